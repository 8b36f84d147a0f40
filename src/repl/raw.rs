//! Raw REPL mode controller.
//!
//! The device interpreter runs in one of two modes: the friendly line
//! REPL, and raw mode, which accepts a whole program terminated by Ctrl-D.
//! Mode switches are single control bytes the device never acknowledges,
//! so [`RawRepl`] tracks the mode it *asked for*, not the mode the device
//! is known to be in.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::protocol::control;
use crate::transport::Transport;

// ============================================================================
// ReplMode
// ============================================================================

/// Interpreter mode last requested by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplMode {
    /// Interactive line mode.
    #[default]
    Normal,
    /// Bulk program mode.
    Raw,
}

impl fmt::Display for ReplMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Raw => f.write_str("raw"),
        }
    }
}

// ============================================================================
// RawRepl
// ============================================================================

/// Sends mode-switch and interrupt sequences over a transport.
pub struct RawRepl {
    /// Write handle.
    transport: Arc<dyn Transport>,
    /// Last requested mode.
    mode: Mutex<ReplMode>,
}

impl RawRepl {
    /// Creates a controller assuming the device starts in normal mode.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            mode: Mutex::new(ReplMode::Normal),
        }
    }

    /// Returns the last requested mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> ReplMode {
        *self.mode.lock()
    }

    /// Returns `true` if raw mode was entered and not yet exited.
    #[inline]
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.mode() == ReplMode::Raw
    }

    /// Sends a bare carriage return so the device prints a prompt.
    pub async fn wake(&self) -> Result<()> {
        self.transport.write(control::WAKE).await
    }

    /// Requests raw mode.
    ///
    /// # Errors
    ///
    /// Propagates transport write failures.
    pub async fn enter(&self) -> Result<()> {
        self.transport.write(control::ENTER_RAW).await?;
        *self.mode.lock() = ReplMode::Raw;
        debug!("Raw mode requested");
        Ok(())
    }

    /// Ends the current program and returns to normal mode.
    ///
    /// # Errors
    ///
    /// Propagates transport write failures.
    pub async fn exit(&self) -> Result<()> {
        self.transport.write(control::EXIT_RAW).await?;
        *self.mode.lock() = ReplMode::Normal;
        debug!("Raw mode exit requested");
        Ok(())
    }

    /// Discards a partially received program and returns to normal mode.
    ///
    /// Ctrl-C empties the raw-mode input buffer, so the Ctrl-D that follows
    /// runs nothing.
    ///
    /// # Errors
    ///
    /// Propagates transport write failures.
    pub async fn abort(&self) -> Result<()> {
        self.interrupt().await?;
        self.exit().await
    }

    /// Interrupts whatever the device is running.
    ///
    /// Does not change the tracked mode.
    pub async fn interrupt(&self) -> Result<()> {
        self.transport.write(control::INTERRUPT).await?;
        debug!("Interrupt sent");
        Ok(())
    }

    /// Interrupts, then sends Ctrl-D to restart the interpreter.
    pub async fn soft_reset(&self) -> Result<()> {
        self.interrupt().await?;
        self.transport.write(control::END_OF_TRANSMISSION).await?;
        debug!("Soft reset sent");
        Ok(())
    }
}

impl fmt::Debug for RawRepl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRepl")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::{Connector, MemoryTransport};

    async fn controller() -> (MemoryTransport, RawRepl) {
        let memory = MemoryTransport::new();
        let link = memory.connect("mem0", 115_200).await.unwrap();
        (memory, RawRepl::new(link.transport))
    }

    #[tokio::test]
    async fn test_enter_exit() {
        let (memory, repl) = controller().await;
        assert_eq!(repl.mode(), ReplMode::Normal);

        repl.enter().await.unwrap();
        assert!(repl.is_raw());
        repl.exit().await.unwrap();
        assert!(!repl.is_raw());

        assert_eq!(memory.written_bytes(), b"\r\x01\x04\x02");
    }

    #[tokio::test]
    async fn test_interrupt_keeps_mode() {
        let (memory, repl) = controller().await;
        repl.enter().await.unwrap();
        repl.interrupt().await.unwrap();

        assert!(repl.is_raw());
        assert_eq!(memory.written_bytes(), b"\r\x01\r\x03");
    }

    #[tokio::test]
    async fn test_abort_interrupts_before_exit() {
        let (memory, repl) = controller().await;
        repl.enter().await.unwrap();
        memory.clear_writes();

        repl.abort().await.unwrap();

        assert!(!repl.is_raw());
        let writes: Vec<Vec<u8>> = memory.writes().into_iter().map(|w| w.bytes).collect();
        assert_eq!(writes, vec![b"\r\x03".to_vec(), b"\x04\x02".to_vec()]);
    }

    #[tokio::test]
    async fn test_soft_reset_sequence() {
        let (memory, repl) = controller().await;
        repl.soft_reset().await.unwrap();
        assert_eq!(memory.written_bytes(), b"\r\x03\x04");
    }

    #[tokio::test]
    async fn test_failed_enter_keeps_mode() {
        let (memory, repl) = controller().await;
        memory.fail_writes(true);

        assert!(repl.enter().await.is_err());
        assert_eq!(repl.mode(), ReplMode::Normal);
    }
}
