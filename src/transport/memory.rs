//! In-memory recording transport.
//!
//! [`MemoryTransport`] stands in for a device: every write is recorded with
//! the tokio instant it happened at, and signals can be injected as if the
//! device had sent them. Under a paused tokio clock the recorded instants
//! are exact, which makes pacing observable.
//!
//! # Example
//!
//! ```ignore
//! let device = MemoryTransport::new();
//! let session = Session::new(SessionOptions::default());
//! session.open(&device, "mem0").await?;
//!
//! device.push_data(b">>> ");
//! assert_eq!(device.written_bytes(), b"\r");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{Error, Result};

use super::{Connector, Transport, TransportLink, TransportSignal};

// ============================================================================
// RecordedWrite
// ============================================================================

/// One write observed by a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    /// When the write happened.
    pub at: Instant,
    /// Bytes written.
    pub bytes: Vec<u8>,
}

// ============================================================================
// MemoryTransport
// ============================================================================

#[derive(Default)]
struct MemoryState {
    writes: Vec<RecordedWrite>,
    signal_tx: Option<mpsc::UnboundedSender<TransportSignal>>,
    opened_with: Option<(String, u32)>,
    closed: bool,
    fail_writes: bool,
}

/// Recording transport and connector. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Creates an unconnected memory transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every write so far.
    #[must_use]
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    /// Returns all written bytes concatenated.
    #[must_use]
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state
            .lock()
            .writes
            .iter()
            .flat_map(|w| w.bytes.iter().copied())
            .collect()
    }

    /// Forgets recorded writes.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Port and baud rate of the last `connect`.
    #[must_use]
    pub fn opened_with(&self) -> Option<(String, u32)> {
        self.state.lock().opened_with.clone()
    }

    /// Returns `true` once `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Makes subsequent writes fail with a transport error.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Injects a signal. Returns `false` if nobody is connected.
    pub fn inject(&self, signal: TransportSignal) -> bool {
        self.state
            .lock()
            .signal_tx
            .as_ref()
            .is_some_and(|tx| tx.send(signal).is_ok())
    }

    /// Injects device output.
    pub fn push_data(&self, bytes: &[u8]) -> bool {
        self.inject(TransportSignal::Data(bytes.to_vec()))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::ConnectionClosed);
        }
        if state.fail_writes {
            return Err(Error::transport("write rejected"));
        }

        trace!(bytes = bytes.len(), "Memory write");
        state.writes.push(RecordedWrite {
            at: Instant::now(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        state.signal_tx = None;
        Ok(())
    }
}

#[async_trait]
impl Connector for MemoryTransport {
    async fn connect(&self, port: &str, baud_rate: u32) -> Result<TransportLink> {
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let _ = signal_tx.send(TransportSignal::Opened);

        {
            let mut state = self.state.lock();
            state.signal_tx = Some(signal_tx);
            state.opened_with = Some((port.to_string(), baud_rate));
            state.closed = false;
        }

        Ok(TransportLink {
            transport: Arc::new(self.clone()),
            signals,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_records_port() {
        let memory = MemoryTransport::new();
        let mut link = memory.connect("mem0", 115_200).await.unwrap();

        assert_eq!(memory.opened_with(), Some(("mem0".to_string(), 115_200)));
        assert_eq!(link.signals.recv().await, Some(TransportSignal::Opened));

        assert!(memory.push_data(b">>> "));
        assert_eq!(
            link.signals.recv().await,
            Some(TransportSignal::Data(b">>> ".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_records_writes() {
        let memory = MemoryTransport::new();
        let link = memory.connect("mem0", 9600).await.unwrap();

        link.transport.write(b"\r").await.unwrap();
        link.transport.write(b"\x03").await.unwrap();

        assert_eq!(memory.writes().len(), 2);
        assert_eq!(memory.written_bytes(), b"\r\x03");

        memory.clear_writes();
        assert!(memory.writes().is_empty());
    }

    #[tokio::test]
    async fn test_close_rejects_writes() {
        let memory = MemoryTransport::new();
        let link = memory.connect("mem0", 9600).await.unwrap();

        link.transport.close().await.unwrap();
        assert!(memory.is_closed());
        assert!(!memory.push_data(b"late"));

        let err = link.transport.write(b"x").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let memory = MemoryTransport::new();
        let link = memory.connect("mem0", 9600).await.unwrap();

        memory.fail_writes(true);
        let err = link.transport.write(b"x").await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
