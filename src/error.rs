//! Error types for the raw REPL driver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use board_repl::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let execution = session.execute("print(1 + 1)").await?;
//!     execution.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Discovery | [`Error::NoPortsAvailable`] |
//! | Execution | [`Error::Busy`], [`Error::TaskJoin`] |
//! | External | [`Error::Transport`], [`Error::Io`], [`Error::Json`] |
//!
//! Errors raised by the program running on the device are never mapped to
//! this type. They arrive as ordinary text on [`SessionEvent::Output`].
//!
//! [`SessionEvent::Output`]: crate::SessionEvent::Output

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::task::JoinError;

use crate::session::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport could not be opened.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport closed while an operation was using it.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires an open connection.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// Port enumeration found no port carrying a vendor identifier.
    #[error("No ports available")]
    NoPortsAvailable,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Another execution is still in flight.
    ///
    /// Returned by `execute` under [`OverlapPolicy::Reject`].
    ///
    /// [`OverlapPolicy::Reject`]: crate::OverlapPolicy::Reject
    #[error("Session busy: {state}")]
    Busy {
        /// State the connection was in when the call was rejected.
        state: ConnectionState,
    },

    /// Background transmission task panicked or was aborted.
    #[error("Execution task failed: {0}")]
    TaskJoin(#[from] JoinError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Transport-level failure reported by an adapter.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a busy error for the given state.
    #[inline]
    pub fn busy(state: ConnectionState) -> Self {
        Self::Busy { state }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::Transport { .. }
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::NoPortsAvailable)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("port not found");
        assert_eq!(err.to_string(), "Connection failed: port not found");
    }

    #[test]
    fn test_busy_display() {
        let err = Error::busy(ConnectionState::Transmitting);
        assert_eq!(err.to_string(), "Session busy: transmitting");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::transport("x").is_connection_error());
        assert!(!Error::config("x").is_connection_error());
        assert!(!Error::NoPortsAvailable.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::busy(ConnectionState::RawEntering).is_recoverable());
        assert!(Error::NoPortsAvailable.is_recoverable());
        assert!(!Error::config("x").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
