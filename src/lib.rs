//! Board REPL - raw REPL driver for microcontroller interpreters.
//!
//! This library drives the line-oriented interpreter of a small device
//! (MicroPython-style) over a byte-stream link such as a serial port.
//!
//! # Architecture
//!
//! The device offers no framing and no acknowledgements:
//!
//! - **Control bytes** switch between the friendly REPL and raw mode,
//!   interrupt programs and soft-reset the interpreter
//! - **Raw mode** accepts a whole program terminated by Ctrl-D
//! - **Pacing** replaces flow control: scripts are written in fixed-size
//!   slices at fixed intervals
//! - **File operations** are generated programs run through the same path
//!
//! # Quick Start
//!
//! ```no_run
//! use board_repl::{Result, Session, SessionOptions, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::new(SessionOptions::default())?;
//!     session.open(&TcpConnector, "localhost:4000").await?;
//!
//!     let execution = session.execute("print(1 + 1)").await?;
//!     execution.wait().await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Public façade: [`Session`], events, options |
//! | [`repl`] | Raw mode controller and paced writer |
//! | [`protocol`] | Control bytes and script templates |
//! | [`transport`] | Transport traits and adapters |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Control bytes and remote script templates.
pub mod protocol;

/// Raw REPL controller and paced transmission.
pub mod repl;

/// Session façade.
///
/// - [`Session`] - Connection owner and public operations
/// - [`SessionEvent`] - Lifecycle and output notifications
/// - [`Execution`] - Handle to one transmission
pub mod session;

/// Transport seam and adapters.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{
    ConnectionState, Execution, ExecutionOutcome, OverlapPolicy, Session, SessionEvent,
    SessionOptions,
};

// Protocol types
pub use protocol::{BEGIN_MARKER, END_MARKER, FileOperation};

// REPL types
pub use repl::{PacingPlan, ReplMode};

// Transport types
pub use transport::{
    Connector, MemoryTransport, PortEnumerator, PortInfo, StaticPorts, StreamTransport,
    TcpConnector, Transport, TransportLink, TransportSignal,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ExecutionId;
