//! Byte-stream transport seam.
//!
//! Physical transport construction lives outside this crate. The session
//! only needs something it can write bytes to and a channel of signals
//! coming back from it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session (Rust) │        serial / bridge       │  Device         │
//! │                 │─── write(&[u8]) ────────────►│  interpreter    │
//! │  signal pump    │◄── TransportSignal ──────────│                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! 1. `Connector::connect` - Open the port, get a [`TransportLink`]
//! 2. [`TransportSignal::Opened`] - Adapter reports the stream is usable
//! 3. [`TransportSignal::Data`] - One per chunk received from the device
//! 4. `Transport::close` - Release the port
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `decoder` | Incremental UTF-8 decoding of received bytes |
//! | `memory` | Recording in-memory adapter |
//! | `ports` | Port descriptions and enumeration |
//! | `stream` | Adapter over any tokio byte stream, TCP bridge connector |

// ============================================================================
// Submodules
// ============================================================================

/// Incremental UTF-8 decoding.
pub mod decoder;

/// In-memory recording transport.
pub mod memory;

/// Port descriptions and enumeration.
pub mod ports;

/// Tokio stream adapter.
pub mod stream;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use decoder::Utf8Decoder;
pub use memory::{MemoryTransport, RecordedWrite};
pub use ports::{PortEnumerator, PortInfo, StaticPorts};
pub use stream::{StreamTransport, TcpConnector};

// ============================================================================
// TransportSignal
// ============================================================================

/// Signals an adapter sends back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The stream is ready for writes.
    Opened,
    /// Bytes received from the device.
    Data(Vec<u8>),
    /// Adapter-level failure.
    Error(String),
    /// The stream ended.
    Closed,
}

// ============================================================================
// Transport
// ============================================================================

/// Write side of an open byte stream.
///
/// Implementations serialize concurrent writes themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes all of `bytes` to the stream.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Closes the stream. Closing twice is not an error.
    async fn close(&self) -> Result<()>;
}

/// An opened transport together with its signal channel.
pub struct TransportLink {
    /// Write handle.
    pub transport: Arc<dyn Transport>,
    /// Signals from the adapter, `Opened` first.
    pub signals: mpsc::UnboundedReceiver<TransportSignal>,
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports by port name.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens `port` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the port cannot be opened.
    ///
    /// [`Error::Connection`]: crate::Error::Connection
    async fn connect(&self, port: &str, baud_rate: u32) -> Result<TransportLink>;
}
