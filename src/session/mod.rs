//! Device session façade.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session struct, lifecycle, execute pipeline |
//! | `files` | List, load, write, remove, rename |
//! | `event` | Published events |
//! | `execution` | Per-execute handle |
//! | `options` | Session configuration |
//! | `state` | Execute pipeline state |
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(SessionOptions::default())?;
//! session.open(&TcpConnector, "localhost:4000").await?;
//!
//! session.write_file("/main.py", "print('hi')").await?;
//! session.soft_reset().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod event;
mod execution;
mod files;
mod options;
mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Session;
pub use event::SessionEvent;
pub use execution::{Execution, ExecutionOutcome};
pub use options::{DEFAULT_BAUD_RATE, DEFAULT_EVENT_CAPACITY, OverlapPolicy, SessionOptions};
pub use state::ConnectionState;
