//! Wire-level protocol knowledge.
//!
//! The device interpreter offers no framing and no acknowledgements. The
//! host talks to it with a handful of reserved control bytes and with
//! plain program text.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `control` | Control bytes and fixed byte sequences |
//! | `script` | Remote program templates for file operations |

// ============================================================================
// Submodules
// ============================================================================

/// Control bytes and sequences.
pub mod control;

/// Remote program templates.
pub mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use script::{BEGIN_MARKER, END_MARKER, FileOperation};
