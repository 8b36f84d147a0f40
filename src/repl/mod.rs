//! Raw REPL protocol.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `raw` | Mode switching, interrupt and soft reset |
//! | `pacing` | Sliced transmission on a fixed timeline |

// ============================================================================
// Submodules
// ============================================================================

/// Paced script transmission.
pub mod pacing;

/// Raw mode controller.
pub mod raw;

// ============================================================================
// Re-exports
// ============================================================================

pub use pacing::{
    DEFAULT_PACING_UNIT, DEFAULT_SLICE_SIZE, PacedOutcome, PacedWriter, PacingPlan,
};
pub use raw::{RawRepl, ReplMode};
