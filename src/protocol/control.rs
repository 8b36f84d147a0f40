//! Control bytes understood by the device interpreter.
//!
//! | Action | Bytes |
//! |--------|-------|
//! | Wake / prompt | `CR` |
//! | Enter raw mode | `CR` `0x01` |
//! | Exit raw mode | `0x04` `0x02` |
//! | Interrupt | `CR` `0x03` |
//! | Soft reset | interrupt, then `0x04` |
//! | End of script | `0x04` |

/// Carriage return.
pub const CR: u8 = b'\r';

/// Ctrl-A: switch to raw mode.
pub const CTRL_A: u8 = 0x01;

/// Ctrl-B: leave raw mode for the friendly REPL.
pub const CTRL_B: u8 = 0x02;

/// Ctrl-C: keyboard interrupt.
pub const CTRL_C: u8 = 0x03;

/// Ctrl-D: end of transmission.
pub const CTRL_D: u8 = 0x04;

// ============================================================================
// Sequences
// ============================================================================

/// Nudges the interpreter into printing a prompt.
pub const WAKE: &[u8] = &[CR];

/// Enters raw mode.
pub const ENTER_RAW: &[u8] = &[CR, CTRL_A];

/// Leaves raw mode.
pub const EXIT_RAW: &[u8] = &[CTRL_D, CTRL_B];

/// Interrupts the running program.
pub const INTERRUPT: &[u8] = &[CR, CTRL_C];

/// Terminates a script, or soft-resets when sent at an idle prompt.
pub const END_OF_TRANSMISSION: &[u8] = &[CTRL_D];
