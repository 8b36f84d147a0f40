//! Session configuration.
//!
//! # Example
//!
//! ```ignore
//! use board_repl::{OverlapPolicy, SessionOptions};
//!
//! let options = SessionOptions::new()
//!     .with_slice_size(128)
//!     .with_overlap(OverlapPolicy::Preempt);
//!
//! let from_file = SessionOptions::from_json_str(r#"{ "pacingUnitMs": 20 }"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repl::{DEFAULT_PACING_UNIT, DEFAULT_SLICE_SIZE};

// ============================================================================
// Constants
// ============================================================================

/// Default serial line rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default broadcast capacity for session events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ============================================================================
// OverlapPolicy
// ============================================================================

/// What `execute` does while another execution is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Fail with [`Error::Busy`].
    #[default]
    Reject,
    /// Cancel the in-flight schedule and start over.
    Preempt,
}

// ============================================================================
// SessionOptions
// ============================================================================

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// Line rate passed to the connector.
    pub baud_rate: u32,

    /// Bytes per paced write.
    pub slice_size: usize,

    /// Interval between paced writes, in milliseconds.
    pub pacing_unit_ms: u64,

    /// Overlapping `execute` behaviour.
    pub overlap: OverlapPolicy,

    /// Buffered events per subscriber before it lags.
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with the protocol defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            slice_size: DEFAULT_SLICE_SIZE,
            pacing_unit_ms: whole_millis(DEFAULT_PACING_UNIT),
            overlap: OverlapPolicy::Reject,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not valid options JSON
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the baud rate.
    #[inline]
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Sets the slice size.
    #[inline]
    #[must_use]
    pub fn with_slice_size(mut self, slice_size: usize) -> Self {
        self.slice_size = slice_size;
        self
    }

    /// Sets the pacing interval, in whole milliseconds.
    ///
    /// Sub-millisecond intervals round down to zero and fail validation.
    #[inline]
    #[must_use]
    pub fn with_pacing_unit(mut self, unit: Duration) -> Self {
        self.pacing_unit_ms = whole_millis(unit);
        self
    }

    /// Sets the overlap policy.
    #[inline]
    #[must_use]
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Sets the event channel capacity.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

// ============================================================================
// Accessors & Validation
// ============================================================================

impl SessionOptions {
    /// Returns the pacing interval.
    #[inline]
    #[must_use]
    pub fn pacing_unit(&self) -> Duration {
        Duration::from_millis(self.pacing_unit_ms)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the slice size, pacing interval, baud
    /// rate or event capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.slice_size == 0 {
            return Err(Error::config("slice size must be greater than zero"));
        }
        if self.pacing_unit_ms == 0 {
            return Err(Error::config("pacing unit must be at least one millisecond"));
        }
        if self.baud_rate == 0 {
            return Err(Error::config("baud rate must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event capacity must be greater than zero"));
        }
        Ok(())
    }
}

/// Saturates durations beyond `u64::MAX` milliseconds.
fn whole_millis(unit: Duration) -> u64 {
    u64::try_from(unit.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
