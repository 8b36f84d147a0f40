//! Connection execution state.

use std::fmt;

use serde::Serialize;

/// Where the connection is in the execute pipeline.
///
/// ```text
/// Idle ─► RawEntering ─► Transmitting ─► RawExiting ─► Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    /// No execution in flight.
    #[default]
    Idle,
    /// Interrupt and raw-mode entry being sent.
    RawEntering,
    /// Script slices being written.
    Transmitting,
    /// Raw-mode exit being sent.
    RawExiting,
}

impl ConnectionState {
    /// Returns `true` if an execution is in flight.
    #[inline]
    #[must_use]
    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RawEntering => "raw-entering",
            Self::Transmitting => "transmitting",
            Self::RawExiting => "raw-exiting",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy() {
        assert!(!ConnectionState::Idle.is_busy());
        assert!(ConnectionState::RawEntering.is_busy());
        assert!(ConnectionState::Transmitting.is_busy());
        assert!(ConnectionState::RawExiting.is_busy());
    }

    #[test]
    fn test_display_matches_serde() {
        let state = ConnectionState::RawExiting;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, format!("\"{state}\""));
    }
}
