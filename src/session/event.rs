//! Events published by a session.
//!
//! | Event | Emitted when |
//! |-------|--------------|
//! | `connected` | The transport reported it is open |
//! | `disconnected` | `close` was called, or the transport ended |
//! | `execution-started` | `execute` accepted a script |
//! | `execution-finished` | The paced schedule wrote its terminator |
//! | `execution-cancelled` | The schedule was cancelled before finishing |
//! | `output` | Device bytes were received and decoded |
//! | `file-saved` | The execution started by `write_file` finished |
//! | `transport-error` | The adapter reported a failure |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::ExecutionId;

// ============================================================================
// SessionEvent
// ============================================================================

/// A lifecycle or output notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// Transport is open and the device was woken.
    Connected,

    /// Session let go of the transport.
    Disconnected,

    /// Script accepted.
    ExecutionStarted {
        /// Execution handle ID.
        id: ExecutionId,
    },

    /// Script fully transmitted.
    ExecutionFinished {
        /// Execution handle ID.
        id: ExecutionId,
    },

    /// Script transmission cancelled.
    ExecutionCancelled {
        /// Execution handle ID.
        id: ExecutionId,
    },

    /// Decoded device output, exactly as received.
    Output {
        /// Text fragment.
        text: String,
    },

    /// A `write_file` execution finished.
    FileSaved {
        /// Device path written.
        path: String,
    },

    /// Adapter-level failure.
    TransportError {
        /// Adapter message.
        message: String,
    },
}

impl SessionEvent {
    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::ExecutionStarted { .. } => "execution-started",
            Self::ExecutionFinished { .. } => "execution-finished",
            Self::ExecutionCancelled { .. } => "execution-cancelled",
            Self::Output { .. } => "output",
            Self::FileSaved { .. } => "file-saved",
            Self::TransportError { .. } => "transport-error",
        }
    }

    /// Returns the execution ID for lifecycle events.
    #[must_use]
    pub fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            Self::ExecutionStarted { id }
            | Self::ExecutionFinished { id }
            | Self::ExecutionCancelled { id } => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag_matches_name() {
        let events = [
            SessionEvent::Connected,
            SessionEvent::ExecutionFinished {
                id: ExecutionId::generate(),
            },
            SessionEvent::Output {
                text: ">>> ".into(),
            },
            SessionEvent::FileSaved {
                path: "/a.txt".into(),
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }

    #[test]
    fn test_execution_id() {
        let id = ExecutionId::generate();
        assert_eq!(
            SessionEvent::ExecutionStarted { id }.execution_id(),
            Some(id)
        );
        assert_eq!(SessionEvent::Connected.execution_id(), None);
    }
}
