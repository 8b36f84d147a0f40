//! Handle to one in-flight script transmission.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::identifiers::ExecutionId;

// ============================================================================
// ExecutionOutcome
// ============================================================================

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every slice and the terminator were sent.
    Finished,
    /// Cancelled by `cancel`, `stop`, `soft_reset`, a preempting
    /// `execute`, or `close`.
    Cancelled,
}

// ============================================================================
// Execution
// ============================================================================

/// Returned by `execute`. Dropping it does not stop the transmission.
///
/// # Example
///
/// ```ignore
/// let execution = session.execute("import machine").await?;
/// match execution.wait().await? {
///     ExecutionOutcome::Finished => println!("sent"),
///     ExecutionOutcome::Cancelled => println!("cancelled"),
/// }
/// ```
pub struct Execution {
    id: ExecutionId,
    cancel: CancellationToken,
    task: JoinHandle<Result<ExecutionOutcome>>,
}

impl Execution {
    pub(crate) fn new(
        id: ExecutionId,
        cancel: CancellationToken,
        task: JoinHandle<Result<ExecutionOutcome>>,
    ) -> Self {
        Self { id, cancel, task }
    }

    /// Returns the ID carried by this execution's events.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Stops writing further slices.
    ///
    /// Slices already written stay written.
    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation was requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the transmission task has ended.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the schedule to end.
    ///
    /// # Errors
    ///
    /// - Transport errors hit during transmission
    /// - [`Error::TaskJoin`] if the task panicked
    ///
    /// [`Error::TaskJoin`]: crate::Error::TaskJoin
    pub async fn wait(self) -> Result<ExecutionOutcome> {
        self.task.await?
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}
