//! Paced, sliced script transmission.
//!
//! The device has a small receive buffer and no flow control. A script is
//! cut into fixed-size slices written at evenly spaced instants, then
//! terminated with Ctrl-D one interval after the last slice:
//!
//! ```text
//! t = 0      unit    2·unit   ...   n·unit
//!     slice0 slice1  slice2         EOT (complete)
//! ```
//!
//! Completion means every byte was handed to the transport. It says
//! nothing about whether the device has finished running the program.

// ============================================================================
// Imports
// ============================================================================

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::control;
use crate::transport::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default slice size in bytes.
pub const DEFAULT_SLICE_SIZE: usize = 256;

/// Default interval between slices.
pub const DEFAULT_PACING_UNIT: Duration = Duration::from_millis(10);

// ============================================================================
// PacingPlan
// ============================================================================

/// Slice boundaries and write offsets for one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPlan {
    len: usize,
    slice_size: usize,
    unit: Duration,
}

impl PacingPlan {
    /// Plans a script of `len` bytes. A zero slice size is treated as 1.
    #[must_use]
    pub fn new(len: usize, slice_size: usize, unit: Duration) -> Self {
        Self {
            len,
            slice_size: slice_size.max(1),
            unit,
        }
    }

    /// Number of slices, `ceil(len / slice_size)`.
    #[inline]
    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.len.div_ceil(self.slice_size)
    }

    /// Byte range of slice `index`.
    #[inline]
    #[must_use]
    pub fn slice_range(&self, index: usize) -> Range<usize> {
        let start = (index * self.slice_size).min(self.len);
        start..(start + self.slice_size).min(self.len)
    }

    /// Offset of slice `index` from the start of transmission.
    #[inline]
    #[must_use]
    pub fn slice_offset(&self, index: usize) -> Duration {
        scale(self.unit, index)
    }

    /// Offset of the terminating Ctrl-D, which is also completion.
    #[inline]
    #[must_use]
    pub fn completion_offset(&self) -> Duration {
        scale(self.unit, self.slice_count())
    }

    /// Time slots occupied by the schedule, `(slice_count + 1) · unit`.
    #[inline]
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        scale(self.unit, self.slice_count() + 1)
    }
}

fn scale(unit: Duration, factor: usize) -> Duration {
    unit.saturating_mul(u32::try_from(factor).unwrap_or(u32::MAX))
}

// ============================================================================
// PacedOutcome
// ============================================================================

/// How a paced transmission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacedOutcome {
    /// All slices and the terminator were written.
    Completed,
    /// The token fired first; nothing further was written.
    Cancelled,
}

// ============================================================================
// PacedWriter
// ============================================================================

/// Writes scripts slice by slice on a fixed timeline.
#[derive(Clone)]
pub struct PacedWriter {
    transport: Arc<dyn Transport>,
    slice_size: usize,
    unit: Duration,
}

impl PacedWriter {
    /// Creates a writer with the given slice size and interval.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, slice_size: usize, unit: Duration) -> Self {
        Self {
            transport,
            slice_size,
            unit,
        }
    }

    /// Returns the plan `script` would be sent with.
    #[inline]
    #[must_use]
    pub fn plan(&self, script: &[u8]) -> PacingPlan {
        PacingPlan::new(script.len(), self.slice_size, self.unit)
    }

    /// Transmits `script` followed by Ctrl-D.
    ///
    /// Offsets are measured from the call. Once `cancel` fires no further
    /// slice is written.
    ///
    /// # Errors
    ///
    /// Transport write failures end the transmission and are returned
    /// as-is; nothing is retried.
    pub async fn run(&self, script: &[u8], cancel: &CancellationToken) -> Result<PacedOutcome> {
        let plan = self.plan(script);
        let start = Instant::now();

        debug!(
            bytes = script.len(),
            slices = plan.slice_count(),
            "Transmitting script"
        );

        for index in 0..plan.slice_count() {
            if !wait_until(start + plan.slice_offset(index), cancel).await {
                debug!(sent = index, "Transmission cancelled");
                return Ok(PacedOutcome::Cancelled);
            }

            let range = plan.slice_range(index);
            trace!(index, start = range.start, end = range.end, "Writing slice");
            self.transport.write(&script[range]).await?;
        }

        if !wait_until(start + plan.completion_offset(), cancel).await {
            debug!("Transmission cancelled before terminator");
            return Ok(PacedOutcome::Cancelled);
        }

        self.transport
            .write(control::END_OF_TRANSMISSION)
            .await?;
        Ok(PacedOutcome::Completed)
    }
}

/// Sleeps until `deadline`. Returns `false` if cancelled first.
async fn wait_until(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = sleep_until(deadline) => true,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::transport::{Connector, MemoryTransport};

    async fn writer() -> (MemoryTransport, PacedWriter) {
        let memory = MemoryTransport::new();
        let link = memory.connect("mem0", 115_200).await.unwrap();
        let writer = PacedWriter::new(link.transport, DEFAULT_SLICE_SIZE, DEFAULT_PACING_UNIT);
        (memory, writer)
    }

    #[test]
    fn test_plan_short_script() {
        let plan = PacingPlan::new(12, 256, Duration::from_millis(10));
        assert_eq!(plan.slice_count(), 1);
        assert_eq!(plan.slice_range(0), 0..12);
        assert_eq!(plan.completion_offset(), Duration::from_millis(10));
        assert_eq!(plan.total_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_plan_empty_script() {
        let plan = PacingPlan::new(0, 256, Duration::from_millis(10));
        assert_eq!(plan.slice_count(), 0);
        assert_eq!(plan.completion_offset(), Duration::ZERO);
    }

    #[test]
    fn test_plan_exact_multiple() {
        let plan = PacingPlan::new(512, 256, Duration::from_millis(10));
        assert_eq!(plan.slice_count(), 2);
        assert_eq!(plan.slice_range(1), 256..512);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slice_schedule() {
        let (memory, writer) = writer().await;
        let start = Instant::now();

        let outcome = writer
            .run(b"print(1+1)\r\n", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, PacedOutcome::Completed);

        let writes = memory.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].bytes, b"print(1+1)\r\n");
        assert_eq!(writes[0].at - start, Duration::ZERO);
        assert_eq!(writes[1].bytes, b"\x04");
        assert_eq!(writes[1].at - start, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_slice_schedule() {
        let (memory, writer) = writer().await;
        let script = vec![b'x'; 600];
        let start = Instant::now();

        writer.run(&script, &CancellationToken::new()).await.unwrap();

        let writes = memory.writes();
        let sizes: Vec<usize> = writes.iter().map(|w| w.bytes.len()).collect();
        assert_eq!(sizes, vec![256, 256, 88, 1]);

        let offsets: Vec<Duration> = writes.iter().map(|w| w.at - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(30),
            ]
        );
        assert_eq!(memory.written_bytes()[..600], script[..]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_remaining_slices() {
        let (memory, writer) = writer().await;
        let script = vec![b'y'; 1024];
        let cancel = CancellationToken::new();

        let task = {
            let writer = writer.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { writer.run(&script, &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(15)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap().unwrap(), PacedOutcome::Cancelled);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(memory.writes().len(), 2);
        assert!(!memory.written_bytes().contains(&control::CTRL_D));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_propagates() {
        let (memory, writer) = writer().await;
        memory.fail_writes(true);

        let result = writer.run(b"x", &CancellationToken::new()).await;
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_plan_laws(len in 0usize..10_000) {
            let unit = Duration::from_millis(10);
            let plan = PacingPlan::new(len, 256, unit);
            let slices = len.div_ceil(256);

            prop_assert_eq!(plan.slice_count(), slices);
            prop_assert_eq!(plan.total_duration(), unit * (slices as u32 + 1));

            let covered: usize = (0..slices).map(|i| plan.slice_range(i).len()).sum();
            prop_assert_eq!(covered, len);
        }
    }
}
