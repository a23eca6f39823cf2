//! Progress reporting, run stages, notices, and cancellation.
//!
//! A run publishes three kinds of events through [`ProgressCallback`]:
//!
//! - [`ProgressInfo`] snapshots carrying an integer percentage and a phase
//!   label (`"sampling"`, `"adjusting frame i/N"`, `"complete"`,
//!   `"failed"`);
//! - [`RunStage`] transitions of the pipeline state machine;
//! - [`Notice`]s for non-fatal degradations.
//!
//! Front ends (a terminal progress bar, a GUI, a test harness) subscribe by
//! implementing the trait; the pipeline never touches presentation state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{ExtractOptions, Notice, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:>3}%] {}", info.percentage, info.label);
//!     }
//!
//!     fn on_notice(&self, notice: &Notice) {
//!         eprintln!("note: {notice}");
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::plan::OutputFormat;

/// Stages of a single pipeline run.
///
/// ```text
/// Idle → Validating → Sampling → (Targeting)? → Summarizing → Done
///            │            │           │               │
///            └────────────┴───────────┴───────────────┴──→ Failed
/// ```
///
/// There is no way out of [`Failed`](RunStage::Failed); a new run starts
/// fresh from [`Idle`](RunStage::Idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// No run in progress.
    Idle,
    /// Checking inputs before any collaborator is invoked.
    Validating,
    /// Sampling frames from the video.
    Sampling,
    /// Re-encoding frames toward the size target.
    Targeting,
    /// Counting the frames on disk.
    Summarizing,
    /// Finished successfully.
    Done,
    /// Finished with a fatal error.
    Failed,
}

impl RunStage {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(self, next: RunStage) -> bool {
        use RunStage::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Sampling)
                | (Sampling, Targeting)
                | (Sampling, Summarizing)
                | (Targeting, Summarizing)
                | (Summarizing, Done)
                | (Validating, Failed)
                | (Sampling, Failed)
                | (Targeting, Failed)
                | (Summarizing, Failed)
        )
    }

    /// `true` for [`Done`](RunStage::Done) and [`Failed`](RunStage::Failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::Done | RunStage::Failed)
    }
}

/// A non-fatal degradation surfaced during a run.
///
/// Notices never stop a run. They are delivered through
/// [`ProgressCallback::on_notice`] as they happen and also collected into
/// [`ExtractionResult::notices`](crate::ExtractionResult::notices).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Notice {
    /// The size target could not be parsed; targeting is disabled.
    SizeTargetIgnored {
        /// The size text as entered.
        input: String,
    },
    /// A size target was combined with a lossless format; frames are
    /// written in the lossy format instead.
    FormatUpgraded {
        /// Format the user asked for.
        requested: OutputFormat,
        /// Format that will actually be written.
        effective: OutputFormat,
    },
    /// Video metadata could not be read; the estimate falls back to zero.
    MetadataUnavailable {
        /// Why the probe failed.
        reason: String,
    },
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Notice::SizeTargetIgnored { input } => {
                write!(f, "invalid target file size {input:?}; ignoring size setting")
            }
            Notice::FormatUpgraded {
                requested,
                effective,
            } => write!(
                f,
                "{} chosen with a target size; frames will be written as {} to meet the size target",
                requested.extension().to_ascii_uppercase(),
                effective.extension().to_ascii_uppercase(),
            ),
            Notice::MetadataUnavailable { reason } => {
                write!(f, "could not read video info: {reason}")
            }
        }
    }
}

/// A snapshot of run progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Stage the run is in.
    pub stage: RunStage,
    /// Overall completion, `0..=100`. Never decreases within a run.
    pub percentage: u8,
    /// Human-readable phase label.
    pub label: String,
    /// Frames re-encoded so far (targeting only; `0` otherwise).
    pub current: u64,
    /// Frames to re-encode, if known.
    pub total: Option<u64>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time left in the targeting phase, based on throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Receiver for run events.
///
/// Implementations must be [`Send`] and [`Sync`]; with the `rayon` feature,
/// targeting progress may be reported from worker threads (serialised, so
/// percentages still arrive in order).
///
/// Callbacks are **infallible**. They observe the run but cannot halt it;
/// use [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever the overall percentage or phase label changes.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called on every stage transition.
    fn on_stage(&self, _stage: RunStage) {}

    /// Called when a non-fatal degradation occurs.
    fn on_notice(&self, _notice: &Notice) {}
}

/// A no-op implementation that discards all events.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread. The pipeline checks
/// it before sampling and between frames while size targeting. An
/// in-flight sampling or re-encoding call is always awaited to completion.
///
/// # Example
///
/// ```
/// use framegrab::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that maps phase-local progress onto the overall
/// percentage and emits callbacks.
///
/// Sampling occupies `[0, 50]` when targeting follows, `[0, 100]` otherwise.
/// Targeting occupies `[50, 100]` in proportion to completed frames.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    stage: RunStage,
    batch_size: u64,
    start_time: Instant,
    targeting_started: Option<Instant>,
    targeting_enabled: bool,
    last_percentage: u8,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        Self {
            callback,
            stage: RunStage::Idle,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            targeting_started: None,
            targeting_enabled: false,
            last_percentage: 0,
        }
    }

    pub(crate) fn stage(&self) -> RunStage {
        self.stage
    }

    /// Move to `next` and notify the callback.
    pub(crate) fn enter(&mut self, next: RunStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {:?} -> {next:?}",
            self.stage
        );
        log::debug!("Run stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.callback.on_stage(next);
    }

    pub(crate) fn notice(&self, notice: &Notice) {
        log::warn!("{notice}");
        self.callback.on_notice(notice);
    }

    /// Sampling is about to start. `targeting` decides how much of the bar
    /// sampling owns.
    pub(crate) fn sampling_started(&mut self, targeting: bool) {
        self.targeting_enabled = targeting;
        self.report(0, "sampling".to_string(), 0, None, None);
    }

    pub(crate) fn sampling_finished(&mut self) {
        let percentage = if self.targeting_enabled { 50 } else { 100 };
        self.report(percentage, "sampling".to_string(), 0, None, None);
    }

    /// One more frame has been size-targeted.
    pub(crate) fn frame_adjusted(&mut self, completed: usize, total: usize) {
        let started = *self.targeting_started.get_or_insert_with(Instant::now);
        let completed = completed as u64;
        let total = total as u64;
        if total == 0 || (completed % self.batch_size != 0 && completed != total) {
            return;
        }

        let percentage = 50 + (completed * 50 / total) as u8;
        let estimated_remaining = (completed > 0).then(|| {
            let per_frame = started.elapsed() / completed as u32;
            per_frame * total.saturating_sub(completed) as u32
        });
        self.report(
            percentage,
            format!("adjusting frame {completed}/{total}"),
            completed,
            Some(total),
            estimated_remaining,
        );
    }

    pub(crate) fn complete(&mut self) {
        self.report(100, "complete".to_string(), 0, None, None);
    }

    /// Report failure without moving the bar backwards.
    pub(crate) fn failed(&mut self) {
        self.report(self.last_percentage, "failed".to_string(), 0, None, None);
    }

    fn report(
        &mut self,
        percentage: u8,
        label: String,
        current: u64,
        total: Option<u64>,
        estimated_remaining: Option<Duration>,
    ) {
        self.last_percentage = self.last_percentage.max(percentage.min(100));
        let info = ProgressInfo {
            stage: self.stage,
            percentage: self.last_percentage,
            label,
            current,
            total,
            elapsed: self.start_time.elapsed(),
            estimated_remaining,
        };
        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        infos: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
    }

    fn percentages(recorder: &Recorder) -> Vec<u8> {
        recorder
            .infos
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.percentage)
            .collect()
    }

    #[test]
    fn sampling_only_fills_whole_bar() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), 1);
        tracker.sampling_started(false);
        tracker.sampling_finished();
        tracker.complete();
        assert_eq!(percentages(&recorder), vec![0, 100, 100]);
    }

    #[test]
    fn targeting_fills_second_half() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), 1);
        tracker.sampling_started(true);
        tracker.sampling_finished();
        for completed in 1..=4 {
            tracker.frame_adjusted(completed, 4);
        }
        tracker.complete();
        assert_eq!(percentages(&recorder), vec![0, 50, 62, 75, 87, 100, 100]);

        let infos = recorder.infos.lock().unwrap();
        assert_eq!(infos[2].label, "adjusting frame 1/4");
        assert_eq!(infos[5].total, Some(4));
    }

    #[test]
    fn batch_size_skips_intermediate_frames_but_not_last() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), 2);
        tracker.sampling_started(true);
        tracker.sampling_finished();
        for completed in 1..=5 {
            tracker.frame_adjusted(completed, 5);
        }
        assert_eq!(percentages(&recorder), vec![0, 50, 70, 90, 100]);
    }

    #[test]
    fn failure_does_not_move_bar_backwards() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), 1);
        tracker.sampling_started(true);
        tracker.sampling_finished();
        tracker.failed();
        let infos = recorder.infos.lock().unwrap();
        let last = infos.last().unwrap();
        assert_eq!(last.label, "failed");
        assert_eq!(last.percentage, 50);
    }

    #[test]
    fn stage_transitions() {
        assert!(RunStage::Idle.can_advance_to(RunStage::Validating));
        assert!(RunStage::Sampling.can_advance_to(RunStage::Summarizing));
        assert!(RunStage::Targeting.can_advance_to(RunStage::Failed));
        assert!(RunStage::Summarizing.can_advance_to(RunStage::Failed));
        assert!(!RunStage::Done.can_advance_to(RunStage::Failed));
        assert!(!RunStage::Failed.can_advance_to(RunStage::Idle));
        assert!(!RunStage::Idle.can_advance_to(RunStage::Sampling));
        assert!(RunStage::Done.is_terminal());
    }
}
