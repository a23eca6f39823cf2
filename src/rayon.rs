//! Parallel size targeting.
//!
//! [`SizeTargetingPass::apply_parallel`] distributes per-frame quality
//! searches across rayon worker threads. Each frame's scratch files are
//! unique to that frame, so workers share no mutable file state. Progress
//! calls are serialised behind a mutex so completed counts still arrive in
//! increasing order.

use std::sync::Mutex;

use ::rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::FramegrabError;
use crate::plan::{OutputFormat, SizeTarget};
use crate::sampler::FrameFile;
use crate::search::ImageReencoder;
use crate::targeting::{FrameOutcome, SizeTargetingPass, TargetingReport};

impl SizeTargetingPass {
    /// Apply the size target to `frames` on the rayon thread pool.
    ///
    /// Same contract as [`apply`](SizeTargetingPass::apply), except frames
    /// finish in no particular order. The report is still in sequence order,
    /// and `progress(completed, total)` still sees `completed` rise by one
    /// per call.
    ///
    /// # Errors
    ///
    /// - [`FramegrabError::NoFramesProduced`] if `frames` is empty.
    /// - [`FramegrabError::Cancelled`] if the token fires. Workers already
    ///   searching a frame finish it.
    pub fn apply_parallel<F>(
        &self,
        mut frames: Vec<FrameFile>,
        target: SizeTarget,
        final_format: OutputFormat,
        reencoder: &dyn ImageReencoder,
        progress: F,
    ) -> Result<TargetingReport, FramegrabError>
    where
        F: FnMut(usize, usize) + Send,
    {
        if frames.is_empty() {
            return Err(FramegrabError::NoFramesProduced);
        }
        frames.sort_by_key(|frame| frame.sequence_index);

        let total = frames.len();
        log::info!(
            "Targeting {total} frame(s) in parallel at ~{} KB each",
            target.kilobytes()
        );
        let completed = Mutex::new((0_usize, progress));

        let outcomes: Result<Vec<FrameOutcome>, FramegrabError> = frames
            .into_par_iter()
            .map(|frame| {
                self.check_cancelled()?;
                let outcome = self.target_frame(frame, target, final_format, reencoder);
                if let Ok(mut guard) = completed.lock() {
                    let (count, callback) = &mut *guard;
                    *count += 1;
                    callback(*count, total);
                }
                Ok(outcome)
            })
            .collect();

        let report = TargetingReport::from_outcomes(outcomes?);
        log::info!(
            "Adjusted {} frame(s), skipped {}",
            report.adjusted,
            report.skipped.len()
        );
        Ok(report)
    }
}
