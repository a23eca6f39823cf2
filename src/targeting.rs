//! Size targeting.
//!
//! [`SizeTargetingPass`] runs a [`QualitySearch`] over every sampled frame and
//! replaces each frame with its winning re-encoding. Frames whose search
//! produced nothing are left as they are and reported as skipped; a failed
//! frame never aborts the pass.

use std::fs;
use std::path::Path;

use crate::error::FramegrabError;
use crate::plan::{OutputFormat, SizeTarget};
use crate::progress::CancellationToken;
use crate::sampler::FrameFile;
use crate::search::{ImageReencoder, QualitySearch, SearchCandidate};

/// Outcome of a size-targeting pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use]
pub struct TargetingReport {
    /// Every frame after the pass, in sequence order. Adjusted frames point
    /// at their new location and size.
    pub frames: Vec<FrameFile>,
    /// Number of frames replaced by a re-encoding.
    pub adjusted: usize,
    /// Sequence indices of frames left untouched.
    pub skipped: Vec<u32>,
}

/// What happened to one frame.
#[derive(Debug)]
pub(crate) enum FrameOutcome {
    Adjusted(FrameFile),
    Skipped(FrameFile),
}

impl TargetingReport {
    pub(crate) fn from_outcomes(outcomes: Vec<FrameOutcome>) -> Self {
        let mut report = TargetingReport::default();
        for outcome in outcomes {
            match outcome {
                FrameOutcome::Adjusted(frame) => {
                    report.adjusted += 1;
                    report.frames.push(frame);
                }
                FrameOutcome::Skipped(frame) => {
                    report.skipped.push(frame.sequence_index);
                    report.frames.push(frame);
                }
            }
        }
        report.frames.sort_by_key(|frame| frame.sequence_index);
        report.skipped.sort_unstable();
        report
    }
}

/// Re-encodes every frame toward a byte-size target.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FfmpegReencoder, OutputFormat, QualitySearch, SizeTarget, SizeTargetingPass, scan_frames};
///
/// let frames = scan_frames("frames".as_ref(), OutputFormat::Jpeg)?;
/// let report = SizeTargetingPass::new(QualitySearch::default()).apply(
///     frames,
///     SizeTarget::parse_kb("200")?,
///     OutputFormat::Jpeg,
///     &FfmpegReencoder,
///     |done, total| println!("{done}/{total}"),
/// )?;
/// println!("adjusted {} frame(s), skipped {:?}", report.adjusted, report.skipped);
/// # Ok::<(), framegrab::FramegrabError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SizeTargetingPass {
    search: QualitySearch,
    cancellation: Option<CancellationToken>,
}

impl SizeTargetingPass {
    /// Create a pass that uses `search` for every frame.
    pub fn new(search: QualitySearch) -> Self {
        Self {
            search,
            cancellation: None,
        }
    }

    /// Check `token` before each frame.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Apply the size target to `frames`, one at a time in sequence order.
    ///
    /// `progress(completed, total)` is called after each frame.
    ///
    /// # Errors
    ///
    /// - [`FramegrabError::NoFramesProduced`] if `frames` is empty.
    /// - [`FramegrabError::Cancelled`] if the token fires between frames.
    ///   Frames already processed keep their new encoding.
    pub fn apply(
        &self,
        mut frames: Vec<FrameFile>,
        target: SizeTarget,
        final_format: OutputFormat,
        reencoder: &dyn ImageReencoder,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<TargetingReport, FramegrabError> {
        if frames.is_empty() {
            return Err(FramegrabError::NoFramesProduced);
        }
        frames.sort_by_key(|frame| frame.sequence_index);

        let total = frames.len();
        log::info!(
            "Targeting {total} frame(s) at ~{} KB each",
            target.kilobytes()
        );

        let mut outcomes = Vec::with_capacity(total);
        for (position, frame) in frames.into_iter().enumerate() {
            self.check_cancelled()?;
            outcomes.push(self.target_frame(frame, target, final_format, reencoder));
            progress(position + 1, total);
        }

        let report = TargetingReport::from_outcomes(outcomes);
        log::info!(
            "Adjusted {} frame(s), skipped {}",
            report.adjusted,
            report.skipped.len()
        );
        Ok(report)
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), FramegrabError> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            return Err(FramegrabError::Cancelled);
        }
        Ok(())
    }

    /// Search one frame and swap in the winner.
    pub(crate) fn target_frame(
        &self,
        frame: FrameFile,
        target: SizeTarget,
        final_format: OutputFormat,
        reencoder: &dyn ImageReencoder,
    ) -> FrameOutcome {
        let result = self.search.search(reencoder, &frame.path, target.bytes());
        let Some(candidate) = result.best else {
            log::warn!(
                "No re-encoding produced for {}; keeping the original",
                frame.path.display()
            );
            return FrameOutcome::Skipped(frame);
        };

        match replace_with_candidate(&frame, &candidate, final_format) {
            Ok(adjusted) => {
                log::debug!(
                    "{}: q={} -> {} bytes after {} probe(s)",
                    adjusted.path.display(),
                    candidate.quality,
                    candidate.size_bytes,
                    result.probes_run
                );
                FrameOutcome::Adjusted(adjusted)
            }
            Err(error) => {
                log::warn!(
                    "Could not replace {} with its re-encoding: {error}",
                    frame.path.display()
                );
                remove_quietly(&candidate.path);
                FrameOutcome::Skipped(frame)
            }
        }
    }
}

/// Move the winning scratch file into place and remove the original if the
/// extension changed.
fn replace_with_candidate(
    frame: &FrameFile,
    candidate: &SearchCandidate,
    final_format: OutputFormat,
) -> Result<FrameFile, FramegrabError> {
    let destination = frame.path.with_extension(final_format.extension());
    fs::rename(&candidate.path, &destination)?;
    if destination != frame.path {
        remove_quietly(&frame.path);
    }
    Ok(FrameFile {
        path: destination,
        sequence_index: frame.sequence_index,
        size_bytes: candidate.size_bytes,
    })
}

fn remove_quietly(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != std::io::ErrorKind::NotFound
    {
        log::warn!("Failed to remove {}: {error}", path.display());
    }
}
