//! End-to-end extraction.
//!
//! [`ExtractionPipeline`] turns an [`ExtractionRequest`] (raw user input)
//! into frame files on disk:
//!
//! 1. validate the input and resolve the sampling plan and output format;
//! 2. probe the video for the advisory frame estimate;
//! 3. sample frames into the output folder;
//! 4. optionally re-encode every frame toward a size target;
//! 5. count what actually landed on disk.
//!
//! Stage transitions, progress, and non-fatal notices are published through
//! the [`ProgressCallback`](crate::ProgressCallback) configured in
//! [`ExtractOptions`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::configuration::ExtractOptions;
use crate::error::FramegrabError;
use crate::metadata::VideoMetadata;
use crate::plan::{OutputFormat, SamplingPlan, SizeTarget};
use crate::probe::{FfmpegProbe, MetadataProbe};
use crate::progress::{Notice, ProgressTracker, RunStage};
use crate::sampler::{FfmpegSampler, FrameFile, FrameSampler, SamplingService, scan_frames};
use crate::search::{FfmpegReencoder, ImageReencoder};
use crate::targeting::{SizeTargetingPass, TargetingReport};

/// Default name of the folder receiving frames.
pub const DEFAULT_OUTPUT_FOLDER: &str = "extracted_frames";

/// Raw inputs of one extraction run.
///
/// Text fields are kept as entered so that validation errors and notices can
/// echo them back.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Video to extract from. `None` fails validation.
    pub video: Option<PathBuf>,
    /// Keep every frame at the native rate, ignoring `rate_input`.
    pub use_original_rate: bool,
    /// Frames per second to sample, as text.
    pub rate_input: String,
    /// Format asked for. May be upgraded when a size target is set.
    pub requested_format: OutputFormat,
    /// Per-frame size target in kilobytes, as text. `None` or blank
    /// disables targeting.
    pub size_target_kb: Option<String>,
    /// Name of the output folder, created under `output_root`.
    pub output_folder: String,
    /// Directory the output folder is created in.
    pub output_root: PathBuf,
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self {
            video: None,
            use_original_rate: false,
            rate_input: "1".to_string(),
            requested_format: OutputFormat::Png,
            size_target_kb: None,
            output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            output_root: PathBuf::from("."),
        }
    }
}

impl ExtractionRequest {
    /// A request for `video` with default settings: one frame per second,
    /// PNG, no size target, `./extracted_frames`.
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: Some(video.into()),
            ..Self::default()
        }
    }

    fn size_target_text(&self) -> Option<&str> {
        self.size_target_kb
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Frame files of `output_format` found in `output_location` after the
    /// run.
    pub frame_count: u64,
    /// Format actually written.
    pub output_format: OutputFormat,
    /// Folder holding the frames.
    pub output_location: PathBuf,
    /// Pre-run estimate. Advisory only.
    pub estimated_frames: u64,
    /// Frames replaced by a size-targeted re-encoding.
    pub adjusted_frames: usize,
    /// Sequence indices of frames the size target could not be applied to.
    pub skipped_frames: Vec<u32>,
    /// Non-fatal degradations, in the order they occurred.
    pub notices: Vec<Notice>,
}

/// What a run would do, computed without extracting anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPreview {
    /// Probed video metadata. Zero-valued if the probe failed.
    pub metadata: VideoMetadata,
    /// Why the probe failed, if it did.
    pub metadata_error: Option<String>,
    /// The resolved plan, or `None` if the rate text is invalid.
    pub plan: Option<SamplingPlan>,
    /// Advisory frame estimate, if the plan is valid.
    pub estimated_frames: Option<u64>,
    /// Size target text as entered, if any.
    pub size_target: Option<String>,
}

impl Display for ExtractionPreview {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(reason) = &self.metadata_error {
            writeln!(f, "Could not read video info: {reason}")?;
        }
        let (Some(plan), Some(estimated)) = (self.plan, self.estimated_frames) else {
            f.write_str("Please enter a valid frame rate")?;
            return self.fmt_target(f);
        };
        writeln!(
            f,
            "Video: {:.1} seconds @ {:.2} fps",
            self.metadata.duration_seconds, self.metadata.native_fps
        )?;
        match plan {
            SamplingPlan::OriginalRate => writeln!(
                f,
                "Will extract ALL frames at original {:.2} fps",
                self.metadata.native_fps
            )?,
            SamplingPlan::FixedRate(rate) => writeln!(f, "Will extract {rate} frame(s) per second")?,
        }
        write!(f, "Estimated images: ~{estimated}")?;
        self.fmt_target(f)
    }
}

impl ExtractionPreview {
    fn fmt_target(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.size_target {
            Some(text) => write!(f, "\nTarget file size: ~{text} KB per frame"),
            None => Ok(()),
        }
    }
}

/// Runs extractions against a set of collaborators.
///
/// [`new`](ExtractionPipeline::new) wires the FFmpeg-backed probe, sampler,
/// and re-encoder. Each can be replaced, which is how the tests drive the
/// pipeline with deterministic stubs.
///
/// # Example
///
/// ```no_run
/// use framegrab::{ExtractionPipeline, ExtractionRequest, OutputFormat};
///
/// let mut request = ExtractionRequest::new("input.mp4");
/// request.rate_input = "2".to_string();
/// request.requested_format = OutputFormat::Jpeg;
/// request.size_target_kb = Some("150".to_string());
///
/// let result = ExtractionPipeline::new().run(&request)?;
/// println!("{} frame(s) in {}", result.frame_count, result.output_location.display());
/// # Ok::<(), framegrab::FramegrabError>(())
/// ```
#[derive(Clone)]
pub struct ExtractionPipeline {
    probe: Arc<dyn MetadataProbe>,
    sampler: Arc<dyn SamplingService>,
    reencoder: Arc<dyn ImageReencoder>,
    options: ExtractOptions,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionPipeline {
    /// A pipeline backed by FFmpeg with default options.
    pub fn new() -> Self {
        Self {
            probe: Arc::new(FfmpegProbe),
            sampler: Arc::new(FfmpegSampler),
            reencoder: Arc::new(FfmpegReencoder),
            options: ExtractOptions::default(),
        }
    }

    /// Replace the metadata probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the sampling service.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Arc<dyn SamplingService>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replace the image re-encoder used for size targeting.
    #[must_use]
    pub fn with_reencoder(mut self, reencoder: Arc<dyn ImageReencoder>) -> Self {
        self.reencoder = reencoder;
        self
    }

    /// Replace the run options.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Probe the video and compute the frame estimate without extracting.
    ///
    /// A failed probe does not fail the preview: the metadata is zeroed, as
    /// it would be for [`run`](ExtractionPipeline::run), and the reason is
    /// kept in [`ExtractionPreview::metadata_error`].
    ///
    /// # Errors
    ///
    /// [`FramegrabError::NoVideoSelected`] if the request has no video.
    pub fn preview(&self, request: &ExtractionRequest) -> Result<ExtractionPreview, FramegrabError> {
        let video = request
            .video
            .as_deref()
            .ok_or(FramegrabError::NoVideoSelected)?;
        let (metadata, metadata_error) = match self.probe.probe(video) {
            Ok(metadata) => (metadata, None),
            Err(error) => {
                log::warn!("Could not read video info: {error}");
                (VideoMetadata::default(), Some(error.to_string()))
            }
        };
        let plan = SamplingPlan::from_input(request.use_original_rate, &request.rate_input).ok();
        Ok(ExtractionPreview {
            metadata,
            metadata_error,
            plan,
            estimated_frames: plan.map(|plan| plan.estimated_frames(&metadata)),
            size_target: request.size_target_text().map(str::to_string),
        })
    }

    /// Run one extraction.
    ///
    /// The run never retries. A failure leaves whatever files were already
    /// written in the output folder.
    ///
    /// # Errors
    ///
    /// - [`FramegrabError::NoVideoSelected`],
    ///   [`FramegrabError::InvalidOutputFolder`], or
    ///   [`FramegrabError::InvalidFrameRate`] if validation fails. Nothing is
    ///   invoked in that case.
    /// - [`FramegrabError::ExtractionFailed`] if sampling fails.
    /// - [`FramegrabError::NoFramesProduced`] if a size target is active but
    ///   sampling produced nothing.
    /// - [`FramegrabError::Cancelled`] if the run was cancelled.
    /// - [`FramegrabError::IoError`] if the output folder cannot be created
    ///   or read.
    pub fn run(&self, request: &ExtractionRequest) -> Result<ExtractionResult, FramegrabError> {
        let mut tracker =
            ProgressTracker::new(self.options.progress.clone(), self.options.batch_size);
        tracker.enter(RunStage::Validating);

        match self.execute(request, &mut tracker) {
            Ok(result) => Ok(result),
            Err(error) => {
                if tracker.stage().can_advance_to(RunStage::Failed) {
                    tracker.enter(RunStage::Failed);
                }
                tracker.failed();
                log::error!("Extraction failed: {error}");
                Err(error)
            }
        }
    }

    fn execute(
        &self,
        request: &ExtractionRequest,
        tracker: &mut ProgressTracker,
    ) -> Result<ExtractionResult, FramegrabError> {
        let mut notices = Vec::new();

        let video = request
            .video
            .as_deref()
            .ok_or(FramegrabError::NoVideoSelected)?;
        let folder = request.output_folder.trim();
        if folder.is_empty() {
            return Err(FramegrabError::InvalidOutputFolder);
        }

        let size_target = match request.size_target_text() {
            None => None,
            Some(text) => match SizeTarget::parse_kb(text) {
                Ok(target) => Some(target),
                Err(error) => {
                    log::debug!("{error}");
                    notify(
                        tracker,
                        &mut notices,
                        Notice::SizeTargetIgnored {
                            input: text.to_string(),
                        },
                    );
                    None
                }
            },
        };

        let output_format = request.requested_format.effective(size_target.is_some());
        if output_format != request.requested_format {
            notify(
                tracker,
                &mut notices,
                Notice::FormatUpgraded {
                    requested: request.requested_format,
                    effective: output_format,
                },
            );
        }

        let plan = SamplingPlan::from_input(request.use_original_rate, &request.rate_input)?;

        let metadata = match self.probe.probe(video) {
            Ok(metadata) => metadata,
            Err(error) => {
                notify(
                    tracker,
                    &mut notices,
                    Notice::MetadataUnavailable {
                        reason: error.to_string(),
                    },
                );
                VideoMetadata::default()
            }
        };
        let estimated_frames = plan.estimated_frames(&metadata);
        log::info!(
            "Video: {:.1}s @ {:.2} fps; estimated ~{estimated_frames} frame(s) as {output_format}",
            metadata.duration_seconds,
            metadata.native_fps
        );

        let output_location = request.output_root.join(folder);
        fs::create_dir_all(&output_location)?;

        if self.options.is_cancelled() {
            return Err(FramegrabError::Cancelled);
        }

        tracker.enter(RunStage::Sampling);
        tracker.sampling_started(size_target.is_some());
        let frames = FrameSampler::new(self.sampler.as_ref())
            .with_quality(self.options.sampling_quality)
            .sample(video, &plan, output_format, &output_location)?;
        tracker.sampling_finished();

        let report = match size_target {
            Some(target) => {
                tracker.enter(RunStage::Targeting);
                self.apply_target(frames, target, output_format, tracker)?
            }
            None => TargetingReport::default(),
        };

        tracker.enter(RunStage::Summarizing);
        let frame_count = scan_frames(&output_location, output_format)?.len() as u64;
        tracker.enter(RunStage::Done);
        tracker.complete();

        log::info!(
            "Extracted {frame_count} frame(s) to {}",
            output_location.display()
        );
        Ok(ExtractionResult {
            frame_count,
            output_format,
            output_location,
            estimated_frames,
            adjusted_frames: report.adjusted,
            skipped_frames: report.skipped,
            notices,
        })
    }

    fn apply_target(
        &self,
        frames: Vec<FrameFile>,
        target: SizeTarget,
        output_format: OutputFormat,
        tracker: &mut ProgressTracker,
    ) -> Result<TargetingReport, FramegrabError> {
        let mut pass = SizeTargetingPass::new(self.options.search());
        if let Some(token) = self.options.cancellation() {
            pass = pass.with_cancellation(token.clone());
        }
        let progress = |completed, total| tracker.frame_adjusted(completed, total);

        #[cfg(feature = "rayon")]
        if self.options.parallel {
            return pass.apply_parallel(
                frames,
                target,
                output_format,
                self.reencoder.as_ref(),
                progress,
            );
        }

        pass.apply(
            frames,
            target,
            output_format,
            self.reencoder.as_ref(),
            progress,
        )
    }
}

fn notify(tracker: &ProgressTracker, notices: &mut Vec<Notice>, notice: Notice) {
    tracker.notice(&notice);
    notices.push(notice);
}
