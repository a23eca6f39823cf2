//! # framegrab
//!
//! Extract still frames from video files, optionally re-encoding each frame
//! so its file size lands near a per-frame byte target.
//!
//! `framegrab` samples a video at a fixed rate (or every native frame) into
//! numbered image files, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate. When a size
//! target is set, every frame gets a bounded binary search over FFmpeg's JPEG
//! quality index and is replaced by the re-encoding whose size is closest to
//! the target.
//!
//! ## Quick Start
//!
//! ### Extract Frames
//!
//! ```no_run
//! use framegrab::{ExtractionPipeline, ExtractionRequest};
//!
//! let result = ExtractionPipeline::new().run(&ExtractionRequest::new("input.mp4")).unwrap();
//! println!("{} frames in {}", result.frame_count, result.output_location.display());
//! ```
//!
//! ### Aim for a File Size
//!
//! ```no_run
//! use framegrab::{ExtractionPipeline, ExtractionRequest, Notice};
//!
//! let mut request = ExtractionRequest::new("input.mp4");
//! request.rate_input = "0.5".to_string();
//! request.size_target_kb = Some("200".to_string());
//!
//! // PNG is upgraded to JPEG because PNG has no quality parameter.
//! let result = ExtractionPipeline::new().run(&request).unwrap();
//! assert!(result
//!     .notices
//!     .iter()
//!     .any(|notice| matches!(notice, Notice::FormatUpgraded { .. })));
//! ```
//!
//! ### Preview Before Extracting
//!
//! ```no_run
//! use framegrab::{ExtractionPipeline, ExtractionRequest};
//!
//! let preview = ExtractionPipeline::new()
//!     .preview(&ExtractionRequest::new("input.mp4"))
//!     .unwrap();
//! println!("{preview}");
//! ```
//!
//! ## Features
//!
//! - **Frame sampling**: fixed rate via FFmpeg's `fps` filter, or every frame
//!   at the native rate
//! - **Size targeting**: per-frame quality search with a fixed probe budget
//! - **Pluggable collaborators**: metadata probe, sampling service, and
//!   re-encoder are traits with FFmpeg-backed defaults
//! - **Progress & cancellation**: stage, percentage, and notice events through
//!   `ProgressCallback`, plus a cooperative `CancellationToken`
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `SizeTargetingPass::apply_parallel` re-encodes frames on rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
mod encode;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod pipeline;
pub mod plan;
pub mod probe;
pub mod progress;
#[cfg(feature = "rayon")]
mod rayon;
pub mod sampler;
pub mod search;
pub mod targeting;

pub use configuration::{ExtractOptions, MAX_QUALITY_INDEX, MIN_QUALITY_INDEX};
pub use error::FramegrabError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use pipeline::{
    DEFAULT_OUTPUT_FOLDER, ExtractionPipeline, ExtractionPreview, ExtractionRequest,
    ExtractionResult,
};
pub use plan::{OutputFormat, SamplingPlan, SizeTarget};
pub use probe::{FfmpegProbe, MetadataProbe};
pub use progress::{CancellationToken, Notice, ProgressCallback, ProgressInfo, RunStage};
pub use sampler::{
    FfmpegSampler, FrameFile, FrameSampler, SamplingRequest, SamplingService, frame_file_name,
    scan_frames,
};
pub use search::{
    FfmpegReencoder, ImageReencoder, QualitySearch, QualitySearchResult, SearchCandidate,
};
pub use targeting::{SizeTargetingPass, TargetingReport};
