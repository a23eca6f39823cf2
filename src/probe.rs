//! Video metadata probing.
//!
//! [`MetadataProbe`] abstracts the collaborator that reads a video's duration
//! and native frame rate. [`FfmpegProbe`] opens the file with FFmpeg, reads
//! the best video stream, and closes the demuxer immediately.

use std::path::Path;

use ffmpeg_next::media::Type;

use crate::conversion::{rational_to_fps, ticks_to_seconds};
use crate::error::FramegrabError;
use crate::metadata::VideoMetadata;

/// Reads duration and native frame rate from a video file.
pub trait MetadataProbe: Send + Sync {
    /// Probe `path`.
    ///
    /// # Errors
    ///
    /// Implementations return [`FramegrabError::MetadataProbeFailed`] when
    /// the file cannot be read as a video.
    fn probe(&self, path: &Path) -> Result<VideoMetadata, FramegrabError>;
}

/// [`MetadataProbe`] backed by FFmpeg's demuxer.
///
/// The frame rate is the stream's real base rate (`r_frame_rate`), falling
/// back to the average rate. The duration is the stream duration, falling
/// back to the container duration. Missing values are reported as `0.0`.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FfmpegProbe, MetadataProbe};
///
/// let metadata = FfmpegProbe.probe("video.mkv".as_ref())?;
/// println!("{metadata:?}");
/// # Ok::<(), framegrab::FramegrabError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegProbe;

impl MetadataProbe for FfmpegProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, FramegrabError> {
        let failed = |reason: String| FramegrabError::MetadataProbeFailed {
            path: path.to_path_buf(),
            reason,
        };

        crate::ffmpeg::initialize().map_err(|error| failed(error.to_string()))?;
        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| failed(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| failed("no video stream found".to_string()))?;

        let mut native_fps = rational_to_fps(stream.rate());
        if native_fps == 0.0 {
            native_fps = rational_to_fps(stream.avg_frame_rate());
        }

        let mut duration_seconds = if stream.duration() > 0 {
            ticks_to_seconds(stream.duration(), stream.time_base())
        } else {
            0.0
        };
        if duration_seconds == 0.0 && input_context.duration() > 0 {
            // Container duration is in AV_TIME_BASE (microsecond) units.
            duration_seconds = input_context.duration() as f64 / 1_000_000.0;
        }

        let metadata = VideoMetadata::new(duration_seconds, native_fps);
        log::debug!(
            "Probed {}: {:.3}s @ {:.3} fps",
            path.display(),
            metadata.duration_seconds,
            metadata.native_fps
        );
        Ok(metadata)
    }
}
