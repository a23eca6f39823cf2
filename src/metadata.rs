//! Video metadata types.
//!
//! [`VideoMetadata`] is produced once per selected video by a
//! [`MetadataProbe`](crate::MetadataProbe). It is not refreshed if the file
//! changes on disk; callers re-probe when a different video is selected.

/// Duration and native frame rate of a video.
///
/// Both values are zero when unknown. The all-zero [`Default`] is what the
/// pipeline falls back to when probing fails, so the pre-run estimate
/// degrades to zero instead of aborting the run.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FfmpegProbe, MetadataProbe};
///
/// let metadata = FfmpegProbe.probe("input.mp4".as_ref())?;
/// println!("{:.1}s @ {:.2} fps", metadata.duration_seconds, metadata.native_fps);
/// # Ok::<(), framegrab::FramegrabError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[must_use]
pub struct VideoMetadata {
    /// Playback duration in seconds.
    pub duration_seconds: f64,
    /// Native frames per second (may be approximate for variable-frame-rate
    /// content).
    pub native_fps: f64,
}

impl VideoMetadata {
    /// Build metadata from raw values, clamping negatives and non-finite
    /// values to zero.
    pub fn new(duration_seconds: f64, native_fps: f64) -> Self {
        Self {
            duration_seconds: sanitize(duration_seconds),
            native_fps: sanitize(native_fps),
        }
    }

    /// Estimated number of frames at the native rate.
    pub fn native_frame_count(&self) -> u64 {
        (self.duration_seconds * self.native_fps) as u64
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
