//! Sampling plans, output formats, and size targets.
//!
//! These are the value types the pipeline derives from raw user input before
//! any collaborator is invoked.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::FramegrabError;
use crate::metadata::VideoMetadata;

/// How densely frames are sampled from the video.
///
/// # Example
///
/// ```
/// use framegrab::{SamplingPlan, VideoMetadata};
///
/// let plan = SamplingPlan::from_input(false, "2")?;
/// assert_eq!(plan.rate_filter(), Some(2.0));
///
/// let metadata = VideoMetadata::new(10.0, 30.0);
/// assert_eq!(plan.estimated_frames(&metadata), 20);
/// # Ok::<(), framegrab::FramegrabError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingPlan {
    /// Keep every frame at the video's native rate. No rate filter applies.
    OriginalRate,
    /// Sample this many frames per second of playback.
    FixedRate(f64),
}

impl SamplingPlan {
    /// Build a fixed-rate plan.
    ///
    /// # Errors
    ///
    /// Returns [`FramegrabError::InvalidFrameRate`] unless `rate_fps` is
    /// positive and finite.
    pub fn fixed(rate_fps: f64) -> Result<Self, FramegrabError> {
        if rate_fps.is_finite() && rate_fps > 0.0 {
            Ok(SamplingPlan::FixedRate(rate_fps))
        } else {
            Err(FramegrabError::InvalidFrameRate {
                input: rate_fps.to_string(),
            })
        }
    }

    /// Build a plan from the "use original rate" flag and the rate text.
    ///
    /// The rate text is ignored when `use_original_rate` is set.
    ///
    /// # Errors
    ///
    /// Returns [`FramegrabError::InvalidFrameRate`] if a fixed rate is
    /// requested and `rate_input` does not parse to a positive, finite
    /// number.
    pub fn from_input(use_original_rate: bool, rate_input: &str) -> Result<Self, FramegrabError> {
        if use_original_rate {
            return Ok(SamplingPlan::OriginalRate);
        }
        let invalid = || FramegrabError::InvalidFrameRate {
            input: rate_input.to_string(),
        };
        let rate = rate_input.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::fixed(rate).map_err(|_| invalid())
    }

    /// The value of the sampling service's rate filter, if any.
    pub fn rate_filter(&self) -> Option<f64> {
        match self {
            SamplingPlan::OriginalRate => None,
            SamplingPlan::FixedRate(rate) => Some(*rate),
        }
    }

    /// The effective sampling rate given the video's metadata.
    pub fn effective_rate(&self, metadata: &VideoMetadata) -> f64 {
        self.rate_filter().unwrap_or(metadata.native_fps)
    }

    /// Advisory frame count: `duration × rate`, truncated.
    ///
    /// The real count can differ because of rounding, variable frame rates,
    /// or damaged input. It is only for display; never use it in place of
    /// the files on disk.
    pub fn estimated_frames(&self, metadata: &VideoMetadata) -> u64 {
        (metadata.duration_seconds * self.effective_rate(metadata)) as u64
    }
}

/// Image format of the extracted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// Lossy JPEG, parameterized by an FFmpeg quality index.
    Jpeg,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// `true` for formats without a quality parameter.
    pub fn is_lossless(self) -> bool {
        matches!(self, OutputFormat::Png)
    }

    /// Resolve the format that will actually be written.
    ///
    /// Size targeting needs a quality parameter, so a lossless request is
    /// upgraded to [`OutputFormat::Jpeg`] whenever a target is active.
    pub fn effective(self, size_targeting: bool) -> Self {
        if size_targeting && self.is_lossless() {
            OutputFormat::Jpeg
        } else {
            self
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unsupported output format: {other} (expected png or jpg)")),
        }
    }
}

/// Approximate per-frame byte size to aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeTarget {
    target_bytes: u64,
}

impl SizeTarget {
    /// Build a target from a byte count.
    ///
    /// Returns `None` for zero.
    pub fn from_bytes(target_bytes: u64) -> Option<Self> {
        (target_bytes > 0).then_some(Self { target_bytes })
    }

    /// Parse a target given in kilobytes (`1 KB = 1024 bytes`).
    ///
    /// Fractional kilobytes are accepted; the byte count is truncated.
    ///
    /// # Errors
    ///
    /// Returns [`FramegrabError::InvalidSizeTarget`] for text that is not a
    /// positive, finite number, or that rounds down to zero bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use framegrab::SizeTarget;
    ///
    /// assert_eq!(SizeTarget::parse_kb("500")?.bytes(), 512_000);
    /// assert!(SizeTarget::parse_kb("-5").is_err());
    /// # Ok::<(), framegrab::FramegrabError>(())
    /// ```
    pub fn parse_kb(input: &str) -> Result<Self, FramegrabError> {
        let invalid = || FramegrabError::InvalidSizeTarget {
            input: input.to_string(),
        };
        let kilobytes = input.trim().parse::<f64>().map_err(|_| invalid())?;
        if !kilobytes.is_finite() || kilobytes <= 0.0 {
            return Err(invalid());
        }
        Self::from_bytes((kilobytes * 1024.0) as u64).ok_or_else(invalid)
    }

    /// Target size in bytes. Always greater than zero.
    pub fn bytes(&self) -> u64 {
        self.target_bytes
    }

    /// Target size in whole kilobytes, for display.
    pub fn kilobytes(&self) -> u64 {
        self.target_bytes / 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_rate_rejects_non_positive() {
        assert!(SamplingPlan::fixed(0.0).is_err());
        assert!(SamplingPlan::fixed(-1.0).is_err());
        assert!(SamplingPlan::fixed(f64::INFINITY).is_err());
        assert!(SamplingPlan::fixed(f64::NAN).is_err());
        assert_eq!(SamplingPlan::fixed(0.5).unwrap(), SamplingPlan::FixedRate(0.5));
    }

    #[test]
    fn from_input_keeps_original_text_in_error() {
        match SamplingPlan::from_input(false, "fast") {
            Err(FramegrabError::InvalidFrameRate { input }) => assert_eq!(input, "fast"),
            other => panic!("Expected InvalidFrameRate, got: {other:?}"),
        }
    }

    #[test]
    fn from_input_ignores_rate_for_original() {
        let plan = SamplingPlan::from_input(true, "not a number").unwrap();
        assert_eq!(plan, SamplingPlan::OriginalRate);
        assert_eq!(plan.rate_filter(), None);
    }

    #[test]
    fn estimate_for_fixed_rate() {
        let metadata = VideoMetadata::new(10.0, 30.0);
        let plan = SamplingPlan::from_input(false, "1.0").unwrap();
        assert_eq!(plan.rate_filter(), Some(1.0));
        assert_eq!(plan.estimated_frames(&metadata), 10);
    }

    #[test]
    fn estimate_for_original_rate_uses_native_fps() {
        let metadata = VideoMetadata::new(2.0, 24.0);
        assert_eq!(SamplingPlan::OriginalRate.estimated_frames(&metadata), 48);
    }

    #[test]
    fn estimate_degrades_to_zero_without_metadata() {
        let plan = SamplingPlan::fixed(5.0).unwrap();
        assert_eq!(plan.estimated_frames(&VideoMetadata::default()), 0);
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(".jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn lossless_format_upgraded_only_when_targeting() {
        assert_eq!(OutputFormat::Png.effective(true), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::Png.effective(false), OutputFormat::Png);
        assert_eq!(OutputFormat::Jpeg.effective(true), OutputFormat::Jpeg);
    }

    #[test]
    fn size_target_parsing() {
        assert_eq!(SizeTarget::parse_kb(" 1.5 ").unwrap().bytes(), 1536);
        assert!(SizeTarget::parse_kb("0").is_err());
        assert!(SizeTarget::parse_kb("abc").is_err());
        assert!(SizeTarget::parse_kb("inf").is_err());
        // 0.0001 KB truncates to zero bytes.
        assert!(SizeTarget::parse_kb("0.0001").is_err());
    }

    #[test]
    fn size_target_kilobytes_round_down() {
        assert_eq!(SizeTarget::parse_kb("200").unwrap().kilobytes(), 200);
        assert_eq!(SizeTarget::parse_kb("1.5").unwrap().kilobytes(), 1);
        assert_eq!(SizeTarget::from_bytes(1000).unwrap().kilobytes(), 0);
    }
}
