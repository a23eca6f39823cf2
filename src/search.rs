//! Per-frame quality search.
//!
//! [`QualitySearch`] looks for the JPEG quality index whose re-encoding of a
//! frame lands closest to a byte-size target. The encoder is reached through
//! the [`ImageReencoder`] trait so the search can be driven by a
//! deterministic stub in tests; [`FfmpegReencoder`] is the production
//! implementation.
//!
//! Quality indices follow FFmpeg's `-q:v` scale: a **lower** index means
//! higher fidelity and a **larger** file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::configuration::{MAX_QUALITY_INDEX, MIN_QUALITY_INDEX};
use crate::error::FramegrabError;

/// Re-encodes a single still image at a given quality index.
///
/// On success the implementation must leave a file at `output`. On failure
/// it should leave nothing behind. The search treats a missing file the same
/// as an error.
pub trait ImageReencoder: Send + Sync {
    /// Re-encode `source` at `quality` into `output`.
    fn reencode(&self, source: &Path, quality: u8, output: &Path) -> Result<(), FramegrabError>;
}

/// [`ImageReencoder`] backed by FFmpeg's MJPEG encoder.
///
/// Equivalent to `ffmpeg -i <source> -q:v <quality> <output>`: the source is
/// decoded with the `image` crate and encoded in-process through
/// `ffmpeg-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegReencoder;

impl ImageReencoder for FfmpegReencoder {
    fn reencode(&self, source: &Path, quality: u8, output: &Path) -> Result<(), FramegrabError> {
        let image = image::open(source)?.to_rgb8();
        let bytes = crate::encode::encode_jpeg(&image, quality)?;
        fs::write(output, bytes)?;
        Ok(())
    }
}

/// The best re-encoding found for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    /// Quality index that produced this candidate.
    pub quality: u8,
    /// Size of the re-encoded file.
    pub size_bytes: u64,
    /// Scratch file holding the re-encoding. The caller owns it.
    pub path: PathBuf,
}

/// Outcome of [`QualitySearch::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct QualitySearchResult {
    /// Closest candidate, or `None` if no probe produced output.
    pub best: Option<SearchCandidate>,
    /// Number of encode attempts made, including a failed final one.
    pub probes_run: u32,
}

impl QualitySearchResult {
    /// Quality index of the winning candidate.
    pub fn chosen_quality(&self) -> Option<u8> {
        self.best.as_ref().map(|candidate| candidate.quality)
    }

    /// Byte size of the winning candidate.
    pub fn achieved_size_bytes(&self) -> Option<u64> {
        self.best.as_ref().map(|candidate| candidate.size_bytes)
    }
}

/// Bounded binary search over the quality-index range.
///
/// The search always spends its full probe budget; it does not stop when
/// the interval collapses. Each probe's midpoint is clamped into the range,
/// so the chosen quality is always within `[min_quality, max_quality]`.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FfmpegReencoder, QualitySearch};
///
/// let result = QualitySearch::default().search(
///     &FfmpegReencoder,
///     "frames/frame_0001.jpg".as_ref(),
///     100 * 1024,
/// );
/// if let Some(candidate) = &result.best {
///     println!("q={} -> {} bytes at {}", candidate.quality, candidate.size_bytes, candidate.path.display());
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySearch {
    min_quality: u8,
    max_quality: u8,
    probe_budget: u32,
}

impl Default for QualitySearch {
    fn default() -> Self {
        Self {
            min_quality: 2,
            max_quality: 31,
            probe_budget: 6,
        }
    }
}

impl QualitySearch {
    /// Set the quality-index range. Bounds are clamped to `1..=31` and
    /// swapped if given in reverse.
    #[must_use]
    pub fn with_range(mut self, min_quality: u8, max_quality: u8) -> Self {
        let low = min_quality.clamp(MIN_QUALITY_INDEX, MAX_QUALITY_INDEX);
        let high = max_quality.clamp(MIN_QUALITY_INDEX, MAX_QUALITY_INDEX);
        self.min_quality = low.min(high);
        self.max_quality = low.max(high);
        self
    }

    /// Set the number of probes per frame. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_probe_budget(mut self, probes: u32) -> Self {
        self.probe_budget = probes.max(1);
        self
    }

    /// Lowest (highest-fidelity) quality index searched.
    pub fn min_quality(&self) -> u8 {
        self.min_quality
    }

    /// Highest (lowest-fidelity) quality index searched.
    pub fn max_quality(&self) -> u8 {
        self.max_quality
    }

    /// Number of probes spent per frame.
    pub fn probe_budget(&self) -> u32 {
        self.probe_budget
    }

    /// Search for the quality index whose output size is closest to
    /// `target_bytes`.
    ///
    /// Scratch files are written next to `source`. When this returns, at
    /// most one of them remains: the winner named in
    /// [`QualitySearchResult::best`]. This also holds when the search
    /// aborts early. Ties keep the candidate found first.
    pub fn search(
        &self,
        reencoder: &dyn ImageReencoder,
        source: &Path,
        target_bytes: u64,
    ) -> QualitySearchResult {
        let mut low = i32::from(self.min_quality);
        let mut high = i32::from(self.max_quality);
        let mut best: Option<SearchCandidate> = None;
        let mut best_diff = u64::MAX;
        let mut probes_run = 0;

        for probe in 0..self.probe_budget {
            let quality = ((low + high) / 2)
                .clamp(i32::from(self.min_quality), i32::from(self.max_quality))
                as u8;
            let scratch = scratch_path(source, probe);
            probes_run += 1;

            let size = match encode_probe(reencoder, source, quality, &scratch) {
                Some(size) => size,
                None => break,
            };

            let diff = size.abs_diff(target_bytes);
            log::debug!(
                "{}: q={quality} -> {size} bytes (diff {diff})",
                source.display()
            );
            if diff < best_diff {
                if let Some(previous) = best.take() {
                    discard(&previous.path);
                }
                best_diff = diff;
                best = Some(SearchCandidate {
                    quality,
                    size_bytes: size,
                    path: scratch,
                });
            } else {
                discard(&scratch);
            }

            if size > target_bytes {
                low = i32::from(quality) + 1;
            } else {
                high = i32::from(quality) - 1;
            }
        }

        QualitySearchResult { best, probes_run }
    }
}

/// Run one probe and return the output size, or `None` if the encoder
/// failed or produced no file.
fn encode_probe(
    reencoder: &dyn ImageReencoder,
    source: &Path,
    quality: u8,
    scratch: &Path,
) -> Option<u64> {
    if let Err(error) = reencoder.reencode(source, quality, scratch) {
        log::warn!(
            "Re-encoding {} at q={quality} failed: {error}",
            source.display()
        );
        discard(scratch);
        return None;
    }
    match fs::metadata(scratch) {
        Ok(metadata) => Some(metadata.len()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "Re-encoding {} at q={quality} produced no output",
                source.display()
            );
            None
        }
        Err(error) => {
            log::warn!(
                "Cannot read re-encoding of {} at q={quality}: {error}",
                scratch.display()
            );
            discard(scratch);
            None
        }
    }
}

/// Scratch location for one probe: hidden, next to the source, unique per
/// frame and probe.
pub(crate) fn scratch_path(source: &Path, probe: u32) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    source.with_file_name(format!(".{stem}.probe{probe}.jpg"))
}

fn discard(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != std::io::ErrorKind::NotFound
    {
        log::warn!("Failed to remove scratch file {}: {error}", path.display());
    }
}
