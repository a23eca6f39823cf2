//! Run configuration.
//!
//! [`ExtractOptions`] is a builder that threads progress callbacks,
//! cancellation tokens, and search tuning through a run without polluting
//! every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{CancellationToken, ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}% {}", info.percentage, info.label);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_probe_budget(8);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::search::QualitySearch;

/// Lowest quality index FFmpeg's JPEG encoder accepts.
pub const MIN_QUALITY_INDEX: u8 = 1;
/// Highest quality index FFmpeg's JPEG encoder accepts.
pub const MAX_QUALITY_INDEX: u8 = 31;

/// Configuration for a pipeline run.
///
/// All fields have sensible defaults; a default-constructed value searches
/// quality indices `2..=31` with 6 probes per frame and samples JPEG frames
/// at quality index 2.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    /// Targeting progress fires every N frames (and always on the last).
    pub(crate) batch_size: u64,
    pub(crate) search: QualitySearch,
    /// Quality index for JPEG frames written by the sampler.
    pub(crate) sampling_quality: u8,
    #[cfg(feature = "rayon")]
    pub(crate) parallel: bool,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut debug = f.debug_struct("ExtractOptions");
        debug
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("search", &self.search)
            .field("sampling_quality", &self.sampling_quality);
        #[cfg(feature = "rayon")]
        debug.field("parallel", &self.parallel);
        debug.finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            search: QualitySearch::default(),
            sampling_quality: 2,
            #[cfg(feature = "rayon")]
            parallel: false,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the run stops at the next check point and
    /// returns [`FramegrabError::Cancelled`](crate::FramegrabError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often targeting progress fires.
    ///
    /// A value of 1 means every frame; 10 means every 10th frame. The last
    /// frame always reports. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the quality-index range searched per frame.
    ///
    /// Bounds are clamped to `1..=31` and swapped if given in reverse.
    #[must_use]
    pub fn with_quality_range(mut self, min_quality: u8, max_quality: u8) -> Self {
        self.search = self.search.with_range(min_quality, max_quality);
        self
    }

    /// Set the number of encode probes per frame. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_probe_budget(mut self, probes: u32) -> Self {
        self.search = self.search.with_probe_budget(probes);
        self
    }

    /// Set the quality index for JPEG frames written during sampling.
    #[must_use]
    pub fn with_sampling_quality(mut self, quality: u8) -> Self {
        self.sampling_quality = quality.clamp(MIN_QUALITY_INDEX, MAX_QUALITY_INDEX);
        self
    }

    /// Re-encode frames on rayon worker threads during size targeting.
    ///
    /// Only available when the `rayon` feature is enabled.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The quality search these options configure.
    pub fn search(&self) -> QualitySearch {
        self.search
    }

    pub(crate) fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
