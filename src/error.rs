//! Error types for the `framegrab` crate.
//!
//! This module defines [`FramegrabError`], the unified error type returned by
//! all fallible operations in the crate. Validation errors abort a run before
//! any collaborator is invoked; sampling failures carry the collaborator's
//! diagnostic text verbatim.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framegrab` operations.
///
/// Two variants, [`MetadataProbeFailed`](FramegrabError::MetadataProbeFailed)
/// and [`InvalidSizeTarget`](FramegrabError::InvalidSizeTarget), are
/// non-fatal inside [`ExtractionPipeline`](crate::ExtractionPipeline): the
/// pipeline converts them into a [`Notice`](crate::Notice) and keeps going.
/// They are still returned as errors by the lower-level APIs that produce
/// them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramegrabError {
    /// No video file was provided.
    #[error("No video selected")]
    NoVideoSelected,

    /// The output folder name was empty or blank.
    #[error("Output folder name must not be empty")]
    InvalidOutputFolder,

    /// A fixed sampling rate was requested but is not a positive, finite
    /// number.
    #[error("Invalid frame rate: {input:?} (expected a positive number)")]
    InvalidFrameRate {
        /// The rate text as entered.
        input: String,
    },

    /// The metadata probe could not read duration / frame rate.
    #[error("Failed to probe video metadata at {path}: {reason}")]
    MetadataProbeFailed {
        /// Path that was probed.
        path: PathBuf,
        /// Underlying reason the probe failed.
        reason: String,
    },

    /// The target size was not a positive number of kilobytes.
    #[error("Invalid target size: {input:?} (expected a positive number of KB)")]
    InvalidSizeTarget {
        /// The size text as entered.
        input: String,
    },

    /// The sampling service failed. `diagnostic` is its raw output.
    #[error("Frame extraction failed:\n{diagnostic}")]
    ExtractionFailed {
        /// Diagnostic text reported by the sampling service.
        diagnostic: String,
    },

    /// Size targeting was requested but sampling produced no frames.
    #[error("No frames were produced during extraction")]
    NoFramesProduced,

    /// A still image could not be encoded.
    #[error("Image encoding error: {0}")]
    EncodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or writing a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for FramegrabError {
    fn from(error: FfmpegError) -> Self {
        FramegrabError::FfmpegError(error.to_string())
    }
}
