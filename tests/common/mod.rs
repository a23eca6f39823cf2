//! Deterministic stand-ins for the FFmpeg-backed collaborators.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use framegrab::{
    FramegrabError, FrameFile, ImageReencoder, MetadataProbe, Notice, OutputFormat,
    ProgressCallback, ProgressInfo, RunStage, SamplingRequest, SamplingService, VideoMetadata,
    frame_file_name,
};

// ── Re-encoder ─────────────────────────────────────────────────────

/// Writes a file whose size is `size_for(quality)`; `None` fails the probe.
pub struct CurveReencoder<F> {
    size_for: F,
    calls: Mutex<Vec<(PathBuf, u8)>>,
}

impl<F> CurveReencoder<F>
where
    F: Fn(&Path, u8) -> Option<u64> + Send + Sync,
{
    pub fn new(size_for: F) -> Self {
        Self {
            size_for,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Qualities probed, in order.
    pub fn qualities(&self) -> Vec<u8> {
        self.calls.lock().unwrap().iter().map(|(_, q)| *q).collect()
    }

    /// Source frames probed, in order.
    pub fn calls_sources(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl<F> ImageReencoder for CurveReencoder<F>
where
    F: Fn(&Path, u8) -> Option<u64> + Send + Sync,
{
    fn reencode(&self, source: &Path, quality: u8, output: &Path) -> Result<(), FramegrabError> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_path_buf(), quality));
        match (self.size_for)(source, quality) {
            Some(size) => {
                fs::write(output, vec![b'j'; size as usize])?;
                Ok(())
            }
            None => Err(FramegrabError::EncodeError(format!("stub refused q={quality}"))),
        }
    }
}

/// Size falls as the quality index rises: `numerator / quality`.
pub fn inverse_curve(numerator: u64) -> impl Fn(&Path, u8) -> Option<u64> + Send + Sync {
    move |_, quality| Some(numerator / u64::from(quality))
}

// ── Probe ──────────────────────────────────────────────────────────

pub struct StubProbe {
    result: Result<VideoMetadata, String>,
    calls: Mutex<usize>,
}

impl StubProbe {
    pub fn returning(duration_seconds: f64, native_fps: f64) -> Self {
        Self {
            result: Ok(VideoMetadata::new(duration_seconds, native_fps)),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl MetadataProbe for StubProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, FramegrabError> {
        *self.calls.lock().unwrap() += 1;
        self.result
            .clone()
            .map_err(|reason| FramegrabError::MetadataProbeFailed {
                path: path.to_path_buf(),
                reason,
            })
    }
}

// ── Sampler ────────────────────────────────────────────────────────

/// Writes `frame_count` files of `frame_size` bytes, or fails with a
/// diagnostic.
pub struct StubSampler {
    frame_count: u32,
    frame_size: usize,
    failure: Option<String>,
    requests: Mutex<Vec<SamplingRequest>>,
}

impl StubSampler {
    pub fn writing(frame_count: u32, frame_size: usize) -> Self {
        Self {
            frame_count,
            frame_size,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(diagnostic: &str) -> Self {
        Self {
            frame_count: 0,
            frame_size: 0,
            failure: Some(diagnostic.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SamplingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SamplingService for StubSampler {
    fn sample(&self, request: &SamplingRequest) -> Result<(), FramegrabError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(diagnostic) = &self.failure {
            return Err(FramegrabError::ExtractionFailed {
                diagnostic: diagnostic.clone(),
            });
        }
        for index in 1..=self.frame_count {
            fs::write(request.frame_path(index), vec![b'f'; self.frame_size])?;
        }
        Ok(())
    }
}

// ── Progress ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingProgress {
    pub infos: Mutex<Vec<ProgressInfo>>,
    pub stages: Mutex<Vec<RunStage>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingProgress {
    pub fn percentages(&self) -> Vec<u8> {
        self.infos
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.percentage)
            .collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.infos
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.label.clone())
            .collect()
    }

    pub fn stages(&self) -> Vec<RunStage> {
        self.stages.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }

    fn on_stage(&self, stage: RunStage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

// ── Files ──────────────────────────────────────────────────────────

/// Write `count` frames of `size` bytes into `directory` and return them.
pub fn write_frames(directory: &Path, count: u32, size: usize, format: OutputFormat) -> Vec<FrameFile> {
    (1..=count)
        .map(|index| {
            let path = directory.join(frame_file_name(index, format));
            fs::write(&path, vec![b'f'; size]).expect("Failed to write frame");
            FrameFile {
                path,
                sequence_index: index,
                size_bytes: size as u64,
            }
        })
        .collect()
}

/// Names of the hidden scratch files left in `directory`.
pub fn scratch_files(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(directory)
        .expect("Failed to read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with('.'))
        .collect();
    names.sort();
    names
}
