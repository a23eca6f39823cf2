//! Benchmarks for the quality search and size-targeting pass.
//!
//! Run with: cargo bench
//! Run with all features: cargo bench --all-features
//!
//! The search benchmarks use an in-memory size curve so they measure the
//! search and scratch-file bookkeeping, not the encoder. The FFmpeg
//! benchmark requires fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{fs, path::Path};

use criterion::Criterion;
use framegrab::{
    ExtractionPipeline, ExtractionRequest, FfmpegLogLevel, FramegrabError, ImageReencoder,
    OutputFormat, QualitySearch, SizeTarget, SizeTargetingPass, frame_file_name, scan_frames,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// Writes `numerator / quality` bytes.
struct CurveReencoder {
    numerator: u64,
}

impl ImageReencoder for CurveReencoder {
    fn reencode(&self, _source: &Path, quality: u8, output: &Path) -> Result<(), FramegrabError> {
        let size = self.numerator / u64::from(quality);
        fs::write(output, vec![0_u8; size as usize])?;
        Ok(())
    }
}

fn benchmark_quality_search(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let source = directory.path().join(frame_file_name(1, OutputFormat::Jpeg));
    fs::write(&source, vec![0_u8; 64 * 1024]).unwrap();
    let reencoder = CurveReencoder { numerator: 600_000 };

    let mut group = criterion.benchmark_group("quality search");
    for probes in [1_u32, 6, 12] {
        let search = QualitySearch::default().with_probe_budget(probes);
        group.bench_function(format!("{probes} probe(s)"), |bencher| {
            bencher.iter(|| {
                let result = search.search(&reencoder, &source, 30_000);
                if let Some(best) = result.best {
                    let _ = fs::remove_file(best.path);
                }
            });
        });
    }
    group.finish();
}

fn benchmark_targeting_pass(criterion: &mut Criterion) {
    let reencoder = CurveReencoder { numerator: 600_000 };
    let target = SizeTarget::from_bytes(30_000).unwrap();

    criterion.bench_function("targeting pass (50 frames)", |bencher| {
        bencher.iter_batched(
            || {
                let directory = tempfile::tempdir().unwrap();
                for index in 1..=50 {
                    let path = directory.path().join(frame_file_name(index, OutputFormat::Jpeg));
                    fs::write(path, vec![0_u8; 64 * 1024]).unwrap();
                }
                let frames = scan_frames(directory.path(), OutputFormat::Jpeg).unwrap();
                (directory, frames)
            },
            |(_directory, frames)| {
                SizeTargetingPass::new(QualitySearch::default())
                    .apply(frames, target, OutputFormat::Jpeg, &reencoder, |_, _| {})
                    .unwrap()
            },
            criterion::BatchSize::PerIteration,
        );
    });
}

fn benchmark_ffmpeg_pipeline(criterion: &mut Criterion) {
    framegrab::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let mut group = criterion.benchmark_group("ffmpeg pipeline");
    group.sample_size(10);
    for target_kb in [None, Some("20")] {
        let name = match target_kb {
            Some(kb) => format!("1 fps, target {kb} KB"),
            None => "1 fps, png".to_string(),
        };
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                let root = tempfile::tempdir().unwrap();
                let mut request = ExtractionRequest::new(SAMPLE_VIDEO);
                request.output_root = root.path().to_path_buf();
                request.size_target_kb = target_kb.map(str::to_string);
                ExtractionPipeline::new().run(&request).unwrap()
            });
        });
    }
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_quality_search,
    benchmark_targeting_pass,
    benchmark_ffmpeg_pipeline,
);
criterion::criterion_main!(benches);
