//! Demonstrate progress reporting, notices, and cancellation.
//!
//! Usage:
//!   cargo run --example progress -- <input_file>

use std::error::Error;
use std::sync::Arc;

use framegrab::{
    CancellationToken, ExtractOptions, ExtractionPipeline, ExtractionRequest, FramegrabError,
    Notice, ProgressCallback, ProgressInfo, RunStage,
};

/// Simple progress callback that prints to stdout.
struct PrintProgress;

impl ProgressCallback for PrintProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let remaining = info
            .estimated_remaining
            .map_or("???".to_string(), |r| format!("{:.1}s", r.as_secs_f64()));
        println!(
            "[{:?}] {:>3}% {} elapsed={:.1}s remaining={remaining}",
            info.stage,
            info.percentage,
            info.label,
            info.elapsed.as_secs_f64(),
        );
    }

    fn on_stage(&self, stage: RunStage) {
        println!("-> {stage:?}");
    }

    fn on_notice(&self, notice: &Notice) {
        println!("note: {notice}");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());

    let mut request = ExtractionRequest::new(&input_path);
    request.size_target_kb = Some("80".to_string());

    // ── Progress callback ──────────────────────────────────────────
    println!("Extracting frames with progress reporting...");
    let options = ExtractOptions::new()
        .with_progress(Arc::new(PrintProgress))
        .with_batch_size(5);
    let result = ExtractionPipeline::new().with_options(options).run(&request)?;
    println!("Extracted {} frames\n", result.frame_count);

    // ── Cancellation token ─────────────────────────────────────────
    println!("Demonstrating cancellation...");
    let token = CancellationToken::new();
    let options = ExtractOptions::new().with_cancellation(token.clone());

    // Cancel immediately to demonstrate the mechanism.
    token.cancel();

    match ExtractionPipeline::new().with_options(options).run(&request) {
        Err(FramegrabError::Cancelled) => println!("Cancelled as expected"),
        Err(error) => println!("Unexpected error: {error}"),
        Ok(result) => println!("Finished anyway with {} frames", result.frame_count),
    }

    println!("Done!");
    Ok(())
}
