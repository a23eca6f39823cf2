//! Extract frames and re-encode each one toward a file size.
//!
//! Usage:
//!   cargo run --example size_target -- <input_file> [target_kb]

use std::error::Error;

use framegrab::{ExtractOptions, ExtractionPipeline, ExtractionRequest, OutputFormat};

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());
    let target_kb = std::env::args().nth(2).unwrap_or_else(|| "100".to_string());

    let mut request = ExtractionRequest::new(&input_path);
    request.rate_input = "0.5".to_string();
    // PNG has no quality knob, so this is written as JPEG with a notice.
    request.requested_format = OutputFormat::Png;
    request.size_target_kb = Some(target_kb.clone());
    request.output_folder = "sized_frames".to_string();

    let options = ExtractOptions::new()
        .with_probe_budget(8)
        .with_quality_range(2, 31);

    println!("Extracting from {input_path}, aiming for ~{target_kb} KB per frame...");
    let result = ExtractionPipeline::new()
        .with_options(options)
        .run(&request)?;

    for notice in &result.notices {
        println!("note: {notice}");
    }
    println!(
        "Adjusted {} of {} frame(s) in {}",
        result.adjusted_frames,
        result.frame_count,
        result.output_location.display()
    );
    if !result.skipped_frames.is_empty() {
        println!("Left untouched: {:?}", result.skipped_frames);
    }

    println!("Done!");
    Ok(())
}
