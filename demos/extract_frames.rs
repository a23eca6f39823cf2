//! Extract still frames from a video at a fixed rate.
//!
//! Usage:
//!   cargo run --example extract_frames -- <input_file> [fps]

use std::error::Error;

use framegrab::{ExtractionPipeline, ExtractionRequest};

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());
    let rate = std::env::args().nth(2).unwrap_or_else(|| "1".to_string());

    let mut request = ExtractionRequest::new(&input_path);
    request.rate_input = rate;
    let pipeline = ExtractionPipeline::new();

    // Print what the run is going to do.
    println!("{}", pipeline.preview(&request)?);

    println!("Extracting from {input_path}...");
    let result = pipeline.run(&request)?;
    println!(
        "Saved {} {} frame(s) to {} (estimated {})",
        result.frame_count,
        result.output_format,
        result.output_location.display(),
        result.estimated_frames,
    );

    // Every native frame instead of a fixed rate.
    request.use_original_rate = true;
    request.output_folder = "all_frames".to_string();
    println!("Extracting every frame...");
    let result = pipeline.run(&request)?;
    println!(
        "Saved {} frame(s) to {}",
        result.frame_count,
        result.output_location.display()
    );

    println!("Done!");
    Ok(())
}
