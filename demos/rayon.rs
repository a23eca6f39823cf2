//! Parallel size targeting example (feature = "rayon").
//!
//! Usage:
//!   cargo run --features=rayon --example rayon -- <input_file> [target_kb]

use std::error::Error;
use std::time::Instant;

use framegrab::{ExtractOptions, ExtractionPipeline, ExtractionRequest, OutputFormat};

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());
    let target_kb = std::env::args().nth(2).unwrap_or_else(|| "50".to_string());

    let mut request = ExtractionRequest::new(&input_path);
    request.rate_input = "2".to_string();
    request.requested_format = OutputFormat::Jpeg;
    request.size_target_kb = Some(target_kb);

    for parallel in [false, true] {
        request.output_folder = if parallel { "parallel" } else { "sequential" }.to_string();
        let pipeline =
            ExtractionPipeline::new().with_options(ExtractOptions::new().with_parallel(parallel));

        let start = Instant::now();
        let result = pipeline.run(&request)?;
        let elapsed = start.elapsed();

        println!(
            "{}: {} frame(s), {} adjusted, in {elapsed:.2?}",
            if parallel { "parallel" } else { "sequential" },
            result.frame_count,
            result.adjusted_frames,
        );
    }

    println!("Done!");
    Ok(())
}
