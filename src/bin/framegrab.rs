use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framegrab::{
    DEFAULT_OUTPUT_FOLDER, ExtractOptions, ExtractionPipeline, ExtractionRequest,
    ExtractionResult, FfmpegLogLevel, FfmpegProbe, MetadataProbe, Notice, OutputFormat,
    ProgressCallback, ProgressInfo, RunStage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab probe input.mp4 --json\n  framegrab extract input.mp4 --fps 2 --out frames --progress\n  framegrab extract input.mp4 --original-fps --format jpg --target-kb 150\n  framegrab extract input.mp4 --fps 0.5 --dry-run\n  framegrab completions zsh > _framegrab";

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Extract still frames from videos, optionally aiming for a per-frame file size",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print duration and native frame rate of a video.
    #[command(
        about = "Print video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  framegrab probe input.mp4\n  framegrab probe input.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract frames into an output folder.
    #[command(
        about = "Extract video frames",
        after_help = "Examples:\n  framegrab extract input.mp4 --fps 1 --format png\n  framegrab extract input.mp4 --target-kb 200 --out small_frames --progress"
    )]
    Extract(ExtractArgs),

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Parser, Clone)]
struct ExtractArgs {
    /// Input video path.
    input: PathBuf,

    /// Frames per second to extract.
    #[arg(long, default_value = "1", conflicts_with = "original_fps")]
    fps: String,

    /// Extract every frame at the video's native rate.
    #[arg(long)]
    original_fps: bool,

    /// Output image format (png, jpg).
    #[arg(long, default_value = "png")]
    format: OutputFormat,

    /// Approximate size per frame in KB. Forces JPEG output.
    #[arg(long)]
    target_kb: Option<String>,

    /// Output folder name, created under --root.
    #[arg(long, default_value = DEFAULT_OUTPUT_FOLDER)]
    out: String,

    /// Directory the output folder is created in.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Encode probes per frame while size targeting.
    #[arg(long)]
    probes: Option<u32>,

    /// Re-encode frames on all cores while size targeting.
    #[cfg(feature = "rayon")]
    #[arg(long)]
    parallel: bool,

    /// Print what would be extracted without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Output the result as machine-readable JSON.
    #[arg(long)]
    json: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,
}

impl ExtractArgs {
    fn to_request(&self) -> ExtractionRequest {
        ExtractionRequest {
            video: Some(self.input.clone()),
            use_original_rate: self.original_fps,
            rate_input: self.fps.clone(),
            requested_format: self.format,
            size_target_kb: self.target_kb.clone(),
            output_folder: self.out.clone(),
            output_root: self.root.clone(),
        }
    }

    fn to_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new()
            .with_progress(Arc::new(TerminalProgress::new(self.progress && !self.json)));
        if let Some(probes) = self.probes {
            options = options.with_probe_budget(probes);
        }
        #[cfg(feature = "rayon")]
        {
            options = options.with_parallel(self.parallel);
        }
        options
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "error" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}

fn apply_global_options(global: &GlobalOptions) {
    init_logging(global);
    if let Some(level) = global.log_level {
        framegrab::set_ffmpeg_log_level(level);
    }
}

/// Terminal front end for pipeline events: a percentage bar and coloured
/// notices on stderr.
struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    fn new(show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(100);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")
            {
                bar.set_style(style.progress_chars("##-"));
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    fn warn(&self, message: String) {
        let line = format!("{} {}", "warning:".yellow().bold(), message.yellow());
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(info.percentage));
            bar.set_message(info.label.clone());
        }
    }

    fn on_stage(&self, stage: RunStage) {
        if let Some(bar) = &self.bar {
            match stage {
                RunStage::Done => bar.finish_with_message("complete"),
                RunStage::Failed => bar.abandon_with_message("failed"),
                _ => {}
            }
        }
    }

    fn on_notice(&self, notice: &Notice) {
        self.warn(notice.to_string());
    }
}

fn result_json(result: &ExtractionResult) -> serde_json::Value {
    json!({
        "frame_count": result.frame_count,
        "output_format": result.output_format.extension(),
        "output_location": result.output_location.display().to_string(),
        "estimated_frames": result.estimated_frames,
        "adjusted_frames": result.adjusted_frames,
        "skipped_frames": result.skipped_frames,
        "notices": result.notices.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global);

    match cli.command {
        Commands::Probe { input, json } => {
            let metadata = FfmpegProbe.probe(&input)?;
            if json {
                let payload = json!({
                    "path": input.display().to_string(),
                    "duration_seconds": metadata.duration_seconds,
                    "fps": metadata.native_fps,
                    "frame_count": metadata.native_frame_count(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Duration: {:.1} seconds", metadata.duration_seconds);
                println!("Frame rate: {:.2} fps", metadata.native_fps);
                println!("Frames: ~{}", metadata.native_frame_count());
            }
        }
        Commands::Extract(args) => {
            let request = args.to_request();
            let pipeline = ExtractionPipeline::new().with_options(args.to_options());

            if args.dry_run {
                let preview = pipeline.preview(&request)?;
                if args.json {
                    let payload = json!({
                        "duration_seconds": preview.metadata.duration_seconds,
                        "fps": preview.metadata.native_fps,
                        "rate": preview.plan.and_then(|plan| plan.rate_filter()),
                        "estimated_frames": preview.estimated_frames,
                        "target_kb": preview.size_target,
                        "metadata_error": preview.metadata_error,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                } else {
                    println!("{}", preview.to_string().cyan());
                }
                return Ok(());
            }

            let result = pipeline.run(&request)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
            } else {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Extracted {} frame(s) to {}",
                        result.frame_count,
                        result.output_location.display()
                    )
                    .green()
                );
                if !result.skipped_frames.is_empty() {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!(
                            "{} frame(s) kept their original size: {:?}",
                            result.skipped_frames.len(),
                            result.skipped_frames
                        )
                        .yellow()
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framegrab", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
