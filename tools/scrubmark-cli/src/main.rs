//! Scrubmark CLI — Command-line interface for activity scanning.
//!
//! Usage:
//!   scrubmark scan <PATH>      Scan a recording for per-frame activity
//!   scrubmark info <PATH>      Show probed video information
//!   scrubmark check            Check that ffmpeg/ffprobe are available

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scrubmark_activity_core::ScanConfig;
use scrubmark_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "scrubmark",
    about = "Find the parts of a recording worth scrubbing to",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a recording and report per-frame activity segments
    Scan {
        /// Path to the video file
        path: PathBuf,

        /// Coalescing window divisor (frames / divisor per run; default 50)
        #[arg(long)]
        divisor: Option<u32>,

        /// Audio loudness threshold scale factor (default 0.001)
        #[arg(long)]
        audio_scale: Option<f64>,

        /// Per-channel video difference threshold, 0-255 (default 30)
        #[arg(long)]
        diff_threshold: Option<u8>,

        /// Frames between stop-flag checks (default 200)
        #[arg(long)]
        poll_interval: Option<u32>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show probed video information
    Info {
        /// Path to the video file
        path: PathBuf,
    },

    /// Check that the external tools are available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    scrubmark_common::logging::init_logging(&scrubmark_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Scan {
            path,
            divisor,
            audio_scale,
            diff_threshold,
            poll_interval,
            json,
        } => {
            // Saved defaults first, then command-line overrides.
            let mut config = ScanConfig::from(AppConfig::load().scan);
            if let Some(divisor) = divisor {
                config.granularity_divisor = divisor;
            }
            if let Some(audio_scale) = audio_scale {
                config.audio_threshold_scale = audio_scale;
            }
            if let Some(diff_threshold) = diff_threshold {
                config.video_diff_threshold = diff_threshold;
            }
            if let Some(poll_interval) = poll_interval {
                config.stop_poll_interval = poll_interval;
            }

            commands::scan::run(path, config, json).await
        }
        Commands::Info { path } => commands::info::run(path),
        Commands::Check => commands::check::run(),
    }
}
