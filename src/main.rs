//! `subdig` command-line front end.

use clap::{Parser, Subcommand};
use miette::{Result, miette};
use std::path::{Path, PathBuf};
use subdig_config::Config;
use subdig_extract::subtitle_path;
use subdig_library::{Pipeline, Progress};
use subdig_tools::ToolOverrides;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "subdig", version, about = "Extract embedded subtitle streams from a video library as WebVTT")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Keep detection results in memory only for this run
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract every subtitle stream of every video under a directory
    Extract {
        dir: PathBuf,
        /// Use this ffprobe executable
        #[arg(long, value_name = "PATH")]
        ffprobe: Option<PathBuf>,
        /// Use this ffmpeg executable
        #[arg(long, value_name = "PATH")]
        ffmpeg: Option<PathBuf>,
    },
    /// List the subtitle streams of one video
    Info { video: PathBuf },
    /// Extract a single subtitle stream
    ExtractOne {
        video: PathBuf,
        index: u32,
        /// Output file; defaults to `<video stem>.<index>.vtt` next to the video
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Delete all cached detection results
    ClearCache,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn report_progress(progress: &Progress) {
    match progress {
        Progress::Scanning { total } => eprintln!("Found {total} video file(s)"),
        Progress::Processing { current, total, current_file } => {
            eprintln!("[{current}/{total}] {}", current_file.display());
        },
        Progress::Completed { .. } => {},
        Progress::Error { message } => eprintln!("{message}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).map_err(|e| miette!("{e:?}"))?;
    if cli.no_cache {
        config.cache.enabled = false;
    }
    tracing::debug!(config = ?config, "Configuration loaded");
    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Extract { dir, ffprobe, ffmpeg } => {
            let overrides = ToolOverrides { ffprobe, ffmpeg };
            let summary =
                pipeline.extract_folder(&dir, Some(overrides), report_progress).await.map_err(|e| miette!("{e:?}"))?;
            println!("Processed {} video(s), extracted {} subtitle file(s)", summary.processed, summary.success);
        },
        Command::Info { video } => {
            let streams = pipeline.stream_info(&video).await;
            if streams.is_empty() {
                println!("No subtitle streams found in {}", video.display());
            }
            for stream in streams {
                println!("{stream}");
            }
        },
        Command::ExtractOne { video, index, output } => {
            let output = match output {
                Some(output) => output,
                None => subtitle_path(&video, index).map_err(|e| miette!("{e:?}"))?,
            };
            extract_one(&pipeline, &video, index, &output).await?;
        },
        Command::ClearCache => pipeline.clear_cache(),
    }
    Ok(())
}

async fn extract_one(pipeline: &Pipeline, video: &Path, index: u32, output: &Path) -> Result<()> {
    if !pipeline.extract_single_stream(video, index, output).await {
        return Err(miette!(
            help = "run with -v to see the transcoder's error output",
            "unable to extract stream {index} of {}",
            video.display()
        ));
    }
    println!("{}", output.display());
    Ok(())
}
