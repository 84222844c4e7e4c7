use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use vidsynth::Encoder as _;

#[derive(Parser, Debug)]
#[command(name = "vidsynth", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a narrated slideshow video (requires `ffmpeg` on PATH).
    Assemble(AssembleArgs),
    /// Check that the configured encoder can be found.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Configuration JSON.
    #[arg(long, default_value = vidsynth::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Script JSON (`video_title` + `scenes`).
    #[arg(long)]
    script: PathBuf,

    /// Narration audio for the whole script.
    #[arg(long)]
    narration: PathBuf,

    /// One image per scene, in scene order.
    #[arg(long, num_args = 1.., required = true)]
    images: Vec<PathBuf>,

    /// Override `paths.output_videos`.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override `paths.assets`.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Render clips in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for parallel clip rendering.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Configuration JSON.
    #[arg(long, default_value = vidsynth::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Assemble(args) => cmd_assemble(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_assemble(args: AssembleArgs) -> anyhow::Result<()> {
    let mut cfg = vidsynth::AppConfig::load(&args.config)?;
    let _log_guard = init_logging(Some(&cfg.paths.logs))?;

    if let Some(dir) = args.output_dir {
        cfg.paths.output_videos = dir;
    }
    if let Some(dir) = args.assets {
        cfg.paths.assets = dir;
    }
    if args.parallel {
        cfg.encoder.parallel_clips = true;
    }
    if args.threads.is_some() {
        cfg.encoder.threads = args.threads;
    }
    cfg.validate()?;

    let script = vidsynth::ScriptData::load(&args.script)?;
    tracing::info!(
        title = %script.title,
        scenes = script.scene_count(),
        images = args.images.len(),
        "starting assembly"
    );
    if script.scene_count() != args.images.len() {
        tracing::warn!(
            scenes = script.scene_count(),
            images = args.images.len(),
            "scene and image counts differ"
        );
    }

    let req = vidsynth::AssemblyRequest {
        script,
        image_paths: args.images,
        narration_path: args.narration,
        output_dir: cfg.paths.output_videos.clone(),
        assets_dir: cfg.paths.assets.clone(),
    };
    let assembler = vidsynth::VideoAssembler::new(
        Box::new(vidsynth::FfmpegEncoder::new(cfg.encoder_opts())),
        Arc::new(vidsynth::TracingReporter),
        cfg.assembler_opts(),
    );
    let out = assembler.assemble(&req)?;

    println!("{}", out.display());
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let cfg = vidsynth::AppConfig::load(&args.config)?;
    let _log_guard = init_logging(None)?;

    let encoder = vidsynth::FfmpegEncoder::new(cfg.encoder_opts());
    encoder.preflight()?;
    if let Some(p) = encoder.resolved_program() {
        eprintln!("encoder: {}", p.display());
    }
    Ok(())
}

/// Stderr logging filtered by `RUST_LOG` (default `info`), plus a debug-level log file per run
/// under `logs_dir` when given.
fn init_logging(
    logs_dir: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let Some(dir) = logs_dir else {
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir).with_context(|| format!("create log dir '{}'", dir.display()))?;
    let name = format!("{}.log", chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}
