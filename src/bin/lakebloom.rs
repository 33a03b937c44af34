use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lakebloom::{
    AssembleOpts, EUTROPHIC_THRESHOLD, Fps, FrameRenderer, PipelineConfig, RasterSynthesizer,
    RenderThreading, SeriesParams, Strictness, TrendChartOpts, VideoAssembler, VideoBackend,
    load_or_synthesize, render_frames, render_trend_chart, run_pipeline, sample_timestamps,
    summarize,
};

#[derive(Parser, Debug)]
#[command(name = "lakebloom", version, about = "Lake chlorophyll-a series, frames, and video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every stage: series, trend chart, frames, video, manifest.
    Run(RunArgs),
    /// Load or synthesize the monthly series and print its summary.
    Series(SeriesArgs),
    /// Draw the trend chart of a series.
    Trend(TrendArgs),
    /// Synthesize fields and render frames for a series.
    Frames(FramesArgs),
    /// Encode a directory of frames into a video.
    Assemble(AssembleArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Pipeline config JSON; every key is optional.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Series CSV (synthesized when absent).
    #[arg(long)]
    series: Option<PathBuf>,
    /// Frame directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    /// Output video path.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,
    /// Video backend.
    #[arg(long, value_enum)]
    backend: Option<VideoBackend>,
    /// Fail when the backend is unavailable instead of skipping the video.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,
    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
    /// Keep frames already in the frame directory.
    #[arg(long, default_value_t = false)]
    reuse_frames: bool,
    /// Per-frame render deadline in milliseconds.
    #[arg(long)]
    frame_deadline_ms: Option<u64>,
    /// Encode deadline in milliseconds.
    #[arg(long)]
    encode_timeout_ms: Option<u64>,
}

#[derive(Parser, Debug)]
struct SeriesArgs {
    /// Series CSV (synthesized when absent).
    #[arg(long)]
    path: PathBuf,
    /// Generator seed for a synthesized series.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Parser, Debug)]
struct TrendArgs {
    /// Series CSV (synthesized when absent).
    #[arg(long)]
    series: PathBuf,
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    /// Series CSV (synthesized when absent).
    #[arg(long)]
    series: PathBuf,
    /// Frame directory.
    #[arg(long)]
    out_dir: PathBuf,
    /// Months between frames.
    #[arg(long, default_value_t = 6)]
    step: usize,
    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Directory of ordered frames.
    #[arg(long)]
    frames_dir: PathBuf,
    /// Output video path.
    #[arg(long)]
    out: PathBuf,
    /// Frames per second.
    #[arg(long, default_value_t = 6)]
    fps: u32,
    /// Video backend.
    #[arg(long, value_enum, default_value_t = VideoBackend::Ffmpeg)]
    backend: VideoBackend,
    /// Fail when the backend is unavailable instead of skipping the video.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Series(args) => cmd_series(args),
        Command::Trend(args) => cmd_trend(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Assemble(args) => cmd_assemble(args),
    }
}

fn strictness(strict: bool) -> Strictness {
    if strict {
        Strictness::Strict
    } else {
        Strictness::Lenient
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(p) = args.series {
        cfg.paths.series = p;
    }
    if let Some(p) = args.frames_dir {
        cfg.paths.frames_dir = p;
    }
    if let Some(p) = args.out {
        cfg.paths.video = p;
    }
    if let Some(fps) = args.fps {
        cfg.fps = Fps::integer(fps)?;
    }
    if let Some(b) = args.backend {
        cfg.assemble.backend = b;
    }
    if args.strict {
        cfg.assemble.strictness = Strictness::Strict;
    }
    if args.parallel {
        cfg.threading.parallel = true;
    }
    if args.threads.is_some() {
        cfg.threading.threads = args.threads;
    }
    if args.reuse_frames {
        cfg.reuse_frames = true;
    }
    if let Some(ms) = args.frame_deadline_ms {
        cfg.frame_deadline = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = args.encode_timeout_ms {
        cfg.assemble.encode_timeout = Some(Duration::from_millis(ms));
    }

    let report = run_pipeline(&cfg)?;
    match &report.manifest.video {
        Some(video) => eprintln!("wrote {}", video.path.display()),
        None => eprintln!("video skipped; frames are in {}", cfg.paths.frames_dir.display()),
    }
    eprintln!("wrote {}", report.manifest_path.display());
    Ok(())
}

fn cmd_series(args: SeriesArgs) -> anyhow::Result<()> {
    let params = SeriesParams {
        seed: args.seed,
        ..SeriesParams::default()
    };
    let series = load_or_synthesize(&args.path, &params)?;
    let summary = summarize(&series.records, EUTROPHIC_THRESHOLD)?;
    let json = serde_json::to_string_pretty(&summary).context("serialize series summary")?;
    println!("{json}");
    Ok(())
}

fn cmd_trend(args: TrendArgs) -> anyhow::Result<()> {
    let series = load_or_synthesize(&args.series, &SeriesParams::default())?;
    let opts = TrendChartOpts {
        synthetic: series.is_synthetic(),
        ..TrendChartOpts::default()
    };
    render_trend_chart(&series.records, &opts, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let cfg = PipelineConfig::default();
    let series = load_or_synthesize(&args.series, &cfg.series)?;
    let timestamps = sample_timestamps(&series.records, args.step)?;
    let fields = RasterSynthesizer::new(&cfg.raster)?.synthesize(&timestamps)?;
    let renderer = FrameRenderer::new(cfg.frame)?.with_synthetic_marker(true);
    let threading = RenderThreading {
        parallel: args.parallel,
        ..RenderThreading::default()
    };
    let (paths, _stats) = render_frames(&renderer, &fields, &args.out_dir, &threading, None)?;
    eprintln!("wrote {} frames to {}", paths.len(), args.out_dir.display());
    Ok(())
}

fn cmd_assemble(args: AssembleArgs) -> anyhow::Result<()> {
    let assembler = VideoAssembler::new(AssembleOpts {
        backend: args.backend,
        strictness: strictness(args.strict),
        ..AssembleOpts::default()
    });
    match assembler.assemble(&args.frames_dir, &args.out, Fps::integer(args.fps)?)? {
        Some(video) => eprintln!("wrote {} ({} frames)", video.path.display(), video.frames),
        None => eprintln!("video skipped: {:?} backend unavailable", args.backend),
    }
    Ok(())
}
