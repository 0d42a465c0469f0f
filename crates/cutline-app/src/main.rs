//! Cutline - demo driver
//!
//! Builds a transition timeline from generated colour-bar clips, renders it
//! through a [`RenderSession`], and writes the frames as PNGs.

mod synthetic;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cutline_core::{Color, FrameRate, RationalTime, Size};
use cutline_effects::{BlendMode, FrameFilter, Image, TransitionStyle};
use cutline_render::{
    CompositorConfig, FrameCompositor, RenderContext, RenderOutcome, RenderRequest,
    RenderSession, SessionConfig, Watermark,
};
use cutline_timeline::{Timeline, TimelineBuilder, TimelineConfig, TimelineDocument};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use synthetic::SyntheticSource;

#[derive(Parser, Debug)]
#[command(name = "cutline", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a transition timeline to numbered PNG frames.
    RenderTransition(RenderArgs),
    /// Print the timeline document JSON without rendering.
    Timeline(TimelineArgs),
}

#[derive(Parser, Debug)]
struct LayoutArgs {
    /// Number of generated clips.
    #[arg(long, default_value_t = 3)]
    clips: usize,

    /// Length of each clip in seconds.
    #[arg(long, default_value_t = 3)]
    clip_seconds: i64,

    /// Requested transition overlap in frames.
    #[arg(long, default_value_t = 30)]
    overlap_frames: i64,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    layout: LayoutArgs,

    /// Output directory for frames and the timeline document.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Worker threads (defaults to the number of CPUs).
    #[arg(long)]
    workers: Option<usize>,

    /// Nearest-neighbour resampling.
    #[arg(long)]
    draft: bool,

    /// Stamp a watermark in the top-left corner.
    #[arg(long)]
    watermark: bool,

    /// Filter applied to every composited frame.
    #[arg(long, value_enum, default_value_t = FilterArg::None)]
    filter: FilterArg,

    /// Blur sigma in output pixels for `--filter blur`.
    #[arg(long, default_value_t = 6.0)]
    blur_sigma: f32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FilterArg {
    None,
    Grayscale,
    Blur,
}

impl RenderArgs {
    fn frame_filter(&self) -> Result<FrameFilter> {
        Ok(match self.filter {
            FilterArg::None => FrameFilter::None,
            FilterArg::Grayscale => FrameFilter::Grayscale,
            FilterArg::Blur => {
                if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
                    bail!("blur sigma must be a non-negative number");
                }
                FrameFilter::Blur {
                    sigma: self.blur_sigma,
                }
            }
        })
    }
}

#[derive(Parser, Debug)]
struct TimelineArgs {
    #[command(flatten)]
    layout: LayoutArgs,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.cmd {
        Command::RenderTransition(args) => cmd_render_transition(args),
        Command::Timeline(args) => cmd_timeline(args),
    }
}

fn frame_rate(layout: &LayoutArgs) -> Result<FrameRate> {
    if layout.fps == 0 {
        bail!("fps must be positive");
    }
    Ok(FrameRate::new(layout.fps, 1))
}

fn build_timeline(layout: &LayoutArgs, size: Size) -> Result<(Timeline, SyntheticSource)> {
    if layout.clip_seconds <= 0 {
        bail!("clip length must be positive");
    }
    let rate = frame_rate(layout)?;
    let duration = RationalTime::seconds(layout.clip_seconds);
    let overlap = RationalTime::from_frames(layout.overlap_frames, rate);
    let (assets, source) = SyntheticSource::assets(layout.clips, duration, size);

    let mut builder = TimelineBuilder::new(TimelineConfig::default());
    builder
        .concatenate_with_transitions(&assets, overlap)
        .context("lay out clips")?;
    Ok((builder.build(), source))
}

fn cmd_timeline(args: TimelineArgs) -> Result<()> {
    let (timeline, _) = build_timeline(&args.layout, Size::new(640.0, 360.0))?;
    let json = TimelineDocument::new(timeline).to_json()?;
    println!("{}", String::from_utf8_lossy(&json));
    Ok(())
}

fn cmd_render_transition(args: RenderArgs) -> Result<()> {
    if args.width == 0 || args.height == 0 {
        bail!("output size must be non-zero");
    }
    let size = Size::new(args.width as f64, args.height as f64);
    let (timeline, source) = build_timeline(&args.layout, size)?;
    let rate = frame_rate(&args.layout)?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output directory '{}'", args.out.display()))?;
    TimelineDocument::new(timeline.clone())
        .save_to_file(&args.out.join("timeline.json"))
        .context("write timeline document")?;

    let compositor = FrameCompositor::new(CompositorConfig {
        background: Color::BLACK,
        transition: TransitionStyle::default(),
        filter: args.frame_filter()?,
        watermark: args.watermark.then(demo_watermark),
        honor_passthrough: true,
    })?;
    let context = RenderContext::new(args.width, args.height, !args.draft);
    let config = args
        .workers
        .map(SessionConfig::with_workers)
        .unwrap_or_default();
    let session = RenderSession::new(compositor, Some(context), config)?;

    let total = timeline.duration().to_frames(rate);
    info!(
        frames = total,
        transitions = timeline.instructions.transitions().count(),
        duration = %timeline.duration(),
        "rendering"
    );

    let requests: Vec<RenderRequest> = (0..total)
        .filter_map(|n| RenderRequest::gather(&timeline, RationalTime::from_frames(n, rate), &source))
        .collect();
    let expected = requests.len();

    let written = std::thread::scope(|scope| -> Result<usize> {
        let writer = scope.spawn(|| write_frames(&session, expected, &args.out));
        for request in requests {
            session.submit(request)?;
        }
        match writer.join() {
            Ok(result) => result,
            Err(_) => bail!("frame writer panicked"),
        }
    })?;

    info!(written, out = %args.out.display(), "done");
    Ok(())
}

fn write_frames(session: &RenderSession, expected: usize, out: &Path) -> Result<usize> {
    let mut written = 0;
    for _ in 0..expected {
        let Some(result) = session.recv() else {
            bail!("render session closed early");
        };
        match result.outcome {
            RenderOutcome::Finished(frame) => {
                let path = out.join(format!("frame_{:05}.png", result.sequence));
                let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba8())
                    .context("frame buffer size")?;
                image
                    .save(&path)
                    .with_context(|| format!("write '{}'", path.display()))?;
                written += 1;
            }
            RenderOutcome::Cancelled => warn!(sequence = result.sequence, "frame cancelled"),
            RenderOutcome::Failed(e) => warn!(sequence = result.sequence, "frame failed: {e}"),
        }
    }
    Ok(written)
}

fn demo_watermark() -> Watermark {
    let mut bars = Image::solid(Color::WHITE, 64, 36);
    for y in 12..24 {
        for x in 0..64 {
            bars.set_pixel(x, y, Color::rgb(0.9, 0.2, 0.2).premultiply().to_array().into());
        }
    }
    Watermark {
        blend_mode: BlendMode::Screen,
        ..Watermark::new(bars)
    }
}
