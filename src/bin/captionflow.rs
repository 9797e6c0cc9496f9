use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "captionflow", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `CAPTIONFLOW_LOG` sets the level too.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the captions of a single instant as a PNG.
    Frame(FrameArgs),
    /// Overlay the captions on the source video (requires `ffmpeg` and `ffprobe`).
    Render(RenderArgs),
    /// List the built-in effect presets.
    Presets,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Render job JSON.
    #[arg(long)]
    job: PathBuf,

    /// Time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas size as WIDTHxHEIGHT when the job does not fix one.
    #[arg(long, default_value = "1920x1080")]
    size: String,

    /// Print the loaded font faces and their families.
    #[arg(long)]
    dump_fonts: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render job JSON.
    #[arg(long)]
    job: PathBuf,

    /// Override the job's output path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Upper bound on render units.
    #[arg(long)]
    workers: Option<usize>,

    /// Do not print the progress line.
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Presets => cmd_presets(),
    }
}

fn init_tracing(verbose: u8) {
    let from_env = std::env::var("CAPTIONFLOW_LOG")
        .ok()
        .and_then(|v| v.trim().parse::<tracing::Level>().ok());
    let level = match verbose {
        0 => from_env.unwrap_or(tracing::Level::WARN),
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{s}' is not WIDTHxHEIGHT"))?;
    let w = w.trim().parse().with_context(|| format!("invalid width in '{s}'"))?;
    let h = h.trim().parse().with_context(|| format!("invalid height in '{s}'"))?;
    Ok((w, h))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = captionflow::RenderJob::load(&args.job)?;
    let env = captionflow::EnvOverrides::from_env()?;
    let opts = job.render_options(&env)?;

    let (width, height) = match opts.preset.and_then(captionflow::FramePreset::dimensions) {
        Some(dims) => dims,
        None => match (opts.width, opts.height) {
            (Some(w), Some(h)) => (w, h),
            _ => parse_size(&args.size)?,
        },
    };
    let canvas = captionflow::Canvas::new(width, height)?;
    let fonts = captionflow::FontBook::discover(&opts.fonts, opts.font_dir.as_deref())?;

    if args.dump_fonts {
        let engine = captionflow::text::TextEngine::new(&fonts)?;
        eprintln!("fonts:");
        for face in fonts.faces() {
            eprintln!("  {}", face.label);
        }
        eprintln!("families:");
        for family in engine.families() {
            eprintln!("  {family}");
        }
    }

    let frame = captionflow::render_still(&fonts, &job.cues, &job.style, canvas, args.time)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let job = captionflow::RenderJob::load(&args.job)?;
    let env = captionflow::EnvOverrides::from_env()?;
    let mut opts = job.render_options(&env)?;
    if let Some(n) = args.workers {
        anyhow::ensure!(n > 0, "--workers must be >= 1");
        opts.workers = Some(n);
    }
    if !args.quiet {
        opts.progress = Some(Arc::new(|p: f64| {
            eprint!("\rrendering {:>3.0}%", p * 100.0);
            let _ = std::io::stderr().flush();
        }));
    }
    let output = args.out.unwrap_or_else(|| job.output.clone());

    let report = captionflow::render_animated_captions(&job.source, &output, &job.cues, &job.style, &opts)
        .with_context(|| format!("render '{}'", job.source.display()))?;

    if !args.quiet {
        eprintln!();
    }
    let s = report.stats;
    eprintln!(
        "wrote {} ({}x{} @ {:.3} fps, {} frames, {} rendered, {} reused, {} units{})",
        report.output.display(),
        report.geometry.canvas.width,
        report.geometry.canvas.height,
        report.geometry.fps.as_f64(),
        s.frames_total,
        s.frames_rendered,
        s.frames_reused,
        s.workers,
        if s.fell_back { ", sequential fallback" } else { "" },
    );
    Ok(())
}

fn cmd_presets() -> anyhow::Result<()> {
    let catalog = captionflow::PresetCatalog::builtin();
    anyhow::ensure!(!catalog.is_empty(), "built-in preset catalog is empty");
    for preset in catalog.presets() {
        let scope = match preset.scope {
            captionflow::preset::model::Scope::Line => "line",
            captionflow::preset::model::Scope::Word => "word",
        };
        let tier = preset.tier.map_or("-", |t| t.as_str());
        println!("{:<28} {scope:<5} {tier:<10} {}", preset.id, preset.name);
    }
    for (alias, target) in catalog.aliases() {
        println!("{alias:<28} alias -> {target}");
    }
    Ok(())
}
