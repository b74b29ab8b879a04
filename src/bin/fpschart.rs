use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use fpschart::{
    ChartKind, ChartSpec, ExportOptions, ProgressSink, RenderStyle, Resolution, RunOptions,
    chart::{DPI_MAX, DPI_MIN},
    metric, render, resample, timebase,
};

#[derive(Parser, Debug)]
#[command(name = "fpschart", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and export the requested chart videos
    /// (requires `ffmpeg` on PATH when any export flag is set).
    Render(RenderArgs),
    /// Rasterize a single animation frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input capture log (semicolon-separated, TIMESTAMP + FRAMERATE columns).
    csv_report: PathBuf,

    /// Output file stem; "_fps"/"_frametime"/"_combined" is appended per chart.
    #[arg(long, default_value = "graph")]
    output: String,

    /// Export the FPS chart.
    #[arg(long)]
    fps: bool,

    /// Export the frame-time chart.
    #[arg(long)]
    frametime: bool,

    /// Export the combined FPS + frame-time chart.
    #[arg(long)]
    combined: bool,

    /// Output resolution preset.
    #[arg(short, long, value_enum, default_value_t = ResolutionChoice::R1080p)]
    resolution: ResolutionChoice,

    /// DPI scale; 100 matches the preset, 200 doubles it.
    #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(DPI_MIN as i64..=DPI_MAX as i64))]
    dpi: u32,

    /// Draw y-axis labels on the exported charts.
    #[arg(long)]
    yaxis_label: bool,

    /// Print the run report as JSON instead of the plain summary.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input capture log.
    csv_report: PathBuf,

    /// Which chart variant to rasterize.
    #[arg(long, value_enum, default_value_t = ChartChoice::Fps)]
    chart: ChartChoice,

    /// Animation frame index (0-based).
    #[arg(long)]
    frame: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output resolution preset.
    #[arg(short, long, value_enum, default_value_t = ResolutionChoice::R1080p)]
    resolution: ResolutionChoice,

    /// DPI scale.
    #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(DPI_MIN as i64..=DPI_MAX as i64))]
    dpi: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResolutionChoice {
    #[value(name = "720p")]
    R720p,
    #[value(name = "1080p")]
    R1080p,
    #[value(name = "1440p")]
    R1440p,
    #[value(name = "4k")]
    R4k,
}

impl From<ResolutionChoice> for Resolution {
    fn from(c: ResolutionChoice) -> Self {
        match c {
            ResolutionChoice::R720p => Resolution::R720p,
            ResolutionChoice::R1080p => Resolution::R1080p,
            ResolutionChoice::R1440p => Resolution::R1440p,
            ResolutionChoice::R4k => Resolution::R4k,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChartChoice {
    Fps,
    Frametime,
    Combined,
}

impl From<ChartChoice> for ChartKind {
    fn from(c: ChartChoice) -> Self {
        match c {
            ChartChoice::Fps => ChartKind::Fps,
            ChartChoice::Frametime => ChartKind::Frametime,
            ChartChoice::Combined => ChartKind::Combined,
        }
    }
}

/// Prints per-frame progress in the capture tool's classic format.
struct PrintProgress;

impl ProgressSink for PrintProgress {
    fn on_chart_start(&mut self, name: &str, out_path: &Path) {
        println!("Saving {name} Graph to {}", out_path.display());
    }

    fn on_frame(&mut self, current: usize, total: usize) {
        let percent = current as f64 * 100.0 / total.max(1) as f64;
        println!("Saving frame {current} out of {total} : {percent:05.2}%");
        std::io::stdout().flush().ok();
    }

    fn on_chart_done(&mut self, _name: &str) {
        println!("Done.");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let export = ExportOptions {
        export_fps: args.fps,
        export_frametime: args.frametime,
        export_combined: args.combined,
        resolution: args.resolution.into(),
        dpi: args.dpi,
        yaxis_label: args.yaxis_label,
    };

    if !export.any_export() {
        println!("No export files chosen - printing general statistics.");
    }

    let opts = RunOptions {
        input: args.csv_report,
        output_stem: args.output,
        export,
        style: RenderStyle::default(),
    };

    let report = fpschart::run(&opts, &mut PrintProgress)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if !report.failed_charts.is_empty() {
        let failed: Vec<&str> = report
            .failed_charts
            .iter()
            .map(|f| f.chart.as_str())
            .collect();
        anyhow::bail!("{} chart export(s) failed: {}", failed.len(), failed.join(", "));
    }

    Ok(())
}

fn print_summary(report: &fpschart::RunReport) {
    println!("# of original data points: {}", report.length_original);
    println!("# of Frames: {}", report.frame_count);
    println!("Minimum FPS: {}", report.fps.min);
    println!("Maximum FPS: {}", report.fps.max);
    println!("Mean FPS: {}", report.fps.mean);
    println!("Median FPS: {}", report.fps.median);
    println!("Minimum Frametime: {}ms", report.frametime.min);
    println!("Maximum Frametime: {}ms", report.frametime.max);
    println!("Mean Frametime: {}ms", report.frametime.mean);
    println!("Median Frametime: {}ms", report.frametime.median);
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let kind: ChartKind = args.chart.into();
    let export = ExportOptions {
        export_fps: kind == ChartKind::Fps,
        export_frametime: kind == ChartKind::Frametime,
        export_combined: kind == ChartKind::Combined,
        resolution: args.resolution.into(),
        dpi: args.dpi,
        yaxis_label: false,
    };

    let rows = fpschart::input::read_log(&args.csv_report)?;
    let samples = timebase::normalize(&rows)?;
    let resampled = resample::resample(&samples, resample::GRID_INTERVAL_MS)?;
    let derived = metric::derive(&resampled)?;

    let data = render::ChartData {
        times_ms: &resampled.times_ms,
        fps: &derived.fps,
        frametime_ms: &derived.frametime_ms,
        interval_ms: resampled.interval_ms,
    };

    let spec = ChartSpec::build_all("frame", &export)?
        .into_iter()
        .find(|s| s.kind == kind)
        .context("chart spec construction failed")?;

    let (width, height) = export.pixel_size();
    let frame = render::render_single_frame(
        &spec,
        &data,
        &RenderStyle::default(),
        width,
        height,
        args.frame,
    )?;

    write_png(&args.out, &frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_png(out: &Path, frame: &render::FrameRgba) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    // PNG expects straight alpha.
    let mut data = frame.data.clone();
    if frame.premultiplied {
        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a > 0 && a < 255 {
                for c in px.iter_mut().take(3) {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }

    image::save_buffer_with_format(
        out,
        &data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}
