//! CLI binary for tools24-jobs.
//!
//! A thin shim over the library crate that maps CLI flags to tool
//! parameters, drives the job workflow and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use recent_tools::{FileStore, RecentTools};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tools24_jobs::tools::image::{
    CompressImageParams, CompressPreset, ConvertParams, CropParams, FilterParams, ImageCompressor,
    ImageConverter, ImageCropper, ImageFilters, ImageFormat, ImageResizer, ImageRotate,
    ImageWatermark, ResizeParams, ResizePreset, Resampling, RotateParams, WatermarkParams,
    WatermarkPosition,
};
use tools24_jobs::tools::pdf::{
    CompressPdf, CompressPdfOptions, DeskewPdf, MergeParams, MergePdf, OcrLanguage, OcrMode,
    OcrOptions, OcrPdf, OrganizeParams, OrganizePdf, PdfQuality, PdfToImages, PdfToWord,
    SplitParams, SplitPdf,
};
use tools24_jobs::tools::{NoParams, NoUploadOptions};
use tools24_jobs::upload::sources_from_paths;
use tools24_jobs::{
    run, run_logo_watermark, ClientConfig, JobClient, JobId, JobProgressCallback, JobRun,
    JobStatus, ProgressCallback, Tool, ToolKind, UploadSource,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the job is queued, switching
/// to a percentage bar once the server reports progress.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Whether the bar style has replaced the initial spinner.
    bar_active: AtomicBool,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            bar_active: AtomicBool::new(false),
        })
    }

    fn activate_bar(&self) {
        if self.bar_active.swap(true, Ordering::SeqCst) {
            return;
        }
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(progress_style);
        self.bar.reset_eta();
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, tool: Tool, files: usize, bytes: u64) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!(
            "{files} file(s), {} to {}",
            human_bytes(bytes),
            tool
        ));
    }

    fn on_job_created(&self, tool: Tool, job_id: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Created {tool} job {job_id}"))
        ));
        self.bar.set_prefix("Queued");
        self.bar.set_message("");
    }

    fn on_submitted(&self, _tool: Tool, _job_id: &str) {
        self.bar.set_prefix("Processing");
    }

    fn on_poll(&self, _job_id: &str, _attempt: u32, status: &JobStatus, percent: Option<f32>) {
        if let Some(p) = percent.filter(|p| *p > 0.0) {
            self.activate_bar();
            self.bar.set_position(p.clamp(0.0, 100.0) as u64);
        }
        self.bar.set_message(status.to_string());
    }

    fn on_poll_error(&self, _job_id: &str, attempt: u32, error: &str) {
        self.bar.println(format!(
            "  {} Status check {:>3}  {}",
            red("✗"),
            attempt,
            red(&truncate(error, 80)),
        ));
    }

    fn on_job_complete(&self, tool: Tool, job_id: &str, _download_url: &str) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} job {} completed",
            green("✔"),
            bold(tool.slug()),
            dim(job_id)
        );
    }

    fn on_job_failed(&self, tool: Tool, job_id: &str, error: &str) {
        self.bar.finish_and_clear();
        if job_id.is_empty() {
            eprintln!("{} {} upload failed: {}", red("✘"), bold(tool.slug()), red(error));
            return;
        }
        eprintln!(
            "{} {} job {} failed: {}",
            red("✘"),
            bold(tool.slug()),
            dim(job_id),
            red(error)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

fn human_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n >= KB * KB {
        format!("{:.1} MB", n / (KB * KB))
    } else if n >= KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{n} B")
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Resize a photo to the medium preset and print the download URL
  tools24 run image-resizer photo.jpg --preset medium

  # OCR a scan in German and save the text next to it
  tools24 run ocr-pdf scan.pdf --language deu -o scan.txt

  # Same job, structured JSON output
  tools24 run ocr-pdf scan.pdf --variant json -o scan.json

  # Merge PDFs in the given order
  tools24 run merge-pdf a.pdf b.pdf c.pdf --order 2,0,1 -o merged.pdf

  # Extract pages 1 and 3 (0-indexed) from a PDF
  tools24 run split-pdf report.pdf --pages 0,2

  # Watermark with a logo
  tools24 run image-watermark photo.png --logo logo.png --position top-right

  # Check a job started elsewhere
  tools24 status ocr-pdf 5f0c2a1e

  # List every tool and its limits
  tools24 tools --json

ENVIRONMENT VARIABLES:
  TOOLS24_API_URL         API base URL (default http://localhost:9000/api/v1)
  NEXT_PUBLIC_API_URL     Fallback base URL shared with the web frontend
  TOOLS24_DATA_DIR        Where the recent-tools list is stored
  RUST_LOG                Override log filtering (e.g. tools24_jobs=debug)
"#;

/// Run Tools24Now file-processing jobs from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "tools24",
    version,
    about = "Run Tools24Now file-processing jobs from the command line",
    long_about = "Upload files to a Tools24Now backend, configure the selected tool, wait for \
the job to finish and fetch the result. Covers the PDF tools (merge, split, organize, compress, \
OCR, deskew, to Word, to images) and the image tools (convert, compress, resize, crop, filters, \
rotate, watermark).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API base URL.
    #[arg(long, env = "TOOLS24_API_URL", global = true)]
    api_url: Option<String>,

    /// Output structured JSON instead of text.
    #[arg(long, env = "TOOLS24_JSON", global = true)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "TOOLS24_NO_PROGRESS", global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TOOLS24_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "TOOLS24_QUIET", global = true)]
    quiet: bool,

    /// Delay between status checks in milliseconds.
    #[arg(long, env = "TOOLS24_POLL_INTERVAL_MS", default_value_t = 1000, global = true)]
    poll_interval: u64,

    /// Give up after this many status checks (default: wait until the job ends).
    #[arg(long, env = "TOOLS24_MAX_POLLS", global = true)]
    max_polls: Option<u32>,

    /// Consecutive failed status checks tolerated before giving up.
    #[arg(long, env = "TOOLS24_POLL_RETRIES", default_value_t = 1, global = true)]
    poll_retries: u32,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "TOOLS24_TIMEOUT", default_value_t = 60, global = true)]
    timeout: u64,

    /// Seconds to wait for the process/configure call before falling back
    /// to status polling.
    #[arg(long, env = "TOOLS24_PROCESS_TIMEOUT", default_value_t = 600, global = true)]
    process_timeout: u64,

    /// Skip the client-side 10 MB / 50 MB upload limits.
    #[arg(long, global = true)]
    no_size_limit: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload files and run a tool to completion.
    Run(RunArgs),

    /// Show the current status of a job.
    Status {
        /// Tool slug, e.g. ocr-pdf.
        tool: Tool,
        job_id: String,
    },

    /// Print the download URL of a job's artifact (no network access).
    Url {
        tool: Tool,
        job_id: String,
        /// Download variant (ocr-pdf: txt, json).
        #[arg(long)]
        variant: Option<String>,
    },

    /// List the available tools.
    Tools,

    /// Show recently used tools.
    Recent {
        /// Forget the history.
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Tool slug, e.g. image-resizer.
    tool: Tool,

    /// Input file(s). merge-pdf takes 2 to 10 PDFs, every other tool one file.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Save the artifact here instead of printing its URL.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Download variant (ocr-pdf: txt, json).
    #[arg(long)]
    variant: Option<String>,

    #[command(flatten)]
    params: ParamArgs,
}

/// Tool parameters. Each tool reads the flags that apply to it.
#[derive(Args, Debug, Default)]
struct ParamArgs {
    // ── Images ───────────────────────────────────────────────────────────
    /// Output format (converter: required).
    #[arg(long, help_heading = "Image options")]
    format: Option<ImageFormat>,

    /// Output quality 1-100.
    #[arg(long, help_heading = "Image options")]
    quality: Option<u8>,

    /// Resize preset (thumbnail, small, medium, large, hd, 4k) or
    /// compression preset (maximum, high, balanced, compress, max_compress).
    #[arg(long, help_heading = "Image options")]
    preset: Option<String>,

    #[arg(long, help_heading = "Image options")]
    width: Option<u32>,

    #[arg(long, help_heading = "Image options")]
    height: Option<u32>,

    /// Resize by percentage.
    #[arg(long, help_heading = "Image options")]
    scale: Option<f32>,

    /// Resize to the exact width and height, ignoring the aspect ratio.
    #[arg(long, help_heading = "Image options")]
    stretch: bool,

    /// Resampling filter (lanczos, bicubic, bilinear, nearest).
    #[arg(long, help_heading = "Image options")]
    resampling: Option<Resampling>,

    /// Target output size in KB (converter, compressor).
    #[arg(long, help_heading = "Image options")]
    target_kb: Option<u32>,

    /// Crop origin.
    #[arg(long, default_value_t = 0, help_heading = "Image options")]
    x: u32,

    #[arg(long, default_value_t = 0, help_heading = "Image options")]
    y: u32,

    /// Crop to an aspect ratio such as 16:9.
    #[arg(long, help_heading = "Image options")]
    aspect_ratio: Option<String>,

    /// Center the crop box.
    #[arg(long, help_heading = "Image options")]
    center: bool,

    #[arg(long, help_heading = "Image options")]
    brightness: Option<f32>,

    #[arg(long, help_heading = "Image options")]
    contrast: Option<f32>,

    #[arg(long, help_heading = "Image options")]
    saturation: Option<f32>,

    #[arg(long, help_heading = "Image options")]
    sharpness: Option<f32>,

    #[arg(long, help_heading = "Image options")]
    blur: Option<u8>,

    #[arg(long, help_heading = "Image options")]
    grayscale: bool,

    #[arg(long, help_heading = "Image options")]
    sepia: bool,

    /// Rotation in degrees, counter-clockwise (rotate, watermark).
    #[arg(long, allow_hyphen_values = true, help_heading = "Image options")]
    rotation: Option<f32>,

    #[arg(long, help_heading = "Image options")]
    flip_h: bool,

    #[arg(long, help_heading = "Image options")]
    flip_v: bool,

    // ── Watermark ────────────────────────────────────────────────────────
    /// Watermark text.
    #[arg(long, help_heading = "Watermark options")]
    text: Option<String>,

    /// Watermark logo image (replaces --text).
    #[arg(long, help_heading = "Watermark options")]
    logo: Option<PathBuf>,

    #[arg(long, help_heading = "Watermark options")]
    position: Option<WatermarkPosition>,

    /// Opacity 0-100.
    #[arg(long, help_heading = "Watermark options")]
    opacity: Option<u8>,

    /// Text colour as #rrggbb.
    #[arg(long, help_heading = "Watermark options")]
    color: Option<String>,

    // ── PDF ──────────────────────────────────────────────────────────────
    /// Pages to extract (split-pdf), 0-indexed, comma-separated.
    #[arg(long, value_delimiter = ',', help_heading = "PDF options")]
    pages: Vec<u32>,

    /// New page order (organize-pdf) or file order (merge-pdf), 0-indexed.
    #[arg(long, value_delimiter = ',', help_heading = "PDF options")]
    order: Vec<u32>,

    /// OCR language (auto, eng, deu, fra, ...).
    #[arg(long, help_heading = "PDF options")]
    language: Option<OcrLanguage>,

    /// OCR mode (standard, enhanced).
    #[arg(long, help_heading = "PDF options")]
    ocr_mode: Option<OcrMode>,

    /// compress-pdf strength (low, medium, high).
    #[arg(long, help_heading = "PDF options")]
    pdf_quality: Option<PdfQuality>,

    /// compress-pdf target reduction in percent.
    #[arg(long, help_heading = "PDF options")]
    reduce_by: Option<u8>,

    /// compress-pdf maximum output size in MB.
    #[arg(long, help_heading = "PDF options")]
    max_size_mb: Option<f64>,
}

impl ParamArgs {
    fn convert(&self) -> Result<ConvertParams> {
        let format = self
            .format
            .context("image-converter needs --format (png, jpeg, webp, ...)")?;
        let mut p = ConvertParams::new(format);
        p.quality = self.quality.unwrap_or(p.quality);
        p.target_size_kb = self.target_kb;
        p.max_width = self.width;
        p.max_height = self.height;
        Ok(p)
    }

    fn compress_image(&self) -> Result<CompressImageParams> {
        let preset = self
            .preset
            .as_deref()
            .map(str::parse::<CompressPreset>)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let mut p = CompressImageParams {
            target_size_kb: self.target_kb,
            max_width: self.width,
            max_height: self.height,
            output_format: self.format,
            preset,
            ..CompressImageParams::default()
        };
        p.quality = self
            .quality
            .or_else(|| preset.map(CompressPreset::quality))
            .unwrap_or(p.quality);
        Ok(p)
    }

    fn resize(&self) -> Result<ResizeParams> {
        let preset = self
            .preset
            .as_deref()
            .map(str::parse::<ResizePreset>)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let mut p = ResizeParams {
            width: self.width,
            height: self.height,
            scale_percent: self.scale,
            preset,
            maintain_aspect: !self.stretch,
            output_format: self.format,
            ..ResizeParams::default()
        };
        if let Some(r) = self.resampling {
            p.resampling = r;
        }
        p.quality = self.quality.unwrap_or(p.quality);
        Ok(p)
    }

    fn crop(&self) -> CropParams {
        let mut p = CropParams {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            aspect_ratio: self.aspect_ratio.clone(),
            center_crop: self.center,
            output_format: self.format,
            ..CropParams::default()
        };
        p.quality = self.quality.unwrap_or(p.quality);
        p
    }

    fn filters(&self) -> FilterParams {
        let d = FilterParams::default();
        FilterParams {
            brightness: self.brightness.unwrap_or(d.brightness),
            contrast: self.contrast.unwrap_or(d.contrast),
            saturation: self.saturation.unwrap_or(d.saturation),
            sharpness: self.sharpness.unwrap_or(d.sharpness),
            blur: self.blur.unwrap_or(d.blur),
            grayscale: self.grayscale,
            sepia: self.sepia,
            output_format: self.format,
            quality: self.quality.unwrap_or(d.quality),
            ..d
        }
    }

    fn rotate(&self) -> RotateParams {
        let d = RotateParams::default();
        RotateParams {
            rotation: self.rotation.unwrap_or(d.rotation),
            flip_h: self.flip_h,
            flip_v: self.flip_v,
            output_format: self.format,
            quality: self.quality.unwrap_or(d.quality),
        }
    }

    /// Watermark settings; the text is ignored when a logo is given.
    fn watermark(&self) -> Result<WatermarkParams> {
        let mut p = if self.logo.is_some() {
            WatermarkParams::logo(String::new())
        } else {
            let text = self
                .text
                .clone()
                .context("image-watermark needs --text or --logo")?;
            WatermarkParams::text(text)
        };
        p.text_color = self.color.clone();
        p.position = self.position.unwrap_or(p.position);
        p.opacity = self.opacity.unwrap_or(p.opacity);
        p.rotation = self.rotation.map(|r| r.round() as i32).unwrap_or(p.rotation);
        p.output_format = self.format;
        p.quality = self.quality.unwrap_or(p.quality);
        Ok(p)
    }

    fn ocr(&self) -> OcrOptions {
        OcrOptions {
            language: self.language.unwrap_or_default(),
            mode: self.ocr_mode.unwrap_or_default(),
        }
    }

    fn compress_pdf(&self) -> CompressPdfOptions {
        CompressPdfOptions {
            quality: self.pdf_quality.unwrap_or_default(),
            compress_by_percent: self.reduce_by,
            max_file_size_mb: self.max_size_mb,
        }
    }
}

/// Shared state for subcommands.
struct Ctx {
    client: JobClient,
    json: bool,
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active; it
    // provides all the feedback that matters to the user.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && matches!(cli.command, Command::Run(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build client ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let client = build_client(&cli, progress_cb)?;
    let ctx = Ctx {
        client,
        json: cli.json,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Run(args) => run_command(&ctx, args).await,
        Command::Status { tool, job_id } => status_command(&ctx, tool, &JobId::new(job_id)).await,
        Command::Url {
            tool,
            job_id,
            variant,
        } => url_command(&ctx, tool, &JobId::new(job_id), variant.as_deref()),
        Command::Tools => tools_command(&ctx),
        Command::Recent { clear } => recent_command(&ctx, clear),
    }
}

/// Map CLI args to a `JobClient`.
fn build_client(cli: &Cli, progress: Option<ProgressCallback>) -> Result<JobClient> {
    let mut builder = ClientConfig::builder()
        .request_timeout_secs(cli.timeout)
        .process_timeout_secs(cli.process_timeout)
        .poll_interval_ms(cli.poll_interval)
        .max_poll_attempts(cli.max_polls)
        .max_consecutive_poll_errors(cli.poll_retries)
        .enforce_size_limits(!cli.no_size_limit);

    if let Some(ref url) = cli.api_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;
    JobClient::new(config).context("Failed to create HTTP client")
}

// ── run ──────────────────────────────────────────────────────────────────

async fn run_command(ctx: &Ctx, args: RunArgs) -> Result<()> {
    let tool = args.tool;
    // Reject a bad variant before anything is uploaded.
    tool.spec()
        .download_path("-", args.variant.as_deref())
        .map_err(anyhow::Error::msg)?;

    let sources = sources_from_paths(&args.files)
        .await
        .context("Failed to read input files")?;
    let p = &args.params;
    let out = args.output.as_deref();
    let variant = args.variant.as_deref();

    let summary = match tool {
        Tool::PdfToImages => {
            execute::<PdfToImages>(ctx, sources, &NoUploadOptions, &NoParams, out, variant).await?
        }
        Tool::OrganizePdf => {
            if p.order.is_empty() {
                bail!("organize-pdf needs --order with the new page order");
            }
            let params = OrganizeParams {
                page_order: p.order.clone(),
            };
            execute::<OrganizePdf>(ctx, sources, &NoUploadOptions, &params, out, variant).await?
        }
        Tool::MergePdf => {
            let params = if p.order.is_empty() {
                MergeParams::in_upload_order(sources.len())
            } else {
                MergeParams {
                    file_order: p.order.clone(),
                }
            };
            execute::<MergePdf>(ctx, sources, &NoUploadOptions, &params, out, variant).await?
        }
        Tool::CompressPdf => {
            execute::<CompressPdf>(ctx, sources, &p.compress_pdf(), &NoParams, out, variant).await?
        }
        Tool::OcrPdf => execute::<OcrPdf>(ctx, sources, &p.ocr(), &NoParams, out, variant).await?,
        Tool::DeskewPdf => {
            execute::<DeskewPdf>(ctx, sources, &NoUploadOptions, &NoParams, out, variant).await?
        }
        Tool::SplitPdf => {
            let params = SplitParams {
                pages: p.pages.clone(),
            };
            execute::<SplitPdf>(ctx, sources, &NoUploadOptions, &params, out, variant).await?
        }
        Tool::PdfToWord => {
            execute::<PdfToWord>(ctx, sources, &NoUploadOptions, &NoParams, out, variant).await?
        }
        Tool::ImageConverter => {
            execute::<ImageConverter>(ctx, sources, &NoUploadOptions, &p.convert()?, out, variant)
                .await?
        }
        Tool::ImageCompressor => {
            let params = p.compress_image()?;
            execute::<ImageCompressor>(ctx, sources, &NoUploadOptions, &params, out, variant)
                .await?
        }
        Tool::ImageResizer => {
            execute::<ImageResizer>(ctx, sources, &NoUploadOptions, &p.resize()?, out, variant)
                .await?
        }
        Tool::ImageCropper => {
            execute::<ImageCropper>(ctx, sources, &NoUploadOptions, &p.crop(), out, variant).await?
        }
        Tool::ImageFilters => {
            execute::<ImageFilters>(ctx, sources, &NoUploadOptions, &p.filters(), out, variant)
                .await?
        }
        Tool::ImageRotate => {
            execute::<ImageRotate>(ctx, sources, &NoUploadOptions, &p.rotate(), out, variant)
                .await?
        }
        Tool::ImageWatermark => {
            let params = p.watermark()?;
            match &p.logo {
                Some(logo) => watermark_with_logo(ctx, sources, logo, params, out).await?,
                None => {
                    execute::<ImageWatermark>(ctx, sources, &NoUploadOptions, &params, out, variant)
                        .await?
                }
            }
        }
    };

    report(ctx, &summary)?;
    remember(tool);
    Ok(())
}

/// What `run` prints once a job has finished.
#[derive(Serialize)]
struct RunSummary {
    tool: Tool,
    job_id: String,
    download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_written: Option<u64>,
    polls: u32,
    duration_ms: u64,
    /// The full job record, including the tool result.
    run: serde_json::Value,
}

async fn execute<T: ToolKind>(
    ctx: &Ctx,
    sources: Vec<UploadSource>,
    options: &T::UploadOptions,
    params: &T::Params,
    output: Option<&Path>,
    variant: Option<&str>,
) -> Result<RunSummary> {
    let finished = run::<T>(&ctx.client, sources, options, params, None)
        .await
        .with_context(|| format!("{} failed", T::TOOL))?;

    // Honour the requested variant for both the printed URL and the download.
    let download_url = ctx
        .client
        .tool::<T>()
        .download_url(finished.job_id(), variant)?;
    summarise(ctx, T::TOOL, finished, download_url, output).await
}

async fn watermark_with_logo(
    ctx: &Ctx,
    mut sources: Vec<UploadSource>,
    logo: &Path,
    params: WatermarkParams,
    output: Option<&Path>,
) -> Result<RunSummary> {
    if sources.len() != 1 {
        bail!("image-watermark takes exactly one image");
    }
    let image = sources.remove(0);
    let logo = UploadSource::from_path(logo)
        .await
        .context("Failed to read logo")?;
    let finished = run_logo_watermark(&ctx.client, image, logo, params)
        .await
        .context("image-watermark failed")?;
    let download_url = finished.download_url.clone();
    summarise(ctx, Tool::ImageWatermark, finished, download_url, output).await
}

async fn summarise<R: Serialize>(
    ctx: &Ctx,
    tool: Tool,
    finished: JobRun<R>,
    download_url: String,
    output: Option<&Path>,
) -> Result<RunSummary> {
    let bytes_written = match output {
        Some(path) => Some(
            ctx.client
                .download_to_file(&download_url, path)
                .await
                .with_context(|| format!("Failed to save result to {}", path.display()))?,
        ),
        None => None,
    };

    Ok(RunSummary {
        tool,
        job_id: finished.job_id().to_string(),
        download_url,
        saved_to: output.map(Path::to_path_buf),
        bytes_written,
        polls: finished.polls,
        duration_ms: finished.duration_ms,
        run: serde_json::to_value(&finished).context("Failed to serialise job")?,
    })
}

fn report(ctx: &Ctx, summary: &RunSummary) -> Result<()> {
    if ctx.json {
        let json = serde_json::to_string_pretty(summary).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    match (&summary.saved_to, summary.bytes_written) {
        (Some(path), Some(bytes)) => {
            if !ctx.quiet {
                eprintln!(
                    "{}  {}  {}ms  →  {}",
                    green("✔"),
                    human_bytes(bytes),
                    summary.duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        _ => {
            // The URL is the result; keep it alone on stdout for scripting.
            println!("{}", summary.download_url);
            if !ctx.quiet {
                eprintln!(
                    "   {} status checks  —  {}ms total",
                    dim(&summary.polls.to_string()),
                    summary.duration_ms
                );
            }
        }
    }
    Ok(())
}

/// Record a successful run in the recent-tools list. Never fatal.
fn remember(tool: Tool) {
    let mut recent = RecentTools::load(FileStore::default_location());
    if let Err(e) = recent.add(tool.href()) {
        warn!("Could not update recent tools: {}", e);
    }
}

// ── status / url ─────────────────────────────────────────────────────────

/// Bind `$T` to the marker type of a runtime [`Tool`] and evaluate `$body`.
macro_rules! with_tool {
    ($tool:expr, $T:ident => $body:expr) => {
        match $tool {
            Tool::PdfToImages => { type $T = PdfToImages; $body }
            Tool::OrganizePdf => { type $T = OrganizePdf; $body }
            Tool::MergePdf => { type $T = MergePdf; $body }
            Tool::CompressPdf => { type $T = CompressPdf; $body }
            Tool::OcrPdf => { type $T = OcrPdf; $body }
            Tool::DeskewPdf => { type $T = DeskewPdf; $body }
            Tool::SplitPdf => { type $T = SplitPdf; $body }
            Tool::PdfToWord => { type $T = PdfToWord; $body }
            Tool::ImageConverter => { type $T = ImageConverter; $body }
            Tool::ImageCompressor => { type $T = ImageCompressor; $body }
            Tool::ImageResizer => { type $T = ImageResizer; $body }
            Tool::ImageCropper => { type $T = ImageCropper; $body }
            Tool::ImageFilters => { type $T = ImageFilters; $body }
            Tool::ImageRotate => { type $T = ImageRotate; $body }
            Tool::ImageWatermark => { type $T = ImageWatermark; $body }
        }
    };
}

async fn status_command(ctx: &Ctx, tool: Tool, job_id: &JobId) -> Result<()> {
    let job: serde_json::Value = with_tool!(tool, T => {
        let job = ctx
            .client
            .tool::<T>()
            .status(job_id)
            .await
            .context("Status check failed")?;
        serde_json::to_value(&job).context("Failed to serialise job")?
    });

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&job).context("Failed to serialise job")?
        );
        return Ok(());
    }

    let field = |k: &str| job.get(k).filter(|v| !v.is_null());
    println!("Job:          {}", job_id);
    println!("Tool:         {}", tool);
    if let Some(s) = field("status").and_then(|v| v.as_str()) {
        println!("Status:       {}", s);
    }
    if let Some(p) = field("progress").and_then(|v| v.get("percent")).and_then(|v| v.as_f64()) {
        println!("Progress:     {:.0}%", p);
    }
    if let Some(f) = field("filename").and_then(|v| v.as_str()) {
        println!("File:         {}", f);
    }
    if let Some(e) = field("error").and_then(|v| v.as_str()) {
        println!("Error:        {}", red(e));
    }
    if let Some(t) = field("expires_at").and_then(|v| v.as_str()) {
        println!("Expires:      {}", t);
    }
    Ok(())
}

fn url_command(ctx: &Ctx, tool: Tool, job_id: &JobId, variant: Option<&str>) -> Result<()> {
    let segments = tool
        .spec()
        .download_path(job_id.as_str(), variant)
        .map_err(anyhow::Error::msg)?;
    let url = ctx.client.endpoint(&segments);
    if ctx.json {
        println!("{}", serde_json::json!({ "tool": tool, "job_id": job_id, "url": url.as_str() }));
    } else {
        println!("{url}");
    }
    Ok(())
}

// ── tools / recent ───────────────────────────────────────────────────────

fn tools_command(ctx: &Ctx) -> Result<()> {
    if ctx.json {
        let specs: Vec<_> = Tool::ALL.iter().map(|t| t.spec()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&specs).context("Failed to serialise registry")?
        );
        return Ok(());
    }

    println!(
        "  {:<18} {:<26} {:<28} {:>6}  {}",
        "TOOL", "TITLE", "ACCEPTS", "LIMIT", "MODE"
    );
    for tool in Tool::ALL {
        let spec = tool.spec();
        let mode = if spec.is_synchronous() { "sync" } else { "polled" };
        println!(
            "  {:<18} {:<26} {:<28} {:>6}  {}",
            cyan(spec.slug),
            spec.title,
            spec.accepts.describe(),
            human_bytes(spec.max_upload_bytes),
            dim(mode),
        );
    }
    Ok(())
}

fn recent_command(ctx: &Ctx, clear: bool) -> Result<()> {
    let mut recent = RecentTools::load(FileStore::default_location());
    if clear {
        recent.clear().context("Failed to clear recent tools")?;
        if !ctx.quiet {
            eprintln!("{} Recent tools cleared", green("✔"));
        }
        return Ok(());
    }

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(recent.entries()).context("Failed to serialise list")?
        );
        return Ok(());
    }
    if recent.is_empty() {
        if !ctx.quiet {
            eprintln!("{}", dim("No tools used yet."));
        }
        return Ok(());
    }
    for href in recent.entries() {
        match Tool::from_slug(href) {
            Some(tool) => println!("  {:<18} {}", cyan(tool.slug()), tool.spec().title),
            None => println!("  {href}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_tool_flags() {
        let cli = Cli::try_parse_from([
            "tools24", "run", "image-resizer", "photo.jpg", "--preset", "medium", "--quality", "90",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.tool, Tool::ImageResizer);
        let p = args.params.resize().unwrap();
        assert_eq!(p.preset, Some(ResizePreset::Medium));
        assert_eq!(p.quality, 90);
    }

    #[test]
    fn parses_comma_separated_pages() {
        let cli =
            Cli::try_parse_from(["tools24", "run", "split-pdf", "a.pdf", "--pages", "0,2,5"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.params.pages, vec![0, 2, 5]);
    }

    #[test]
    fn rejects_unknown_tool() {
        assert!(Cli::try_parse_from(["tools24", "status", "pdf-to-png", "j1"]).is_err());
    }

    #[test]
    fn compress_preset_sets_quality_unless_overridden() {
        let p = ParamArgs {
            preset: Some("balanced".into()),
            ..ParamArgs::default()
        };
        assert_eq!(p.compress_image().unwrap().quality, 75);

        let p = ParamArgs {
            preset: Some("balanced".into()),
            quality: Some(50),
            ..ParamArgs::default()
        };
        assert_eq!(p.compress_image().unwrap().quality, 50);
    }

    #[test]
    fn watermark_requires_text_or_logo() {
        assert!(ParamArgs::default().watermark().is_err());
        let p = ParamArgs {
            text: Some("© 2025".into()),
            ..ParamArgs::default()
        };
        assert_eq!(p.watermark().unwrap().text.as_deref(), Some("© 2025"));
    }

    #[test]
    fn truncate_and_bytes_helpers() {
        assert_eq!(truncate("abcdef", 4), "abc\u{2026}");
        assert_eq!(truncate("abc", 4), "abc");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(10 * 1024 * 1024), "10.0 MB");
    }
}
