//! CLI binary for edgequake-pdf2html.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionRequest` and writes the results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2html::{
    load_input, write_image_files, write_markup_file, ConversionProgressCallback,
    ConversionRequest, Converter, ImageFormat, ImageManifest, PdfiumBackend, ProgressCallback,
    StandardEncoder, WhitespaceMinifier,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being rendered.
    page_started: std::sync::Mutex<Instant>,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: std::sync::Mutex::new(Instant::now()),
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    /// Seconds since the previous page finished, restarting the clock.
    fn lap(&self) -> f64 {
        let mut started = self
            .page_started
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let secs = started.elapsed().as_secs_f64();
        *started = Instant::now();
        secs
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.lap();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, encoded_len: usize) {
        let secs = self.lap();
        let size = if encoded_len == 0 {
            yellow("    empty")
        } else {
            dim(&format!("{:>7} KB", encoded_len.div_ceil(1024)))
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            green("✓"),
            page_num,
            total,
            size,
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_num: usize, total: usize) {
        self.lap();
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("⚠"),
            page_num,
            total,
            yellow("skipped (could not be loaded)"),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, produced: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!(
                "{} {} pages rendered",
                green("✔"),
                bold(&produced.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} skipped)",
                yellow("⚠"),
                bold(&produced.to_string()),
                total_pages,
                yellow(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single HTML file on stdout
  pdf2html document.pdf > document.html

  # Write to a file, crisper pages
  pdf2html document.pdf -o document.html --dpi 200

  # Smaller output: lossy JPEG, grayscale
  pdf2html scan.pdf -o scan.html --format jpeg --quality 70 --grayscale

  # One image per page instead of HTML
  pdf2html document.pdf --images pages/ --format png

  # Image mode with a JSON manifest on stdout
  pdf2html document.pdf --images pages/ --json

  # Convert from URL
  pdf2html https://arxiv.org/pdf/1706.03762 -o attention.html

FORMATS:
  Format  Extension  Lossless  Quality means
  ──────  ─────────  ────────  ─────────────────────
  webp    .webp      yes       compression effort
  png     .png       yes       ignored
  jpeg    .jpg       no        visual fidelity

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH             Path to an existing libpdfium (skips auto-download)
  PDFIUM_PROVISION_CACHE_DIR  Override the default pdfium cache directory
  RUST_LOG                    Override the log filter (e.g. edgequake_pdf2html=debug)

  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/pdf2html/pdfium-7690/.
"#;

/// Convert PDF files and URLs to self-contained HTML or per-page images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2html",
    version,
    about = "Convert PDF files and URLs to self-contained HTML or per-page images",
    long_about = "Render every page of a PDF (local file or URL) with pdfium and embed the \
pages as base64 images in a single HTML file, or write them out as individual PNG, WebP \
or JPEG files.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long, env = "PDF2HTML_OUTPUT", conflicts_with = "images")]
    output: Option<PathBuf>,

    /// Write one image per page into this directory instead of HTML.
    #[arg(long, env = "PDF2HTML_IMAGES")]
    images: Option<PathBuf>,

    /// Rendering DPI.
    #[arg(long, env = "PDF2HTML_DPI", default_value_t = 144,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// Encoder quality (1–100).
    #[arg(long, env = "PDF2HTML_QUALITY", default_value_t = 100,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Image format: png, webp, jpeg.
    #[arg(long, env = "PDF2HTML_FORMAT", value_enum, default_value = "webp")]
    format: FormatArg,

    /// Render pages in grayscale.
    #[arg(long, env = "PDF2HTML_GRAYSCALE")]
    grayscale: bool,

    /// File name prefix in --images mode (default: input file stem).
    #[arg(long, env = "PDF2HTML_BASE_NAME")]
    base_name: Option<String>,

    /// With --images: print a JSON manifest of the written files.
    #[arg(long, env = "PDF2HTML_JSON", requires = "images")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2HTML_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2HTML_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Webp,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Webp => ImageFormat::Webp,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Ensure PDFium engine is available ───────────────────────────────────
    let library = provision_pdfium(cli.quiet)?;

    // ── Load input ───────────────────────────────────────────────────────
    let input = load_input(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to load {}", cli.input))?;

    let request = build_request(&cli, input.stem.as_deref())?;

    let mut converter = Converter::with_parts(
        PdfiumBackend::from_library(library),
        StandardEncoder,
        WhitespaceMinifier,
    );
    if show_progress {
        converter = converter.with_progress(CliProgressCallback::new_dynamic() as ProgressCallback);
    }

    let started = Instant::now();

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref dir) = cli.images {
        let images = converter
            .image_list_async(input.bytes, request)
            .await
            .context("Conversion failed")?;
        let paths = write_image_files(dir, &images).context("Failed to write images")?;

        if cli.json {
            let manifest = ImageManifest::from_images(&images);
            let json =
                serde_json::to_string_pretty(&manifest).context("Failed to serialise manifest")?;
            println!("{json}");
        } else if !cli.quiet {
            let total: usize = images.iter().map(|img| img.bytes.len()).sum();
            eprintln!(
                "{}  {} images  {}  {}ms  →  {}",
                green("✔"),
                paths.len(),
                dim(&human_bytes(total)),
                started.elapsed().as_millis(),
                bold(&dir.display().to_string()),
            );
        }
    } else {
        let html = converter
            .markup_document_async(input.bytes, request)
            .await
            .context("Conversion failed")?;

        match cli.output {
            Some(ref path) => {
                write_markup_file(path, &html).context("Failed to write HTML")?;
                if !cli.quiet {
                    report_written(path, html.len(), started);
                }
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(html.as_bytes())
                    .context("Failed to write to stdout")?;
                handle.flush().context("Failed to write to stdout")?;
            }
        }
    }

    Ok(())
}

/// Locate or download libpdfium, with a download bar unless quiet.
fn provision_pdfium(quiet: bool) -> Result<PathBuf> {
    if let Some(path) = pdfium_provision::local_library() {
        return Ok(path);
    }
    if quiet {
        return tokio::task::block_in_place(|| pdfium_provision::ensure_library(None))
            .context("Failed to download PDFium engine");
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    // block_in_place lets the callback borrow `bar` without a 'static bound.
    let path = tokio::task::block_in_place(|| {
        pdfium_provision::ensure_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(path)
}

/// Map CLI args to `ConversionRequest`.
fn build_request(cli: &Cli, input_stem: Option<&str>) -> Result<ConversionRequest> {
    let mut builder = ConversionRequest::builder()
        .dpi(cli.dpi)
        .quality(cli.quality)
        .format(cli.format.into())
        .grayscale(cli.grayscale);

    if let Some(name) = cli.base_name.as_deref().or(input_stem) {
        builder = builder.base_name(name);
    }

    builder.build().context("Invalid configuration")
}

fn report_written(path: &Path, len: usize, started: Instant) {
    eprintln!(
        "{}  {}  {}ms  →  {}",
        green("✔"),
        dim(&human_bytes(len)),
        started.elapsed().as_millis(),
        bold(&path.display().to_string()),
    );
}

fn human_bytes(n: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
