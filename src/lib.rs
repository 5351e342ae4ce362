//! # edgequake-pdf2html
//!
//! Convert PDF documents into a single self-contained HTML file, or into one
//! encoded image per page.
//!
//! ## Why this crate?
//!
//! Text extraction loses layout, fonts and figures. Instead every page is
//! rasterised with pdfium and embedded as an image, so the result looks
//! exactly like the PDF in any browser, with no external assets and no
//! JavaScript.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Guard   take the process-wide backend lock, init pdfium
//!  ├─ 2. Open    parse the document from memory
//!  ├─ 3. Raster  per page: size at DPI, white buffer, paint
//!  ├─ 4. Encode  PNG / WebP / JPEG bytes, pixels dropped right after
//!  ├─ 5. Emit    <img src="data:…;base64,…"> or one ImageResult per page
//!  └─ 6. Minify  HTML only; failure keeps the unminified document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2html::{to_markup_document, ConversionRequest, ImageFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("document.pdf")?;
//!     let request = ConversionRequest::builder()
//!         .dpi(144)
//!         .format(ImageFormat::Webp)
//!         .quality(80)
//!         .build()?;
//!     let html = to_markup_document(&bytes, &request)?;
//!     std::fs::write("document.html", html)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2html` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `webp`  | on      | WebP encoding via libwebp; without it WebP pages encode to empty bytes |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2html = { version = "0.1", default-features = false, features = ["webp"] }
//! ```
//!
//! ## Concurrency
//!
//! Conversions may be started from any number of threads but run one at a
//! time: pdfium is not thread-safe, so [`lifecycle`] serialises them behind
//! a process-wide lock. Use the `*_async` methods on [`Converter`] from
//! async code.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    BackendError, DocumentHandle, PageHandle, PageSize, PaintFlags, PdfiumBackend, RenderBackend,
    RenderEngine,
};
pub use config::{ConversionRequest, ConversionRequestBuilder, ImageFormat};
pub use convert::{to_image_list, to_markup_document, Converter};
pub use error::ConvertError;
pub use lifecycle::{with_rendering_backend, BackendRegistry};
pub use output::{write_image_files, write_markup_file, ImageManifest, ImageResult};
pub use pipeline::encode::{EncodeError, PageEncoder, StandardEncoder};
pub use pipeline::input::{load_input, LoadedInput};
pub use pipeline::minify::{MarkupMinifier, MinifyError, WhitespaceMinifier};
pub use pipeline::raster::{PixelBuffer, PixelBufferError, PixelFormat};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
