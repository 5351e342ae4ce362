//! Error types for the edgequake-pdf2html library.
//!
//! Only three things stop a conversion once it has started: empty input
//! ([`ConvertError::InvalidArgument`]), a document the backend cannot open
//! ([`ConvertError::DocumentOpen`]) and a page buffer that cannot be
//! allocated ([`ConvertError::BufferAllocation`]). Pages that fail to load,
//! formats the encoder cannot produce and minifier failures are absorbed
//! where they happen and only show up in the logs.
//!
//! The remaining variants belong to the layers around the pipeline: binding
//! the pdfium library, request validation, input resolution and output
//! writing.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2html library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The caller passed no document bytes.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend could not parse the bytes (corrupt, unsupported or
    /// password-protected content).
    #[error("Failed to open document: {detail}")]
    DocumentOpen { detail: String },

    /// The pixel buffer for a page could not be created.
    #[error("Cannot allocate a {width}x{height} pixel buffer for page {page}: {detail}")]
    BufferAllocation {
        page: usize,
        width: u32,
        height: u32,
        detail: String,
    },

    /// The rendering backend could not be initialised.
    #[error(
        "Failed to initialise the rendering backend: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If that failed you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    BackendInit(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP(S) URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read, but it does not start with the PDF magic.
    #[error("Input is not a PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
