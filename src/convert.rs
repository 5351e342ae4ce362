//! Conversion entry points.
//!
//! Both operations share one per-page loop: open the document under the
//! lifecycle guard, rasterise each page, encode it, drop the pixels, hand
//! the encoded bytes on. They differ only in what they do with the bytes:
//! [`Converter::to_markup_document`] embeds them into one HTML document,
//! [`Converter::to_image_list`] returns them as named files.
//!
//! All calls block the calling thread and are serialised process-wide (see
//! [`crate::lifecycle`]). From async code use the `*_async` variants, which
//! move the work onto tokio's blocking pool.

use crate::backend::{DocumentHandle, PdfiumBackend, RenderBackend, RenderEngine};
use crate::config::ConversionRequest;
use crate::error::ConvertError;
use crate::lifecycle::with_rendering_backend;
use crate::output::ImageResult;
use crate::pipeline::encode::{encode_page, PageEncoder, StandardEncoder};
use crate::pipeline::markup::MarkupBuilder;
use crate::pipeline::minify::{MarkupMinifier, WhitespaceMinifier};
use crate::pipeline::raster::rasterize_page;
use crate::progress::ProgressCallback;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts PDF bytes into HTML or image lists.
///
/// The three type parameters are the external capabilities: rendering
/// backend, image encoder and markup minifier. [`Converter::new`] wires the
/// production ones; tests plug in doubles with [`Converter::with_parts`].
pub struct Converter<B = PdfiumBackend, E = StandardEncoder, M = WhitespaceMinifier> {
    backend: B,
    encoder: E,
    minifier: M,
    progress: Option<ProgressCallback>,
}

impl Converter {
    /// pdfium, the standard encoder and the whitespace minifier.
    pub fn new() -> Self {
        Self::with_parts(PdfiumBackend::new(), StandardEncoder, WhitespaceMinifier)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, E, M> Converter<B, E, M>
where
    B: RenderBackend,
    E: PageEncoder,
    M: MarkupMinifier,
{
    pub fn with_parts(backend: B, encoder: E, minifier: M) -> Self {
        Self {
            backend,
            encoder,
            minifier,
            progress: None,
        }
    }

    /// Report per-page events to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Render every page into one self-contained HTML document.
    ///
    /// # Errors
    /// - [`ConvertError::InvalidArgument`] for empty `bytes`
    /// - [`ConvertError::DocumentOpen`] when the backend cannot parse them
    /// - [`ConvertError::BufferAllocation`] when a page buffer cannot be created
    ///
    /// Pages that fail to load are left out. If minification fails the
    /// unminified HTML is returned.
    pub fn to_markup_document(
        &self,
        bytes: &[u8],
        request: &ConversionRequest,
    ) -> Result<String, ConvertError> {
        let mime = request.format.mime_type();
        let mut builder = MarkupBuilder::new();
        self.for_each_page(bytes, request, |index, encoded| {
            builder.push_page(index + 1, mime, &encoded);
        })?;

        let pages = builder.page_count();
        let markup = builder.finish();
        match self.minifier.minify(&markup) {
            Ok(minified) => {
                debug!(
                    "Minified HTML {} → {} bytes ({} pages)",
                    markup.len(),
                    minified.len(),
                    pages
                );
                Ok(minified)
            }
            Err(e) => {
                warn!("Minification failed ({}); returning unminified HTML", e);
                Ok(markup)
            }
        }
    }

    /// Render every page into its own encoded image, in page order.
    ///
    /// Errors as for [`Converter::to_markup_document`]. Pages that fail to
    /// load are left out, so the list can be shorter than the page count.
    pub fn to_image_list(
        &self,
        bytes: &[u8],
        request: &ConversionRequest,
    ) -> Result<Vec<ImageResult>, ConvertError> {
        let base_name = request.base_name();
        let mut images = Vec::new();
        self.for_each_page(bytes, request, |index, encoded| {
            images.push(ImageResult::new(base_name, index, request.format, encoded));
        })?;
        Ok(images)
    }

    /// The shared loop. `sink` receives the 0-based page index and the
    /// encoded bytes of every page that was rendered.
    fn for_each_page<F>(
        &self,
        bytes: &[u8],
        request: &ConversionRequest,
        mut sink: F,
    ) -> Result<(), ConvertError>
    where
        F: FnMut(usize, Vec<u8>),
    {
        if bytes.is_empty() {
            return Err(ConvertError::InvalidArgument(
                "document bytes are empty".into(),
            ));
        }
        request.validate()?;

        let start = Instant::now();
        let (total, produced) = with_rendering_backend(&self.backend, |engine| {
            let document = engine
                .open_document(bytes)
                .map_err(|e| ConvertError::DocumentOpen {
                    detail: e.to_string(),
                })?;
            let total = document.page_count();
            info!("Document opened: {} pages", total);
            if let Some(ref cb) = self.progress {
                cb.on_conversion_start(total);
            }

            let mut produced = 0;
            for index in 0..total {
                let Some(pixels) =
                    rasterize_page(&document, index, request.dpi, request.grayscale)?
                else {
                    if let Some(ref cb) = self.progress {
                        cb.on_page_skipped(index + 1, total);
                    }
                    continue;
                };

                let encoded = encode_page(&self.encoder, &pixels, request.format, request.quality);
                drop(pixels);

                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(index + 1, total, encoded.len());
                }
                sink(index, encoded);
                produced += 1;
            }
            Ok((total, produced))
        })?;

        info!(
            "Conversion complete: {}/{} pages, {}ms",
            produced,
            total,
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.progress {
            cb.on_conversion_complete(total, produced);
        }
        Ok(())
    }
}

impl<B, E, M> Converter<B, E, M>
where
    B: RenderBackend + Send + 'static,
    E: PageEncoder + Send + 'static,
    M: MarkupMinifier + Send + 'static,
{
    /// [`Converter::to_markup_document`] on tokio's blocking pool.
    pub async fn markup_document_async(
        self,
        bytes: Vec<u8>,
        request: ConversionRequest,
    ) -> Result<String, ConvertError> {
        tokio::task::spawn_blocking(move || self.to_markup_document(&bytes, &request))
            .await
            .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {}", e)))?
    }

    /// [`Converter::to_image_list`] on tokio's blocking pool.
    pub async fn image_list_async(
        self,
        bytes: Vec<u8>,
        request: ConversionRequest,
    ) -> Result<Vec<ImageResult>, ConvertError> {
        tokio::task::spawn_blocking(move || self.to_image_list(&bytes, &request))
            .await
            .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {}", e)))?
    }
}

/// [`Converter::to_markup_document`] with the production components.
pub fn to_markup_document(bytes: &[u8], request: &ConversionRequest) -> Result<String, ConvertError> {
    Converter::new().to_markup_document(bytes, request)
}

/// [`Converter::to_image_list`] with the production components.
pub fn to_image_list(
    bytes: &[u8],
    request: &ConversionRequest,
) -> Result<Vec<ImageResult>, ConvertError> {
    Converter::new().to_image_list(bytes, request)
}
