//! pdfium-render implementation of the rendering traits.
//!
//! `Pdfium::new` initialises the native library and dropping the `Pdfium`
//! value destroys it, which is exactly the engine lifecycle the guard
//! expects. Documents and pages are pdfium-render's own owned wrappers,
//! which close their native handles on drop.

use super::{BackendError, DocumentHandle, PageHandle, PageSize, PaintFlags, RenderBackend, RenderEngine};
use crate::error::ConvertError;
use crate::pipeline::raster::{PixelBuffer, PixelFormat};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Binds pdfium on demand through `pdfium-provision`.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Resolve the library via `PDFIUM_LIB_PATH`, the cache, or a download.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always bind the library at `path`.
    pub fn from_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
        }
    }
}

impl RenderBackend for PdfiumBackend {
    type Engine = PdfiumEngine;

    fn initialize(&self) -> Result<PdfiumEngine, ConvertError> {
        let path = match &self.library {
            Some(path) => path.clone(),
            None => pdfium_provision::ensure_library(None)
                .map_err(|e| ConvertError::BackendInit(e.to_string()))?,
        };
        let pdfium =
            pdfium_provision::bind(&path).map_err(|e| ConvertError::BackendInit(e.to_string()))?;
        debug!("pdfium initialised from {}", path.display());
        Ok(PdfiumEngine { pdfium })
    }
}

/// An initialised pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl Drop for PdfiumEngine {
    fn drop(&mut self) {
        debug!("pdfium shutting down");
    }
}

impl RenderEngine for PdfiumEngine {
    type Document<'a>
        = PdfDocument<'a>
    where
        Self: 'a;

    fn open_document<'a>(&'a self, bytes: &'a [u8]) -> Result<PdfDocument<'a>, BackendError> {
        self.pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| BackendError::new(format!("{e:?}")))
    }
}

impl<'a> DocumentHandle for PdfDocument<'a> {
    type Page<'p>
        = PdfPage<'p>
    where
        Self: 'p;

    fn page_count(&self) -> usize {
        self.pages().len() as usize
    }

    fn load_page(&self, index: usize) -> Option<PdfPage<'_>> {
        let page_index = PdfPageIndex::try_from(index).ok()?;
        match self.pages().get(page_index) {
            Ok(page) => Some(page),
            Err(e) => {
                debug!("pdfium could not load page {}: {:?}", index + 1, e);
                None
            }
        }
    }
}

impl<'a> PageHandle for PdfPage<'a> {
    fn size(&self) -> PageSize {
        PageSize::new(self.width().value, self.height().value)
    }

    fn paint(&self, target: &mut PixelBuffer, flags: PaintFlags) -> Result<(), BackendError> {
        let width = Pixels::try_from(target.width())
            .map_err(|_| BackendError::new("target width exceeds pdfium limits"))?;
        let height = Pixels::try_from(target.height())
            .map_err(|_| BackendError::new("target height exceeds pdfium limits"))?;
        let format = match target.format() {
            PixelFormat::Gray8 => PdfBitmapFormat::Gray,
            PixelFormat::Bgra8 => PdfBitmapFormat::BGRA,
        };

        let config = PdfRenderConfig::new()
            .set_target_size(width, height)
            .set_format(format)
            .set_clear_color(PdfColor::WHITE)
            .clear_before_rendering(true)
            .set_text_smoothing(flags.anti_aliased_text)
            .render_annotations(flags.annotations)
            .use_grayscale_rendering(flags.grayscale);

        let mut bitmap = PdfBitmap::empty(width, height, format, self.bindings()).map_err(|e| {
            BackendError::allocation(format!("{width}x{height} pdfium bitmap: {e:?}"))
        })?;
        self.render_into_bitmap_with_config(&mut bitmap, &config)
            .map_err(|e| BackendError::new(format!("{e:?}")))?;

        target.copy_rows_from(
            &bitmap.as_raw_bytes(),
            bitmap.width() as u32,
            bitmap.height() as u32,
        )
    }
}
