//! The rendering capability behind the pipeline.
//!
//! The pipeline never talks to pdfium directly. It sees four traits, one
//! per native resource, and relies on `Drop` for every release:
//!
//! ```text
//! RenderBackend ──initialize──▶ RenderEngine ──open_document──▶ DocumentHandle
//!                                (library up)                      │ load_page
//!                                                                  ▼
//!                                                              PageHandle ──paint──▶ PixelBuffer
//! ```
//!
//! Dropping the engine shuts the library down, dropping a document closes
//! it, dropping a page closes it. Borrowing ties each handle to its parent,
//! so a page can never outlive its document nor a document its engine.
//!
//! [`PdfiumBackend`] is the production implementation. Tests substitute an
//! in-memory backend.

pub mod pdfium;

pub use self::pdfium::{PdfiumBackend, PdfiumEngine};

use crate::error::ConvertError;
use crate::pipeline::raster::PixelBuffer;
use thiserror::Error;

/// Failure reported by a backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The call failed. For a page this means the page is skipped.
    #[error("{0}")]
    Failed(String),

    /// The backend could not allocate the bitmap it paints into. Fatal for
    /// the whole conversion, like a failed [`PixelBuffer`] allocation.
    #[error("bitmap allocation failed: {0}")]
    Allocation(String),
}

impl BackendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }

    pub fn allocation(detail: impl Into<String>) -> Self {
        Self::Allocation(detail.into())
    }
}

/// Page geometry in typographic points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }
}

/// Flags passed to [`PageHandle::paint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintFlags {
    pub anti_aliased_text: bool,
    pub annotations: bool,
    pub grayscale: bool,
}

impl PaintFlags {
    /// Anti-aliased text and annotations, plus gray rendering when asked.
    pub fn for_page(grayscale: bool) -> Self {
        Self {
            anti_aliased_text: true,
            annotations: true,
            grayscale,
        }
    }
}

/// Creates an initialised engine. Called by the lifecycle guard only.
pub trait RenderBackend {
    type Engine: RenderEngine;

    /// Bring the library up. Dropping the returned engine shuts it down.
    fn initialize(&self) -> Result<Self::Engine, ConvertError>;
}

/// An initialised rendering library.
pub trait RenderEngine {
    type Document<'a>: DocumentHandle
    where
        Self: 'a;

    /// Parse `bytes` into a document. Closing happens on drop.
    fn open_document<'a>(&'a self, bytes: &'a [u8]) -> Result<Self::Document<'a>, BackendError>;
}

/// An open document.
pub trait DocumentHandle {
    type Page<'p>: PageHandle
    where
        Self: 'p;

    fn page_count(&self) -> usize;

    /// Load one page; `None` when the backend cannot produce it.
    fn load_page(&self, index: usize) -> Option<Self::Page<'_>>;
}

/// A loaded page.
pub trait PageHandle {
    fn size(&self) -> PageSize;

    /// Paint the page over the whole extent of `target`.
    ///
    /// Return [`BackendError::Allocation`] when a native bitmap of the
    /// target's size cannot be created.
    fn paint(&self, target: &mut PixelBuffer, flags: PaintFlags) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_flags_always_request_text_and_annotations() {
        let color = PaintFlags::for_page(false);
        assert!(color.anti_aliased_text && color.annotations && !color.grayscale);
        assert!(PaintFlags::for_page(true).grayscale);
    }
}
