//! Page rasterisation: one page in, one freshly allocated pixel buffer out.
//!
//! ## Sizing
//!
//! Page geometry is in points (1/72 inch). Each axis becomes
//! `ceil(points * dpi / 72)` pixels, never less than one, so doubling the
//! DPI roughly doubles the pixel size and the last partial row or column is
//! never clipped.
//!
//! ## Ownership
//!
//! The page handle lives only inside [`rasterize_page`] and is dropped on
//! every return path. The buffer is handed to the caller, who drops it after
//! encoding. Buffers are never pooled: consecutive pages may differ in size.

use crate::backend::{BackendError, DocumentHandle, PageHandle, PaintFlags};
use crate::error::ConvertError;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a [`PixelBuffer`] could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PixelBufferError {
    #[error("degenerate size {width}x{height}")]
    Degenerate { width: u32, height: u32 },

    #[error("{width}x{height} buffer size overflows")]
    Overflow { width: u32, height: u32 },

    #[error("allocator refused {bytes} bytes")]
    Refused { bytes: usize },
}

/// Channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One 8-bit gray channel.
    Gray8,
    /// Four 8-bit channels in B, G, R, A byte order.
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Bgra8 => 4,
        }
    }

    pub fn for_request(grayscale: bool) -> Self {
        if grayscale {
            PixelFormat::Gray8
        } else {
            PixelFormat::Bgra8
        }
    }
}

/// An owned raster of `width × height` pixels with `stride` bytes per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a buffer filled with opaque white.
    ///
    /// Fails (instead of aborting the process) when the size overflows or
    /// the allocator refuses the request.
    pub fn new_white(width: u32, height: u32, format: PixelFormat) -> Result<Self, PixelBufferError> {
        if width == 0 || height == 0 {
            return Err(PixelBufferError::Degenerate { width, height });
        }
        let overflow = PixelBufferError::Overflow { width, height };
        let len = (width as usize)
            .checked_mul(format.bytes_per_pixel())
            .and_then(|stride| stride.checked_mul(height as usize))
            .ok_or(overflow)?;
        let stride = width as usize * format.bytes_per_pixel();

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PixelBufferError::Refused { bytes: len })?;
        // 0xFF is white in Gray8 and opaque white in Bgra8.
        data.resize(len, 0xFF);

        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row; at least `width * bytes_per_pixel`.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Iterate rows without their stride padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let row_len = self.width as usize * self.channels();
        self.data
            .chunks_exact(self.stride)
            .map(move |row| &row[..row_len])
    }

    /// Copy a backend-produced raster of the same size and layout into this
    /// buffer. The source stride is derived from its length.
    pub fn copy_rows_from(&mut self, src: &[u8], width: u32, height: u32) -> Result<(), BackendError> {
        if width != self.width || height != self.height {
            return Err(BackendError::new(format!(
                "backend produced {width}x{height}, expected {}x{}",
                self.width, self.height
            )));
        }
        let row_len = self.width as usize * self.channels();
        let src_stride = src.len() / self.height as usize;
        if src_stride < row_len {
            return Err(BackendError::new(format!(
                "backend row stride {src_stride} is shorter than {row_len}"
            )));
        }
        for (dst, src) in self
            .data
            .chunks_exact_mut(self.stride)
            .zip(src.chunks_exact(src_stride))
        {
            dst[..row_len].copy_from_slice(&src[..row_len]);
        }
        Ok(())
    }
}

/// Pixels needed to cover `points` at `dpi`, never less than one.
pub fn target_pixels(points: f32, dpi: u32) -> u32 {
    let px = (f64::from(points) * f64::from(dpi) / 72.0).ceil();
    if px.is_finite() && px >= 1.0 {
        // `as` saturates at u32::MAX
        px as u32
    } else {
        1
    }
}

/// Render page `index` of `document` into a new buffer.
///
/// Returns `Ok(None)` when the page is skipped: it failed to load or the
/// backend failed to paint it. Skipped pages contribute no output and do not
/// abort the conversion. A buffer that cannot be allocated is fatal.
pub fn rasterize_page<D: DocumentHandle>(
    document: &D,
    index: usize,
    dpi: u32,
    grayscale: bool,
) -> Result<Option<PixelBuffer>, ConvertError> {
    let Some(page) = document.load_page(index) else {
        warn!("Skipping page {}: failed to load", index + 1);
        return Ok(None);
    };

    let size = page.size();
    let width = target_pixels(size.width_pt, dpi);
    let height = target_pixels(size.height_pt, dpi);
    let format = PixelFormat::for_request(grayscale);

    let allocation_failed = |detail: String| ConvertError::BufferAllocation {
        page: index + 1,
        width,
        height,
        detail,
    };
    let mut buffer = PixelBuffer::new_white(width, height, format)
        .map_err(|e| allocation_failed(e.to_string()))?;

    match page.paint(&mut buffer, PaintFlags::for_page(grayscale)) {
        Ok(()) => {}
        Err(BackendError::Allocation(detail)) => return Err(allocation_failed(detail)),
        Err(e) => {
            warn!("Skipping page {}: paint failed: {}", index + 1, e);
            return Ok(None);
        }
    }

    debug!(
        "Rendered page {} → {}x{} px ({:?})",
        index + 1,
        width,
        height,
        format
    );
    Ok(Some(buffer))
}
