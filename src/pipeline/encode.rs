//! Image encoding: `PixelBuffer` → PNG, WebP or JPEG bytes.
//!
//! PNG and WebP are written lossless, which keeps rendered text crisp.
//! For WebP the request quality becomes libwebp's compression effort; for
//! JPEG it is the usual fidelity setting; PNG ignores it.
//!
//! [`encode_page`] never fails. If the encoder cannot produce the format it
//! returns an empty payload, so a caller that needs bytes must check the
//! length.

use crate::config::ImageFormat;
use crate::pipeline::raster::{PixelBuffer, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GrayImage, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

/// Why an encoder produced nothing.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// This encoder has no codec for the format.
    #[error("{0} encoding is not available")]
    Unsupported(ImageFormat),

    /// The codec rejected the pixels.
    #[error("{format} encoding failed: {detail}")]
    Codec { format: ImageFormat, detail: String },
}

/// Turns one pixel buffer into encoded image bytes.
pub trait PageEncoder {
    fn encode(
        &self,
        pixels: &PixelBuffer,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// Encode `pixels`, yielding an empty payload when the encoder cannot.
pub fn encode_page<E: PageEncoder + ?Sized>(
    encoder: &E,
    pixels: &PixelBuffer,
    format: ImageFormat,
    quality: u8,
) -> Vec<u8> {
    match encoder.encode(pixels, format, quality) {
        Ok(bytes) => {
            debug!(
                "Encoded {}x{} {:?} → {} bytes {}",
                pixels.width(),
                pixels.height(),
                pixels.format(),
                bytes.len(),
                format
            );
            bytes
        }
        Err(e) => {
            warn!("{e}; emitting an empty payload");
            Vec::new()
        }
    }
}

/// `image` for PNG and JPEG, libwebp (`webp` feature) for WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncoder;

impl PageEncoder for StandardEncoder {
    fn encode(
        &self,
        pixels: &PixelBuffer,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError> {
        let codec_err = |e: image::ImageError| EncodeError::Codec {
            format,
            detail: e.to_string(),
        };
        let img = to_dynamic_image(pixels).ok_or_else(|| EncodeError::Codec {
            format,
            detail: "pixel buffer shorter than its dimensions".into(),
        })?;

        let mut buf = Vec::new();
        match format {
            ImageFormat::Png => img
                .write_with_encoder(PngEncoder::new(&mut buf))
                .map_err(codec_err)?,
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let img = match img {
                    DynamicImage::ImageLuma8(_) => img,
                    other => DynamicImage::ImageRgb8(other.to_rgb8()),
                };
                img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                    .map_err(codec_err)?
            }
            ImageFormat::Webp => buf = encode_webp(&img, quality)?,
        }
        Ok(buf)
    }
}

#[cfg(feature = "webp")]
fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    // libwebp has no gray mode; gray pages go in as RGB.
    let encoded = match img {
        DynamicImage::ImageLuma8(_) => {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                .encode_simple(true, f32::from(quality))
        }
        _ => {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode_simple(true, f32::from(quality))
        }
    };
    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| EncodeError::Codec {
            format: ImageFormat::Webp,
            detail: format!("{e:?}"),
        })
}

#[cfg(not(feature = "webp"))]
fn encode_webp(_img: &DynamicImage, _quality: u8) -> Result<Vec<u8>, EncodeError> {
    Err(EncodeError::Unsupported(ImageFormat::Webp))
}

/// View a pixel buffer as an `image` crate image with a matching channel
/// count: Gray8 → Luma8, Bgra8 → Rgba8.
fn to_dynamic_image(pixels: &PixelBuffer) -> Option<DynamicImage> {
    let (w, h) = (pixels.width(), pixels.height());
    match pixels.format() {
        PixelFormat::Gray8 => {
            let raw: Vec<u8> = pixels.rows().flatten().copied().collect();
            GrayImage::from_raw(w, h, raw).map(DynamicImage::ImageLuma8)
        }
        PixelFormat::Bgra8 => {
            let mut raw = Vec::with_capacity(w as usize * h as usize * 4);
            for row in pixels.rows() {
                for bgra in row.chunks_exact(4) {
                    raw.extend_from_slice(&[bgra[2], bgra[1], bgra[0], bgra[3]]);
                }
            }
            RgbaImage::from_raw(w, h, raw).map(DynamicImage::ImageRgba8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingEncoder;

    impl PageEncoder for RefusingEncoder {
        fn encode(&self, _: &PixelBuffer, format: ImageFormat, _: u8) -> Result<Vec<u8>, EncodeError> {
            Err(EncodeError::Unsupported(format))
        }
    }

    fn white(format: PixelFormat) -> PixelBuffer {
        PixelBuffer::new_white(17, 9, format).unwrap()
    }

    #[test]
    fn png_of_white_buffer_decodes_to_white() {
        for format in [PixelFormat::Gray8, PixelFormat::Bgra8] {
            let bytes = encode_page(&StandardEncoder, &white(format), ImageFormat::Png, 100);
            let decoded = image::load_from_memory(&bytes).expect("valid png").to_rgba8();
            assert_eq!(decoded.dimensions(), (17, 9));
            assert!(decoded.pixels().all(|p| p.0 == [255, 255, 255, 255]));
        }
    }

    #[test]
    fn png_keeps_channel_count() {
        let gray = encode_page(&StandardEncoder, &white(PixelFormat::Gray8), ImageFormat::Png, 100);
        let img = image::load_from_memory(&gray).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);

        let color = encode_page(&StandardEncoder, &white(PixelFormat::Bgra8), ImageFormat::Png, 100);
        let img = image::load_from_memory(&color).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgba8);
    }

    #[test]
    fn bgra_is_swizzled_to_rgba() {
        let mut buffer = PixelBuffer::new_white(1, 1, PixelFormat::Bgra8).unwrap();
        buffer.as_bytes_mut().copy_from_slice(&[10, 20, 30, 255]);
        let bytes = encode_page(&StandardEncoder, &buffer, ImageFormat::Png, 100);
        let px = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(px.get_pixel(0, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn jpeg_encodes_color_and_gray() {
        for format in [PixelFormat::Gray8, PixelFormat::Bgra8] {
            let bytes = encode_page(&StandardEncoder, &white(format), ImageFormat::Jpeg, 80);
            assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        }
    }

    #[cfg(feature = "webp")]
    #[test]
    fn webp_output_is_riff_container() {
        for format in [PixelFormat::Gray8, PixelFormat::Bgra8] {
            let bytes = encode_page(&StandardEncoder, &white(format), ImageFormat::Webp, 50);
            assert_eq!(&bytes[..4], b"RIFF");
            assert_eq!(&bytes[8..12], b"WEBP");
        }
    }

    /// BGRA buffer with a different colour in every pixel.
    fn pattern(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::new_white(width, height, PixelFormat::Bgra8).unwrap();
        for (i, px) in buffer.as_bytes_mut().chunks_exact_mut(4).enumerate() {
            let i = i as u32;
            px.copy_from_slice(&[
                (i * 37 % 251) as u8,
                (i * 11 % 241) as u8,
                (i * 59 % 239) as u8,
                255,
            ]);
        }
        buffer
    }

    #[cfg(feature = "webp")]
    #[test]
    fn webp_is_lossless_even_at_lowest_quality() {
        let buffer = pattern(16, 8);
        let bytes = encode_page(&StandardEncoder, &buffer, ImageFormat::Webp, 1);
        let decoded = webp::Decoder::new(&bytes).decode().expect("valid webp");
        assert_eq!((decoded.width(), decoded.height()), (16, 8));

        let channels = if decoded.is_alpha() { 4 } else { 3 };
        let expected: Vec<u8> = buffer
            .as_bytes()
            .chunks_exact(4)
            .flat_map(|bgra| [bgra[2], bgra[1], bgra[0], bgra[3]].into_iter().take(channels))
            .collect();
        assert_eq!(&*decoded, expected.as_slice());
    }

    #[test]
    fn jpeg_quality_controls_size() {
        let buffer = pattern(64, 64);
        let low = encode_page(&StandardEncoder, &buffer, ImageFormat::Jpeg, 5);
        let high = encode_page(&StandardEncoder, &buffer, ImageFormat::Jpeg, 95);
        assert!(!low.is_empty());
        assert!(
            low.len() < high.len(),
            "q5 = {} bytes, q95 = {} bytes",
            low.len(),
            high.len()
        );
    }

    #[cfg(not(feature = "webp"))]
    #[test]
    fn webp_without_feature_is_empty() {
        let bytes = encode_page(&StandardEncoder, &white(PixelFormat::Bgra8), ImageFormat::Webp, 50);
        assert!(bytes.is_empty());
    }

    #[test]
    fn unsupported_format_yields_empty_payload() {
        let bytes = encode_page(&RefusingEncoder, &white(PixelFormat::Bgra8), ImageFormat::Png, 100);
        assert!(bytes.is_empty());
    }
}
