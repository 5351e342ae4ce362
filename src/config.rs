//! Request types for page rasterisation.
//!
//! Every knob of a conversion lives in [`ConversionRequest`]. It is plain
//! data: cloneable, serialisable, and never mutated by the pipeline. Build
//! one with [`ConversionRequest::builder()`] or start from
//! [`ConversionRequest::default()`].

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parameters for one conversion call.
///
/// # Example
/// ```rust
/// use edgequake_pdf2html::{ConversionRequest, ImageFormat};
///
/// let request = ConversionRequest::builder()
///     .dpi(200)
///     .format(ImageFormat::Jpeg)
///     .quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(request.dpi, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionRequest {
    /// Rendering resolution in pixels per inch. Default: 144.
    ///
    /// A page of `w` points becomes `ceil(w * dpi / 72)` pixels wide, so 72
    /// reproduces the page at one pixel per point and 144 doubles it.
    pub dpi: u32,

    /// Encoder quality, 1–100. Default: 100.
    ///
    /// JPEG: visual fidelity. WebP (always lossless here): compression
    /// effort. PNG: ignored.
    pub quality: u8,

    /// Output image format. Default: [`ImageFormat::Webp`].
    pub format: ImageFormat,

    /// Render single-channel gray instead of BGRA colour. Default: false.
    pub grayscale: bool,

    /// Prefix for generated file names in image-list mode. `None` means `"doc"`.
    pub base_name: Option<String>,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self {
            dpi: 144,
            quality: 100,
            format: ImageFormat::default(),
            grayscale: false,
            base_name: None,
        }
    }
}

impl ConversionRequest {
    /// Create a new builder for `ConversionRequest`.
    pub fn builder() -> ConversionRequestBuilder {
        ConversionRequestBuilder {
            request: Self::default(),
        }
    }

    /// Check the numeric ranges. Requests assembled field by field skip the
    /// builder, so the converter calls this again before doing any work.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.dpi == 0 {
            return Err(ConvertError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "Quality must be 1–100, got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// File-name prefix for image-list results.
    pub fn base_name(&self) -> &str {
        self.base_name.as_deref().unwrap_or("doc")
    }
}

/// Builder for [`ConversionRequest`].
#[derive(Debug)]
pub struct ConversionRequestBuilder {
    request: ConversionRequest,
}

impl ConversionRequestBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.request.dpi = dpi.max(1);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.request.quality = quality.clamp(1, 100);
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.request.format = format;
        self
    }

    pub fn grayscale(mut self, v: bool) -> Self {
        self.request.grayscale = v;
        self
    }

    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        self.request.base_name = Some(name.into());
        self
    }

    /// Build the request, validating constraints.
    pub fn build(self) -> Result<ConversionRequest, ConvertError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoded image format for rendered pages.
///
/// | Format | Extension | Media type   | Lossless |
/// |--------|-----------|--------------|----------|
/// | PNG    | `png`     | `image/png`  | yes      |
/// | WebP   | `webp`    | `image/webp` | yes      |
/// | JPEG   | `jpg`     | `image/jpeg` | no       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[default]
    Webp,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn is_lossless(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Webp => "WebP",
            ImageFormat::Jpeg => "JPEG",
        })
    }
}

impl FromStr for ImageFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(ConvertError::InvalidConfig(format!(
                "Unknown image format '{other}' (expected png, webp or jpeg)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let r = ConversionRequest::default();
        assert_eq!(r.dpi, 144);
        assert_eq!(r.quality, 100);
        assert_eq!(r.format, ImageFormat::Webp);
        assert!(!r.grayscale);
        assert_eq!(r.base_name(), "doc");
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let r = ConversionRequest::builder()
            .dpi(0)
            .quality(0)
            .build()
            .unwrap();
        assert_eq!(r.dpi, 1);
        assert_eq!(r.quality, 1);

        let r = ConversionRequest::builder().quality(250).build().unwrap();
        assert_eq!(r.quality, 100);
    }

    #[test]
    fn validate_rejects_hand_built_requests() {
        let r = ConversionRequest {
            dpi: 0,
            ..ConversionRequest::default()
        };
        assert!(matches!(r.validate(), Err(ConvertError::InvalidConfig(_))));

        let r = ConversionRequest {
            quality: 101,
            ..ConversionRequest::default()
        };
        assert!(matches!(r.validate(), Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn format_extension_and_mime() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Webp.extension(), "webp");
        assert_eq!(ImageFormat::Webp.mime_type(), "image/webp");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert!(ImageFormat::Webp.is_lossless());
        assert!(!ImageFormat::Jpeg.is_lossless());
    }

    #[test]
    fn format_from_str() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(" jpeg ".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn request_deserialises_with_defaults() {
        let r: ConversionRequest =
            serde_json::from_str(r#"{"format":"jpeg","base_name":"report"}"#).unwrap();
        assert_eq!(r.format, ImageFormat::Jpeg);
        assert_eq!(r.dpi, 144);
        assert_eq!(r.base_name(), "report");
    }
}
