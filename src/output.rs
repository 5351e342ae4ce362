//! Conversion results and helpers to write them to disk.

use crate::config::ImageFormat;
use crate::error::ConvertError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One encoded page in image-list mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    /// Encoded image; empty when the encoder could not produce the format.
    pub bytes: Vec<u8>,
    /// Media type, e.g. `image/webp`.
    pub mime: String,
    /// `{base}_page-{NNN}.{ext}`, NNN 1-based and zero-padded to three digits.
    pub file_name: String,
}

impl ImageResult {
    pub fn new(base_name: &str, page_index: usize, format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: format.mime_type().to_string(),
            file_name: page_file_name(base_name, page_index, format),
        }
    }
}

/// File name for the page at 0-based `page_index`.
pub fn page_file_name(base_name: &str, page_index: usize, format: ImageFormat) -> String {
    format!("{}_page-{:03}.{}", base_name, page_index + 1, format.extension())
}

/// Serializable summary of an image list (no payloads).
#[derive(Debug, Clone, Serialize)]
pub struct ImageManifest {
    pub images: Vec<ManifestEntry>,
    pub total_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub mime: String,
    pub size: usize,
}

impl ImageManifest {
    pub fn from_images(images: &[ImageResult]) -> Self {
        let images: Vec<ManifestEntry> = images
            .iter()
            .map(|img| ManifestEntry {
                file_name: img.file_name.clone(),
                mime: img.mime.clone(),
                size: img.bytes.len(),
            })
            .collect();
        let total_bytes = images.iter().map(|e| e.size).sum();
        Self {
            images,
            total_bytes,
        }
    }
}

/// Write `markup` to `path` atomically (temp file in the same directory,
/// then rename), creating parent directories as needed.
pub fn write_markup_file(path: &Path, markup: &str) -> Result<(), ConvertError> {
    let write_err = |source| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(markup.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes of HTML to {}", markup.len(), path.display());
    Ok(())
}

/// Write each image into `dir` under its generated file name.
pub fn write_image_files(dir: &Path, images: &[ImageResult]) -> Result<Vec<PathBuf>, ConvertError> {
    std::fs::create_dir_all(dir).map_err(|source| ConvertError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    images
        .iter()
        .map(|img| {
            let path = dir.join(&img.file_name);
            std::fs::write(&path, &img.bytes).map_err(|source| {
                ConvertError::OutputWriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_one_based_and_padded() {
        assert_eq!(page_file_name("doc", 0, ImageFormat::Webp), "doc_page-001.webp");
        assert_eq!(page_file_name("scan", 41, ImageFormat::Jpeg), "scan_page-042.jpg");
        assert_eq!(page_file_name("big", 1233, ImageFormat::Png), "big_page-1234.png");
    }

    #[test]
    fn manifest_sums_sizes() {
        let images = vec![
            ImageResult::new("doc", 0, ImageFormat::Png, vec![0; 10]),
            ImageResult::new("doc", 1, ImageFormat::Png, vec![0; 5]),
        ];
        let manifest = ImageManifest::from_images(&images);
        assert_eq!(manifest.total_bytes, 15);
        assert_eq!(manifest.images[1].file_name, "doc_page-002.png");
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"mime\":\"image/png\""));
    }

    #[test]
    fn markup_file_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.html");
        write_markup_file(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        // Only the target remains; the temp file was renamed onto it.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn image_files_land_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![ImageResult::new("a", 0, ImageFormat::Jpeg, vec![1, 2, 3])];
        let paths = write_image_files(dir.path(), &images).unwrap();
        assert_eq!(paths, vec![dir.path().join("a_page-001.jpg")]);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![1, 2, 3]);
    }
}
