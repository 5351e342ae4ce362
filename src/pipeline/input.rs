//! Input resolution: a user-supplied path or URL → PDF bytes in memory.
//!
//! The converter works on byte slices, so both local files and downloads
//! are read fully into memory. The `%PDF` magic is checked here so a wrong
//! file produces [`ConvertError::NotAPdf`] with the offending bytes instead
//! of a generic open failure later on.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bytes of a resolved input, plus a name usable for output files.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub bytes: Vec<u8>,
    /// File stem of the path or of the URL's last segment, if any.
    pub stem: Option<String>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read the input string as a local path or download it as a URL.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<LoadedInput, ConvertError> {
    if path.as_os_str().is_empty() {
        return Err(ConvertError::InvalidInput {
            input: String::new(),
        });
    }
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    check_magic(&bytes, &path.display().to_string())?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(LoadedInput {
        bytes,
        stem: file_stem(path),
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, ConvertError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let stem = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments()?.next_back().map(PathBuf::from))
        .and_then(|last| file_stem(&last));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| failed(e.to_string()))?
        .to_vec();
    check_magic(&bytes, url)?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedInput { bytes, stem })
}

fn check_magic(bytes: &[u8], source_name: &str) -> Result<(), ConvertError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(ConvertError::NotAPdf {
            source_name: source_name.to_string(),
            magic,
        });
    }
    Ok(())
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}
