//! # pdfium-provision
//!
//! Finds a usable PDFium shared library for `pdfium-render` and binds it.
//!
//! Resolution order, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH`: an explicit library file.
//! 2. The per-version cache directory (see [`cache_dir`]).
//! 3. A download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    unpacked into the cache directory.
//!
//! ```rust,no_run
//! let path = pdfium_provision::ensure_library(None)?;
//! let pdfium = pdfium_provision::bind(&path)?;
//! # Ok::<(), pdfium_provision::ProvisionError>(())
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag (`chromium/{PDFIUM_VERSION}`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Environment variable naming an existing library file.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PDFIUM_PROVISION_CACHE_DIR";

/// Download progress: `(bytes_so_far, content_length)`.
pub type ProgressFn<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("No PDFium build is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloading PDFium failed: {0}")]
    Download(String),

    #[error("Unpacking PDFium failed: {0}")]
    Unpack(String),

    #[error("Cannot bind PDFium at '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Release asset layout for one OS/arch pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub archive: &'static str,
    pub member: &'static str,
    pub file_name: &'static str,
}

impl Platform {
    const fn new(archive: &'static str, file_name: &'static str, member: &'static str) -> Self {
        Self {
            archive,
            member,
            file_name,
        }
    }

    /// The platform this process runs on.
    pub fn current() -> Result<Self, ProvisionError> {
        Self::lookup(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn lookup(os: &str, arch: &str) -> Result<Self, ProvisionError> {
        let platform = match (os, arch) {
            ("macos", "aarch64") => {
                Self::new("pdfium-mac-arm64.tgz", "libpdfium.dylib", "lib/libpdfium.dylib")
            }
            ("macos", "x86_64") => {
                Self::new("pdfium-mac-x64.tgz", "libpdfium.dylib", "lib/libpdfium.dylib")
            }
            ("linux", "x86_64") => {
                Self::new("pdfium-linux-x64.tgz", "libpdfium.so", "lib/libpdfium.so")
            }
            ("linux", "aarch64") => {
                Self::new("pdfium-linux-arm64.tgz", "libpdfium.so", "lib/libpdfium.so")
            }
            ("windows", "x86_64") => Self::new("pdfium-win-x64.tgz", "pdfium.dll", "bin/pdfium.dll"),
            ("windows", "aarch64") => {
                Self::new("pdfium-win-arm64.tgz", "pdfium.dll", "bin/pdfium.dll")
            }
            ("windows", "x86") => Self::new("pdfium-win-x86.tgz", "pdfium.dll", "bin/pdfium.dll"),
            _ => {
                return Err(ProvisionError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(platform)
    }

    fn download_url(&self) -> String {
        format!("{RELEASES_URL}/chromium%2F{PDFIUM_VERSION}/{}", self.archive)
    }
}

/// Per-version cache directory.
///
/// `{CACHE_DIR_ENV}/pdfium-{VERSION}` when the override is set, otherwise
/// `{platform cache dir}/pdf2html/pdfium-{VERSION}`.
pub fn cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    match std::env::var_os(CACHE_DIR_ENV) {
        Some(root) => PathBuf::from(root).join(versioned),
        None => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("pdf2html")
            .join(versioned),
    }
}

/// Where the library would come from without touching the network.
///
/// `None` means [`ensure_library`] has to download it.
pub fn local_library() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(LIB_PATH_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Some(path);
        }
    }
    let platform = Platform::current().ok()?;
    let cached = cache_dir().join(platform.file_name);
    cached.is_file().then_some(cached)
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Returns a path to the PDFium library, downloading it on first use.
///
/// Once resolved the path is memoised for the process.
pub fn ensure_library(on_progress: Option<ProgressFn<'_>>) -> Result<PathBuf, ProvisionError> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }
    let path = match local_library() {
        Some(path) => path,
        None => download_into_cache(on_progress)?,
    };
    Ok(RESOLVED.get_or_init(|| path).clone())
}

/// Loads the library at `path` and initialises a [`Pdfium`] instance.
///
/// Dropping the returned value tears the library down again.
pub fn bind(path: &Path) -> Result<Pdfium, ProvisionError> {
    let bindings = Pdfium::bind_to_library(path).map_err(|e| ProvisionError::Bind {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Pdfium::new(bindings))
}

/// [`ensure_library`] followed by [`bind`], without progress reporting.
pub fn bind_default() -> Result<Pdfium, ProvisionError> {
    let path = ensure_library(None)?;
    bind(&path)
}

fn download_into_cache(on_progress: Option<ProgressFn<'_>>) -> Result<PathBuf, ProvisionError> {
    let platform = Platform::current()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| ProvisionError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let archive = fetch(&platform.download_url(), on_progress)?;
    let dest = dir.join(platform.file_name);
    unpack_member(&archive, platform.member, &dest)?;
    Ok(dest)
}

fn fetch(url: &str, on_progress: Option<ProgressFn<'_>>) -> Result<Vec<u8>, ProvisionError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-provision/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProvisionError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| ProvisionError::Download(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(ProvisionError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProvisionError::Download(format!("read {url}: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(report) = on_progress {
            report(body.len() as u64, total);
        }
    }
    Ok(body)
}

/// Writes the single archive entry named `member` to `dest`.
///
/// The entry is extracted into a temp file in `dest`'s directory and renamed
/// over `dest` only once complete, so an interrupted run never leaves a
/// truncated library in the cache.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), ProvisionError> {
    let unpack_err = |e: std::io::Error| ProvisionError::Unpack(format!("{}: {e}", dest.display()));
    let mut tarball = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let entries = tarball
        .entries()
        .map_err(|e| ProvisionError::Unpack(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ProvisionError::Unpack(e.to_string()))?;
        let is_member = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| ProvisionError::Unpack(e.to_string()))?;
        if is_member {
            let dir = match dest.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(unpack_err)?;
            let expected = entry.size();
            let written = std::io::copy(&mut entry, tmp.as_file_mut()).map_err(unpack_err)?;
            if written != expected {
                return Err(ProvisionError::Unpack(format!(
                    "{}: archive ended after {written} of {expected} bytes",
                    dest.display()
                )));
            }
            tmp.as_file().sync_all().map_err(unpack_err)?;
            tmp.persist(dest).map_err(|e| unpack_err(e.error))?;
            return Ok(());
        }
    }

    Err(ProvisionError::Unpack(format!("'{member}' missing from archive")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_platforms_resolve() {
        let linux = Platform::lookup("linux", "x86_64").unwrap();
        assert_eq!(linux.file_name, "libpdfium.so");
        assert!(linux.download_url().ends_with("/chromium%2F7690/pdfium-linux-x64.tgz"));

        let win = Platform::lookup("windows", "x86").unwrap();
        assert_eq!(win.member, "bin/pdfium.dll");
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = Platform::lookup("plan9", "mips").unwrap_err();
        assert!(err.to_string().contains("plan9/mips"));
    }

    #[test]
    fn cache_dir_is_versioned() {
        let dir = cache_dir();
        assert!(dir.ends_with(format!("pdfium-{PDFIUM_VERSION}")));
    }

    #[test]
    fn unpack_reports_missing_member() {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::fast(),
        ));
        let payload = b"not a library";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, "lib/README", &payload[..])
            .unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");
        let err = unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap_err();
        assert!(matches!(err, ProvisionError::Unpack(_)));
        assert!(!dest.exists());
    }

    fn archive_with(name: &str, payload: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::fast(),
        ));
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, name, payload).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn unpack_writes_member_and_leaves_nothing_else() {
        let payload = vec![0x7f; 10_000];
        let archive = archive_with("lib/libpdfium.so", &payload);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");

        unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), payload);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn truncated_archive_never_creates_the_library() {
        let archive = archive_with("lib/libpdfium.so", &vec![0x7f; 100_000]);
        let truncated = &archive[..archive.len() / 2];
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");

        assert!(unpack_member(truncated, "lib/libpdfium.so", &dest).is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
