//! Pipeline stages for PDF-to-HTML / PDF-to-images conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raster ──▶ encode ──▶ markup ──▶ minify
//! (path/URL) (pixels)  (png/webp/jpeg)  (HTML)   (smaller HTML)
//!                         │
//!                         └──▶ image list
//! ```
//!
//! 1. [`input`]  — read a local file or download a URL into memory
//! 2. [`raster`] — size, allocate and paint one page's pixel buffer
//! 3. [`encode`] — turn a pixel buffer into encoded image bytes
//! 4. [`markup`] — embed encoded pages into a self-contained HTML document
//! 5. [`minify`] — shrink the HTML; failure falls back to the original

pub mod encode;
pub mod input;
pub mod markup;
pub mod minify;
pub mod raster;
