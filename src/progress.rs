//! Progress-callback trait for per-page conversion events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::convert::Converter::with_progress`] to follow a conversion page
//! by page, e.g. to drive a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2html::{ConversionProgressCallback, Converter};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, encoded_len);
//!     }
//! }
//!
//! let converter = Converter::new().with_progress(Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! }));
//! ```

use std::sync::Arc;

/// Called by the converter as it processes each page.
///
/// All methods have no-op defaults. Events arrive in page order on the
/// thread running the conversion, while the backend lock is held, so keep
/// implementations short.
///
/// # Deadlock
///
/// The lock is not re-entrant. A callback must not start another conversion
/// or call [`BackendRegistry::init_count`](crate::BackendRegistry::init_count):
/// both wait for the lock the calling conversion holds and never return.
/// Hand such work to another thread and let it run after the conversion ends.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the document is open, before any page is rendered.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page was rendered and encoded.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in the document
    /// * `encoded_len` — size of the encoded image (0 when the format
    ///   could not be produced)
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_num, total_pages, encoded_len);
    }

    /// Called when a page is skipped because it could not be loaded or
    /// painted.
    fn on_page_skipped(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after the last page.
    ///
    /// # Arguments
    /// * `total_pages` — pages in the document
    /// * `produced`    — pages that made it into the output
    fn on_conversion_complete(&self, total_pages: usize, produced: usize) {
        let _ = (total_pages, produced);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared callback handle as stored by the converter.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        completes: AtomicUsize,
        skips: AtomicUsize,
        produced: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _encoded_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_skipped(&self, _page_num: usize, _total_pages: usize) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total_pages: usize, produced: usize) {
            self.produced.store(produced, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_skipped(2, 5);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let tracker = TrackingCallback::default();
        let cb: &dyn ConversionProgressCallback = &tracker;
        cb.on_conversion_start(3);
        cb.on_page_complete(1, 3, 100);
        cb.on_page_skipped(2, 3);
        cb.on_page_complete(3, 3, 80);
        cb.on_conversion_complete(3, 2);

        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.produced.load(Ordering::SeqCst), 2);
    }
}
