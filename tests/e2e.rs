//! End-to-end tests against the real pdfium library.
//!
//! The PDFs are generated in memory, so no fixtures are needed, but pdfium
//! must be available (it is downloaded on first use if not cached). The
//! tests are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! To use an existing library:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e

use edgequake_pdf2html::{
    to_image_list, to_markup_document, BackendRegistry, ConversionRequest, ConvertError,
    ImageFormat,
};
use std::fmt::Write as _;
use std::sync::Once;
use std::thread;

// ── Test helpers ─────────────────────────────────────────────────────────────

static INIT: Once = Once::new();

/// Install a subscriber once per test binary; `RUST_LOG` overrides `info`.
fn init_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Skip this test if E2E_ENABLED is not set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
    }};
}

/// A PDF of empty pages, one per `(width_pt, height_pt)`, with a correct
/// cross-reference table.
fn blank_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let mut objects = Vec::new();
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", i + 3)).collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));
    for (w, h) in pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        writeln!(pdf, "{} 0 obj\n{}\nendobj", i + 1, body).unwrap();
    }
    let xref = pdf.len();
    writeln!(pdf, "xref\n0 {}\n0000000000 65535 f ", objects.len() + 1).unwrap();
    for offset in offsets {
        writeln!(pdf, "{offset:010} 00000 n ").unwrap();
    }
    write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    )
    .unwrap();
    pdf.into_bytes()
}

fn request(format: ImageFormat, dpi: u32, grayscale: bool) -> ConversionRequest {
    ConversionRequest::builder()
        .format(format)
        .dpi(dpi)
        .grayscale(grayscale)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn blank_letter_page_renders_white_at_72_dpi() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(612, 792)]);

    let images = to_image_list(&pdf, &request(ImageFormat::Png, 72, false)).unwrap();

    assert_eq!(images.len(), 1);
    let decoded = image::load_from_memory(&images[0].bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (612, 792));
    assert!(
        decoded.pixels().all(|p| p.0 == [255, 255, 255, 255]),
        "blank page must be pure white"
    );
    assert_eq!(BackendRegistry::global().init_count(), 0);
}

#[test]
fn dpi_scales_pixel_dimensions() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(612, 792), (595, 842)]);

    let images = to_image_list(&pdf, &request(ImageFormat::Png, 144, false)).unwrap();

    let dims: Vec<_> = images
        .iter()
        .map(|img| image::load_from_memory(&img.bytes).unwrap())
        .map(|img| (img.width(), img.height()))
        .collect();
    assert_eq!(dims, [(1224, 1584), (1190, 1684)]);
}

#[test]
fn grayscale_png_is_single_channel() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(200, 100)]);

    let images = to_image_list(&pdf, &request(ImageFormat::Png, 72, true)).unwrap();

    let decoded = image::load_from_memory(&images[0].bytes).unwrap();
    assert_eq!(decoded.color(), image::ColorType::L8);
    assert!(decoded.to_luma8().pixels().all(|p| p.0 == [255]));
}

#[test]
fn jpeg_and_webp_payloads_have_their_signatures() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(100, 100)]);

    let jpeg = to_image_list(&pdf, &request(ImageFormat::Jpeg, 72, false)).unwrap();
    assert!(jpeg[0].bytes.starts_with(&[0xFF, 0xD8]));
    assert_eq!(jpeg[0].file_name, "doc_page-001.jpg");

    let webp = to_image_list(&pdf, &request(ImageFormat::Webp, 72, false)).unwrap();
    if cfg!(feature = "webp") {
        assert!(webp[0].bytes.starts_with(b"RIFF"));
        assert_eq!(&webp[0].bytes[8..12], b"WEBP");
    } else {
        assert!(webp[0].bytes.is_empty());
    }
}

#[test]
fn markup_document_embeds_each_page() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(300, 300), (300, 300), (300, 300)]);

    let html = to_markup_document(&pdf, &request(ImageFormat::Png, 72, false)).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("src=\"data:image/png;base64,").count(), 3);
    assert!(html.contains("alt=\"Page 3\""));
}

#[test]
fn garbage_bytes_fail_to_open() {
    e2e_skip_unless_enabled!();
    let err = to_markup_document(b"this is not a pdf", &ConversionRequest::default()).unwrap_err();
    assert!(matches!(err, ConvertError::DocumentOpen { .. }), "got {err:?}");
    assert_eq!(BackendRegistry::global().init_count(), 0);
}

#[test]
fn parallel_callers_all_succeed() {
    e2e_skip_unless_enabled!();
    let pdf = blank_pdf(&[(100, 100), (100, 100)]);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pdf = pdf.clone();
            thread::spawn(move || to_image_list(&pdf, &request(ImageFormat::Png, 72, false)))
        })
        .collect();

    for handle in handles {
        let images = handle.join().unwrap().unwrap();
        assert_eq!(images.len(), 2);
    }
    assert_eq!(BackendRegistry::global().init_count(), 0);
}
