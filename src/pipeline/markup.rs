//! HTML assembly: one self-contained document, one inline image per page.
//!
//! Images are embedded as base64 `data:` URIs so the output is a single
//! file with no external references. The skeleton is fixed: UTF-8,
//! responsive viewport, a few style rules that centre each page image and
//! cap it at the container width, and lazy/async decoding hints so long
//! documents open quickly.

use base64::{engine::general_purpose::STANDARD, Engine as _};

const HEAD: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html>\n",
    "<head>\n",
    "<meta charset=\"utf-8\">\n",
    "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    "<style>\n",
    "  html, body { margin: 0; padding: 0; }\n",
    "  img { display: block; margin: 0 auto; max-width: 100%; height: auto; }\n",
    "</style>\n",
    "</head>\n",
    "<body>\n",
);

const TAIL: &str = "</body>\n</html>\n";

/// Accumulates page images into the HTML skeleton.
#[derive(Debug)]
pub struct MarkupBuilder {
    html: String,
    pages: usize,
}

impl Default for MarkupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupBuilder {
    pub fn new() -> Self {
        Self {
            html: String::from(HEAD),
            pages: 0,
        }
    }

    /// Append page `page_num` (1-based) as an inline `<img>`.
    pub fn push_page(&mut self, page_num: usize, mime: &str, bytes: &[u8]) {
        // base64 grows by 4/3; reserve before encoding in place.
        self.html.reserve(bytes.len() / 3 * 4 + 160);
        self.html.push_str("<img loading=\"lazy\" decoding=\"async\" alt=\"Page ");
        self.html.push_str(&page_num.to_string());
        self.html.push_str("\" src=\"data:");
        self.html.push_str(mime);
        self.html.push_str(";base64,");
        STANDARD.encode_string(bytes, &mut self.html);
        self.html.push_str("\">\n");
        self.pages += 1;
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn finish(mut self) -> String {
        self.html.push_str(TAIL);
        self.html
    }
}
