//! Markup minification.
//!
//! The converter treats the minifier as optional polish: any
//! [`MinifyError`] is logged and the original markup is returned instead.
//!
//! [`WhitespaceMinifier`] applies three regex rules, in order:
//!
//! 1. Drop HTML comments
//! 2. Remove whitespace between tags
//! 3. Collapse remaining whitespace runs to a single space
//!
//! Rule 3 would corrupt whitespace-sensitive elements, so markup that
//! contains them is refused rather than rewritten.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinifyError {
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("whitespace-sensitive <{0}> element present")]
    WhitespaceSensitive(String),

    #[error("{0}")]
    Other(String),
}

/// Returns a smaller, equivalent document or an error.
pub trait MarkupMinifier {
    fn minify(&self, markup: &str) -> Result<String, MinifyError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceMinifier;

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_BETWEEN_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s+<").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}|[\t\r\n]").unwrap());
static RE_SENSITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(pre|textarea|script)[\s>]").unwrap());

impl MarkupMinifier for WhitespaceMinifier {
    fn minify(&self, markup: &str) -> Result<String, MinifyError> {
        if let Some(caps) = RE_SENSITIVE.captures(markup) {
            return Err(MinifyError::WhitespaceSensitive(caps[1].to_ascii_lowercase()));
        }

        let without_comments = RE_COMMENT.replace_all(markup, "");
        if let Some(pos) = without_comments.find("<!--") {
            return Err(MinifyError::UnterminatedComment(pos));
        }

        let tight = RE_BETWEEN_TAGS.replace_all(&without_comments, "><");
        let collapsed = RE_WHITESPACE.replace_all(&tight, " ");
        Ok(collapsed.trim().to_string())
    }
}
