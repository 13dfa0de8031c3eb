//! Shared text cleaning for both fetchers.
//!
//! Feed entries and scraped containers carry markup, entities, full-width
//! spaces and stray zero-width characters. Everything that becomes a title or
//! summary goes through [`clean_text`] first.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Number of leading title characters hashed for URL-less identity.
pub const TITLE_HASH_PREFIX_CHARS: usize = 30;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup, decode entities, collapse whitespace and drop control and
/// zero-width format characters.
///
/// ```ignore
/// assert_eq!(clean_text("<b>生成AI</b>&nbsp;の\u{3000}最新  動向\n"), "生成AI の 最新 動向");
/// ```
pub fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let stripped = RE_TAGS.replace_all(&decoded, "");

    let visible: String = stripped
        .chars()
        .map(|c| match c {
            '\u{3000}' | '\u{00A0}' => ' ',
            _ => c,
        })
        .filter(|c| c.is_whitespace() || !(c.is_control() || is_format_char(*c)))
        .collect();

    RE_WS.replace_all(&visible, " ").trim().to_string()
}

fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' | '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Canonical form of a URL for identity comparison.
///
/// Parseable URLs lose their fragment and get the `url` crate's scheme/host
/// normalization; anything else is compared as trimmed text.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Fixed-length hash of the first [`TITLE_HASH_PREFIX_CHARS`] characters of a title.
pub fn title_hash(title: &str) -> String {
    let prefix = truncate_chars(title, TITLE_HASH_PREFIX_CHARS);
    format!("{:x}", Sha256::digest(prefix.as_bytes()))
}
