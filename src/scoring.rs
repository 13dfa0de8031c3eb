//! Fixed additive scoring rule.
//!
//! | Signal | Points |
//! |--------|--------|
//! | each [`HIGH_SIGNAL_KEYWORDS`] entry found in the title | +10 |
//! | source name contains a [`TRUSTED_OUTLETS`] entry | +5 |
//! | summary longer than [`LONG_SUMMARY_CHARS`] characters | +3 |
//! | URL present with an `http`/`https` scheme | +2 |
//!
//! [`score`] is pure: the same record always gets the same score, and
//! scores are recomputed on every run.
//!
//! [`TRUSTED_OUTLETS`]: crate::keywords::TRUSTED_OUTLETS

use crate::keywords::{HIGH_SIGNAL_KEYWORDS, is_trusted_outlet};
use crate::models::CandidateRecord;
use url::Url;

pub const KEYWORD_POINTS: u32 = 10;
pub const TRUSTED_OUTLET_POINTS: u32 = 5;
pub const LONG_SUMMARY_POINTS: u32 = 3;
pub const VALID_URL_POINTS: u32 = 2;

/// Summaries strictly longer than this many characters earn [`LONG_SUMMARY_POINTS`].
pub const LONG_SUMMARY_CHARS: usize = 100;

fn has_web_scheme(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

pub fn score(record: &CandidateRecord) -> u32 {
    let keyword_hits = HIGH_SIGNAL_KEYWORDS
        .iter()
        .filter(|keyword| record.title.contains(*keyword))
        .count() as u32;

    let mut total = keyword_hits * KEYWORD_POINTS;
    if is_trusted_outlet(&record.source_name) {
        total += TRUSTED_OUTLET_POINTS;
    }
    if record.summary.chars().count() > LONG_SUMMARY_CHARS {
        total += LONG_SUMMARY_POINTS;
    }
    if record.has_url() && has_web_scheme(&record.url) {
        total += VALID_URL_POINTS;
    }
    total
}
