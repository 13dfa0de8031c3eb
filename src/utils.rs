//! Utility functions for edition naming, log-friendly truncation and output
//! directory checks.

use chrono::{Local, NaiveTime, Timelike};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Classify a local time into the digest edition.
///
/// Posts go out twice a day, so there are two editions:
/// - **morning**: 05:00 - 12:00
/// - **evening**: everything else
pub fn edition_for(time: NaiveTime) -> &'static str {
    if (5..12).contains(&time.hour()) {
        "morning"
    } else {
        "evening"
    }
}

/// Edition for the current local time.
#[instrument]
pub fn edition() -> String {
    let tod = Local::now().time();
    let which = edition_for(tod);
    tracing::debug!(%tod, %which, "Computed edition");
    which.to_string()
}

/// Truncate a string to `max` characters for logs and listings.
///
/// Longer strings get `"…"` appended. Counting is by character, so
/// Japanese titles never split inside a code point.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("人工知能ニュース", 4), "人工知能…");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        assert_eq!(truncate_for_log("人工知能ニュース", 4), "人工知能…");
        let s = "a".repeat(500);
        assert_eq!(truncate_for_log(&s, 100).chars().count(), 101);
    }

    #[test]
    fn test_edition_boundaries() {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(edition_for(at(4, 59)), "evening");
        assert_eq!(edition_for(at(5, 0)), "morning");
        assert_eq!(edition_for(at(7, 30)), "morning");
        assert_eq!(edition_for(at(11, 59)), "morning");
        assert_eq!(edition_for(at(12, 0)), "evening");
        assert_eq!(edition_for(at(19, 30)), "evening");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let nested = nested.to_str().unwrap();
        ensure_writable_dir(nested).await.unwrap();
        assert!(std::path::Path::new(nested).is_dir());
    }
}
