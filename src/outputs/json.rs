//! JSON hand-off for downstream generation and publishing.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     └── evening.json
//! ```
//!
//! A rerun of the same edition overwrites its file.

use crate::models::Digest;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path the digest is written to: `{json_output_dir}/{date}/{edition}.json`.
pub fn digest_path(digest: &Digest, json_output_dir: &str) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(&digest.local_date)
        .join(format!("{}.json", digest.edition))
}

/// Serialize `digest` and write it under `json_output_dir`.
///
/// # Arguments
///
/// * `digest` - Ranked articles plus the date and edition they belong to
/// * `json_output_dir` - Root directory; the date subdirectory is created
///
/// # Returns
///
/// The path written, as given by [`digest_path`].
///
/// # Errors
///
/// Returns an error if the digest cannot be serialized or written to disk.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_digest(digest: &Digest, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;
    let path = digest_path(digest, json_output_dir);

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = digest.articles.len(), "Wrote digest JSON");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateRecord;
    use chrono::Utc;

    fn digest() -> Digest {
        Digest {
            local_date: "2025-05-06".to_string(),
            edition: "evening".to_string(),
            local_time: "19:30:00".to_string(),
            hours_back: 48,
            articles: vec![CandidateRecord::new(
                "生成AIの話題",
                "https://example.com/a",
                "要約",
                "ITmedia AI+",
                Utc::now(),
            )],
        }
    }

    #[test]
    fn test_digest_path() {
        let path = digest_path(&digest(), "/tmp/out");
        assert_eq!(path, PathBuf::from("/tmp/out/2025-05-06/evening.json"));
    }

    #[tokio::test]
    async fn test_write_digest_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let path = write_digest(&digest(), dir).await.unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let back: Digest = serde_json::from_str(&written).unwrap();
        assert_eq!(back.articles.len(), 1);
        assert_eq!(back.articles[0].title, "生成AIの話題");
    }
}
