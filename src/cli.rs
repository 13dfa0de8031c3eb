//! Command-line interface definitions.
//!
//! Every option can also come from the environment (or a `.env` file).

use clap::Parser;
use std::path::PathBuf;

/// Collect and rank recent AI news into a digest.
///
/// # Examples
///
/// ```sh
/// # Five best articles from the last 48 hours, printed only
/// ai_news_digest
///
/// # Three articles from the last day, written as JSON
/// ai_news_digest -n 3 --hours 24 -j ./json
///
/// # Custom source list, no network (fallback set only)
/// ai_news_digest -s sources.yaml --offline
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Maximum number of articles in the digest
    #[arg(short = 'n', long, env = "NEWS_LIMIT", default_value_t = 5,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub limit: u16,

    /// Recency window in hours
    #[arg(long, env = "NEWS_HOURS_BACK", default_value_t = 48,
          value_parser = clap::value_parser!(i64).range(1..=8760))]
    pub hours: i64,

    /// YAML source registry replacing the built-in sources
    #[arg(short, long, env = "NEWS_SOURCES_PATH")]
    pub sources: Option<PathBuf>,

    /// Output directory for the JSON digest
    #[arg(short, long, env = "NEWS_JSON_OUTPUT_DIR")]
    pub json_output_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "NEWS_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Skip all network requests and use the fallback set
    #[arg(long)]
    pub offline: bool,
}
