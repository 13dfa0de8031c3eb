//! # AI News Digest
//!
//! Collects recent AI news from syndication feeds and scraped listing pages,
//! ranks it with a fixed scoring rule, and hands the best few articles to the
//! blog-post generation step as a JSON digest.
//!
//! ## Usage
//!
//! ```sh
//! ai_news_digest -n 3 --hours 48 -j ./json
//! ```
//!
//! ## Architecture
//!
//! The application follows a staged pipeline:
//! 1. **Feeds**: RSS/Atom sources, filtered by recency and optional allow-lists
//! 2. **Pages**: scraped listing pages, filtered by AI relevance (only when feeds fall short)
//! 3. **Fallback**: a fixed set of articles (only when still short)
//! 4. **Ranking**: dedup, score, sort and truncate
//! 5. **Output**: console listing and an optional JSON digest
//!
//! Per-source failures are logged and skipped. Only an invalid source
//! registry aborts the run.

use chrono::{Duration, Local};
use clap::Parser;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod http;
mod keywords;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod registry;
mod scoring;
mod scrapers;
mod utils;

use cli::Cli;
use http::{HttpFetch, OfflineFetcher, ReqwestFetcher};
use models::Digest;
use outputs::json;
use pipeline::{Aggregator, Pacing};
use utils::{edition, ensure_writable_dir, truncate_for_log};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let digest = if args.offline {
        info!("Offline mode; live sources disabled");
        collect_digest(&args, OfflineFetcher, Pacing::none()).await?
    } else {
        match ReqwestFetcher::new(StdDuration::from_secs(args.timeout_secs)) {
            Ok(fetcher) => collect_digest(&args, fetcher, Pacing::default()).await?,
            Err(e) => {
                warn!(error = %e, "HTTP client unavailable; continuing offline");
                collect_digest(&args, OfflineFetcher, Pacing::none()).await?
            }
        }
    };

    print_digest(&digest);

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(&digest, dir).await {
            error!(error = %e, "Failed to write digest JSON");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = digest.articles.len(),
        edition = %digest.edition,
        date = %digest.local_date,
        "Execution complete"
    );
    Ok(())
}

/// Build the registry, run one collection and wrap the result in a [`Digest`].
async fn collect_digest<F: HttpFetch>(
    args: &Cli,
    fetcher: F,
    pacing: Pacing,
) -> Result<Digest, Box<dyn Error>> {
    let aggregator = match Aggregator::from_config(args.sources.as_deref(), fetcher) {
        Ok(aggregator) => aggregator.with_pacing(pacing),
        Err(e) => {
            error!(error = %e, "Source registry is invalid; aborting");
            return Err(e.into());
        }
    };
    info!(
        sources = aggregator.registry().sources().len(),
        limit = args.limit,
        hours = args.hours,
        "Collecting AI news"
    );

    let articles = aggregator
        .collect(usize::from(args.limit), Duration::hours(args.hours))
        .await;

    let now = Local::now();
    Ok(Digest {
        local_date: now.date_naive().to_string(),
        edition: edition(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        hours_back: args.hours,
        articles,
    })
}

fn print_digest(digest: &Digest) {
    println!(
        "AI news digest: {} {} ({} articles)",
        digest.local_date,
        digest.edition,
        digest.articles.len()
    );
    for (i, article) in digest.articles.iter().enumerate() {
        println!();
        println!("{}. {}", i + 1, article.title);
        println!("   source:    {}", article.source_name);
        println!("   url:       {}", truncate_for_log(&article.url, 80));
        println!("   summary:   {}", truncate_for_log(&article.summary, 100));
        println!("   score:     {}", article.relevance_score());
        println!("   published: {}", article.published_at.to_rfc3339());
    }
}
