//! Page-Scrape Fetcher.
//!
//! Scrapes an HTML listing page with the source's [`ExtractionRules`]. Unlike
//! feeds, a listing page is not known to be on-topic, so every title must
//! pass [`is_ai_related`] before it becomes a record.
//!
//! [`ExtractionRules`]: crate::registry::ExtractionRules

use crate::http::{HttpFetch, SourceError};
use crate::keywords::is_ai_related;
use crate::models::{CandidateRecord, SUMMARY_MAX_CHARS};
use crate::normalize::{clean_text, truncate_chars};
use crate::registry::SourceDescriptor;
use crate::scrapers::SourceOutcome;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};
use url::Url;

/// Containers examined per page.
pub const MAX_CONTAINERS_PER_PAGE: usize = 5;

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Make `href` absolute against the source origin.
///
/// Already-absolute links are kept. A link that cannot be joined is returned
/// unchanged.
pub fn resolve_link(origin: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || Url::parse(href).is_ok() {
        return href.to_string();
    }
    origin
        .and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn synthesized_summary(title: &str) -> String {
    format!("{title}に関する最新情報です。")
}

/// Extract candidate records from a fetched page.
pub fn extract_records(
    source: &SourceDescriptor,
    html: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CandidateRecord>, SourceError> {
    let rules = source
        .rules
        .as_ref()
        .ok_or_else(|| SourceError::Rules("no extraction rules".to_string()))?
        .compile(&source.name)
        .map_err(|e| SourceError::Rules(e.to_string()))?;
    let origin = source.origin();

    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for container in document.select(&rules.container).take(MAX_CONTAINERS_PER_PAGE) {
        let Some(title) = container
            .select(&rules.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
        else {
            continue;
        };

        if !is_ai_related(&title) {
            debug!(%title, "Skipping off-topic title");
            continue;
        }

        let url = container
            .select(&rules.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_link(origin.as_ref(), href))
            .unwrap_or_default();

        let summary = container
            .select(&rules.summary)
            .next()
            .map(|el| truncate_chars(&element_text(el), SUMMARY_MAX_CHARS))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| synthesized_summary(&title));

        records.push(CandidateRecord::new(
            title,
            url,
            &summary,
            source.name.as_str(),
            now,
        ));
    }

    Ok(records)
}

/// Fetch and scrape one page source. Failures are returned inside the outcome.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch_page<F: HttpFetch>(
    fetcher: &F,
    source: &SourceDescriptor,
    now: DateTime<Utc>,
) -> SourceOutcome {
    let result = match fetcher.get_text(&source.endpoint).await {
        Ok(body) => extract_records(source, &body, now),
        Err(e) => Err(e),
    };
    SourceOutcome::new(&source.name, result)
}
