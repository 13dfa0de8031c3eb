//! Aggregation Pipeline.
//!
//! One call to [`Aggregator::collect`] runs the staged collection:
//!
//! 1. **Feeds**: every feed source, always.
//! 2. **Pages**: every scraped-page source, only if still short of `limit`.
//! 3. **Fallback**: the fixed fallback set, only if still short of `limit`.
//!
//! Records enter a working set that rejects repeated non-empty URLs. After
//! the last stage the set is deduplicated by [`ArticleKey`], scored, sorted by
//! `(score, published_at)` descending and truncated to `limit`.
//!
//! # Execution model
//!
//! Sources are fetched one after another, never concurrently. Consecutive
//! requests of the same kind are separated by the [`Pacing`] delay. Each
//! source gets a single attempt; a failed source contributes nothing.
//!
//! [`ArticleKey`]: crate::models::ArticleKey

use crate::http::HttpFetch;
use crate::models::{ArticleKey, CandidateRecord};
use crate::registry::{RegistryError, SourceRegistry};
use crate::scoring::score;
use crate::scrapers::{fallback, feed, page};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Politeness delays between consecutive requests of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub feed_delay: StdDuration,
    pub page_delay: StdDuration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            feed_delay: StdDuration::from_millis(500),
            page_delay: StdDuration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No delays, for fetchers that never reach a remote host.
    pub fn none() -> Self {
        Self {
            feed_delay: StdDuration::ZERO,
            page_delay: StdDuration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Feeds,
    Pages,
    Fallback,
}

const STAGES: [Stage; 3] = [Stage::Feeds, Stage::Pages, Stage::Fallback];

/// Records collected so far in one run, unique by [`ArticleKey`].
///
/// Its length drives stage skipping, so it only counts distinct articles.
#[derive(Debug, Default)]
struct WorkingSet {
    records: Vec<CandidateRecord>,
    seen: HashSet<ArticleKey>,
}

impl WorkingSet {
    fn admit(&mut self, record: CandidateRecord) -> bool {
        if !self.seen.insert(record.article_key()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Admit records in order, returning how many were new.
    fn extend(&mut self, records: Vec<CandidateRecord>) -> usize {
        let mut admitted = 0;
        for record in records {
            if self.admit(record) {
                admitted += 1;
            }
        }
        admitted
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn into_records(self) -> Vec<CandidateRecord> {
        self.records
    }
}

/// Drop later records that share an article identity with an earlier one.
pub fn deduplicate(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    records
        .into_iter()
        .unique_by(|record| record.article_key())
        .collect()
}

/// Score, sort by `(score, published_at)` descending and keep `limit` records.
///
/// The sort is stable: records with equal score and timestamp keep their
/// collection order.
pub fn rank(records: Vec<CandidateRecord>, limit: usize) -> Vec<CandidateRecord> {
    let mut ranked: Vec<CandidateRecord> = records
        .into_iter()
        .map(|record| {
            let points = score(&record);
            record.scored(points)
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.relevance_score()
            .cmp(&a.relevance_score())
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    ranked.truncate(limit);
    ranked
}

/// Runs the staged collection over a [`SourceRegistry`].
#[derive(Debug)]
pub struct Aggregator<F> {
    registry: SourceRegistry,
    fetcher: F,
    pacing: Pacing,
}

impl<F: HttpFetch> Aggregator<F> {
    pub fn new(registry: SourceRegistry, fetcher: F) -> Self {
        Self {
            registry,
            fetcher,
            pacing: Pacing::default(),
        }
    }

    /// Build the registry from `sources` (or the built-in table) and wrap it.
    ///
    /// This is the only fallible step of a collection run.
    pub fn from_config(sources: Option<&Path>, fetcher: F) -> Result<Self, RegistryError> {
        Ok(Self::new(SourceRegistry::load(sources)?, fetcher))
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Collect at most `limit` ranked records no older than `recency_window`.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of records returned
    /// * `recency_window` - How far back from now a record may be published
    ///
    /// # Returns
    ///
    /// Records ordered by score, then publication time, both descending.
    /// Never fails: unreachable or broken sources are logged and skipped,
    /// and the fallback set fills in when live sources come up short.
    pub async fn collect(&self, limit: usize, recency_window: Duration) -> Vec<CandidateRecord> {
        self.collect_at(Utc::now(), limit, recency_window).await
    }

    /// [`Aggregator::collect`] with an explicit collection time.
    #[instrument(level = "info", skip(self))]
    pub async fn collect_at(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        recency_window: Duration,
    ) -> Vec<CandidateRecord> {
        let t0 = Instant::now();
        let cutoff = now
            .checked_sub_signed(recency_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut working = WorkingSet::default();

        for stage in STAGES {
            if stage != Stage::Feeds && working.len() >= limit {
                debug!(?stage, collected = working.len(), limit, "Enough candidates; skipping stage");
                continue;
            }
            let records = self.run_stage(stage, cutoff, now).await;
            let fetched = records.len();
            let admitted = working.extend(records);
            info!(?stage, fetched, admitted, total = working.len(), "Stage complete");
        }

        let collected = working.len();
        let unique = deduplicate(working.into_records());
        let duplicates = collected - unique.len();
        let result = rank(unique, limit);

        info!(
            collected,
            duplicates,
            returned = result.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Collection complete"
        );
        result
    }

    async fn run_stage(
        &self,
        stage: Stage,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<CandidateRecord> {
        let mut records = Vec::new();
        match stage {
            Stage::Feeds => {
                for (i, source) in self.registry.feeds().enumerate() {
                    if i > 0 {
                        sleep(self.pacing.feed_delay).await;
                    }
                    let outcome = feed::fetch_feed(&self.fetcher, source, cutoff, now).await;
                    records.extend(outcome.into_records());
                }
            }
            Stage::Pages => {
                for (i, source) in self.registry.pages().enumerate() {
                    if i > 0 {
                        sleep(self.pacing.page_delay).await;
                    }
                    let outcome = page::fetch_page(&self.fetcher, source, now).await;
                    records.extend(outcome.into_records());
                }
            }
            Stage::Fallback => {
                info!("Live sources fell short; adding fallback records");
                records.extend(fallback::fallback_records(now));
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::OfflineFetcher;
    use crate::http::testing::StubFetcher;
    use crate::registry::{ExtractionRules, SourceDescriptor};
    use chrono::TimeZone;

    const FEED_A: &str = "https://feed-a.example/rss";
    const FEED_B: &str = "https://feed-b.example/rss";
    const PAGE: &str = "https://page.example/news/";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 7, 30, 0).unwrap()
    }

    fn window() -> Duration {
        Duration::hours(48)
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::new(vec![
            SourceDescriptor::feed("ITmedia AI+", FEED_A),
            SourceDescriptor::feed("Tech Blog", FEED_B),
            SourceDescriptor::scraped_page(
                "Page News",
                PAGE,
                ExtractionRules::new("article", "h2", "a", "p"),
            ),
        ])
        .unwrap()
    }

    /// RSS document from `(title, link, pubDate, description)` tuples.
    fn rss(items: &[(&str, &str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date, desc)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate><description>{desc}</description></item>"
                )
            })
            .collect();
        format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>{body}</channel></rss>")
    }

    fn aggregator(stub: StubFetcher) -> Aggregator<StubFetcher> {
        Aggregator::new(registry(), stub).with_pacing(Pacing::none())
    }

    fn assert_ranked(records: &[CandidateRecord]) {
        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.relevance_score() >= b.relevance_score());
            if a.relevance_score() == b.relevance_score() {
                assert!(a.published_at >= b.published_at);
            }
        }
    }

    #[tokio::test]
    async fn test_all_sources_empty_yields_fallback_in_declared_order() {
        let empty_page = "<html><body><p>nothing</p></body></html>";
        let stub = StubFetcher::new()
            .with_body(FEED_A, &rss(&[]))
            .with_body(FEED_B, &rss(&[]))
            .with_body(PAGE, empty_page);
        let result = aggregator(stub).collect_at(now(), 5, window()).await;

        let expected: Vec<_> = fallback::fallback_records(now())
            .into_iter()
            .map(|r| r.url)
            .collect();
        let urls: Vec<_> = result.iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_offline_run_is_fallback_truncated_to_limit() {
        let aggregator = Aggregator::new(SourceRegistry::builtin().unwrap(), OfflineFetcher)
            .with_pacing(Pacing::none());
        let result = aggregator.collect_at(now(), 2, window()).await;

        let expected: Vec<_> = fallback::fallback_records(now())
            .into_iter()
            .take(2)
            .map(|r| r.url)
            .collect();
        assert_eq!(result.iter().map(|r| r.url.clone()).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_trusted_feed_entry_literal_score() {
        let summary = "a".repeat(150);
        let stub = StubFetcher::new().with_body(
            FEED_A,
            &rss(&[(
                "OpenAI releases GPT-5 announcement",
                "https://www.itmedia.co.jp/aiplus/articles/gpt5.html",
                "Tue, 06 May 2025 06:00:00 GMT",
                &summary,
            )]),
        );
        let result = aggregator(stub).collect_at(now(), 1, window()).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "OpenAI releases GPT-5 announcement");
        assert_eq!(result[0].relevance_score(), 30);
    }

    #[tokio::test]
    async fn test_same_url_across_feeds_collapses_to_first() {
        let url = "https://news.example/shared";
        let date = "Tue, 06 May 2025 06:00:00 GMT";
        let stub = StubFetcher::new()
            .with_body(FEED_A, &rss(&[("AI story from A", url, date, "a")]))
            .with_body(FEED_B, &rss(&[("AI story from B", url, date, "b")]));
        let result = aggregator(stub).collect_at(now(), 10, window()).await;

        let shared: Vec<_> = result.iter().filter(|r| r.url == url).collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].source_name, "ITmedia AI+");
    }

    #[tokio::test]
    async fn test_enough_feed_records_skip_pages_and_fallback() {
        let date = "Tue, 06 May 2025 06:00:00 GMT";
        let stub = StubFetcher::new()
            .with_body(
                FEED_A,
                &rss(&[
                    ("AI one", "https://a.example/1", date, ""),
                    ("AI two", "https://a.example/2", date, ""),
                ]),
            )
            .with_status(FEED_B, 500);
        let aggregator = aggregator(stub);
        let result = aggregator.collect_at(now(), 2, window()).await;

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| !r.source_name.contains("Fallback")));
        assert_eq!(aggregator.fetcher.requests(), vec![FEED_A, FEED_B]);
    }

    #[tokio::test]
    async fn test_fallback_does_not_duplicate_collected_url() {
        let stub = StubFetcher::new().with_body(
            FEED_A,
            &rss(&[(
                "AI倫理の記事",
                "https://example.com/ai-ethics",
                "Tue, 06 May 2025 06:00:00 GMT",
                "",
            )]),
        );
        let result = aggregator(stub).collect_at(now(), 10, window()).await;

        assert_eq!(result.len(), 3);
        let ethics: Vec<_> = result
            .iter()
            .filter(|r| r.url == "https://example.com/ai-ethics")
            .collect();
        assert_eq!(ethics.len(), 1);
        assert_eq!(ethics[0].source_name, "ITmedia AI+");
    }

    #[tokio::test]
    async fn test_stale_and_off_topic_candidates_never_appear() {
        let page = r#"<html><body>
          <article><h2>週末の天気予報</h2><a href="/weather">x</a></article>
          <article><h2>画像生成AIの新サービス</h2><a href="/imggen">x</a></article>
        </body></html>"#;
        let stub = StubFetcher::new()
            .with_body(
                FEED_A,
                &rss(&[("古いAIニュース", "https://a.example/old", "Thu, 01 May 2025 06:00:00 GMT", "")]),
            )
            .with_status(FEED_B, 404)
            .with_body(PAGE, page);
        let result = aggregator(stub).collect_at(now(), 10, window()).await;

        let titles: Vec<_> = result.iter().map(|r| r.title.as_str()).collect();
        assert!(!titles.contains(&"古いAIニュース"));
        assert!(!titles.contains(&"週末の天気予報"));
        assert!(titles.contains(&"画像生成AIの新サービス"));
        let scraped = result.iter().find(|r| r.title == "画像生成AIの新サービス").unwrap();
        assert_eq!(scraped.url, "https://page.example/imggen");
    }

    #[tokio::test]
    async fn test_url_less_duplicates_collapse_by_title() {
        let page = r#"<html><body>
          <article><h2>生成AIの最新動向</h2></article>
          <article><h2>生成AIの最新動向</h2><p>second copy</p></article>
        </body></html>"#;
        let stub = StubFetcher::new().with_body(PAGE, page);
        let result = aggregator(stub).collect_at(now(), 10, window()).await;

        let copies: Vec<_> = result.iter().filter(|r| r.title == "生成AIの最新動向").collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].summary, "生成AIの最新動向に関する最新情報です。");
    }

    #[tokio::test]
    async fn test_url_less_repeats_do_not_crowd_out_fallback() {
        let page = r#"<html><body>
          <article><h2>AI同じ</h2></article>
          <article><h2>AI同じ</h2></article>
          <article><h2>AI同じ</h2></article>
        </body></html>"#;
        let stub = StubFetcher::new().with_body(PAGE, page);
        let result = aggregator(stub).collect_at(now(), 4, window()).await;

        assert_eq!(result.len(), 4);
        assert_eq!(result.iter().filter(|r| r.title == "AI同じ").count(), 1);
        assert_eq!(result.iter().filter(|r| r.source_name.contains("Fallback")).count(), 3);
    }

    #[tokio::test]
    async fn test_huge_recency_window_keeps_everything() {
        let stub = StubFetcher::new().with_body(
            FEED_A,
            &rss(&[("AI archive", "https://a.example/old", "Mon, 01 Jan 1990 00:00:00 GMT", "")]),
        );
        let result = aggregator(stub).collect_at(now(), 1, Duration::MAX).await;
        assert_eq!(result[0].title, "AI archive");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_same_kind_requests() {
        let feeds = ["https://f1.example/rss", "https://f2.example/rss", "https://f3.example/rss"];
        let pages = ["https://p1.example/", "https://p2.example/"];
        let rules = ExtractionRules::new("article", "h2", "a", "p");
        let mut sources: Vec<_> = feeds
            .iter()
            .enumerate()
            .map(|(i, url)| SourceDescriptor::feed(&format!("Feed {i}"), url))
            .collect();
        sources.extend(
            pages
                .iter()
                .enumerate()
                .map(|(i, url)| SourceDescriptor::scraped_page(&format!("Page {i}"), url, rules.clone())),
        );
        let registry = SourceRegistry::new(sources).unwrap();
        let pacing = Pacing::default();
        let aggregator = Aggregator::new(registry, StubFetcher::new()).with_pacing(pacing);

        let start = tokio::time::Instant::now();
        aggregator.collect_at(now(), 5, window()).await;

        let offsets: Vec<_> = aggregator
            .fetcher
            .request_times()
            .iter()
            .map(|t| t.duration_since(start))
            .collect();
        let (feed, page) = (pacing.feed_delay, pacing.page_delay);
        assert_eq!(
            offsets,
            vec![StdDuration::ZERO, feed, feed * 2, feed * 2, feed * 2 + page]
        );
        assert!(start.elapsed() >= feed * 2 + page);
    }

    #[tokio::test]
    async fn test_result_properties_on_mixed_run() {
        let stub = StubFetcher::new()
            .with_body(
                FEED_A,
                &rss(&[
                    ("ChatGPTの新機能", "https://a.example/1", "Tue, 06 May 2025 01:00:00 GMT", ""),
                    ("AIの話", "https://a.example/2", "Tue, 06 May 2025 05:00:00 GMT", ""),
                    ("AIの話 続報", "https://a.example/3", "Tue, 06 May 2025 03:00:00 GMT", ""),
                ]),
            )
            .with_body(
                FEED_B,
                &rss(&[("Claude latest", "https://b.example/1#frag", "Mon, 05 May 2025 12:00:00 GMT", "")]),
            );
        let limit = 4;
        let result = aggregator(stub).collect_at(now(), limit, window()).await;

        assert!(!result.is_empty() && result.len() <= limit);
        assert_ranked(&result);
        let urls: HashSet<_> = result.iter().map(|r| r.url_key()).collect();
        assert_eq!(urls.len(), result.len());
        // Same score for the two plain AI items: newer first.
        let plain: Vec<_> = result
            .iter()
            .filter(|r| r.title.starts_with("AIの話"))
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(plain, vec!["AIの話", "AIの話 続報"]);
    }

    async fn run_with_feed(feed: &str) -> Vec<CandidateRecord> {
        let stub = StubFetcher::new().with_body(FEED_A, feed);
        aggregator(stub).collect_at(now(), 5, window()).await
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_output() {
        let feed = rss(&[
            ("Gemini 発表", "https://a.example/1", "Tue, 06 May 2025 01:00:00 GMT", "x"),
            ("AI news", "https://a.example/2", "", "y"),
        ]);
        let first = run_with_feed(&feed).await;
        let second = run_with_feed(&feed).await;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_rank_ties_keep_collection_order() {
        let records = fallback::fallback_records(now())
            .into_iter()
            .map(|r| {
                let title = r.title.replace("最新", "");
                CandidateRecord::new(title, r.url, &r.summary, r.source_name, r.published_at)
            })
            .collect();
        let ranked = rank(records, 3);
        let scores: Vec<_> = ranked.iter().map(|r| r.relevance_score()).collect();
        assert_eq!(scores, vec![2, 2, 2]);
        assert_eq!(ranked[0].url, "https://example.com/ai-future");
        assert_eq!(ranked[2].url, "https://example.com/ai-cases");
    }

    #[test]
    fn test_deduplicate_first_wins() {
        let a = CandidateRecord::new("A", "https://x.example/1", "", "first", now());
        let b = CandidateRecord::new("B", "https://x.example/1#c", "", "second", now());
        let c = CandidateRecord::new("C", "", "", "third", now());
        let d = CandidateRecord::new("C", "", "", "fourth", now());
        let unique = deduplicate(vec![a, b, c, d]);
        let sources: Vec<_> = unique.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(sources, vec!["first", "third"]);
    }

    #[test]
    fn test_rank_zero_limit_is_empty() {
        assert!(rank(fallback::fallback_records(now()), 0).is_empty());
    }
}
