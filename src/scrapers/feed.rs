//! Structured-Feed Fetcher.
//!
//! Downloads a syndication feed and turns its newest entries into
//! [`CandidateRecord`]s. Three shapes are understood:
//!
//! - RSS 2.0: `rss/channel/item`
//! - RSS 1.0 (RDF): `rdf:RDF/item`
//! - Atom: `feed/entry`, link taken from `link@href`
//!
//! # Entry handling
//!
//! 1. Only the first [`MAX_ENTRIES_PER_FEED`] entries in document order are
//!    considered (feeds list newest first).
//! 2. The timestamp is parsed with [`DATE_FORMATS`] in order; unparseable or
//!    missing timestamps become the collection time.
//! 3. Entries strictly older than the cutoff are dropped.
//! 4. When the source has an allow-list, titles containing none of its
//!    keywords (case-sensitive) are dropped.
//! 5. Titles that are empty after cleaning are dropped.

use crate::http::{HttpFetch, SourceError};
use crate::models::CandidateRecord;
use crate::normalize::clean_text;
use crate::registry::SourceDescriptor;
use crate::scrapers::SourceOutcome;
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Entries considered per feed, regardless of feed size.
pub const MAX_ENTRIES_PER_FEED: usize = 10;

const XML_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

static RE_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

/// A timestamp layout accepted in `pubDate`/`published`/`updated`.
#[derive(Debug, Clone, Copy)]
pub enum DateFormat {
    Rfc2822,
    Rfc3339,
    /// `chrono` pattern carrying its own offset.
    Zoned(&'static str),
    /// `chrono` pattern without offset, read as UTC.
    Naive(&'static str),
}

/// Accepted timestamp layouts, tried in order.
pub const DATE_FORMATS: &[DateFormat] = &[
    DateFormat::Rfc2822,
    DateFormat::Rfc3339,
    DateFormat::Zoned("%Y-%m-%dT%H:%M:%S%z"),
    DateFormat::Naive("%Y-%m-%d %H:%M:%S"),
    DateFormat::Naive("%Y/%m/%d %H:%M:%S"),
];

impl DateFormat {
    fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        let parsed = match self {
            DateFormat::Rfc2822 => DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc),
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc),
            DateFormat::Zoned(fmt) => DateTime::parse_from_str(raw, fmt).ok()?.with_timezone(&Utc),
            DateFormat::Naive(fmt) => NaiveDateTime::parse_from_str(raw, fmt).ok()?.and_utc(),
        };
        Some(parsed)
    }
}

/// Parse a feed timestamp with the first matching [`DATE_FORMATS`] entry.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|format| format.parse(raw))
}

// Root element name is not checked by quick-xml, so one document struct
// covers RSS 2.0, RDF and Atom roots.
#[derive(Debug, Deserialize)]
struct FeedDocument {
    channel: Option<Channel>,
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
    #[serde(default, rename = "entry")]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

/// Atom text constructs carry a `type` attribute next to their text.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Format-independent view of one feed entry, still uncleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary: String,
}

impl From<RssItem> for FeedEntry {
    fn from(item: RssItem) -> Self {
        Self {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            published: item.pub_date.or(item.dc_date),
            summary: item.description.unwrap_or_default(),
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(entry: AtomEntry) -> Self {
        let link = entry
            .link
            .iter()
            .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
            .or_else(|| entry.link.first())
            .and_then(|l| l.href.clone())
            .unwrap_or_default();
        Self {
            title: entry.title.map(|t| t.value).unwrap_or_default(),
            link,
            published: entry.published.or(entry.updated),
            summary: entry
                .summary
                .or(entry.content)
                .map(|t| t.value)
                .unwrap_or_default(),
        }
    }
}

/// quick-xml only knows the five XML entities; feeds routinely carry HTML ones.
///
/// Named HTML entities are decoded in place and the result re-escaped for XML.
/// Names HTML does not define either are escaped as literal text, so a single
/// odd entry cannot fail the whole document.
fn scrub_html_entities_for_xml(s: &str) -> String {
    RE_ENTITY
        .replace_all(s, |caps: &Captures<'_>| {
            let (raw, name) = (&caps[0], &caps[1]);
            if XML_ENTITIES.contains(&name) {
                return raw.to_string();
            }
            let decoded = html_escape::decode_html_entities(raw);
            if decoded == raw {
                format!("&amp;{name};")
            } else {
                html_escape::encode_text(&decoded).into_owned()
            }
        })
        .into_owned()
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into entries, in document order.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] when the body is not well-formed XML.
/// Unknown HTML entities are not an error.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, SourceError> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let doc: FeedDocument =
        quick_xml::de::from_str(&cleaned).map_err(|e| SourceError::Parse(e.to_string()))?;

    let channel_items = doc.channel.map(|c| c.items).unwrap_or_default();
    let entries = channel_items
        .into_iter()
        .chain(doc.items)
        .map(FeedEntry::from)
        .chain(doc.entries.into_iter().map(FeedEntry::from))
        .collect();
    Ok(entries)
}

/// Apply the per-entry rules from the module docs to parsed entries.
pub fn entries_to_records(
    source: &SourceDescriptor,
    entries: Vec<FeedEntry>,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<CandidateRecord> {
    let mut records = Vec::new();
    for entry in entries.into_iter().take(MAX_ENTRIES_PER_FEED) {
        let published = entry
            .published
            .as_deref()
            .and_then(parse_published)
            .unwrap_or(now);
        if published < cutoff {
            debug!(title = %entry.title, %published, "Skipping stale entry");
            continue;
        }

        let title = clean_text(&entry.title);
        if !source.filter.is_empty() && !source.filter.iter().any(|k| title.contains(k.as_str())) {
            continue;
        }
        if title.is_empty() {
            continue;
        }

        let summary = clean_text(&entry.summary);
        records.push(CandidateRecord::new(
            title,
            entry.link,
            &summary,
            source.name.as_str(),
            published,
        ));
    }
    records
}

/// Fetch one feed source and map its entries to records.
///
/// # Arguments
///
/// * `fetcher` - HTTP access, one GET per call
/// * `source` - Feed descriptor; its name is stamped on every record
/// * `cutoff` - Oldest publication time kept
/// * `now` - Collection time, used for entries without a usable date
///
/// # Returns
///
/// A [`SourceOutcome`] carrying either the records or the reason the
/// source produced none. Failures are never propagated further.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch_feed<F: HttpFetch>(
    fetcher: &F,
    source: &SourceDescriptor,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SourceOutcome {
    let result = match fetcher.get_text(&source.endpoint).await {
        Ok(body) => parse_feed(&body).map(|entries| entries_to_records(source, entries, cutoff, now)),
        Err(e) => Err(e),
    };
    SourceOutcome::new(&source.name, result)
}
