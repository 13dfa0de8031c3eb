//! Candidate sources for the aggregation pipeline.
//!
//! Each stage of the pipeline draws on one submodule:
//!
//! | Stage | Module | Input | Notes |
//! |-------|--------|-------|-------|
//! | Feeds | [`feed`] | RSS 2.0, RSS 1.0, Atom | Recency cutoff and optional title allow-list |
//! | Pages | [`page`] | HTML | CSS extraction rules, AI relevance filter |
//! | Fallback | [`fallback`] | none | Fixed records, no I/O |
//!
//! # Failure isolation
//!
//! A network or parse failure never escapes a fetcher. Each source yields a
//! [`SourceOutcome`] carrying either its records or the reason it produced
//! none, and the pipeline logs it and moves on to the next source.

pub mod fallback;
pub mod feed;
pub mod page;

use crate::http::SourceError;
use crate::models::CandidateRecord;
use tracing::{info, warn};

/// Records produced by one source, or why there are none.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub result: Result<Vec<CandidateRecord>, SourceError>,
}

impl SourceOutcome {
    pub fn new(source: &str, result: Result<Vec<CandidateRecord>, SourceError>) -> Self {
        Self {
            source: source.to_string(),
            result,
        }
    }

    /// Log the outcome and hand over its records (empty on failure).
    pub fn into_records(self) -> Vec<CandidateRecord> {
        match self.result {
            Ok(records) => {
                info!(source = %self.source, count = records.len(), "Collected candidates");
                records
            }
            Err(e) => {
                warn!(source = %self.source, error = %e, "Source failed; continuing without it");
                Vec::new()
            }
        }
    }
}
