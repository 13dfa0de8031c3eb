//! Fallback Supplier: last-resort records that need no I/O.
//!
//! Used only when feeds and pages leave the run short of its limit. All
//! records share the run timestamp, so after ranking they keep the order
//! declared here whenever their scores tie.

use crate::models::CandidateRecord;
use chrono::{DateTime, Utc};

struct FallbackArticle {
    title: &'static str,
    summary: &'static str,
    url: &'static str,
    source: &'static str,
}

const FALLBACK_ARTICLES: &[FallbackArticle] = &[
    FallbackArticle {
        title: "【最新】生成AIが変える私たちの未来",
        summary: "ChatGPTやGeminiなどの生成AIが、教育やビジネスの現場で急速に普及しています。AIとの共存について考える時が来ています。",
        url: "https://example.com/ai-future",
        source: "AI Times (Fallback)",
    },
    FallbackArticle {
        title: "AI技術の倫理的な課題と解決策",
        summary: "AI技術の発展に伴い、プライバシーや著作権などの倫理的な課題が浮上しています。適切なルール作りが求められています。",
        url: "https://example.com/ai-ethics",
        source: "Tech Ethics (Fallback)",
    },
    FallbackArticle {
        title: "日本企業のAI活用事例10選",
        summary: "製造業からサービス業まで、様々な分野でAIが活用されています。成功事例から学ぶAI導入のポイントを紹介します。",
        url: "https://example.com/ai-cases",
        source: "Business AI (Fallback)",
    },
];

/// The fixed fallback set, in declared order, stamped with `now`.
pub fn fallback_records(now: DateTime<Utc>) -> Vec<CandidateRecord> {
    FALLBACK_ARTICLES
        .iter()
        .map(|a| CandidateRecord::new(a.title, a.url, a.summary, a.source, now))
        .collect()
}
