//! Keyword tables for relevance filtering and scoring.
//!
//! These are data, not logic: tune them here without touching the fetchers
//! or the pipeline. Entries cover both the Japanese sources in the built-in
//! registry and English-language outlets.

/// Terms that mark a scraped headline as AI-related. Matched
/// case-insensitively as substrings by [`is_ai_related`].
pub const RELEVANCE_KEYWORDS: &[&str] = &[
    "AI",
    "人工知能",
    "ChatGPT",
    "GPT",
    "Gemini",
    "Claude",
    "機械学習",
    "ディープラーニング",
    "深層学習",
    "ニューラルネット",
    "生成AI",
    "LLM",
    "大規模言語モデル",
    "画像生成",
    "音声認識",
    "OpenAI",
    "Google AI",
    "Microsoft AI",
    "Meta AI",
    "Stable Diffusion",
    "DALL-E",
    "Midjourney",
    "AIアシスタント",
    "チャットボット",
    "自動化",
    "ロボット",
    "machine learning",
    "deep learning",
    "neural network",
    "language model",
    "chatbot",
];

/// Headline terms worth +10 each when present (case-sensitive substring).
pub const HIGH_SIGNAL_KEYWORDS: &[&str] = &[
    "ChatGPT",
    "GPT-4",
    "GPT-5",
    "Gemini",
    "Claude",
    "最新",
    "発表",
    "新機能",
    "革新",
    "latest",
    "announcement",
    "breakthrough",
];

/// Substrings of source names that mark a trusted outlet.
pub const TRUSTED_OUTLETS: &[&str] = &["Google News", "ITmedia", "ASCII"];

/// True when `text` contains any [`RELEVANCE_KEYWORDS`] entry, ignoring case.
pub fn is_ai_related(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RELEVANCE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

/// True when `source_name` contains a [`TRUSTED_OUTLETS`] entry.
pub fn is_trusted_outlet(source_name: &str) -> bool {
    TRUSTED_OUTLETS.iter().any(|outlet| source_name.contains(outlet))
}
