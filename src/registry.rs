//! Source Registry: where to collect candidates from and how to extract them.
//!
//! The registry is static configuration. It ships with a built-in table of
//! Japanese AI news sources and can be replaced wholesale by a YAML file:
//!
//! ```yaml
//! sources:
//!   - name: ITmedia AI+
//!     endpoint: https://rss.itmedia.co.jp/rss/2.0/aiplus.xml
//!     kind: feed
//!   - name: GIGAZINE
//!     endpoint: https://gigazine.net/news/rss_2.0/
//!     kind: feed
//!     filter: [AI, 人工知能]
//!   - name: ASCII AI
//!     endpoint: https://ascii.jp/ai/
//!     kind: scraped_page
//!     rules: { container: div.articleList, title: h3, link: a, summary: p }
//! ```
//!
//! Every descriptor is validated when the registry is built. A registry that
//! fails validation is the only error that aborts a collection run.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Failure to construct a [`SourceRegistry`]. Always fatal for the run.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("reading source registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing source registry: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("source descriptor has an empty name")]
    EmptyName,
    #[error("duplicate source name `{0}`")]
    DuplicateName(String),
    #[error("source `{name}` has invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        name: String,
        endpoint: String,
        reason: String,
    },
    #[error("scraped page `{0}` has no extraction rules")]
    MissingRules(String),
    #[error("source `{name}` has invalid selector `{selector}`: {reason}")]
    BadSelector {
        name: String,
        selector: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS/RDF/Atom syndication feed.
    Feed,
    /// HTML page scraped with [`ExtractionRules`].
    ScrapedPage,
}

/// CSS selectors locating candidates inside a scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractionRules {
    pub container: String,
    pub title: String,
    pub link: String,
    #[serde(default = "default_summary_selector")]
    pub summary: String,
}

fn default_summary_selector() -> String {
    "p".to_string()
}

/// [`ExtractionRules`] with every selector parsed.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub container: Selector,
    pub title: Selector,
    pub link: Selector,
    pub summary: Selector,
}

impl ExtractionRules {
    pub fn new(container: &str, title: &str, link: &str, summary: &str) -> Self {
        Self {
            container: container.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            summary: summary.to_string(),
        }
    }

    /// Parse all selectors, reporting the first one that does not compile.
    pub fn compile(&self, source_name: &str) -> Result<CompiledRules, RegistryError> {
        let parse = |selector: &str| {
            Selector::parse(selector).map_err(|e| RegistryError::BadSelector {
                name: source_name.to_string(),
                selector: selector.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(CompiledRules {
            container: parse(&self.container)?,
            title: parse(&self.title)?,
            link: parse(&self.link)?,
            summary: parse(&self.summary)?,
        })
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub endpoint: String,
    pub kind: SourceKind,
    /// Feed-only allow-list: entries whose title contains none of these are dropped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
    /// Required for [`SourceKind::ScrapedPage`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<ExtractionRules>,
}

impl SourceDescriptor {
    pub fn feed(name: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            kind: SourceKind::Feed,
            filter: Vec::new(),
            rules: None,
        }
    }

    pub fn with_filter(mut self, keywords: &[&str]) -> Self {
        self.filter = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn scraped_page(name: &str, endpoint: &str, rules: ExtractionRules) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            kind: SourceKind::ScrapedPage,
            filter: Vec::new(),
            rules: Some(rules),
        }
    }

    /// `scheme://host[:port]/` of the endpoint, used to resolve relative links.
    pub fn origin(&self) -> Option<Url> {
        let mut url = Url::parse(&self.endpoint).ok()?;
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Some(url)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let invalid = |reason: &str| RegistryError::InvalidEndpoint {
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        if self.kind == SourceKind::ScrapedPage {
            let rules = self
                .rules
                .as_ref()
                .ok_or_else(|| RegistryError::MissingRules(self.name.clone()))?;
            rules.compile(&self.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    sources: Vec<SourceDescriptor>,
}

/// Validated, ordered list of sources.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Validate and wrap `sources`, keeping their order.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        for source in &sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(RegistryError::DuplicateName(source.name.clone()));
            }
        }
        Ok(Self { sources })
    }

    /// The built-in source table.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(builtin_sources())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        Self::new(file.sources)
    }

    /// Load from `path` when given, otherwise use [`SourceRegistry::builtin`].
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, RegistryError> {
        let registry = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&yaml)?
            }
            None => Self::builtin()?,
        };
        info!(
            feeds = registry.feeds().count(),
            pages = registry.pages().count(),
            "Source registry ready"
        );
        Ok(registry)
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn feeds(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.of_kind(SourceKind::Feed)
    }

    pub fn pages(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.of_kind(SourceKind::ScrapedPage)
    }

    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(move |s| s.kind == kind)
    }
}

fn google_news_search(query: &str) -> String {
    format!(
        "https://news.google.com/rss/search?q={}&hl=ja&gl=JP&ceid=JP:ja",
        urlencoding::encode(query)
    )
}

fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed("Google News - AI", &google_news_search("AI 人工知能")),
        SourceDescriptor::feed("ITmedia AI+", "https://rss.itmedia.co.jp/rss/2.0/aiplus.xml"),
        SourceDescriptor::feed("GIGAZINE", "https://gigazine.net/news/rss_2.0/")
            .with_filter(&["AI", "人工知能", "ChatGPT", "機械学習"]),
        SourceDescriptor::scraped_page(
            "AI News Japan",
            "https://ledge.ai/categories/news/",
            ExtractionRules::new("article", "h2", "a", "p"),
        ),
        SourceDescriptor::scraped_page(
            "ASCII AI",
            "https://ascii.jp/ai/",
            ExtractionRules::new("div.articleList", "h3", "a", "p"),
        ),
    ]
}
