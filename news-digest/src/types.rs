use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in a candidate summary.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Appended to summaries that were cut at `SUMMARY_MAX_CHARS`.
pub const TRUNCATION_MARKER: &str = "...";

/// Some sources reject default client identifiers, so requests go out
/// looking like a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A single fetched item flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source_id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    /// Normalised to the display timezone. `None` sorts as oldest but
    /// passes the recency cutoff.
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Empty when the item carries no usable image.
    pub image_ref: String,
}

impl Candidate {
    pub fn has_image(&self) -> bool {
        !self.image_ref.trim().is_empty()
    }

    /// Text the exclusion filter matches against.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub link_timeout_seconds: u64,
    pub media_timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    /// Upper bound on in-flight requests within one stage.
    pub max_concurrent_requests: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: "ko-KR,ko;q=0.9,en;q=0.8".to_string(),
            timeout_seconds: 15,
            link_timeout_seconds: 5,
            media_timeout_seconds: 15,
            max_feed_size_mb: 10,
            max_concurrent_requests: 8,
        }
    }
}

/// Value produced by a stage together with the reasons for any
/// per-unit failures it recovered from.
#[derive(Debug, Clone)]
pub struct StageResult<T> {
    pub value: T,
    pub failures: Vec<String>,
}

impl<T> StageResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            failures: vec![reason.into()],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{what} timed out after {seconds}s")]
    Timeout { what: String, seconds: u64 },

    #[error("Ranking service error: {0}")]
    Ranking(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
