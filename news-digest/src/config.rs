//! Run configuration, read from an optional TOML file.
//!
//! Every key is optional. A missing file yields the defaults: all catalog
//! sources active, no guidance, no keyword filters.

use crate::catalog::{SourceCatalog, SourceEntry};
use crate::types::{FetchConfig, PipelineError, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Longest accepted look-back window.
pub const MAX_RECENCY_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Source ids to fetch; `None` means every catalog source.
    pub active_sources: Option<Vec<String>>,
    pub target_count: usize,
    pub guidance: Option<String>,
    pub interest_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub recency_hours: i64,
    pub run_interval_hours: u32,
    pub display_utc_offset_hours: i32,
    /// Pool is `target_count * pool_multiplier` when filtering or ranking
    /// will discard candidates.
    pub pool_multiplier: usize,
    pub max_pool_size: usize,
    pub fetch: FetchSettings,
    pub search: SearchSettings,
    pub ranking: RankingSettings,
    pub storage: StorageSettings,
    /// Replaces the built-in catalog when present.
    pub catalog: Option<Vec<SourceEntry>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            active_sources: None,
            target_count: 3,
            guidance: None,
            interest_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            recency_hours: 24,
            run_interval_hours: 1,
            display_utc_offset_hours: 9,
            pool_multiplier: 4,
            max_pool_size: 30,
            fetch: FetchSettings::default(),
            search: SearchSettings::default(),
            ranking: RankingSettings::default(),
            storage: StorageSettings::default(),
            catalog: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_seconds: u64,
    pub link_timeout_seconds: u64,
    pub media_timeout_seconds: u64,
    pub max_concurrent_requests: usize,
    pub accept_language: Option<String>,
    pub redirect_hosts: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            timeout_seconds: fetch.timeout_seconds,
            link_timeout_seconds: fetch.link_timeout_seconds,
            media_timeout_seconds: fetch.media_timeout_seconds,
            max_concurrent_requests: fetch.max_concurrent_requests,
            accept_language: None,
            redirect_hosts: crate::link_resolver::DEFAULT_REDIRECT_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub base_url: String,
    pub language: String,
    pub country: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: crate::sources::google_news::GOOGLE_NEWS_BASE_URL.to_string(),
            language: "ko".to_string(),
            country: "KR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub api_url: String,
    pub api_key_env: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            model: "claude-opus-4-5".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub url_env: String,
    pub key_env: String,
    pub bucket: String,
    pub timeout_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            url_env: "SUPABASE_URL".to_string(),
            key_env: "SUPABASE_SERVICE_ROLE_KEY".to_string(),
            bucket: "news-images".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given, using defaults");
            return Ok(Self::default());
        };

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                info!("Loaded config from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(PipelineError::Config("target_count must be at least 1".to_string()));
        }
        if !(1..=MAX_RECENCY_HOURS).contains(&self.recency_hours) {
            return Err(PipelineError::Config(format!(
                "recency_hours must be within 1..={}, got {}",
                MAX_RECENCY_HOURS, self.recency_hours
            )));
        }
        if self.display_offset().is_none() {
            return Err(PipelineError::Config(format!(
                "display_utc_offset_hours out of range: {}",
                self.display_utc_offset_hours
            )));
        }
        Ok(())
    }

    pub fn display_offset(&self) -> Option<FixedOffset> {
        self.display_utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
    }

    pub fn guidance(&self) -> Option<&str> {
        self.guidance
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn source_catalog(&self) -> SourceCatalog {
        match &self.catalog {
            Some(entries) => SourceCatalog::new(entries.clone()),
            None => SourceCatalog::default(),
        }
    }

    pub fn active_set(&self, catalog: &SourceCatalog) -> HashSet<String> {
        match &self.active_sources {
            Some(ids) => ids.iter().cloned().collect(),
            None => catalog.ids().into_iter().collect(),
        }
    }

    /// How many candidates acquisition should gather.
    pub fn candidate_pool_size(&self) -> usize {
        let needs_slack = self.guidance().is_some()
            || self.exclude_keywords.iter().any(|k| !k.trim().is_empty());
        if needs_slack {
            self.target_count
                .saturating_mul(self.pool_multiplier.max(1))
                .min(self.max_pool_size)
                .max(self.target_count)
        } else {
            self.target_count
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig {
            timeout_seconds: self.fetch.timeout_seconds,
            link_timeout_seconds: self.fetch.link_timeout_seconds,
            media_timeout_seconds: self.fetch.media_timeout_seconds,
            max_concurrent_requests: self.fetch.max_concurrent_requests.max(1),
            accept_language: self
                .fetch
                .accept_language
                .clone()
                .unwrap_or(defaults.accept_language.clone()),
            ..defaults
        }
    }
}
