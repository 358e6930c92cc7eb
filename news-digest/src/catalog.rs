use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// One registered source: identifier, fetch endpoint and whether it is
/// attempted on every run regardless of configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub endpoint: String,
    #[serde(default)]
    pub guaranteed: bool,
}

impl SourceEntry {
    pub fn new(id: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
            guaranteed: false,
        }
    }

    pub fn guaranteed(id: &str, endpoint: &str) -> Self {
        Self {
            guaranteed: true,
            ..Self::new(id, endpoint)
        }
    }
}

/// Static registry of known feed sources.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    entries: Vec<SourceEntry>,
}

impl SourceCatalog {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Ordered `(id, endpoint)` list to fetch for the given active set.
    ///
    /// Guaranteed sources missing from `active` are prepended so at least
    /// one reachable source is tried first; everything else keeps catalog
    /// declaration order. Unknown ids in `active` are ignored.
    pub fn sources(&self, active: &HashSet<String>) -> Vec<(String, String)> {
        for id in active {
            if !self.entries.iter().any(|e| &e.id == id) {
                warn!("Ignoring unknown source id in active set: {}", id);
            }
        }

        let prepended = self
            .entries
            .iter()
            .filter(|e| e.guaranteed && !active.contains(&e.id));
        let selected = self.entries.iter().filter(|e| active.contains(&e.id));

        let sources: Vec<(String, String)> = prepended
            .chain(selected)
            .map(|e| (e.id.clone(), e.endpoint.clone()))
            .collect();

        debug!("Resolved {} sources from catalog", sources.len());
        sources
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::new(vec![
            SourceEntry::guaranteed(
                "google_news",
                "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko",
            ),
            SourceEntry::new("bbc", "http://feeds.bbci.co.uk/news/rss.xml"),
            SourceEntry::new("reuters", "https://feeds.reuters.com/reuters/topNews"),
            SourceEntry::new("ap", "https://feeds.apnews.com/rss/apf-topnews"),
        ])
    }
}
