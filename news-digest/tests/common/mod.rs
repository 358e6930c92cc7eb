#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use news_digest::types::{Candidate, PipelineError, Result};
use news_digest::{ObjectStore, PullFeed, RecencyFilter, SearchFeed};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<FixedOffset> {
    (Utc::now() - Duration::hours(hours)).with_timezone(&kst())
}

pub fn candidate(source_id: &str, title: &str, hours_old: i64) -> Candidate {
    Candidate {
        source_id: source_id.to_string(),
        title: title.to_string(),
        summary: format!("Summary of {}", title),
        link: format!("https://{}.example.com/{}", source_id, title.replace(' ', "-")),
        published_at: Some(hours_ago(hours_old)),
        image_ref: String::new(),
    }
}

pub fn titles(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.title.as_str()).collect()
}

/// One `<item>` for `rss_document`.
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<DateTime<FixedOffset>>,
}

impl RssItem {
    pub fn new(title: &str, hours_old: i64) -> Self {
        Self {
            title: title.to_string(),
            link: format!("https://news.example.com/{}", title.replace(' ', "-")),
            description: format!("About {}", title),
            published: Some(hours_ago(hours_old)),
        }
    }

    pub fn undated(mut self) -> Self {
        self.published = None;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

pub fn rss_document(items: &[RssItem]) -> String {
    let mut body = String::new();
    for item in items {
        body.push_str("<item>");
        body.push_str(&format!("<title>{}</title>", item.title));
        body.push_str(&format!("<link>{}</link>", item.link));
        body.push_str(&format!(
            "<description><![CDATA[{}]]></description>",
            item.description
        ));
        if let Some(published) = item.published {
            body.push_str(&format!("<pubDate>{}</pubDate>", published.to_rfc2822()));
        }
        body.push_str("</item>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test feed</title><link>https://news.example.com</link><description>Test</description>{}</channel></rss>"#,
        body
    )
}

/// In-memory feed that optionally stalls or fails.
pub struct StaticFeed {
    pub id: String,
    pub items: Vec<Candidate>,
    pub delay: Option<std::time::Duration>,
    pub fail: bool,
    pub pulls: Mutex<Vec<usize>>,
}

impl StaticFeed {
    pub fn new(id: &str, items: Vec<Candidate>) -> Self {
        Self {
            id: id.to_string(),
            items,
            delay: None,
            fail: false,
            pulls: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(id: &str, delay: std::time::Duration) -> Self {
        let mut feed = Self::new(id, vec![candidate(id, "Too late", 1)]);
        feed.delay = Some(delay);
        feed
    }

    pub fn failing(id: &str) -> Self {
        let mut feed = Self::new(id, Vec::new());
        feed.fail = true;
        feed
    }
}

#[async_trait]
impl PullFeed for StaticFeed {
    fn source_id(&self) -> String {
        self.id.clone()
    }

    fn endpoint(&self) -> String {
        format!("memory://{}", self.id)
    }

    /// Returns its items as-is, stale ones included, so callers can check
    /// the fetch boundary.
    async fn pull(&self, max_items: usize, _recency: &RecencyFilter) -> Result<Vec<Candidate>> {
        self.pulls.lock().unwrap().push(max_items);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PipelineError::General(format!("{} is down", self.id)));
        }
        Ok(self.items.iter().take(max_items).cloned().collect())
    }
}

/// Keyword search answering from a fixed table.
pub struct StaticSearch {
    pub results: Vec<(String, Vec<Candidate>)>,
    pub queries: Mutex<Vec<(String, usize)>>,
}

impl StaticSearch {
    pub fn new(results: Vec<(&str, Vec<Candidate>)>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchFeed for StaticSearch {
    fn source_id(&self) -> String {
        "static_search".to_string()
    }

    async fn search(
        &self,
        query: &str,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_items));
        Ok(self
            .results
            .iter()
            .find(|(k, _)| k == query)
            .map(|(_, v)| {
                v.iter()
                    .filter(|c| recency.admits(c))
                    .take(max_items)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Object store that records uploads instead of sending them anywhere.
#[derive(Default)]
pub struct RecordingStore {
    pub bucket_checks: Mutex<usize>,
    pub uploads: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn ensure_bucket(&self) -> Result<()> {
        *self.bucket_checks.lock().unwrap() += 1;
        Ok(())
    }

    async fn upload(&self, name: &str, _bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_string(), content_type.to_string()));
        Ok(format!("https://cdn.example.com/{}", name))
    }
}

/// Lets a test keep a handle on a search it hands to a collector.
pub struct SharedSearch(pub Arc<StaticSearch>);

#[async_trait]
impl SearchFeed for SharedSearch {
    fn source_id(&self) -> String {
        self.0.source_id()
    }

    async fn search(
        &self,
        query: &str,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>> {
        self.0.search(query, max_items, recency).await
    }
}

/// Search that never answers in time.
pub struct StallingSearch;

#[async_trait]
impl SearchFeed for StallingSearch {
    fn source_id(&self) -> String {
        "stalling".to_string()
    }

    async fn search(
        &self,
        _query: &str,
        _max_items: usize,
        _recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(Vec::new())
    }
}
