use crate::processing::RecencyFilter;
use crate::traits::SearchFeed;
use crate::types::{Candidate, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

pub const GOOGLE_NEWS_BASE_URL: &str = "https://news.google.com";

/// Google News RSS search, one query per call.
pub struct GoogleNewsSearch {
    base_url: String,
    locale: SearchLocale,
    fetcher: Fetcher,
    parser: Arc<FeedParser>,
}

/// `hl` / `gl` / `ceid` query parameters.
#[derive(Debug, Clone)]
pub struct SearchLocale {
    pub language: String,
    pub country: String,
}

impl Default for SearchLocale {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            country: "KR".to_string(),
        }
    }
}

impl GoogleNewsSearch {
    pub fn new(fetcher: Fetcher, parser: Arc<FeedParser>) -> Self {
        Self::with_base_url(GOOGLE_NEWS_BASE_URL.to_string(), fetcher, parser)
    }

    pub fn with_base_url(base_url: String, fetcher: Fetcher, parser: Arc<FeedParser>) -> Self {
        Self {
            base_url,
            locale: SearchLocale::default(),
            fetcher,
            parser,
        }
    }

    pub fn with_locale(mut self, locale: SearchLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn search_url(&self, query: &str) -> Result<String> {
        let mut url = Url::parse(&self.base_url)?.join("/rss/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("hl", &self.locale.language)
            .append_pair("gl", &self.locale.country)
            .append_pair(
                "ceid",
                &format!("{}:{}", self.locale.country, self.locale.language),
            );
        Ok(url.to_string())
    }
}

#[async_trait]
impl SearchFeed for GoogleNewsSearch {
    fn source_id(&self) -> String {
        "google_news_search".to_string()
    }

    async fn search(
        &self,
        query: &str,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>> {
        let url = self.search_url(query)?;
        info!("Searching '{}' via {}", query, url);

        let content = self.fetcher.fetch_text(&url).await?;
        self.parser
            .parse_candidates(&content, &self.source_id(), max_items, recency)
    }
}
