use crate::processing::RecencyFilter;
use crate::traits::PullFeed;
use crate::types::{Candidate, PipelineError, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Generic RSS/Atom feed source
pub struct RssFeedSource {
    pub source_id: String,
    pub url: String,
    fetcher: Fetcher,
    parser: Arc<FeedParser>,
}

impl RssFeedSource {
    pub fn new(source_id: String, url: String, fetcher: Fetcher, parser: Arc<FeedParser>) -> Self {
        Self {
            source_id,
            url,
            fetcher,
            parser,
        }
    }
}

#[async_trait]
impl PullFeed for RssFeedSource {
    fn source_id(&self) -> String {
        self.source_id.clone()
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn pull(&self, max_items: usize, recency: &RecencyFilter) -> Result<Vec<Candidate>> {
        info!("Pulling RSS feed: {} ({})", self.source_id, self.url);

        let content = self.fetcher.fetch_text(&self.url).await?;
        if !FeedParser::is_valid_feed_content(&content) {
            return Err(PipelineError::Parse(format!(
                "Response from {} does not look like a feed",
                self.url
            )));
        }

        self.parser
            .parse_candidates(&content, &self.source_id, max_items, recency)
    }
}
