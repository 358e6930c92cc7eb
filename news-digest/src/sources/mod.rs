pub mod google_news;
pub mod rss_feed;

pub use google_news::{GoogleNewsSearch, SearchLocale};
pub use rss_feed::RssFeedSource;

use crate::processing::RecencyFilter;
use crate::traits::PullFeed;
use crate::types::{Candidate, PipelineError, StageResult};
use std::time::Duration;
use tracing::warn;

/// Pulls one source at a time under a hard timeout. A failing source
/// yields an empty list and a recorded reason, never an error.
#[derive(Debug, Clone, Copy)]
pub struct FeedFetcher {
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn fetch(
        &self,
        source: &dyn PullFeed,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> StageResult<Vec<Candidate>> {
        if max_items == 0 {
            return StageResult::ok(Vec::new());
        }

        let source_id = source.source_id();
        match tokio::time::timeout(self.timeout, source.pull(max_items, recency)).await {
            Ok(Ok(candidates)) => StageResult::ok(enforce_boundary(candidates, max_items, recency)),
            Ok(Err(e)) => {
                warn!("Source {} failed, skipping: {}", source_id, e);
                StageResult::degraded(Vec::new(), format!("{}: {}", source_id, e))
            }
            Err(_) => {
                let e = PipelineError::Timeout {
                    what: format!("source {}", source_id),
                    seconds: self.timeout.as_secs(),
                };
                warn!("{}, skipping", e);
                StageResult::degraded(Vec::new(), format!("{}: {}", source_id, e))
            }
        }
    }
}

/// Re-check the candidate invariants on whatever a source returned.
fn enforce_boundary(
    candidates: Vec<Candidate>,
    max_items: usize,
    recency: &RecencyFilter,
) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !c.title.trim().is_empty())
        .filter(|c| recency.admits(c))
        .map(|mut c| {
            c.summary = crate::utils::text::truncate_summary(&c.summary);
            c
        })
        .take(max_items)
        .collect()
}
