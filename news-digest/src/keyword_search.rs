use crate::processing::RecencyFilter;
use crate::traits::SearchFeed;
use crate::types::{Candidate, PipelineError, StageResult};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Lower bound on items requested per keyword.
pub const MIN_ITEMS_PER_KEYWORD: usize = 4;

const DEFAULT_CONCURRENT_SEARCHES: usize = 4;

/// Acquires candidates by keyword search instead of static feeds.
pub struct KeywordSearchCollector {
    search: Box<dyn SearchFeed>,
    timeout: Duration,
    max_concurrent: usize,
}

impl KeywordSearchCollector {
    pub fn new(search: Box<dyn SearchFeed>, timeout: Duration) -> Self {
        Self {
            search,
            timeout,
            max_concurrent: DEFAULT_CONCURRENT_SEARCHES,
        }
    }

    /// Cap on searches in flight at once.
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn per_keyword_count(target_count: usize, keyword_count: usize) -> usize {
        if keyword_count == 0 {
            return 0;
        }
        target_count.div_ceil(keyword_count).max(MIN_ITEMS_PER_KEYWORD)
    }

    /// Query every keyword, merge with first-title-wins dedup, sort newest
    /// first and truncate to `target_count`.
    ///
    /// The whole multi-keyword pool is gathered before truncating since
    /// ranking across keywords needs every result.
    pub async fn collect(
        &self,
        keywords: &[String],
        target_count: usize,
        recency: &RecencyFilter,
    ) -> StageResult<Vec<Candidate>> {
        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() || target_count == 0 {
            return StageResult::ok(Vec::new());
        }

        let per_keyword = Self::per_keyword_count(target_count, keywords.len());
        info!(
            "Searching {} keywords, {} items each",
            keywords.len(),
            per_keyword
        );

        let outcomes: Vec<_> = stream::iter(keywords.iter().copied())
            .map(|keyword| async move {
                let outcome = tokio::time::timeout(
                    self.timeout,
                    self.search.search(keyword, per_keyword, recency),
                )
                .await;
                (keyword, outcome)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut failures = Vec::new();
        let mut per_keyword_results = Vec::new();
        for (keyword, outcome) in outcomes {
            match outcome {
                Ok(Ok(candidates)) => per_keyword_results.push(candidates),
                Ok(Err(e)) => {
                    warn!("Keyword search '{}' failed: {}", keyword, e);
                    failures.push(format!("{}: {}", keyword, e));
                }
                Err(_) => {
                    let e = PipelineError::Timeout {
                        what: format!("search '{}'", keyword),
                        seconds: self.timeout.as_secs(),
                    };
                    warn!("{}", e);
                    failures.push(format!("{}: {}", keyword, e));
                }
            }
        }

        StageResult {
            value: merge_results(per_keyword_results, target_count),
            failures,
        }
    }
}

/// Exact, case-sensitive title dedup (first occurrence wins), then a
/// stable newest-first sort with undated items last.
pub fn merge_results(per_keyword: Vec<Vec<Candidate>>, target_count: usize) -> Vec<Candidate> {
    let mut seen_titles = HashSet::new();
    let mut merged: Vec<Candidate> = per_keyword
        .into_iter()
        .flatten()
        .filter(|c| !c.title.trim().is_empty())
        .filter(|c| seen_titles.insert(c.title.clone()))
        .collect();

    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged.truncate(target_count);
    merged
}
