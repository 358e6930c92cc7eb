use crate::processing::RecencyFilter;
use crate::types::{Candidate, Result};
use async_trait::async_trait;

/// A static feed that yields candidates on demand.
#[async_trait]
pub trait PullFeed: Send + Sync {
    /// Identifier recorded on every candidate from this source
    fn source_id(&self) -> String;

    fn endpoint(&self) -> String;

    /// Fetch at most `max_items` candidates admitted by `recency`.
    async fn pull(&self, max_items: usize, recency: &RecencyFilter) -> Result<Vec<Candidate>>;
}

/// A source that can be queried with free text.
#[async_trait]
pub trait SearchFeed: Send + Sync {
    fn source_id(&self) -> String;

    async fn search(
        &self,
        query: &str,
        max_items: usize,
        recency: &RecencyFilter,
    ) -> Result<Vec<Candidate>>;
}
