use crate::types::{Candidate, StageResult};
use crate::utils::url::extract_host;
use crate::Fetcher;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Hosts whose article links are redirector URLs.
pub const DEFAULT_REDIRECT_HOSTS: &[&str] = &["news.google.com"];

/// Replaces aggregator redirect links with their destination. Any
/// failure leaves the link untouched.
pub struct LinkResolver {
    fetcher: Fetcher,
    redirect_hosts: Vec<String>,
}

impl LinkResolver {
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_hosts(
            fetcher,
            DEFAULT_REDIRECT_HOSTS.iter().map(|h| h.to_string()).collect(),
        )
    }

    pub fn with_hosts(fetcher: Fetcher, redirect_hosts: Vec<String>) -> Self {
        Self {
            fetcher,
            redirect_hosts,
        }
    }

    fn is_redirector(&self, link: &str) -> bool {
        extract_host(link)
            .map(|host| self.redirect_hosts.iter().any(|h| h == &host))
            .unwrap_or(false)
    }

    pub async fn resolve(&self, link: &str) -> StageResult<String> {
        if !self.is_redirector(link) {
            return StageResult::ok(link.to_string());
        }

        match self.fetcher.redirect_target(link).await {
            Ok(Some(target)) => {
                debug!("Resolved {} -> {}", link, target);
                StageResult::ok(target)
            }
            Ok(None) => StageResult::ok(link.to_string()),
            Err(e) => {
                warn!("Could not resolve {}: {}", link, e);
                StageResult::degraded(link.to_string(), format!("{}: {}", link, e))
            }
        }
    }

    /// Resolve every candidate's link, at most `max_concurrent_requests`
    /// at a time, keeping pool order.
    pub async fn resolve_all(&self, candidates: Vec<Candidate>) -> StageResult<Vec<Candidate>> {
        let limit = self.fetcher.config().max_concurrent_requests.max(1);
        let resolved: Vec<StageResult<String>> = stream::iter(candidates.iter())
            .map(|c| self.resolve(&c.link))
            .buffered(limit)
            .collect()
            .await;

        let mut failures = Vec::new();
        let candidates = candidates
            .into_iter()
            .zip(resolved)
            .map(|(mut candidate, outcome)| {
                failures.extend(outcome.failures);
                candidate.link = outcome.value;
                candidate
            })
            .collect();

        StageResult {
            value: candidates,
            failures,
        }
    }
}
