use crate::types::Candidate;
use chrono::{DateTime, Utc};
use tracing::debug;

/// A pure, order-preserving pass over the candidate pool.
pub trait CandidateFilter: Send + Sync {
    fn apply(&self, candidates: Vec<Candidate>) -> Vec<Candidate>;

    fn stage_name(&self) -> String;
}

/// Drops candidates published before the cutoff.
///
/// Undated candidates are admitted. Stale undated items can therefore
/// survive indefinitely; that is the current policy, not an oversight.
#[derive(Debug, Clone, Copy)]
pub struct RecencyFilter {
    cutoff: DateTime<Utc>,
}

impl RecencyFilter {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self { cutoff }
    }

    /// Window ending at `now`. A window reaching past the representable
    /// range admits everything.
    pub fn within_hours(now: DateTime<Utc>, hours: i64) -> Self {
        let cutoff = chrono::Duration::try_hours(hours)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(cutoff)
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn admits(&self, candidate: &Candidate) -> bool {
        match candidate.published_at {
            Some(published) => published.with_timezone(&Utc) >= self.cutoff,
            None => true,
        }
    }
}

impl CandidateFilter for RecencyFilter {
    fn apply(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let before = candidates.len();
        let kept: Vec<Candidate> = candidates.into_iter().filter(|c| self.admits(c)).collect();
        debug!("Recency filter kept {}/{} candidates", kept.len(), before);
        kept
    }

    fn stage_name(&self) -> String {
        "recency".to_string()
    }
}

/// Drops candidates whose title or summary contains any exclusion term,
/// case-insensitively. Identity when no terms are configured.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    terms: Vec<String>,
}

impl ExclusionFilter {
    /// Blank terms are ignored, they would otherwise match everything.
    pub fn new(terms: &[String]) -> Self {
        let terms = terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, candidate: &Candidate) -> Option<&str> {
        let text = candidate.searchable_text().to_lowercase();
        self.terms
            .iter()
            .find(|term| text.contains(term.as_str()))
            .map(|term| term.as_str())
    }
}

impl CandidateFilter for ExclusionFilter {
    fn apply(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.terms.is_empty() {
            return candidates;
        }

        candidates
            .into_iter()
            .filter(|candidate| match self.matches(candidate) {
                Some(term) => {
                    debug!("Excluding '{}' (matched '{}')", candidate.title, term);
                    false
                }
                None => true,
            })
            .collect()
    }

    fn stage_name(&self) -> String {
        "exclusion".to_string()
    }
}
