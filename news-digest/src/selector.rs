use crate::llm_adapter::{candidate_digest, RankingRequest, RankingService};
use crate::types::{Candidate, StageResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Chooses the final working set, positionally or through a ranking
/// service when guidance is given.
pub struct CandidateSelector {
    ranking: Option<Arc<dyn RankingService>>,
}

impl CandidateSelector {
    pub fn positional() -> Self {
        Self { ranking: None }
    }

    pub fn with_ranking(ranking: Arc<dyn RankingService>) -> Self {
        Self {
            ranking: Some(ranking),
        }
    }

    pub async fn select(
        &self,
        candidates: Vec<Candidate>,
        target_count: usize,
        guidance: Option<&str>,
    ) -> StageResult<Vec<Candidate>> {
        let guidance = guidance.map(str::trim).filter(|g| !g.is_empty());

        let (Some(guidance), Some(ranking)) = (guidance, self.ranking.as_ref()) else {
            return StageResult::ok(positional(candidates, target_count));
        };

        // Too few to choose from; an exact fit still asks for an order.
        if candidates.len() < target_count {
            return StageResult::ok(candidates);
        }

        let request = RankingRequest {
            digest: candidate_digest(&candidates),
            guidance: guidance.to_string(),
            count: target_count,
        };

        let reason = match ranking.rank(&request).await {
            Ok(selection) => match validate_selection(&selection, target_count, candidates.len()) {
                Ok(()) => {
                    info!(
                        "Selected {} of {} candidates via {}",
                        target_count,
                        candidates.len(),
                        ranking.service_name()
                    );
                    return StageResult::ok(pick(candidates, &selection));
                }
                Err(reason) => reason,
            },
            Err(e) => format!("ranking call failed: {}", e),
        };

        warn!("Discarding ranking answer, using positional selection: {}", reason);
        StageResult::degraded(positional(candidates, target_count), reason)
    }
}

/// First `target_count` candidates in pool order.
pub fn positional(mut candidates: Vec<Candidate>, target_count: usize) -> Vec<Candidate> {
    candidates.truncate(target_count);
    candidates
}

/// Exactly `target_count` distinct 1-indexed positions within the pool.
pub fn validate_selection(
    selection: &[usize],
    target_count: usize,
    pool_size: usize,
) -> std::result::Result<(), String> {
    if selection.len() != target_count {
        return Err(format!(
            "expected {} selections, got {}",
            target_count,
            selection.len()
        ));
    }

    if let Some(bad) = selection.iter().find(|&&i| i == 0 || i > pool_size) {
        return Err(format!("selection {} outside 1..={}", bad, pool_size));
    }

    let distinct: HashSet<_> = selection.iter().collect();
    if distinct.len() != selection.len() {
        return Err(format!("duplicate selections in {:?}", selection));
    }

    Ok(())
}

/// Candidates at the given 1-indexed positions, in the order returned.
fn pick(candidates: Vec<Candidate>, selection: &[usize]) -> Vec<Candidate> {
    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    selection
        .iter()
        .filter_map(|&i| slots.get_mut(i - 1).and_then(Option::take))
        .collect()
}
