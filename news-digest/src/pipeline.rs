use crate::config::RunConfig;
use crate::gate::{IntervalGate, RunGate};
use crate::keyword_search::KeywordSearchCollector;
use crate::link_resolver::LinkResolver;
use crate::llm_adapter::{ClaudeRankingService, RankingService};
use crate::media::{MediaResolver, ObjectStore, SupabaseStore};
use crate::processing::{CandidateFilter, ExclusionFilter, RecencyFilter};
use crate::selector::CandidateSelector;
use crate::sources::{FeedFetcher, GoogleNewsSearch, RssFeedSource, SearchLocale};
use crate::traits::{PullFeed, SearchFeed};
use crate::types::{Candidate, PipelineError, Result, StageResult};
use crate::{FeedParser, Fetcher};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a run is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    SourceSelection,
    Fetching,
    Normalizing,
    Excluding,
    Selecting,
    ResolvingMedia,
    Done,
    Skipped,
    Failed,
}

/// Items leaving a stage and the failures it absorbed.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: RunState,
    pub items: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Done { selected: Vec<Candidate> },
    Skipped { reason: String },
    Failed { reason: String },
}

/// Everything the scheduler/notifier needs to know about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<FixedOffset>,
    pub stages: Vec<StageReport>,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(started_at: DateTime<FixedOffset>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            stages: Vec::new(),
            outcome: RunOutcome::Skipped {
                reason: "not started".to_string(),
            },
        }
    }

    fn record<T>(&mut self, stage: RunState, result: &StageResult<T>, items: usize) {
        debug!(
            "Stage {:?}: {} items, {} failures",
            stage,
            items,
            result.failures.len()
        );
        self.stages.push(StageReport {
            stage,
            items,
            failures: result.failures.clone(),
        });
    }

    pub fn final_state(&self) -> RunState {
        match self.outcome {
            RunOutcome::Done { .. } => RunState::Done,
            RunOutcome::Skipped { .. } => RunState::Skipped,
            RunOutcome::Failed { .. } => RunState::Failed,
        }
    }

    pub fn selected(&self) -> Option<&[Candidate]> {
        match &self.outcome {
            RunOutcome::Done { selected } => Some(selected),
            _ => None,
        }
    }

    pub fn stage(&self, stage: RunState) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Sequences acquisition, normalisation, exclusion, selection and media
/// resolution for a single run.
pub struct PipelineOrchestrator {
    config: RunConfig,
    display_offset: FixedOffset,
    sources: Vec<Box<dyn PullFeed>>,
    keyword_search: Option<KeywordSearchCollector>,
    feed_fetcher: FeedFetcher,
    link_resolver: LinkResolver,
    selector: CandidateSelector,
    media: MediaResolver,
    gate: Box<dyn RunGate>,
}

impl PipelineOrchestrator {
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now().with_timezone(&self.display_offset);
        let mut report = RunReport::new(started_at);
        info!("Starting run {} at {}", report.run_id, started_at);

        if !self.gate.should_run(started_at) {
            info!("Run interval gate declined this run");
            report.outcome = RunOutcome::Skipped {
                reason: format!(
                    "outside the {}h run interval",
                    self.config.run_interval_hours
                ),
            };
            return report;
        }

        // SourceSelection
        let pool_size = self.config.candidate_pool_size();
        let recency =
            RecencyFilter::within_hours(started_at.with_timezone(&Utc), self.config.recency_hours);
        info!(
            "Candidate pool size {}, recency cutoff {}",
            pool_size,
            recency.cutoff()
        );
        report.record(
            RunState::SourceSelection,
            &StageResult::ok(()),
            self.sources.len(),
        );

        // Fetching
        let fetched = self.acquire(pool_size, &recency).await;
        report.record(RunState::Fetching, &fetched, fetched.value.len());
        if fetched.value.is_empty() {
            error!("No candidates from any source, failing run");
            report.outcome = RunOutcome::Failed {
                reason: format!(
                    "total acquisition failure ({} source failures)",
                    fetched.failures.len()
                ),
            };
            return report;
        }

        // Normalizing
        let StageResult { value, failures } =
            self.link_resolver.resolve_all(fetched.into_value()).await;
        let normalized = StageResult {
            value: recency.apply(value),
            failures,
        };
        report.record(RunState::Normalizing, &normalized, normalized.value.len());
        let pool = normalized.into_value();

        // Excluding
        let exclusion = ExclusionFilter::new(&self.config.exclude_keywords);
        if exclusion.is_empty() {
            debug!("No {} terms configured", exclusion.stage_name());
        }
        let pool = exclusion.apply(pool);
        report.record(RunState::Excluding, &StageResult::ok(()), pool.len());

        // Selecting
        let selected = self
            .selector
            .select(pool, self.config.target_count, self.config.guidance())
            .await;
        report.record(RunState::Selecting, &selected, selected.value.len());

        // ResolvingMedia
        let mut selected = selected.into_value();
        let media = self.media.resolve(&mut selected).await;
        report.record(RunState::ResolvingMedia, &media, media.value);

        info!("Run {} done with {} items", report.run_id, selected.len());
        report.outcome = RunOutcome::Done { selected };
        report
    }

    /// Keyword search when keywords are configured, static feeds otherwise
    /// or when the search comes back empty.
    async fn acquire(&self, pool_size: usize, recency: &RecencyFilter) -> StageResult<Vec<Candidate>> {
        let mut failures = Vec::new();

        if let Some(collector) = &self.keyword_search {
            if self.config.interest_keywords.iter().any(|k| !k.trim().is_empty()) {
                let searched = collector
                    .collect(&self.config.interest_keywords, pool_size, recency)
                    .await;
                failures.extend(searched.failures);
                if !searched.value.is_empty() {
                    return StageResult {
                        value: searched.value,
                        failures,
                    };
                }
                warn!("Keyword search returned nothing, falling back to feeds");
            }
        }

        let mut pool: Vec<Candidate> = Vec::new();
        for source in &self.sources {
            let remaining = pool_size.saturating_sub(pool.len());
            if remaining == 0 {
                debug!(
                    "Pool full, not pulling {} ({})",
                    source.source_id(),
                    source.endpoint()
                );
                break;
            }

            let outcome = self.feed_fetcher.fetch(source.as_ref(), remaining, recency).await;
            failures.extend(outcome.failures);
            pool.extend(outcome.value);
        }

        StageResult {
            value: pool,
            failures,
        }
    }
}

/// Builder for wiring an orchestrator from a `RunConfig`
pub struct PipelineBuilder {
    config: RunConfig,
    display_offset: FixedOffset,
    fetcher: Fetcher,
    parser: Arc<FeedParser>,
    sources: Vec<Box<dyn PullFeed>>,
    search: Option<Box<dyn SearchFeed>>,
    ranking: Option<Arc<dyn RankingService>>,
    store: Option<Arc<dyn ObjectStore>>,
    gate: Box<dyn RunGate>,
}

impl PipelineBuilder {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let display_offset = config
            .display_offset()
            .ok_or_else(|| PipelineError::Config("invalid display offset".to_string()))?;
        let fetcher = Fetcher::new(config.fetch_config())?;
        let gate: Box<dyn RunGate> = Box::new(IntervalGate::new(config.run_interval_hours));

        Ok(Self {
            display_offset,
            fetcher,
            parser: Arc::new(FeedParser::new(display_offset)),
            sources: Vec::new(),
            search: None,
            ranking: None,
            store: None,
            gate,
            config,
        })
    }

    pub fn add_source(mut self, source: Box<dyn PullFeed>) -> Self {
        info!("Adding source to pipeline: {}", source.source_id());
        self.sources.push(source);
        self
    }

    /// One RSS source per catalog entry selected by the active set.
    pub fn with_catalog_sources(mut self) -> Self {
        let catalog = self.config.source_catalog();
        let active = self.config.active_set(&catalog);
        for (id, endpoint) in catalog.sources(&active) {
            let source = RssFeedSource::new(id, endpoint, self.fetcher.clone(), self.parser.clone());
            self = self.add_source(Box::new(source));
        }
        self
    }

    pub fn with_search(mut self, search: Box<dyn SearchFeed>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_google_news_search(self) -> Self {
        let settings = self.config.search.clone();
        let search = GoogleNewsSearch::with_base_url(
            settings.base_url,
            self.fetcher.clone(),
            self.parser.clone(),
        )
        .with_locale(SearchLocale {
            language: settings.language,
            country: settings.country,
        });
        self.with_search(Box::new(search))
    }

    pub fn with_ranking(mut self, ranking: Arc<dyn RankingService>) -> Self {
        info!("Using ranking service: {}", ranking.service_name());
        self.ranking = Some(ranking);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_gate(mut self, gate: Box<dyn RunGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Wire ranking and storage from environment secrets. Each is left out,
    /// with a warning, when its secrets are missing.
    pub fn with_environment_collaborators(mut self) -> Result<Self> {
        let ranking = self.config.ranking.clone();
        match std::env::var(&ranking.api_key_env) {
            Ok(key) if !key.is_empty() => {
                let service = ClaudeRankingService::new(
                    ranking.api_url,
                    key,
                    ranking.model,
                    Duration::from_secs(ranking.timeout_seconds),
                )?;
                self = self.with_ranking(Arc::new(service));
            }
            _ => warn!(
                "{} not set, selection will be positional",
                ranking.api_key_env
            ),
        }

        let storage = self.config.storage.clone();
        match (std::env::var(&storage.url_env), std::env::var(&storage.key_env)) {
            (Ok(url), Ok(key)) if !url.is_empty() && !key.is_empty() => {
                let store = SupabaseStore::new(
                    url,
                    key,
                    storage.bucket,
                    Duration::from_secs(storage.timeout_seconds),
                )?;
                self = self.with_store(Arc::new(store));
            }
            _ => warn!(
                "{} / {} not set, images will be dropped",
                storage.url_env, storage.key_env
            ),
        }

        Ok(self)
    }

    pub fn build(self) -> PipelineOrchestrator {
        let timeout = Duration::from_secs(self.config.fetch.timeout_seconds);
        let concurrency = self.fetcher.config().max_concurrent_requests;
        let date_prefix = Utc::now()
            .with_timezone(&self.display_offset)
            .format("%Y%m%d")
            .to_string();

        let selector = match self.ranking {
            Some(ranking) => CandidateSelector::with_ranking(ranking),
            None => CandidateSelector::positional(),
        };

        PipelineOrchestrator {
            display_offset: self.display_offset,
            sources: self.sources,
            keyword_search: self.search.map(|search| {
                KeywordSearchCollector::new(search, timeout).with_concurrency(concurrency)
            }),
            feed_fetcher: FeedFetcher::new(timeout),
            link_resolver: LinkResolver::with_hosts(
                self.fetcher.clone(),
                self.config.fetch.redirect_hosts.clone(),
            ),
            selector,
            media: MediaResolver::new(self.fetcher, self.store, date_prefix),
            gate: self.gate,
            config: self.config,
        }
    }
}
