pub mod types;
pub mod utils;
pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod sources;
pub mod processing;
pub mod link_resolver;
pub mod keyword_search;
pub mod llm_adapter;
pub mod selector;
pub mod media;
pub mod gate;
pub mod pipeline;

pub use types::*;
pub use catalog::{SourceCatalog, SourceEntry};
pub use config::RunConfig;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use traits::{PullFeed, SearchFeed};
pub use processing::{CandidateFilter, ExclusionFilter, RecencyFilter};
pub use link_resolver::LinkResolver;
pub use keyword_search::KeywordSearchCollector;
pub use llm_adapter::{ClaudeRankingService, MockRankingService, RankingService};
pub use selector::CandidateSelector;
pub use media::{MediaResolver, ObjectStore, SupabaseStore};
pub use gate::{AlwaysRun, IntervalGate, RunGate};
pub use pipeline::{PipelineBuilder, PipelineOrchestrator, RunOutcome, RunReport, RunState};
