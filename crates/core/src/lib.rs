//! ItemSearch Core Library
//!
//! Item model, relevance query construction and result assembly for the
//! ItemSearch service. The search engine itself sits behind the
//! [`SearchEngine`] trait; an in-memory implementation lives here and the
//! Elasticsearch client lives in the infra crate.

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod postal;
pub mod query;
pub mod search;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use assembler::{ItemResult, ResultAssembler, SearchMeta, SearchResponse};
pub use config::{EngineSettings, LoggingSettings, SearchSettings, ServerSettings, ServiceConfig};
pub use engine::{DeleteOutcome, EngineHit, EngineSearchResult, InMemoryEngine, SearchEngine};
pub use error::{ErrorCategory, ItemSearchError, Result};
pub use postal::{DistanceDecay, SENTINEL_DISTANCE};
pub use query::{Clause, QueryBuilder, RankingWeights, SearchQuery};
pub use search::{SearchKind, SearchRequest, SearchService};
pub use store::ItemStore;
pub use types::{IndexReceipt, Item};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
