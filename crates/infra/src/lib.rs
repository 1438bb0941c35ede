//! ItemSearch Infrastructure Library
//!
//! Infrastructure components for the ItemSearch service: the Elasticsearch
//! client behind the core `SearchEngine` trait and logging setup.

use itemsearch_core::{InMemoryEngine, Result, SearchEngine, ServiceConfig};
use std::str::FromStr;
use std::sync::Arc;

pub mod elasticsearch;
pub mod logger;

pub use elasticsearch::{ElasticsearchClient, ElasticsearchConfig};
pub use logger::{init_logger, init_test_logger, LogLevel, LoggerConfig};

/// Infrastructure version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which search engine implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Elasticsearch,
    /// Process-local engine; contents are lost on exit
    Memory,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(EngineKind::Elasticsearch),
            "memory" | "in-memory" => Ok(EngineKind::Memory),
            other => Err(format!("Unknown engine: {}", other)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Elasticsearch => write!(f, "elasticsearch"),
            EngineKind::Memory => write!(f, "memory"),
        }
    }
}

/// Construct the engine handle shared by every request
pub fn build_engine(kind: EngineKind, config: &ServiceConfig) -> Result<Arc<dyn SearchEngine>> {
    tracing::info!(engine = %kind, index = %config.engine.index, "Initializing search engine v{}", VERSION);

    match kind {
        EngineKind::Elasticsearch => {
            let client = ElasticsearchClient::new(ElasticsearchConfig::from(&config.engine))?;
            tracing::info!("Elasticsearch URL: {}", config.engine.url);
            Ok(Arc::new(client))
        }
        EngineKind::Memory => Ok(Arc::new(InMemoryEngine::new(config.engine.index.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("memory".parse::<EngineKind>().unwrap(), EngineKind::Memory);
        assert_eq!(
            "Elasticsearch".parse::<EngineKind>().unwrap(),
            EngineKind::Elasticsearch
        );
        assert!("solr".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::default().to_string(), "elasticsearch");
    }

    #[tokio::test]
    async fn test_build_memory_engine() {
        let config = ServiceConfig::default();
        let engine = build_engine(EngineKind::Memory, &config).unwrap();
        assert_eq!(engine.index_name(), "items");
        assert!(engine.ping().await.unwrap());
    }

    #[test]
    fn test_build_elasticsearch_engine() {
        let config = ServiceConfig::default();
        let engine = build_engine(EngineKind::Elasticsearch, &config).unwrap();
        assert_eq!(engine.index_name(), "items");
    }
}
