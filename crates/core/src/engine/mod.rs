//! Search engine abstraction
//!
//! Everything the service needs from the backing full-text engine: a
//! document store keyed by string id plus execution of a [`SearchQuery`].
//! Implementations must make writes visible to the next read or search.

pub mod memory;

use crate::query::SearchQuery;
use crate::types::{IndexReceipt, Item};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryEngine;

/// A ranked hit returned by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineHit {
    /// Stored document
    pub item: Item,
    /// Engine relevance score
    pub score: f64,
    /// Computed postal distance, when the query carried a distance decay
    pub distance: Option<f64>,
}

/// Raw result of a query execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSearchResult {
    /// Number of matching documents, independent of the page size
    pub total: u64,
    /// Hits ordered by descending score
    pub hits: Vec<EngineHit>,
}

/// Outcome of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Name of the index or collection holding items
    fn index_name(&self) -> &str;

    /// Check that the engine is reachable
    async fn ping(&self) -> Result<bool>;

    /// Create the index with the item mapping if it does not exist yet.
    /// Returns `true` when the index was created by this call.
    async fn ensure_index(&self) -> Result<bool>;

    /// Fetch a document; `Ok(None)` when the id is unknown
    async fn get(&self, id: &str) -> Result<Option<Item>>;

    async fn exists(&self, id: &str) -> Result<bool>;

    /// Write the full document, replacing any previous version, and make it
    /// visible to subsequent reads before returning
    async fn put(&self, item: &Item) -> Result<IndexReceipt>;

    async fn delete(&self, id: &str) -> Result<DeleteOutcome>;

    /// Execute a ranked query
    async fn search(&self, query: &SearchQuery) -> Result<EngineSearchResult>;
}
