//! Mapping engine hits to the public search response

use crate::engine::EngineSearchResult;
use crate::postal::is_real_distance;
use crate::types::Item;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One ranked item as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(flatten)]
    pub item: Item,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Response metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Documents matched by the engine, beyond the returned page
    pub total: u64,
    /// Items in this page
    pub count: usize,
    pub time_ms: u64,
    pub query: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<ItemResult>,
    pub meta: SearchMeta,
}

/// Builds [`SearchResponse`] values from raw engine results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble a response.
    ///
    /// `distance_applied` is whether the query carried a distance function;
    /// without it no item reports a distance, even if the engine sent one.
    /// Sentinel distances for items without a postal code are dropped too.
    pub fn assemble(
        &self,
        result: EngineSearchResult,
        query: &str,
        zipcode: &str,
        distance_applied: bool,
        elapsed: Duration,
    ) -> SearchResponse {
        let items: Vec<ItemResult> = result
            .hits
            .into_iter()
            .map(|hit| ItemResult {
                item: hit.item,
                score: hit.score,
                distance: hit
                    .distance
                    .filter(|d| distance_applied && is_real_distance(*d)),
            })
            .collect();

        SearchResponse {
            meta: SearchMeta {
                total: result.total,
                count: items.len(),
                time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                query: query.to_string(),
                zipcode: zipcode.to_string(),
            },
            items,
        }
    }
}
