//! Ranked search and autocomplete
//!
//! Parameters are validated in full before the engine is contacted; a request
//! rejected here never costs an engine round trip.

use crate::assembler::{ResultAssembler, SearchResponse};
use crate::config::SearchSettings;
use crate::engine::SearchEngine;
use crate::query::QueryBuilder;
use crate::{ItemSearchError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters accepted by the search and suggestion endpoints, either from
/// the query string or from a JSON body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, alias = "postal_code")]
    pub zipcode: Option<String>,
    /// Ignored by suggestions
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchRequest {
    pub fn new<Q: Into<String>, Z: Into<String>>(query: Q, zipcode: Z) -> Self {
        Self {
            query: Some(query.into()),
            zipcode: Some(zipcode.into()),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Which page size policy applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Search,
    Suggestions,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Search => "search",
            SearchKind::Suggestions => "suggestions",
        }
    }
}

#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    builder: QueryBuilder,
    assembler: ResultAssembler,
    settings: SearchSettings,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("index", &self.engine.index_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl SearchService {
    pub fn new(engine: Arc<dyn SearchEngine>, settings: SearchSettings) -> Self {
        Self {
            builder: QueryBuilder::new(&settings),
            assembler: ResultAssembler::new(),
            engine,
            settings,
        }
    }

    /// Replace the query builder, e.g. to use custom weights
    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Ranked search honoring the caller's `limit`
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.run(SearchKind::Search, request).await
    }

    /// Autocomplete with the fixed suggestion page size
    pub async fn suggest(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.run(SearchKind::Suggestions, request).await
    }

    pub async fn run(&self, kind: SearchKind, request: &SearchRequest) -> Result<SearchResponse> {
        let text = required(request.query.as_deref(), "query")?;
        let zipcode = required(request.zipcode.as_deref(), "zipcode")?;
        let limit = match kind {
            SearchKind::Search => self.resolve_limit(request.limit)?,
            SearchKind::Suggestions => self.settings.suggestion_limit,
        };

        let query = self.builder.build(text, zipcode, limit)?;
        let distance_applied = query.decay().is_some();
        debug!(
            kind = kind.as_str(),
            query = text,
            zipcode = zipcode,
            limit = limit,
            distance_applied = distance_applied,
            "Executing search"
        );

        let started = Instant::now();
        let result = self.engine.search(&query).await?;
        let response = self.assembler.assemble(
            result,
            request.query.as_deref().unwrap_or(text),
            request.zipcode.as_deref().unwrap_or(zipcode),
            distance_applied,
            started.elapsed(),
        );

        info!(
            kind = kind.as_str(),
            query = text,
            total = response.meta.total,
            count = response.meta.count,
            time_ms = response.meta.time_ms,
            "Search completed"
        );
        Ok(response)
    }

    /// Page size for `/search`: default when absent, rejected outside
    /// `1..=max_limit`
    pub fn resolve_limit(&self, limit: Option<i64>) -> Result<usize> {
        match limit {
            None => Ok(self.settings.default_limit),
            Some(n) if n <= 0 => Err(ItemSearchError::validation(
                "Limit must be greater than 0",
            )),
            Some(n) if n as u64 > self.settings.max_limit as u64 => Err(
                ItemSearchError::validation(format!(
                    "Limit cannot exceed {}",
                    self.settings.max_limit
                )),
            ),
            Some(n) => Ok(n as usize),
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ItemSearchError::missing_parameter(name)),
    }
}
