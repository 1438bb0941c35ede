//! Ranked search query construction

use super::clause::{BoostMode, Clause, Fuzziness, MinimumShouldMatch, SearchQuery};
use crate::config::SearchSettings;
use crate::postal::{parse_postal_code, DistanceDecay};
use crate::{ItemSearchError, Result};

/// Boosts and thresholds of the relevance clauses
#[derive(Debug, Clone, PartialEq)]
pub struct RankingWeights {
    /// Exact phrase on `name`; the strongest signal
    pub name_phrase: f64,
    /// Edit-distance tolerant match on `name`
    pub name_fuzzy: f64,
    pub description: f64,
    pub tags: f64,
    pub suggest_input: f64,
    /// Leading characters a fuzzy `name` term must share with the query
    pub fuzzy_prefix_length: usize,
    /// Share of query terms `description` must contain
    pub description_minimum_should_match: MinimumShouldMatch,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            name_phrase: 10.0,
            name_fuzzy: 3.0,
            description: 1.0,
            tags: 2.0,
            suggest_input: 2.0,
            fuzzy_prefix_length: 1,
            description_minimum_should_match: MinimumShouldMatch(75),
        }
    }
}

/// Builds the boosted relevance query for a text query and postal code
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    weights: RankingWeights,
    distance_scale: f64,
    distance_floor: f64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(&SearchSettings::default())
    }
}

impl QueryBuilder {
    /// Create a builder using the configured decay curve
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            weights: RankingWeights::default(),
            distance_scale: settings.distance_scale,
            distance_floor: settings.distance_floor,
        }
    }

    /// Replace the default clause weights
    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Build the query.
    ///
    /// Both `text_query` and `postal_code` must be non-blank; this is checked
    /// before anything is constructed. A postal code that is not exactly five
    /// digits disables distance scoring instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `ItemSearchError::Validation` for a blank query or postal code
    pub fn build(&self, text_query: &str, postal_code: &str, limit: usize) -> Result<SearchQuery> {
        let text = text_query.trim();
        if text.is_empty() {
            return Err(ItemSearchError::missing_parameter("query"));
        }
        if postal_code.trim().is_empty() {
            return Err(ItemSearchError::missing_parameter("zipcode"));
        }

        let relevance = self.relevance_clause(text);

        let root = match parse_postal_code(postal_code) {
            Some(origin) => Clause::FunctionScore {
                query: Box::new(relevance),
                decay: DistanceDecay::new(origin, self.distance_scale, self.distance_floor),
                boost_mode: BoostMode::Multiply,
            },
            None => {
                tracing::debug!(
                    postal_code = postal_code,
                    "Postal code unusable, ranking by text relevance only"
                );
                relevance
            }
        };

        Ok(SearchQuery { root, size: limit })
    }

    /// The weighted disjunction over all text fields; at least one clause
    /// must match
    pub fn relevance_clause(&self, text: &str) -> Clause {
        let w = &self.weights;

        Clause::BoolShould {
            clauses: vec![
                Clause::Phrase {
                    field: "name".to_string(),
                    query: text.to_string(),
                    boost: w.name_phrase,
                },
                Clause::Fuzzy {
                    field: "name".to_string(),
                    query: text.to_string(),
                    fuzziness: Fuzziness::Auto,
                    prefix_length: w.fuzzy_prefix_length,
                    boost: w.name_fuzzy,
                },
                Clause::Match {
                    field: "description".to_string(),
                    query: text.to_string(),
                    minimum_should_match: Some(w.description_minimum_should_match),
                    boost: w.description,
                },
                Clause::Term {
                    field: "tags".to_string(),
                    value: text.to_string(),
                    boost: w.tags,
                },
                Clause::Prefix {
                    field: "suggest_input".to_string(),
                    query: text.to_string(),
                    boost: w.suggest_input,
                },
            ],
            minimum_should_match: 1,
        }
    }
}
