//! Structured relevance query tree
//!
//! The tree is engine independent: the Elasticsearch client renders it to the
//! Query DSL, the in-memory engine evaluates it directly.

use crate::postal::DistanceDecay;
use serde::{Deserialize, Serialize};

/// A node of the relevance query tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// All query terms in order, adjacent
    Phrase {
        field: String,
        query: String,
        boost: f64,
    },
    /// Terms matched with an edit-distance tolerance
    Fuzzy {
        field: String,
        query: String,
        fuzziness: Fuzziness,
        /// Leading characters that must match exactly
        prefix_length: usize,
        boost: f64,
    },
    /// Analyzed term match, optionally requiring a share of the terms
    Match {
        field: String,
        query: String,
        minimum_should_match: Option<MinimumShouldMatch>,
        boost: f64,
    },
    /// Whole-value match against a keyword field, case-insensitive
    Term {
        field: String,
        value: String,
        boost: f64,
    },
    /// Term match where the last query term may be a prefix
    Prefix {
        field: String,
        query: String,
        boost: f64,
    },
    /// Weighted disjunction; scores of matching clauses are summed
    BoolShould {
        clauses: Vec<Clause>,
        minimum_should_match: usize,
    },
    /// Text relevance blended with a distance-derived factor
    FunctionScore {
        query: Box<Clause>,
        decay: DistanceDecay,
        boost_mode: BoostMode,
    },
}

impl Clause {
    /// Short tag used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Clause::Phrase { .. } => "phrase",
            Clause::Fuzzy { .. } => "fuzzy",
            Clause::Match { .. } => "match",
            Clause::Term { .. } => "term",
            Clause::Prefix { .. } => "prefix",
            Clause::BoolShould { .. } => "bool_should",
            Clause::FunctionScore { .. } => "function_score",
        }
    }

    /// Number of leaf clauses in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Clause::BoolShould { clauses, .. } => clauses.iter().map(Clause::leaf_count).sum(),
            Clause::FunctionScore { query, .. } => query.leaf_count(),
            _ => 1,
        }
    }

    /// The distance decay attached anywhere in the tree, if any
    pub fn decay(&self) -> Option<&DistanceDecay> {
        match self {
            Clause::FunctionScore { decay, .. } => Some(decay),
            Clause::BoolShould { clauses, .. } => clauses.iter().find_map(Clause::decay),
            _ => None,
        }
    }
}

/// Edit-distance tolerance for fuzzy matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuzziness {
    /// Tolerance grows with term length: exact up to 2 chars, one edit up to
    /// 5, two edits beyond
    Auto,
    Fixed(u8),
}

impl Fuzziness {
    /// Maximum edits allowed for a term of `term_len` characters
    pub fn max_edits(&self, term_len: usize) -> usize {
        match self {
            Fuzziness::Auto => match term_len {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
            Fuzziness::Fixed(n) => usize::from(*n).min(2),
        }
    }
}

/// Share of query terms that must match, as a percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumShouldMatch(pub u8);

impl MinimumShouldMatch {
    /// Required matching terms out of `term_count`; rounds down, never below one
    pub fn required(&self, term_count: usize) -> usize {
        let percent = usize::from(self.0.min(100));
        (term_count * percent / 100).max(1)
    }
}

impl std::fmt::Display for MinimumShouldMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// How a function score is combined with the text relevance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostMode {
    Multiply,
}

impl BoostMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostMode::Multiply => "multiply",
        }
    }

    pub fn combine(&self, text_score: f64, factor: f64) -> f64 {
        match self {
            BoostMode::Multiply => text_score * factor,
        }
    }
}

/// A complete query handed to the search engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Root of the relevance tree
    pub root: Clause,
    /// Maximum hits to return
    pub size: usize,
}

impl SearchQuery {
    /// Distance decay applied by this query, when the query postal code was
    /// usable
    pub fn decay(&self) -> Option<&DistanceDecay> {
        self.root.decay()
    }
}
