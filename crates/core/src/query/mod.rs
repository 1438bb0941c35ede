//! Relevance query construction
//!
//! - `clause`: the engine independent query tree
//! - `builder`: turns a text query and postal code into that tree

pub mod builder;
pub mod clause;

pub use builder::{QueryBuilder, RankingWeights};
pub use clause::{BoostMode, Clause, Fuzziness, MinimumShouldMatch, SearchQuery};
