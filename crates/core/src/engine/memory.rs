//! In-process search engine
//!
//! Evaluates the [`Clause`] tree directly over documents held in memory. Text
//! analysis is deliberately simple: lowercase alphanumeric tokens, no stemming.
//! Scores are the clause boost scaled by the share of query terms that
//! matched, summed across the matching `BoolShould` branches, so they rank
//! like the real engine without reproducing its BM25 magnitudes.

use super::{DeleteOutcome, EngineHit, EngineSearchResult, SearchEngine};
use crate::query::{Clause, Fuzziness, MinimumShouldMatch, SearchQuery};
use crate::types::{IndexReceipt, Item};
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Search engine keeping every document in a process-local map
#[derive(Debug)]
pub struct InMemoryEngine {
    index: String,
    documents: RwLock<BTreeMap<String, Item>>,
    calls: AtomicUsize,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new("items")
    }
}

impl InMemoryEngine {
    pub fn new<S: Into<String>>(index: S) -> Self {
        Self {
            index: index.into(),
            documents: RwLock::new(BTreeMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of engine operations served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }

    async fn ensure_index(&self) -> Result<bool> {
        Ok(false)
    }

    async fn get(&self, id: &str) -> Result<Option<Item>> {
        self.record_call();
        Ok(self.documents.read().get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.record_call();
        Ok(self.documents.read().contains_key(id))
    }

    async fn put(&self, item: &Item) -> Result<IndexReceipt> {
        self.record_call();
        self.documents.write().insert(item.id.clone(), item.clone());
        Ok(IndexReceipt {
            id: item.id.clone(),
            index: self.index.clone(),
        })
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        self.record_call();
        match self.documents.write().remove(id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<EngineSearchResult> {
        self.record_call();
        let decay = query.decay().copied();

        let mut hits: Vec<EngineHit> = self
            .documents
            .read()
            .values()
            .filter_map(|item| {
                evaluate(&query.root, item).map(|score| EngineHit {
                    item: item.clone(),
                    score,
                    distance: decay.map(|d| d.distance_to(item.address.as_deref())),
                })
            })
            .collect();

        hits.sort_by(rank_order);

        let total = hits.len() as u64;
        hits.truncate(query.size);

        Ok(EngineSearchResult { total, hits })
    }
}

/// Score descending, then distance ascending, then id.
///
/// Once the decay bottoms out at its floor, many hits share a score; the
/// distance keeps closer postal codes ahead and the sentinel last.
fn rank_order(a: &EngineHit, b: &EngineHit) -> Ordering {
    let distance = |hit: &EngineHit| hit.distance.unwrap_or(0.0);
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            distance(a)
                .partial_cmp(&distance(b))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Score of `item` under `clause`, or `None` when the clause does not match
pub fn evaluate(clause: &Clause, item: &Item) -> Option<f64> {
    match clause {
        Clause::Phrase {
            field,
            query,
            boost,
        } => {
            let wanted = tokenize(query);
            best_over_values(item, field, |value| {
                contains_phrase(&tokenize(value), &wanted).then_some(*boost)
            })
        }
        Clause::Fuzzy {
            field,
            query,
            fuzziness,
            prefix_length,
            boost,
        } => {
            let wanted = tokenize(query);
            best_over_values(item, field, |value| {
                let tokens = tokenize(value);
                let matched = wanted
                    .iter()
                    .filter(|q| {
                        tokens
                            .iter()
                            .any(|t| fuzzy_token_match(q, t, *fuzziness, *prefix_length))
                    })
                    .count();
                share(matched, wanted.len(), 1).map(|s| boost * s)
            })
        }
        Clause::Match {
            field,
            query,
            minimum_should_match,
            boost,
        } => {
            let wanted = tokenize(query);
            let required = minimum_should_match
                .unwrap_or(MinimumShouldMatch(0))
                .required(wanted.len());
            best_over_values(item, field, |value| {
                let tokens = tokenize(value);
                let matched = wanted.iter().filter(|q| tokens.contains(q)).count();
                share(matched, wanted.len(), required).map(|s| boost * s)
            })
        }
        Clause::Term {
            field,
            value,
            boost,
        } => {
            let wanted = value.trim().to_lowercase();
            best_over_values(item, field, |candidate| {
                (candidate.trim().to_lowercase() == wanted).then_some(*boost)
            })
        }
        Clause::Prefix {
            field,
            query,
            boost,
        } => {
            let wanted = tokenize(query);
            best_over_values(item, field, |value| {
                let tokens = tokenize(value);
                let matched = wanted
                    .iter()
                    .enumerate()
                    .filter(|(i, q)| {
                        if *i + 1 == wanted.len() {
                            tokens.iter().any(|t| t.starts_with(q.as_str()))
                        } else {
                            tokens.contains(q)
                        }
                    })
                    .count();
                share(matched, wanted.len(), 1).map(|s| boost * s)
            })
        }
        Clause::BoolShould {
            clauses,
            minimum_should_match,
        } => {
            let scores: Vec<f64> = clauses.iter().filter_map(|c| evaluate(c, item)).collect();
            if scores.is_empty() || scores.len() < *minimum_should_match {
                None
            } else {
                Some(scores.iter().sum())
            }
        }
        Clause::FunctionScore {
            query,
            decay,
            boost_mode,
        } => {
            let text_score = evaluate(query, item)?;
            let distance = decay.distance_to(item.address.as_deref());
            Some(boost_mode.combine(text_score, decay.factor(distance)))
        }
    }
}

fn best_over_values<F>(item: &Item, field: &str, mut score: F) -> Option<f64>
where
    F: FnMut(&str) -> Option<f64>,
{
    item.field_values(field)
        .into_iter()
        .filter_map(|value| score(value))
        .fold(None, |best, s| match best {
            Some(b) if b >= s => Some(b),
            _ => Some(s),
        })
}

/// Share of matched terms when at least `required` matched
fn share(matched: usize, total: usize, required: usize) -> Option<f64> {
    if total == 0 || matched == 0 || matched < required {
        None
    } else {
        Some(matched as f64 / total as f64)
    }
}

/// Lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|window| window == phrase)
}

fn fuzzy_token_match(query: &str, token: &str, fuzziness: Fuzziness, prefix_length: usize) -> bool {
    let q: Vec<char> = query.chars().collect();
    let t: Vec<char> = token.chars().collect();

    let prefix = prefix_length.min(q.len());
    if t.len() < prefix || q[..prefix] != t[..prefix] {
        return false;
    }

    levenshtein(&q, &t) <= fuzziness.max_edits(q.len())
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postal::DistanceDecay;
    use crate::query::{BoostMode, QueryBuilder};
    use serde_json::json;

    fn item(id: &str, name: &str, address: Option<&str>) -> Item {
        let mut body = json!({
            "id": id,
            "name": name,
            "suggest_input": [name],
        });
        if let Some(address) = address {
            body["address"] = json!(address);
        }
        Item::from_request(body).unwrap()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Joe's Pizza-Bar, NYC"), vec!["joe", "s", "pizza", "bar", "nyc"]);
        assert!(tokenize("  ,, ").is_empty());
    }

    #[test]
    fn test_levenshtein() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("cafe"), &chars("cafe")), 0);
        assert_eq!(levenshtein(&chars("cafe"), &chars("caffe")), 1);
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
    }

    #[test]
    fn test_fuzzy_respects_prefix_length() {
        assert!(fuzzy_token_match("pizza", "pizzq", Fuzziness::Auto, 1));
        assert!(!fuzzy_token_match("pizza", "bizza", Fuzziness::Auto, 1));
        assert!(fuzzy_token_match("pizza", "bizza", Fuzziness::Auto, 0));
        assert!(!fuzzy_token_match("ab", "ac", Fuzziness::Auto, 0));
    }

    #[test]
    fn test_phrase_requires_adjacent_terms() {
        let clause = Clause::Phrase {
            field: "name".into(),
            query: "sunny cafe".into(),
            boost: 10.0,
        };
        assert_eq!(evaluate(&clause, &item("1", "The Sunny Cafe", None)), Some(10.0));
        assert_eq!(evaluate(&clause, &item("2", "Cafe Sunny", None)), None);
    }

    #[test]
    fn test_match_minimum_should_match() {
        let mut doc = item("1", "x", None);
        doc.description = "fresh coffee and pastries".to_string();

        let clause = Clause::Match {
            field: "description".into(),
            query: "fresh coffee with tea".into(),
            minimum_should_match: Some(MinimumShouldMatch(75)),
            boost: 1.0,
        };
        // 2 of 4 terms match, 3 are required
        assert_eq!(evaluate(&clause, &doc), None);

        let clause = Clause::Match {
            field: "description".into(),
            query: "fresh coffee pastries".into(),
            minimum_should_match: Some(MinimumShouldMatch(75)),
            boost: 1.0,
        };
        assert_eq!(evaluate(&clause, &doc), Some(1.0));
    }

    #[test]
    fn test_term_is_case_insensitive_whole_value() {
        let mut doc = item("1", "x", None);
        doc.tags = vec!["Coffee".to_string(), "ice cream".to_string()];

        let term = |value: &str| Clause::Term {
            field: "tags".into(),
            value: value.into(),
            boost: 2.0,
        };
        assert_eq!(evaluate(&term("coffee"), &doc), Some(2.0));
        assert_eq!(evaluate(&term("ice cream"), &doc), Some(2.0));
        assert_eq!(evaluate(&term("ice"), &doc), None);
    }

    #[test]
    fn test_prefix_matches_partial_last_term() {
        let clause = Clause::Prefix {
            field: "suggest_input".into(),
            query: "sunny ca".into(),
            boost: 2.0,
        };
        assert_eq!(evaluate(&clause, &item("1", "Sunny Cafe", None)), Some(2.0));
        assert_eq!(evaluate(&clause, &item("2", "Rainy Day", None)), None);
    }

    #[test]
    fn test_function_score_multiplies_decay() {
        let decay = DistanceDecay::new(10001, 100.0, 0.1);
        let clause = Clause::FunctionScore {
            query: Box::new(Clause::Phrase {
                field: "name".into(),
                query: "cafe".into(),
                boost: 10.0,
            }),
            decay,
            boost_mode: BoostMode::Multiply,
        };

        let near = evaluate(&clause, &item("1", "Cafe", Some("NY 10001"))).unwrap();
        let far = evaluate(&clause, &item("2", "Cafe", Some("NY 10051"))).unwrap();
        let unknown = evaluate(&clause, &item("3", "Cafe", None)).unwrap();

        assert_eq!(near, 10.0);
        assert!((far - 2.5).abs() < 1e-9);
        assert!(unknown < far);
        assert!(evaluate(&clause, &item("4", "Diner", Some("NY 10001"))).is_none());
    }

    #[tokio::test]
    async fn test_crud_operations() {
        let engine = InMemoryEngine::new("items");
        let doc = item("7", "Noodle Shop", None);

        let receipt = engine.put(&doc).await.unwrap();
        assert_eq!(receipt.index, "items");
        assert!(engine.exists("7").await.unwrap());
        assert_eq!(engine.get("7").await.unwrap(), Some(doc));
        assert_eq!(engine.delete("7").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(engine.delete("7").await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(engine.get("7").await.unwrap(), None);
        assert_eq!(engine.call_count(), 6);
    }

    #[tokio::test]
    async fn test_search_orders_and_truncates() {
        let engine = InMemoryEngine::default();
        for (id, name, zip) in [
            ("1", "Pizza Corner", "10001"),
            ("2", "Pizza Palace", "10090"),
            ("3", "Pizza Express", "10040"),
            ("4", "Taco Fiesta", "10001"),
        ] {
            let address = format!("1 Main St, NY {}", zip);
            engine.put(&item(id, name, Some(&address))).await.unwrap();
        }

        let query = QueryBuilder::default().build("pizza", "10001", 2).unwrap();
        let result = engine.search(&query).await.unwrap();

        assert_eq!(result.total, 3);
        let ids: Vec<_> = result.hits.iter().map(|h| h.item.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(result.hits[0].distance, Some(0.0));
        assert_eq!(result.hits[1].distance, Some(39.0));
    }

    #[tokio::test]
    async fn test_floor_ties_break_on_distance() {
        let engine = InMemoryEngine::default();
        engine.put(&item("a_far", "Corner Bakery", Some("NY 10400"))).await.unwrap();
        engine.put(&item("b_near", "Corner Bakery", Some("NY 10150"))).await.unwrap();
        engine.put(&item("c_nozip", "Corner Bakery", None)).await.unwrap();

        let query = QueryBuilder::default().build("bakery", "10001", 10).unwrap();
        let result = engine.search(&query).await.unwrap();

        let ids: Vec<_> = result.hits.iter().map(|h| h.item.id.as_str()).collect();
        assert_eq!(ids, vec!["b_near", "a_far", "c_nozip"]);
        assert_eq!(result.hits[0].score, result.hits[2].score);
        assert_eq!(result.hits[0].distance, Some(149.0));
        assert_eq!(result.hits[1].distance, Some(399.0));
    }
}
