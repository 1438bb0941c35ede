//! Elasticsearch client implementation for ItemSearch infrastructure
//!
//! Talks to the REST API directly with `reqwest`. The engine independent
//! [`Clause`] tree is rendered to the Query DSL here; distance scoring runs as
//! a painless `script_score` so the cluster needs no plugins.

use async_trait::async_trait;
use itemsearch_core::engine::{DeleteOutcome, EngineHit, EngineSearchResult, SearchEngine};
use itemsearch_core::postal::{DistanceDecay, SENTINEL_DISTANCE};
use itemsearch_core::query::{Clause, Fuzziness, SearchQuery};
use itemsearch_core::{EngineSettings, IndexReceipt, Item, ItemSearchError, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Painless snippet binding `d` to the postal distance of the current
/// document. Scans `address.raw` for the first run of exactly five ASCII
/// digits. Indices created without the item mapping have no `address.raw`;
/// their documents get the sentinel.
const DISTANCE_SCRIPT: &str = "\
String a = doc.containsKey('address.raw') && doc['address.raw'].size() > 0 ? doc['address.raw'].value : ''; \
int run = 0; int start = -1; long code = -1; \
for (int i = 0; i <= a.length(); i++) { \
  int c = i < a.length() ? (int) a.charAt(i) : 0; \
  if (c >= 48 && c <= 57) { if (run == 0) { start = i; } run++; } \
  else { if (run == 5) { code = Long.parseLong(a.substring(start, i)); break; } run = 0; } \
} \
double d = code < 0 ? params.sentinel : Math.abs(code - params.origin); ";

const SCORE_SCRIPT_TAIL: &str =
    "double f = Math.max(Math.max(params.floor, 1.0 - d / params.scale), 0.0); return f * f;";

const DISTANCE_FIELD_TAIL: &str = "return d;";

/// Elasticsearch client configuration
#[derive(Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: String,
    pub timeout: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for ElasticsearchConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            url: settings.url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            index: settings.index.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

impl std::fmt::Debug for ElasticsearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("index", &self.index)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Elasticsearch client implementing [`SearchEngine`]
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    config: ElasticsearchConfig,
    base_url: Url,
    client: reqwest::Client,
    /// Set once the index is known to exist with the item mapping
    index_ready: Arc<OnceCell<()>>,
}

impl ElasticsearchClient {
    /// Create a new client. No request is made until the first operation.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        if base_url.cannot_be_a_base() {
            return Err(ItemSearchError::invalid_config(format!(
                "Elasticsearch URL cannot be used as a base: {}",
                config.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ItemSearchError::engine("connect", e.to_string()))?;

        Ok(Self {
            config,
            base_url,
            client,
            index_ready: Arc::new(OnceCell::new()),
        })
    }

    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// `<base>/<segments...>` with every segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn document_url(&self, id: &str) -> Url {
        self.endpoint(&[self.config.index.as_str(), "_doc", id])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(username) => builder.basic_auth(username, self.config.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            tracing::error!(operation = operation, error = %e, "Elasticsearch request failed");
            ItemSearchError::engine(operation, e.to_string())
        })
    }

    /// Make sure the index exists before the first write so Elasticsearch
    /// never auto-creates it with a dynamic mapping
    async fn prepare_index(&self) -> Result<()> {
        self.index_ready
            .get_or_try_init(|| async { self.ensure_index().await.map(|_| ()) })
            .await
            .map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            ItemSearchError::engine(operation, format!("Failed to parse response: {}", e))
        })
    }
}

/// Turn a non-success status into an engine error carrying the response body
async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(
        operation = operation,
        status = status.as_u16(),
        body = %body,
        "Elasticsearch returned an error"
    );
    Err(ItemSearchError::engine(
        operation,
        format!("status {}: {}", status, body),
    ))
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    fn index_name(&self) -> &str {
        &self.config.index
    }

    async fn ping(&self) -> Result<bool> {
        match self.request(Method::GET, self.endpoint(&[])).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Elasticsearch health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn ensure_index(&self) -> Result<bool> {
        let url = self.endpoint(&[self.config.index.as_str()]);
        let response = self
            .send("check index", self.request(Method::HEAD, url.clone()))
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!(index = %self.config.index, "Index already exists");
                let _ = self.index_ready.set(());
                Ok(false)
            }
            StatusCode::NOT_FOUND => {
                let response = self
                    .send(
                        "create index",
                        self.request(Method::PUT, url).json(&index_mapping()),
                    )
                    .await?;
                ensure_success("create index", response).await?;
                tracing::info!(index = %self.config.index, "Created index with item mapping");
                let _ = self.index_ready.set(());
                Ok(true)
            }
            _ => ensure_success("check index", response).await.map(|_| false),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Item>> {
        tracing::debug!(index = %self.config.index, id = id, "Getting document");
        let response = self
            .send("get", self.request(Method::GET, self.document_url(id)))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success("get", response).await?;
        let document: GetResponse = Self::decode("get", response).await?;
        if !document.found {
            return Ok(None);
        }

        match document.source {
            Some(source) => item_from_source(&document.id, source).map(Some),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let response = self
            .send("exists", self.request(Method::HEAD, self.document_url(id)))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => ensure_success("exists", response).await.map(|_| true),
        }
    }

    async fn put(&self, item: &Item) -> Result<IndexReceipt> {
        tracing::debug!(index = %self.config.index, id = %item.id, "Indexing document");
        self.prepare_index().await?;

        let mut url = self.document_url(&item.id);
        url.query_pairs_mut().append_pair("refresh", "true");

        let response = self
            .send("index", self.request(Method::PUT, url).json(item))
            .await?;
        let response = ensure_success("index", response).await?;
        let written: WriteResponse = Self::decode("index", response).await?;

        Ok(IndexReceipt {
            id: written.id,
            index: written.index,
        })
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        tracing::debug!(index = %self.config.index, id = id, "Deleting document");

        let mut url = self.document_url(id);
        url.query_pairs_mut().append_pair("refresh", "true");

        let response = self.send("delete", self.request(Method::DELETE, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }

        let response = ensure_success("delete", response).await?;
        let written: WriteResponse = Self::decode("delete", response).await?;
        match written.result.as_deref() {
            Some("not_found") => Ok(DeleteOutcome::NotFound),
            _ => Ok(DeleteOutcome::Deleted),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<EngineSearchResult> {
        let body = render_search_body(query);
        tracing::debug!(index = %self.config.index, size = query.size, "Executing search");

        let url = self.endpoint(&[self.config.index.as_str(), "_search"]);
        let response = self
            .send("search", self.request(Method::POST, url).json(&body))
            .await?;
        let response = ensure_success("search", response).await?;
        let parsed: SearchResponseBody = Self::decode("search", response).await?;

        let mut hits = Vec::with_capacity(parsed.hits.hits.len());
        for hit in parsed.hits.hits {
            let distance = hit
                .fields
                .get("distance")
                .and_then(|values| values.first())
                .and_then(Value::as_f64);
            hits.push(EngineHit {
                item: item_from_source(&hit.id, hit.source)?,
                score: hit.score.unwrap_or(0.0),
                distance,
            });
        }

        Ok(EngineSearchResult {
            total: parsed.hits.total.value(),
            hits,
        })
    }
}

fn item_from_source(id: &str, source: Value) -> Result<Item> {
    let mut object = match source {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    object
        .entry("id")
        .or_insert_with(|| Value::String(id.to_string()));

    serde_json::from_value(Value::Object(object)).map_err(|e| {
        ItemSearchError::engine("decode", format!("Stored document {} is malformed: {}", id, e))
    })
}

/// Index settings and mappings for item documents
pub fn index_mapping() -> Value {
    json!({
        "settings": {
            "analysis": {
                "normalizer": {
                    "lowercase_normalizer": {
                        "type": "custom",
                        "filter": ["lowercase"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "name": { "type": "text" },
                "description": { "type": "text" },
                "tags": { "type": "keyword", "normalizer": "lowercase_normalizer" },
                "suggest_input": { "type": "text" },
                "address": {
                    "type": "text",
                    "fields": { "raw": { "type": "keyword", "ignore_above": 512 } }
                },
                "metadata": { "type": "object", "dynamic": true }
            }
        }
    })
}

/// Full `_search` request body
pub fn render_search_body(query: &SearchQuery) -> Value {
    let mut body = json!({
        "query": render_clause(&query.root),
        "size": query.size,
        "track_total_hits": true,
        "_source": true,
    });

    if let Some(decay) = query.decay() {
        let distance_script = json!({
            "lang": "painless",
            "source": format!("{}{}", DISTANCE_SCRIPT, DISTANCE_FIELD_TAIL),
            "params": script_params(decay),
        });

        // Hits sharing a floored score fall back to distance, sentinel last
        body["sort"] = json!([
            { "_score": { "order": "desc" } },
            {
                "_script": {
                    "type": "number",
                    "order": "asc",
                    "script": distance_script.clone(),
                }
            }
        ]);
        body["track_scores"] = json!(true);
        body["script_fields"] = json!({ "distance": { "script": distance_script } });
    }

    body
}

/// Render one clause to the Query DSL
pub fn render_clause(clause: &Clause) -> Value {
    match clause {
        Clause::Phrase {
            field,
            query,
            boost,
        } => json!({ "match_phrase": { field: { "query": query, "boost": boost } } }),
        Clause::Fuzzy {
            field,
            query,
            fuzziness,
            prefix_length,
            boost,
        } => {
            let fuzziness = match fuzziness {
                Fuzziness::Auto => json!("AUTO"),
                Fuzziness::Fixed(n) => json!(n),
            };
            json!({
                "match": {
                    field: {
                        "query": query,
                        "fuzziness": fuzziness,
                        "prefix_length": prefix_length,
                        "boost": boost
                    }
                }
            })
        }
        Clause::Match {
            field,
            query,
            minimum_should_match,
            boost,
        } => {
            let mut params = json!({ "query": query, "boost": boost });
            if let Some(msm) = minimum_should_match {
                params["minimum_should_match"] = json!(msm.to_string());
            }
            json!({ "match": { field: params } })
        }
        Clause::Term {
            field,
            value,
            boost,
        } => json!({ "term": { field: { "value": value, "boost": boost } } }),
        Clause::Prefix {
            field,
            query,
            boost,
        } => json!({ "match_bool_prefix": { field: { "query": query, "boost": boost } } }),
        Clause::BoolShould {
            clauses,
            minimum_should_match,
        } => json!({
            "bool": {
                "should": clauses.iter().map(render_clause).collect::<Vec<_>>(),
                "minimum_should_match": minimum_should_match
            }
        }),
        Clause::FunctionScore {
            query,
            decay,
            boost_mode,
        } => json!({
            "function_score": {
                "query": render_clause(query),
                "functions": [{
                    "script_score": {
                        "script": {
                            "lang": "painless",
                            "source": format!("{}{}", DISTANCE_SCRIPT, SCORE_SCRIPT_TAIL),
                            "params": script_params(decay),
                        }
                    }
                }],
                "score_mode": "multiply",
                "boost_mode": boost_mode.as_str()
            }
        }),
    }
}

fn script_params(decay: &DistanceDecay) -> Value {
    json!({
        "origin": decay.origin,
        "scale": decay.scale,
        "floor": decay.floor,
        "sentinel": SENTINEL_DISTANCE,
    })
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_index")]
    index: String,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is an object since 7.0 and a bare number before
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } => *value,
            TotalHits::Count(count) => *count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(default)]
    fields: HashMap<String, Vec<Value>>,
}
