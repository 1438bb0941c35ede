//! Configuration types for ItemSearch core library
//!
//! Configuration comes from the process environment only. Variables are read
//! through [`config::Environment`] into a flat [`EnvSettings`] record and then
//! grouped into the nested [`ServiceConfig`] the rest of the workspace uses.

use crate::{ItemSearchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Main configuration structure
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shared secret expected in the API token header
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Search engine connection settings
    pub engine: EngineSettings,
    /// Ranking and result size settings
    pub search: SearchSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec!["*".to_string()],
            max_request_size: default_max_request_size(),
        }
    }
}

/// Search engine connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Base URL of the Elasticsearch-compatible endpoint
    pub url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Index holding item documents
    pub index: String,
    /// Per-request timeout applied by the HTTP client
    pub timeout_seconds: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            username: None,
            password: None,
            index: default_index(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl std::fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("index", &self.index)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Ranking and result size settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Postal code difference at which the distance factor bottoms out
    pub distance_scale: f64,
    /// Lower bound of the linear part of the decay curve, in `[0, 1]`
    pub distance_floor: f64,
    /// Upper bound accepted for a caller supplied `limit`
    pub max_limit: usize,
    /// Page size of `/search` when no limit is given
    pub default_limit: usize,
    /// Page size of `/suggestions`
    pub suggestion_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            distance_scale: default_distance_scale(),
            distance_floor: default_distance_floor(),
            max_limit: default_max_limit(),
            default_limit: 20,
            suggestion_limit: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            server: ServerSettings::default(),
            engine: EngineSettings::default(),
            search: SearchSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("server", &self.server)
            .field("engine", &self.engine)
            .field("search", &self.search)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Flat view of the environment variables the service understands.
///
/// `config::Environment` lowercases variable names, so `ELASTICSEARCH_URL`
/// lands in `elasticsearch_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSettings {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Option<String>,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default = "default_engine_url")]
    pub elasticsearch_url: String,
    #[serde(default)]
    pub elasticsearch_username: Option<String>,
    #[serde(default)]
    pub elasticsearch_password: Option<String>,
    #[serde(default = "default_index")]
    pub elasticsearch_index: String,
    #[serde(default = "default_timeout")]
    pub elasticsearch_timeout_secs: u64,
    #[serde(default = "default_distance_scale")]
    pub search_distance_scale: f64,
    #[serde(default = "default_distance_floor")]
    pub search_distance_floor: f64,
    #[serde(default = "default_max_limit")]
    pub search_max_limit: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

impl From<EnvSettings> for ServiceConfig {
    fn from(env: EnvSettings) -> Self {
        let cors_origins = env
            .cors_origins
            .as_deref()
            .map(parse_origin_list)
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Self {
            api_token: env.api_token.filter(|t| !t.is_empty()),
            server: ServerSettings {
                host: env.host,
                port: env.port,
                cors_origins,
                max_request_size: env.max_request_size,
            },
            engine: EngineSettings {
                url: env.elasticsearch_url,
                username: env.elasticsearch_username.filter(|u| !u.is_empty()),
                password: env.elasticsearch_password,
                index: env.elasticsearch_index,
                timeout_seconds: env.elasticsearch_timeout_secs,
            },
            search: SearchSettings {
                distance_scale: env.search_distance_scale,
                distance_floor: env.search_distance_floor,
                max_limit: env.search_max_limit,
                ..SearchSettings::default()
            },
            logging: LoggingSettings {
                level: env.log_level,
                json: env.log_json,
            },
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    /// Load configuration from an explicit variable map instead of the process
    /// environment. Keys use the same upper-case names as the real variables.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    /// Every variable is kept as the string it was set to. Numeric and
    /// boolean settings are converted during deserialization, so secrets such
    /// as `API_TOKEN=0123` reach the service byte for byte.
    fn from_environment(source: config::Environment) -> Result<Self> {
        let settings = config::Config::builder().add_source(source).build()?;

        let env: EnvSettings = settings.try_deserialize()?;
        let config = ServiceConfig::from(env);
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ItemSearchError::invalid_config("PORT cannot be 0"));
        }

        let url = Url::parse(&self.engine.url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ItemSearchError::invalid_config(
                "ELASTICSEARCH_URL must use http or https scheme",
            ));
        }

        if self.engine.index.trim().is_empty() {
            return Err(ItemSearchError::invalid_config(
                "ELASTICSEARCH_INDEX cannot be empty",
            ));
        }

        if !(self.search.distance_scale > 0.0) {
            return Err(ItemSearchError::invalid_config(
                "SEARCH_DISTANCE_SCALE must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.search.distance_floor) {
            return Err(ItemSearchError::invalid_config(
                "SEARCH_DISTANCE_FLOOR must be between 0 and 1",
            ));
        }

        if self.search.max_limit == 0 {
            return Err(ItemSearchError::invalid_config(
                "SEARCH_MAX_LIMIT must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Whether the API token has been configured at all
    pub fn has_api_token(&self) -> bool {
        self.api_token.is_some()
    }
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_request_size() -> usize {
    1024 * 1024
}
fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_index() -> String {
    "items".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_distance_scale() -> f64 {
    100.0
}
fn default_distance_floor() -> f64 {
    0.1
}
fn default_max_limit() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = ServiceConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.engine.index, "items");
        assert_eq!(config.engine.url, "http://localhost:9200");
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.search.max_limit, 100);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_values_from_environment() {
        let config = ServiceConfig::from_vars(vars(&[
            ("API_TOKEN", "secret-token"),
            ("PORT", "5001"),
            ("ELASTICSEARCH_URL", "https://search.internal:9243"),
            ("ELASTICSEARCH_INDEX", "establishments"),
            ("CORS_ORIGINS", "http://localhost:8000, https://app.example.com"),
            ("SEARCH_DISTANCE_SCALE", "250"),
            ("LOG_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("secret-token"));
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.engine.url, "https://search.internal:9243");
        assert_eq!(config.engine.index, "establishments");
        assert_eq!(
            config.server.cors_origins,
            vec![
                "http://localhost:8000".to_string(),
                "https://app.example.com".to_string()
            ]
        );
        assert_eq!(config.search.distance_scale, 250.0);
        assert!(config.logging.json);
    }

    #[test]
    fn test_numeric_api_token_stays_a_string() {
        let config = ServiceConfig::from_vars(vars(&[("API_TOKEN", "12345")])).unwrap();
        assert_eq!(config.api_token.as_deref(), Some("12345"));
    }

    #[test]
    fn test_number_like_secrets_are_not_reformatted() {
        for raw in ["0123", "TRUE", "1e3", "-0", "1.50"] {
            let config = ServiceConfig::from_vars(vars(&[
                ("API_TOKEN", raw),
                ("ELASTICSEARCH_PASSWORD", raw),
                ("ELASTICSEARCH_INDEX", raw),
            ]))
            .unwrap();

            assert_eq!(config.api_token.as_deref(), Some(raw));
            assert_eq!(config.engine.password.as_deref(), Some(raw));
            assert_eq!(config.engine.index, raw);
        }
    }

    #[test]
    fn test_typed_settings_parse_from_strings() {
        let config = ServiceConfig::from_vars(vars(&[
            ("PORT", "8080"),
            ("ELASTICSEARCH_TIMEOUT_SECS", "7"),
            ("SEARCH_DISTANCE_FLOOR", "0.25"),
            ("SEARCH_MAX_LIMIT", "50"),
            ("LOG_JSON", "false"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.engine.timeout_seconds, 7);
        assert_eq!(config.search.distance_floor, 0.25);
        assert_eq!(config.search.max_limit, 50);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_empty_api_token_is_unset() {
        let config = ServiceConfig::from_vars(vars(&[("API_TOKEN", "")])).unwrap();
        assert!(!config.has_api_token());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.search.distance_floor = 1.5;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.search.distance_scale = 0.0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.engine.url = "ftp://search".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ServiceConfig::default();
        config.api_token = Some("super-secret".to_string());
        config.engine.password = Some("hunter2".to_string());

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret"));
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn test_serialization_skips_secrets() {
        let mut config = ServiceConfig::default();
        config.api_token = Some("super-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("\"index\":\"items\""));
    }
}
