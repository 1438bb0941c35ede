//! ItemSearch Serve Library
//!
//! HTTP interface for the ItemSearch service: item CRUD, ranked search and
//! autocomplete behind a shared-token guard.

use itemsearch_core::ServerSettings;

pub mod api;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use api::create_routes;
pub use handlers::{ApiError, AppState};
pub use server::{create_app, ItemSearchServer, ServerBuilder};

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Listener and transport configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            cors_origins: settings.cors_origins.clone(),
            max_request_size: settings.max_request_size,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
