//! Server module for ItemSearch serve crate

use crate::api::create_routes;
use crate::handlers::AppState;
use crate::middleware::{
    cors_layer, request_id_middleware, security_headers_middleware, timing_middleware,
};
use crate::ServerConfig;
use axum::{middleware, Router};
use itemsearch_core::{ItemSearchError, Result, SearchEngine, ServiceConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// ItemSearch HTTP server
pub struct ItemSearchServer {
    config: ServerConfig,
    app: Router,
}

impl ItemSearchServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let app = create_app(&config, state);
        Self { config, app }
    }

    /// Bind and serve until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr = self.config.address();
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ItemSearchError::invalid_config(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting ItemSearch server v{} on {}", crate::VERSION, addr);

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered application, e.g. for in-process testing
    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the Axum application with middleware
pub fn create_app(config: &ServerConfig, state: AppState) -> Router {
    create_routes(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.max_request_size)),
        )
        .layer(cors_layer(&config.cors_origins))
}

/// Server builder for configuration
pub struct ServerBuilder {
    service: ServiceConfig,
    config: ServerConfig,
    engine: Arc<dyn SearchEngine>,
}

impl ServerBuilder {
    /// Start from a loaded service configuration
    pub fn new(service: ServiceConfig, engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            config: ServerConfig::from(&service.server),
            service,
            engine,
        }
    }

    /// Set the host address
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_origins = origins;
        self
    }

    /// Set maximum request size
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    pub fn build(self) -> ItemSearchServer {
        let state = AppState::new(self.engine, &self.service);
        ItemSearchServer::new(self.config, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsearch_core::InMemoryEngine;

    #[test]
    fn test_server_builder() {
        let engine = Arc::new(InMemoryEngine::default());
        let server = ServerBuilder::new(ServiceConfig::default(), engine)
            .host("127.0.0.1")
            .port(8080)
            .cors_origins(vec!["https://shop.example".to_string()])
            .max_request_size(5 * 1024 * 1024)
            .build();

        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 8080);
        assert_eq!(server.config().cors_origins.len(), 1);
        assert_eq!(server.config().max_request_size, 5 * 1024 * 1024);
    }
}
