//! ItemSearch - HTTP facade over a full-text search index
//!
//! Indexes item records and serves ranked search and autocomplete queries
//! with postal-code proximity weighting.

use clap::{Parser, Subcommand};
use itemsearch_core::{ItemSearchError, Result, ServiceConfig};
use itemsearch_infra::{build_engine, init_logger, EngineKind, LoggerConfig};
use itemsearch_serve::ServerBuilder;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "itemsearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ItemSearch - ranked item search and autocomplete over Elasticsearch")]
#[command(long_about = r#"
ItemSearch exposes a small authenticated HTTP API for indexing item records
and querying them with boosted full-text relevance blended with postal-code
proximity.

Configuration is read from the environment (and a .env file when present):
API_TOKEN, HOST, PORT, CORS_ORIGINS, ELASTICSEARCH_URL, ELASTICSEARCH_INDEX,
ELASTICSEARCH_USERNAME, ELASTICSEARCH_PASSWORD, SEARCH_DISTANCE_SCALE,
SEARCH_DISTANCE_FLOOR, SEARCH_MAX_LIMIT, LOG_LEVEL, LOG_JSON.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Search engine backend (elasticsearch, memory)
        #[arg(long, default_value = "elasticsearch")]
        engine: EngineKind,
    },

    /// Create the item index with its mapping if it does not exist
    InitIndex,

    /// Load and validate configuration, then print it with secrets redacted
    CheckConfig,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ServiceConfig::from_env()?;

    let mut logger = LoggerConfig::from(&config.logging);
    if cli.verbose {
        logger.level = "debug".to_string();
    }
    if cli.json_logs {
        logger.json_format = true;
    }
    init_logger(logger)?;

    match cli.command {
        Commands::Serve { host, port, engine } => handle_serve(config, host, port, engine).await,
        Commands::InitIndex => handle_init_index(config).await,
        Commands::CheckConfig => handle_check_config(&config),
        Commands::Version => {
            handle_version();
            Ok(())
        }
    }
}

async fn handle_serve(
    config: ServiceConfig,
    host: Option<String>,
    port: Option<u16>,
    engine_kind: EngineKind,
) -> Result<()> {
    if !config.has_api_token() {
        warn!("API_TOKEN is not set; every /api/v1 request will be rejected");
    }

    let engine = build_engine(engine_kind, &config)?;

    if engine.ping().await? {
        match engine.ensure_index().await {
            Ok(true) => info!(index = %engine.index_name(), "Created search index"),
            Ok(false) => info!(index = %engine.index_name(), "Search index ready"),
            Err(e) => warn!("Could not verify search index, retrying before the first write: {}", e),
        }
    } else {
        warn!("Search engine is not reachable yet; the index is created before the first write");
    }

    let mut builder = ServerBuilder::new(config, engine);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }

    builder.build().start().await
}

async fn handle_init_index(config: ServiceConfig) -> Result<()> {
    let engine = build_engine(EngineKind::Elasticsearch, &config)?;

    if !engine.ping().await? {
        return Err(ItemSearchError::engine(
            "ping",
            format!("Elasticsearch at {} is not reachable", config.engine.url),
        ));
    }

    if engine.ensure_index().await? {
        println!("Created index '{}'", engine.index_name());
    } else {
        println!("Index '{}' already exists", engine.index_name());
    }
    Ok(())
}

fn handle_check_config(config: &ServiceConfig) -> Result<()> {
    config.validate()?;

    let mut summary = serde_json::to_value(config)?;
    summary["api_token_configured"] = serde_json::Value::Bool(config.has_api_token());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn handle_version() {
    println!("{}", itemsearch_core::version_info());
    println!("  infra: v{}", itemsearch_infra::VERSION);
    println!("  serve: v{}", itemsearch_serve::VERSION);
}
