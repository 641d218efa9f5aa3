//! # Case Law Search Server Main Driver
//!
//! ## Purpose
//! Entry point for the case law search backend. Loads configuration, connects
//! the cache, wires the pipeline services together and runs the API server.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment variables
//! - **Output**: Running web server exposing the search endpoints
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Connect the cache store (fatal if enabled and unreachable)
//! 4. Construct the search, opinion and summarizer clients
//! 5. Start the API server and wait for a shutdown signal

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use caselaw_pipeline::{
    api::ApiServer,
    cache::{KeyValueCache, NoopCache, RedisCache},
    config::Config,
    courtlistener::CaseSearchClient,
    errors::Result,
    opinions::OpinionFetcher,
    pipeline::SearchPipeline,
    rate_limit::RateLimiter,
    summarizer::Summarizer,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("caselaw-server")
        .version("0.1.0")
        .author("Legal Search Team")
        .about("Case law search backend with cached AI case summaries")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has default");
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);
    init_logging(&config);

    info!("Starting case law search server v0.1.0");
    info!("Configuration loaded from: {}", config_path);

    let app_state = initialize_components(config.clone()).await?;

    let server = ApiServer::new(app_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Case law search server listening on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Case law search server shut down");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Construct and wire all application components
async fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components");

    let cache: Arc<dyn KeyValueCache> = if config.cache.enabled {
        // Unreachable Redis is a fatal configuration error at startup
        let redis = RedisCache::connect(&config.cache.url).await?;
        info!("Connected to Redis cache");
        Arc::new(redis)
    } else {
        warn!("Cache disabled: every lookup will miss and writes are dropped");
        Arc::new(NoopCache)
    };

    if config.summarizer.api_key.is_none() {
        warn!("No LLM API key configured: summaries degrade to a fixed sentinel");
    }

    let search = CaseSearchClient::new(config.search.clone(), cache.clone())?;
    let opinions = OpinionFetcher::new(config.search.clone())?;
    let summarizer = Summarizer::new(config.summarizer.clone(), cache.clone())?;
    let pipeline = Arc::new(SearchPipeline::new(search, opinions, summarizer));
    let rate_limiter = Arc::new(RateLimiter::new(config.server.rate_limit_per_minute));

    info!("All components initialized");
    Ok(AppState {
        config,
        pipeline,
        cache,
        rate_limiter,
    })
}
