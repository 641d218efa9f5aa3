//! # API Server Module
//!
//! ## Purpose
//! REST surface for the case law pipeline: the search endpoint, a liveness
//! endpoint, and cache management.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with query parameters
//! - **Output**: JSON responses with summarized cases or error payloads
//! - **Endpoints**: `GET /search`, `GET /`, `DELETE /clear-cache`
//!
//! ## Status Mapping
//! - Blank/missing query → 400
//! - Over the per-client rate cap → 429 (pipeline not invoked)
//! - Upstream search failure → 500 with an empty result list
//! - Summarization failure → still 200; sentinel embedded per case

use actix_cors::Cors;
use actix_web::middleware::Condition;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::courtlistener::{SearchQuery, SortMode};
use crate::errors::{PipelineError, Result};
use crate::AppState;

/// Query parameters for the search endpoint
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub court: Option<String>,
    pub sort: Option<SortMode>,
}

/// HTTP server wrapping the shared application state
pub struct ApiServer {
    app_state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Bind and run the server until it is stopped
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;
        let app_state = self.app_state;

        info!("Starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .wrap(Condition::new(enable_cors, Cors::permissive()))
                .configure(routes)
        })
        .bind(&bind_addr)
        .map_err(|e| PipelineError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| PipelineError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Route table, shared between the server and the HTTP tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/search", web::get().to(search_handler))
        .route("/clear-cache", web::delete().to(clear_cache_handler))
        .route("/", web::get().to(index_handler));
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<AppState>,
    params: web::Query<SearchParams>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let client = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Rejected before the pipeline executes
    if let Err(e) = app_state.rate_limiter.check(&client) {
        warn!(client = %client, "Request rate-limited");
        return Ok(HttpResponse::TooManyRequests().json(serde_json::json!({
            "message": e.to_string(),
        })));
    }

    let query = SearchQuery {
        query: params.query.clone().unwrap_or_default(),
        court: params.court.clone(),
        sort: params.sort.unwrap_or_default(),
    };

    match app_state.pipeline.run(&query).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(outcome)),
        Err(e @ PipelineError::InvalidRequest { .. }) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string(),
                "results": [],
            })))
        }
        Err(e) => {
            error!(category = e.category(), query = %query.query, "Search failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Failed to fetch case law",
                "results": [],
            })))
        }
    }
}

/// Cache flush endpoint handler
async fn clear_cache_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match app_state.cache.clear_all().await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Cache cleared",
        }))),
        Err(e) => {
            error!("Cache clear failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Failed to clear cache",
            })))
        }
    }
}

/// Liveness endpoint handler
async fn index_handler() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Case law search service is running",
        "timestamp": Utc::now(),
    })))
}
