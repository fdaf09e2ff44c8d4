//! Moonware Server
//!
//! HTTP server that obfuscates uploaded Luau scripts and serves them back
//! for `loadstring(game:HttpGet(...))()`.

pub mod config;
pub mod error;
pub mod scripts;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use config::{ServerConfig, CONFIG_FILE_NAME};
pub use error::ApiError;
pub use scripts::{loadstring_for, ScriptListResponse, UploadRequest, UploadResponse};
pub use store::{MemoryStore, ScriptRecord, ScriptStore, ScriptSummary, StoreError};

/// Shared application state
pub struct AppState {
    /// Uploaded scripts
    pub store: Arc<dyn ScriptStore>,

    pub config: ServerConfig,

    /// Process start, reported by `/health`
    pub started_at: Instant,
}

impl AppState {
    /// State backed by an in-memory store sized from `config.max_scripts`
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let store = Arc::new(MemoryStore::new(config.max_scripts));
        Self::with_store(config, store)
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn ScriptStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            config,
            started_at: Instant::now(),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_scripts: usize,
    pub total_size: usize,
    pub total_access: u64,
    pub tokens_left: usize,
    pub max_tokens: usize,
}

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit;
    let static_files = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handle_not_found.into_service());

    Router::new()
        .route("/api/upload", post(scripts::handle_upload))
        .route("/api/execute/:script_id", get(scripts::handle_execute))
        .route("/api/scripts", get(scripts::handle_list))
        .route("/api/scripts/:script_id", delete(scripts::handle_delete))
        .route("/api/scripts/:script_id/toggle", patch(scripts::handle_toggle))
        .route("/api/stats", get(handle_stats))
        .route("/health", get(handle_health))
        // Front-end assets, JSON 404 for anything else
        .fallback_service(static_files)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Health check endpoint
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "scripts": state.store.len().await,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let scripts = state.store.list().await;
    let max_tokens = state.store.capacity();
    Json(StatsResponse {
        total_scripts: scripts.len(),
        total_size: scripts.iter().map(|s| s.size).sum(),
        total_access: scripts.iter().map(|s| s.access_count).sum(),
        tokens_left: max_tokens.saturating_sub(scripts.len()),
        max_tokens,
    })
}

async fn handle_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Endpoint not found" })),
    )
}

/// Start the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr();
    let state = AppState::new(config);
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Moonware Obfuscator Server listening on {}", addr);
    tracing::info!("API endpoint: http://{}/api", addr);
    tracing::info!(
        "Front-end: {} (serving {})",
        state.config.base_url(None),
        state.config.static_dir.display()
    );
    tracing::info!("Script capacity: {}", state.store.capacity());

    axum::serve(listener, router).await?;

    Ok(())
}
