//! Script endpoints: upload, execute, list, delete, toggle

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use moonware_core::{generate_script_id, Obfuscator, TransformOptions};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, TOKEN_LIMIT_MESSAGE};
use crate::store::{ScriptRecord, ScriptSummary, StoreError};
use crate::AppState;

const NOT_FOUND_SCRIPT: &str = "-- [Moonware] Script not found or has been deleted";
const DISABLED_SCRIPT: &str = "-- [Moonware] Script has been disabled by owner";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Upload request body
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub options: Option<TransformOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub script_id: String,
    pub loadstring: String,
    pub size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScriptListResponse {
    pub scripts: Vec<ScriptSummary>,
}

/// Lua snippet that fetches and runs a stored script
pub fn loadstring_for(base_url: &str, script_id: &str) -> String {
    format!(
        "loadstring(game:HttpGet(\"{}/api/execute/{}\"))()",
        base_url, script_id
    )
}

/// Transform and store an uploaded script
pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(req) = payload?;
    let script = match req.script {
        Some(script) if !script.trim().is_empty() => script,
        _ => return Err(ApiError::BadRequest("Script content is required".to_string())),
    };

    if state.store.len().await >= state.store.capacity() {
        return Err(ApiError::Forbidden(TOKEN_LIMIT_MESSAGE.to_string()));
    }

    let options = req.options.unwrap_or_default();
    let result = Obfuscator::new(options).obfuscate(&script);
    let script_id = generate_script_id(&mut rand::rngs::OsRng);
    let size = result.size();

    tracing::info!(
        "Obfuscated script {}: {} -> {} bytes, stages {:?}, {} identifiers renamed",
        script_id,
        script.len(),
        size,
        options.enabled_stages(),
        result.identifiers_renamed
    );

    state
        .store
        .insert(ScriptRecord::new(
            script_id.clone(),
            script,
            result.source,
            options,
        ))
        .await?;

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let loadstring = loadstring_for(&state.config.base_url(host), &script_id);

    Ok(Json(UploadResponse {
        success: true,
        script_id,
        loadstring,
        size,
    }))
}

/// Serve a stored script verbatim
pub async fn handle_execute(
    State(state): State<Arc<AppState>>,
    Path(script_id): Path<String>,
) -> Response {
    match state.store.record_access(&script_id).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PLAIN_TEXT), (header::CACHE_CONTROL, NO_CACHE)],
            content,
        )
            .into_response(),
        Err(StoreError::Disabled(_)) => {
            tracing::warn!("Execution of disabled script {}", script_id);
            (
                StatusCode::FORBIDDEN,
                [(header::CONTENT_TYPE, PLAIN_TEXT)],
                DISABLED_SCRIPT,
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, PLAIN_TEXT)],
            NOT_FOUND_SCRIPT,
        )
            .into_response(),
    }
}

/// List stored scripts, newest first
pub async fn handle_list(State(state): State<Arc<AppState>>) -> Json<ScriptListResponse> {
    let mut scripts: Vec<ScriptSummary> = state
        .store
        .list()
        .await
        .iter()
        .map(ScriptRecord::summary)
        .collect();
    scripts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(ScriptListResponse { scripts })
}

pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Path(script_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.remove(&script_id).await?;
    tracing::info!("Deleted script {}", script_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Script deleted successfully"
    })))
}

pub async fn handle_toggle(
    State(state): State<Arc<AppState>>,
    Path(script_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let enabled = state.store.toggle(&script_id).await?;
    tracing::info!("Script {} enabled={}", script_id, enabled);
    Ok(Json(serde_json::json!({
        "success": true,
        "enabled": enabled
    })))
}
