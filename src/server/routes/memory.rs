use axum::{extract::State, http::StatusCode, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::NamedTempFile;

use super::non_empty;
use crate::error::ApiError;
use crate::memory::types::{IngestReport, RecallHit};
use crate::memory::{index, ingest};
use crate::server::extract::{ApiJson, ApiMultipart};
use crate::server::AppState;

#[derive(Debug, TryFromMultipart)]
pub struct UploadMemoryForm {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
    pub agent: Option<String>,
}

/// Accept a memory ZIP, extract and index it.
pub async fn upload_memory(
    State(state): State<AppState>,
    ApiMultipart { data: form, .. }: ApiMultipart<UploadMemoryForm>,
) -> Result<(StatusCode, Json<IngestReport>), ApiError> {
    let name = form
        .file
        .metadata
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ApiError::Validation("uploaded file has no name".into()))?;
    if !name.to_ascii_lowercase().ends_with(".zip") {
        return Err(ApiError::Validation("only .zip archives are accepted".into()));
    }
    let agent = non_empty(form.agent).unwrap_or_else(|| state.config.storage.default_agent.clone());

    tracing::info!(archive = %name, agent = %agent, "memory upload received");

    let report = ingest::ingest_archive(
        &state.store,
        state.embedding.as_ref(),
        form.file.contents.path(),
        &name,
        &agent,
    )
    .await
    .map_err(|e| state.failure("upload-memory", e))?;

    state.activity.info(format!(
        "upload-memory: {} ingested ({} fragments)",
        report.name, report.fragments
    ));
    Ok((StatusCode::CREATED, Json(report)))
}

/// The ingested-archive log.
pub async fn list_memories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let log = state
        .store
        .load_log()
        .map_err(|e| state.failure("memories", e))?;
    let fragments: usize = log.archives.iter().map(|a| a.fragments).sum();

    Ok(Json(json!({
        "count": log.archives.len(),
        "fragments": fragments,
        "archives": log.archives,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRequest {
    #[serde(default)]
    pub query: String,
    #[serde(alias = "top_k")]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub query: String,
    pub results: Vec<RecallHit>,
}

pub async fn recall(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RecallRequest>,
) -> Result<Json<RecallResponse>, ApiError> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::Validation("Missing query".into()));
    }
    let top_k = index::clamp_top_k(req.top_k, &state.config.retrieval);

    let results = index::recall(&state.store, state.embedding.as_ref(), &query, top_k)
        .await
        .map_err(|e| state.failure("recall", e))?;

    Ok(Json(RecallResponse { query, results }))
}
