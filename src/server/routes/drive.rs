use axum::{extract::State, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use super::non_empty;
use crate::error::ApiError;
use crate::google::drive::{DriveFile, DriveUpload};
use crate::memory::sync::{sync_archives, SyncReport};
use crate::server::extract::{ApiJson, ApiMultipart, ApiQuery};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub folder: Option<String>,
}

pub async fn list_files(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let folder = non_empty(query.folder);
    let files = state
        .drive
        .list(folder.as_deref())
        .await
        .map_err(|e| state.failure("drive/files", e))?;
    Ok(Json(json!({ "files": files })))
}

#[derive(Debug, TryFromMultipart)]
pub struct DriveUploadForm {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
    pub folder: Option<String>,
}

pub async fn upload_file(
    State(state): State<AppState>,
    ApiMultipart { data: form, .. }: ApiMultipart<DriveUploadForm>,
) -> Result<Json<DriveFile>, ApiError> {
    let name = non_empty(form.file.metadata.file_name.clone())
        .ok_or_else(|| ApiError::Validation("uploaded file has no name".into()))?;
    let mime_type = form
        .file
        .metadata
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    let bytes = tokio::fs::read(form.file.contents.path())
        .await
        .map_err(|e| state.failure("drive/upload", e.into()))?;

    let file = state
        .drive
        .upload(DriveUpload {
            name,
            mime_type,
            target_mime_type: None,
            parent: non_empty(form.folder),
            bytes,
        })
        .await
        .map_err(|e| state.failure("drive/upload", e))?;

    state.activity.info(format!("drive/upload: {} ({})", file.name, file.id));
    Ok(Json(file))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    pub folder: Option<String>,
}

pub async fn create_doc(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateDocRequest>,
) -> Result<Json<DriveFile>, ApiError> {
    let title = non_empty(req.title).ok_or_else(|| ApiError::Validation("Missing title".into()))?;
    let folder = non_empty(req.folder);

    let file = state
        .drive
        .create_doc(&title, &req.content, folder.as_deref())
        .await
        .map_err(|e| state.failure("drive/docs", e))?;

    state.activity.info(format!("drive/docs: created '{}' ({})", file.name, file.id));
    Ok(Json(file))
}

/// Push unsynced memory archives to their agents' Drive folders.
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncReport>, ApiError> {
    let report = sync_archives(&state.store, state.drive.as_ref(), |key| std::env::var(key).ok())
        .await
        .map_err(|e| state.failure("sync", e))?;

    state.activity.info(format!(
        "sync: {} uploaded, {} failed",
        report.synced.len(),
        report.failed.len()
    ));
    Ok(Json(report))
}
