use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::memory::ingest;
use crate::server::auth::{constant_time_eq, issue_jwt, parse_basic, Claims};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
}

/// Exchange Basic credentials for an admin JWT.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, ApiError> {
    let auth = &state.config.auth;
    let (Some(username), Some(password), Some(secret)) = (
        auth.admin_username.as_deref(),
        auth.admin_password.as_deref(),
        auth.jwt_secret.as_deref(),
    ) else {
        return Err(ApiError::Unauthorized("admin access is not configured".into()));
    };

    let (user, pass) = parse_basic(&headers)
        .ok_or_else(|| ApiError::Unauthorized("missing Basic credentials".into()))?;

    let user_ok = constant_time_eq(user.as_bytes(), username.as_bytes());
    let pass_ok = constant_time_eq(pass.as_bytes(), password.as_bytes());
    if !(user_ok && pass_ok) {
        tracing::warn!(user = %user, "admin login failed");
        state.activity.error(format!("admin login failed for '{user}'"));
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let (token, expires_at) = issue_jwt(&user, secret, auth.jwt_ttl_minutes)
        .map_err(|e| ApiError::Internal(format!("failed to issue token: {e}")))?;

    state.activity.info(format!("admin login: {user}"));
    Ok(Json(LoginResponse {
        token,
        expires_at: expires_at.to_rfc3339(),
    }))
}

pub async fn logs(State(state): State<AppState>) -> Json<Value> {
    let entries = state.activity.snapshot();
    Json(json!({ "count": entries.len(), "entries": entries }))
}

pub async fn reindex(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(admin = %claims.sub, "reindex requested");

    let fragments = ingest::reindex(&state.store, state.embedding.as_ref(), |_| {})
        .await
        .map_err(|e| state.failure("admin/reindex", e))?;

    state.activity.info(format!("admin/reindex by {}: {fragments} fragments", claims.sub));
    Ok(Json(json!({ "fragments": fragments })))
}

pub async fn reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    tracing::warn!(admin = %claims.sub, "memory reset requested");

    let removed = ingest::reset(&state.store)
        .await
        .map_err(|e| state.failure("admin/reset", e))?;

    state.activity.info(format!("admin/reset by {}: {removed} archives removed", claims.sub));
    Ok(Json(json!({ "removed": removed })))
}
