//! Shared-secret token auth, Basic login, and admin JWTs.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Gate for relay routes: `Authorization: Bearer <token>` or `X-API-Key: <token>`.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.auth.api_token.as_deref() else {
        return Err(ApiError::Unauthorized(
            "API token is not configured on this server".into(),
        ));
    };
    let provided = extract_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("missing API token".into()))?;

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "rejected request with invalid API token");
        return Err(ApiError::Unauthorized("invalid API token".into()));
    }

    Ok(next.run(request).await)
}

/// Gate for admin routes: a bearer JWT with the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(secret) = state.config.auth.jwt_secret.as_deref() else {
        return Err(ApiError::Unauthorized("admin access is not configured".into()));
    };
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("missing admin token".into()))?;

    let claims = verify_jwt(token, secret).map_err(|e| {
        tracing::warn!(error = %e, "rejected admin token");
        ApiError::Unauthorized("invalid or expired admin token".into())
    })?;
    if claims.role != ADMIN_ROLE {
        return Err(ApiError::Unauthorized("admin role required".into()));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .or_else(|| bearer_token(headers))
        .filter(|t| !t.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Decode `Authorization: Basic base64(user:pass)`.
pub fn parse_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub fn issue_jwt(
    subject: &str,
    secret: &str,
    ttl_minutes: i64,
) -> jsonwebtoken::errors::Result<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = now + Duration::minutes(ttl_minutes);
    let claims = Claims {
        sub: subject.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

pub fn verify_jwt(token: &str, secret: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Length-leaking but otherwise timing-independent byte comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
