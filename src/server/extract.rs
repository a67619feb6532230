//! Request extractors whose rejections use the `{"error": message}` body.
//!
//! axum's own `Json`, `Query`, and typed-multipart extractors answer a bad
//! request with plain text. These wrappers route the rejection through
//! [`ApiError`] instead.

use axum::extract::{FromRequest, FromRequestParts};
use axum_typed_multipart::BaseMultipart;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Typed multipart form; read the form from `.data`.
pub type ApiMultipart<T> = BaseMultipart<T, ApiError>;
