// SPDX-License-Identifier: Apache-2.0

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;
use valeapp_api::{map_error, ApiError};
use valeapp_auth::AuthError;
use valeapp_lifecycle::LifecycleError;

/// Any handler failure, rendered as the `{"error": ...}` envelope.
#[derive(Debug)]
pub(crate) struct ApiFailure(pub(crate) ApiError);

pub(crate) type ApiResult<T> = Result<T, ApiFailure>;

impl From<ApiError> for ApiFailure {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

impl From<AuthError> for ApiFailure {
    fn from(value: AuthError) -> Self {
        Self(value.into())
    }
}

impl From<LifecycleError> for ApiFailure {
    fn from(value: LifecycleError) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mapping = map_error(&self.0);
        let status =
            StatusCode::from_u16(mapping.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(code = self.0.code.as_str(), message = %self.0.message, "request failed");
        }
        let mut resp = (status, Json(json!({"error": self.0}))).into_response();
        if mapping.retryable {
            resp.headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("3"));
        }
        resp
    }
}

/// Buffered body, with the extractor's own rejection turned into the envelope.
pub(crate) fn body_bytes(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<Bytes, ApiFailure> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiFailure(ApiError::payload_too_large(limit))
        } else {
            ApiFailure(ApiError::invalid_body(&rejection.body_text()))
        }
    })
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<T, ApiFailure> {
    let bytes = body_bytes(body, limit)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiFailure(ApiError::invalid_body(&e.to_string())))
}
