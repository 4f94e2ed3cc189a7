//! Domain errors onto the wire envelope. Messages are already user-facing,
//! so they pass through unchanged.

use crate::{ApiError, ApiErrorCode};
use serde_json::json;
use valeapp_auth::AuthError;
use valeapp_lifecycle::LifecycleError;
use valeapp_store::{StoreError, StoreErrorCode};

fn store_code(source: &StoreError) -> ApiErrorCode {
    match source.code {
        StoreErrorCode::NotFound => ApiErrorCode::NotFound,
        StoreErrorCode::Conflict => ApiErrorCode::Conflict,
        StoreErrorCode::Validation => ApiErrorCode::ValidationFailed,
        StoreErrorCode::Network | StoreErrorCode::Io | StoreErrorCode::Config => {
            ApiErrorCode::UpstreamStoreUnavailable
        }
        _ => ApiErrorCode::Internal,
    }
}

fn from_store(message: String, source: &StoreError) -> ApiError {
    ApiError::new(
        store_code(source),
        message,
        json!({"store_code": source.code.as_str()}),
    )
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::NotFound(_) | AuthError::InvalidCredentials(_) => {
                Self::new(ApiErrorCode::InvalidCredentials, message, json!({}))
            }
            AuthError::Validation(_) => Self::validation_failed(message),
            AuthError::Unauthenticated(_) => Self::unauthenticated(message),
            AuthError::Store { source, .. } => from_store(message, &source),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::Validation(_) => Self::validation_failed(message),
            LifecycleError::NotFound(_) => Self::new(ApiErrorCode::NotFound, message, json!({})),
            LifecycleError::Forbidden(_) => Self::forbidden(message),
            LifecycleError::Conflict(_) => Self::new(ApiErrorCode::Conflict, message, json!({})),
            LifecycleError::Ingest(_) => Self::new(
                ApiErrorCode::ValidationFailed,
                message,
                json!({"stage": "ingest"}),
            ),
            LifecycleError::Store { source, .. } => from_store(message, &source),
        }
    }
}
