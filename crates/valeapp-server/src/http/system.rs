use super::response_contract::{ApiFailure, ApiResult};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use valeapp_api::{
    justification_kinds, openapi_v1_spec, ApiError, ApiErrorCode, JustificationKindDto, ReadyDto,
};

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Ready when the store answers a round trip.
pub(crate) async fn readyz_handler(State(state): State<AppState>) -> ApiResult<Json<ReadyDto>> {
    match state.lifecycle.ping().await {
        Ok(backend) => Ok(Json(ReadyDto {
            status: "ready".to_string(),
            backend: backend.to_string(),
        })),
        Err(e) => Err(ApiFailure(ApiError::new(
            ApiErrorCode::NotReady,
            e.to_string(),
            json!({"backend": state.lifecycle.store().backend_tag()}),
        ))),
    }
}

pub(crate) async fn openapi_handler() -> Json<Value> {
    Json(openapi_v1_spec())
}

pub(crate) async fn justification_kinds_handler() -> Json<Vec<JustificationKindDto>> {
    Json(justification_kinds())
}
