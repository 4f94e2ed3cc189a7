use super::response_contract::{body_bytes, parse_json, ApiFailure, ApiResult};
use super::session::require_admin;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::warn;
use valeapp_api::{
    parse_export_dataset, ApiError, ApiErrorCode, CleanupRequest, ImportResponseDto,
    NewAdminRequest, NewEmployeeRequest,
};
use valeapp_ingest::NormalizeOptions;
use valeapp_lifecycle::CleanupSummary;
use valeapp_model::{AdminStats, AdminUser, Employee};

pub(crate) const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub(crate) const CLEANUP_CONFIRMATION_REQUIRED: &str =
    "A limpeza apaga todos os vales. Envie {\"confirm\": true} para confirmar.";

pub(crate) async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AdminStats>> {
    require_admin(&state, &headers)?;
    Ok(Json(state.lifecycle.admin_stats().await?))
}

/// Raw workbook bytes in the body; the batch is all-or-nothing.
pub(crate) async fn import_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ImportResponseDto>> {
    require_admin(&state, &headers)?;
    let bytes = body_bytes(body, state.config.max_upload_bytes)?;
    if bytes.is_empty() {
        return Err(ApiError::invalid_body("empty workbook upload").into());
    }
    let summary = state
        .lifecycle
        .import_batch(&bytes, &NormalizeOptions::default())
        .await?;
    Ok(Json(summary.into()))
}

pub(crate) async fn cleanup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<CleanupSummary>> {
    let session = require_admin(&state, &headers)?;
    let req: CleanupRequest = parse_json(body, state.config.max_upload_bytes)?;
    if !req.confirm {
        return Err(ApiError::new(
            ApiErrorCode::ConfirmationRequired,
            CLEANUP_CONFIRMATION_REQUIRED,
            json!({"field": "confirm"}),
        )
        .into());
    }
    warn!(admin = %session.value.id, "cleanup confirmed; purging working table");
    let summary = state
        .lifecycle
        .cleanup_archive_and_purge(&session.value.name)
        .await?;
    Ok(Json(summary))
}

pub(crate) async fn export_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(dataset): Path<String>,
) -> ApiResult<Response> {
    require_admin(&state, &headers)?;
    let dataset = parse_export_dataset(&dataset)?;
    let file = state.lifecycle.export(dataset).await?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        file.file_name
    ))
    .map_err(|e| ApiFailure(ApiError::internal(format!("invalid export file name: {e}"))))?;
    let mut resp = file.bytes.into_response();
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    resp.headers_mut().insert(CONTENT_DISPOSITION, disposition);
    Ok(resp)
}

pub(crate) async fn list_employees_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Employee>>> {
    require_admin(&state, &headers)?;
    let search = query.get("search").map(String::as_str);
    Ok(Json(state.lifecycle.list_employees(search).await?))
}

pub(crate) async fn create_employee_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    require_admin(&state, &headers)?;
    let req: NewEmployeeRequest = parse_json(body, state.config.max_upload_bytes)?;
    let employee = state
        .lifecycle
        .add_employee(
            &req.cpf,
            &req.name,
            req.department.as_deref(),
            &req.promax_unico,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub(crate) async fn list_admins_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<AdminUser>>> {
    require_admin(&state, &headers)?;
    Ok(Json(state.lifecycle.list_admins().await?))
}

pub(crate) async fn create_admin_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    require_admin(&state, &headers)?;
    let req: NewAdminRequest = parse_json(body, state.config.max_upload_bytes)?;
    let admin = state
        .lifecycle
        .add_admin(&req.login, &req.name, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(admin)))
}
