use super::response_contract::{parse_json, ApiResult};
use super::session::require_session;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use valeapp_api::{
    AdminLoginRequest, EmployeeLoginRequest, LoginResponseDto, PasswordSetupRequest, SessionDto,
};

pub(crate) async fn admin_login_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<LoginResponseDto>> {
    let req: AdminLoginRequest = parse_json(body, state.config.max_upload_bytes)?;
    let issued = state.auth.admin_login(&req.login, &req.password).await?;
    Ok(Json(issued.into()))
}

pub(crate) async fn employee_login_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<LoginResponseDto>> {
    let req: EmployeeLoginRequest = parse_json(body, state.config.max_upload_bytes)?;
    let outcome = state.auth.employee_login(&req.cpf, &req.password).await?;
    Ok(Json(outcome.into()))
}

pub(crate) async fn password_setup_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<LoginResponseDto>> {
    let req: PasswordSetupRequest = parse_json(body, state.config.max_upload_bytes)?;
    let issued = state
        .auth
        .complete_password_setup(&req.ticket, &req.password, &req.confirmation)
        .await?;
    Ok(Json(issued.into()))
}

pub(crate) async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let (token, _) = require_session(&state, &headers)?;
    state.auth.logout(token);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionDto>> {
    let (_, session) = require_session(&state, &headers)?;
    Ok(Json(session.into()))
}
