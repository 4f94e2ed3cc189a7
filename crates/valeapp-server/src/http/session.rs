use super::response_contract::ApiFailure;
use crate::AppState;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use valeapp_api::ApiError;
use valeapp_auth::{Session, SESSION_INVALID};

pub(crate) const ADMIN_ONLY: &str = "Acesso restrito a administradores.";

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub(crate) fn require_session<'h>(
    state: &AppState,
    headers: &'h HeaderMap,
) -> Result<(&'h str, Session), ApiFailure> {
    let token = bearer_token(headers).ok_or_else(|| ApiError::unauthenticated(SESSION_INVALID))?;
    let session = state.auth.session(token)?;
    Ok((token, session))
}

pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiFailure> {
    let (_, session) = require_session(state, headers)?;
    if !session.value.is_admin() {
        return Err(ApiError::forbidden(ADMIN_ONLY).into());
    }
    Ok(session)
}
