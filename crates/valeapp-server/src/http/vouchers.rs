// SPDX-License-Identifier: Apache-2.0

use super::request_tracing::client_ip;
use super::response_contract::{parse_json, ApiResult};
use super::session::require_session;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use valeapp_api::{
    parse_voucher_key, parse_voucher_list_params, JustifyResponseDto, VoucherListDto,
};
use valeapp_lifecycle::{JustifySubmission, VoucherLifecycle};
use valeapp_model::{filter_vouchers, SearchScope};

/// Stats cover the caller's whole list; `search` and `status` only narrow
/// the rows returned.
pub(crate) async fn list_vouchers_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<VoucherListDto>> {
    let (_, session) = require_session(&state, &headers)?;
    let params = parse_voucher_list_params(&query)?;
    let user = session.value;
    let all = state.lifecycle.vouchers_for(&user).await?;
    let stats = VoucherLifecycle::stats(&all);
    let scope = if user.is_admin() {
        SearchScope::Admin
    } else {
        SearchScope::Employee
    };
    let filter = params.into_filter(scope);
    let vouchers = filter_vouchers(&all, &filter).into_iter().cloned().collect();
    Ok(Json(VoucherListDto { vouchers, stats }))
}

pub(crate) async fn justify_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<JustifyResponseDto>> {
    let (_, session) = require_session(&state, &headers)?;
    let key = parse_voucher_key(&key)?;
    let mut submission: JustifySubmission = parse_json(body, state.config.max_upload_bytes)?;
    submission.client_ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let outcome = state
        .lifecycle
        .justify(&session.value, &key, submission)
        .await?;
    Ok(Json(outcome.into()))
}
