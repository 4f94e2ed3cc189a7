// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use std::collections::BTreeMap;
use valeapp_lifecycle::ExportDataset;
use valeapp_model::{SearchScope, StatusFilter, VoucherFilter, VoucherKey};

pub const MAX_SEARCH_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoucherListParams {
    pub search: String,
    pub status: StatusFilter,
}

impl VoucherListParams {
    #[must_use]
    pub fn into_filter(self, scope: SearchScope) -> VoucherFilter {
        VoucherFilter {
            search: self.search,
            status: self.status,
            scope,
        }
    }
}

/// `?search=&status=all|pending|justified`; unknown keys are rejected.
pub fn parse_voucher_list_params(
    query: &BTreeMap<String, String>,
) -> Result<VoucherListParams, ApiError> {
    if let Some(unknown) = query.keys().find(|k| !matches!(k.as_str(), "search" | "status")) {
        return Err(ApiError::invalid_param(unknown, &query[unknown]));
    }
    let search = query.get("search").map(|s| s.trim().to_string()).unwrap_or_default();
    if search.chars().count() > MAX_SEARCH_CHARS {
        return Err(ApiError::invalid_param("search", &search));
    }
    let status = match query.get("status") {
        Some(raw) => StatusFilter::parse(raw).map_err(|_| ApiError::invalid_param("status", raw))?,
        None => StatusFilter::All,
    };
    Ok(VoucherListParams { search, status })
}

pub fn parse_voucher_key(raw: &str) -> Result<VoucherKey, ApiError> {
    VoucherKey::parse(raw).map_err(|_| ApiError::invalid_param("key", raw))
}

pub fn parse_export_dataset(raw: &str) -> Result<ExportDataset, ApiError> {
    ExportDataset::parse(raw).map_err(|_| ApiError::invalid_param("dataset", raw))
}
