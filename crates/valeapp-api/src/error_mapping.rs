// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    /// Clients may retry the same request later.
    pub retryable: bool,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidQueryParameter
        | ApiErrorCode::InvalidRequestBody
        | ApiErrorCode::ConfirmationRequired => 400,
        ApiErrorCode::ValidationFailed => 422,
        ApiErrorCode::Unauthenticated | ApiErrorCode::InvalidCredentials => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::UpstreamStoreUnavailable | ApiErrorCode::NotReady => 503,
        _ => 500,
    };
    ApiErrorMapping {
        status_code,
        retryable: status_code == 503,
    }
}
