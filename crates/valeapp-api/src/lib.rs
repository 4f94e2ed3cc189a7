#![forbid(unsafe_code)]
//! Wire contract of the HTTP service: error envelope, status mapping,
//! request parameters and response bodies. No transport code lives here.

pub mod convert;
pub mod dto;
pub mod error_mapping;
pub mod errors;
pub mod openapi;
pub mod params;

pub use dto::{
    justification_kinds, AdminLoginRequest, CleanupRequest, EmployeeLoginRequest,
    ImportResponseDto, JustificationKindDto, JustifyResponseDto, LoginResponseDto,
    NewAdminRequest, NewEmployeeRequest, PasswordSetupRequest, ReadyDto, SessionDto,
    VoucherListDto,
};
pub use error_mapping::{map_error, ApiErrorMapping};
pub use errors::{ApiError, ApiErrorCode};
pub use openapi::openapi_v1_spec;
pub use params::{
    parse_export_dataset, parse_voucher_key, parse_voucher_list_params, VoucherListParams,
};

pub const CRATE_NAME: &str = "valeapp-api";
pub const API_VERSION: &str = "v1";
