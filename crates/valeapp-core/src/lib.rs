#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};

pub mod dates;
mod errors;

pub use errors::{ErrorCode, ErrorContext, ExitCode, MachineError, ResultExt};

pub const CRATE_NAME: &str = "valeapp-core";

pub const ENV_VALEAPP_LOG_JSON: &str = "VALEAPP_LOG_JSON";
pub const ENV_VALEAPP_STORE: &str = "VALEAPP_STORE";
pub const ENV_VALEAPP_SQLITE_PATH: &str = "VALEAPP_SQLITE_PATH";
pub const ENV_VALEAPP_STORE_URL: &str = "VALEAPP_STORE_URL";
pub const ENV_VALEAPP_STORE_KEY: &str = "VALEAPP_STORE_KEY";
pub const ENV_VALEAPP_STORE_TIMEOUT_MS: &str = "VALEAPP_STORE_TIMEOUT_MS";
pub const ENV_VALEAPP_BIND: &str = "VALEAPP_BIND";
pub const ENV_VALEAPP_MAX_UPLOAD_BYTES: &str = "VALEAPP_MAX_UPLOAD_BYTES";
pub const ENV_VALEAPP_SESSION_TTL_SECS: &str = "VALEAPP_SESSION_TTL_SECS";
pub const ENV_VALEAPP_GEO_ENABLED: &str = "VALEAPP_GEO_ENABLED";
pub const ENV_VALEAPP_IPIFY_URL: &str = "VALEAPP_IPIFY_URL";
pub const ENV_VALEAPP_IPAPI_URL: &str = "VALEAPP_IPAPI_URL";
pub const ENV_VALEAPP_NOMINATIM_URL: &str = "VALEAPP_NOMINATIM_URL";
pub const ENV_VALEAPP_PASSWORD_ITERATIONS: &str = "VALEAPP_PASSWORD_ITERATIONS";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Reads an environment variable, treating blank values as unset.
#[must_use]
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
