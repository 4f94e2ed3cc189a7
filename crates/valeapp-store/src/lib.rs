#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod backend;
mod rest;
mod sqlite;

pub use backend::{StoreError, StoreErrorCode, VoucherStore};
pub use rest::RestStore;
pub use sqlite::{SqliteStore, SQLITE_SCHEMA_VERSION};

pub const CRATE_NAME: &str = "valeapp-store";

pub const DEFAULT_SQLITE_PATH: &str = "valeapp.sqlite";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 15_000;

/// Which backend to open and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite {
        path: PathBuf,
    },
    Rest {
        base_url: String,
        api_key: String,
        timeout: Duration,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(valeapp_core::env_non_empty)
    }

    /// Resolves the configuration through `lookup`, which returns `None` for
    /// unset or blank variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let kind = lookup(valeapp_core::ENV_VALEAPP_STORE).unwrap_or_else(|| "sqlite".to_string());
        match kind.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite {
                path: lookup(valeapp_core::ENV_VALEAPP_SQLITE_PATH)
                    .map_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH), PathBuf::from),
            }),
            "rest" => {
                let missing = |name: &str| {
                    StoreError::new(
                        StoreErrorCode::Config,
                        format!("{name} is required when {}=rest", valeapp_core::ENV_VALEAPP_STORE),
                    )
                };
                let base_url = lookup(valeapp_core::ENV_VALEAPP_STORE_URL)
                    .ok_or_else(|| missing(valeapp_core::ENV_VALEAPP_STORE_URL))?;
                let api_key = lookup(valeapp_core::ENV_VALEAPP_STORE_KEY)
                    .ok_or_else(|| missing(valeapp_core::ENV_VALEAPP_STORE_KEY))?;
                let timeout_ms = match lookup(valeapp_core::ENV_VALEAPP_STORE_TIMEOUT_MS) {
                    Some(raw) => raw.parse::<u64>().map_err(|e| {
                        StoreError::new(
                            StoreErrorCode::Config,
                            format!(
                                "{} must be milliseconds: {e}",
                                valeapp_core::ENV_VALEAPP_STORE_TIMEOUT_MS
                            ),
                        )
                    })?,
                    None => DEFAULT_STORE_TIMEOUT_MS,
                };
                Ok(Self::Rest {
                    base_url,
                    api_key,
                    timeout: Duration::from_millis(timeout_ms),
                })
            }
            other => Err(StoreError::new(
                StoreErrorCode::Config,
                format!(
                    "unknown {} value `{other}` (expected sqlite or rest)",
                    valeapp_core::ENV_VALEAPP_STORE
                ),
            )),
        }
    }

    #[must_use]
    pub fn backend_tag(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Rest { .. } => "rest",
        }
    }
}

pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn VoucherStore>, StoreError> {
    let store: Arc<dyn VoucherStore> = match config {
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        StoreConfig::Rest {
            base_url,
            api_key,
            timeout,
        } => Arc::new(RestStore::new(base_url, api_key, *timeout)?),
    };
    info!(backend = store.backend_tag(), "store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_local_sqlite() {
        let cfg = StoreConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(cfg, StoreConfig::default());
        assert_eq!(cfg.backend_tag(), "sqlite");
    }

    #[test]
    fn rest_requires_url_and_key() {
        let err = StoreConfig::from_lookup(lookup_from(&[("VALEAPP_STORE", "rest")]))
            .expect_err("missing url");
        assert_eq!(err.code, StoreErrorCode::Config);
        assert!(err.message.contains("VALEAPP_STORE_URL"), "unexpected error: {}", err.message);

        let err = StoreConfig::from_lookup(lookup_from(&[
            ("VALEAPP_STORE", "rest"),
            ("VALEAPP_STORE_URL", "https://x.supabase.co"),
        ]))
        .expect_err("missing key");
        assert!(err.message.contains("VALEAPP_STORE_KEY"), "unexpected error: {}", err.message);
    }

    #[test]
    fn rest_config_reads_timeout() {
        let cfg = StoreConfig::from_lookup(lookup_from(&[
            ("VALEAPP_STORE", "REST"),
            ("VALEAPP_STORE_URL", "https://x.supabase.co"),
            ("VALEAPP_STORE_KEY", "anon"),
            ("VALEAPP_STORE_TIMEOUT_MS", "2500"),
        ]))
        .expect("config");
        assert_eq!(
            cfg,
            StoreConfig::Rest {
                base_url: "https://x.supabase.co".to_string(),
                api_key: "anon".to_string(),
                timeout: Duration::from_millis(2500),
            }
        );
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = StoreConfig::from_lookup(lookup_from(&[("VALEAPP_STORE", "mongo")]))
            .expect_err("unknown backend");
        assert_eq!(err.code, StoreErrorCode::Config);
    }
}
