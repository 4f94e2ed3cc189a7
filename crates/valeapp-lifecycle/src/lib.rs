// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Voucher lifecycle: `Sem ação` → `Justificado` → archived and purged.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use valeapp_auth::PasswordHasher;
use valeapp_geo::GeoLookup;
use valeapp_ingest::IngestError;
use valeapp_store::{StoreError, VoucherStore};

mod export;
mod people;
mod vouchers;

pub use export::{ExportDataset, ExportFile};
pub use vouchers::{CleanupSummary, ImportSummary, JustifyOutcome, JustifySubmission};

pub const CRATE_NAME: &str = "valeapp-lifecycle";

#[derive(Debug)]
pub enum LifecycleError {
    Validation(String),
    NotFound(String),
    /// Caller is authenticated but not allowed to touch this record.
    Forbidden(String),
    /// Precondition failed: already justified, duplicate key.
    Conflict(String),
    Ingest(IngestError),
    /// Store call failed; `context` is the user-facing prefix.
    Store {
        context: &'static str,
        source: StoreError,
    },
}

impl LifecycleError {
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(m) | Self::NotFound(m) | Self::Forbidden(m) | Self::Conflict(m) => {
                write!(f, "{m}")
            }
            Self::Ingest(e) => write!(f, "Erro no upload: {e}"),
            Self::Store { context, source } => write!(f, "{context}: {}", source.message),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ingest(e) => Some(e),
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<IngestError> for LifecycleError {
    fn from(value: IngestError) -> Self {
        Self::Ingest(value)
    }
}

/// Every voucher, employee and admin operation, over one store and one set
/// of geolocation services.
pub struct VoucherLifecycle {
    store: Arc<dyn VoucherStore>,
    geo: Arc<dyn GeoLookup>,
    hasher: PasswordHasher,
}

impl VoucherLifecycle {
    #[must_use]
    pub fn new(
        store: Arc<dyn VoucherStore>,
        geo: Arc<dyn GeoLookup>,
        hasher: PasswordHasher,
    ) -> Self {
        Self { store, geo, hasher }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn VoucherStore> {
        &self.store
    }

    /// Round-trips the store; returns the backend tag.
    pub async fn ping(&self) -> Result<&'static str, LifecycleError> {
        self.store
            .ping()
            .await
            .map_err(LifecycleError::store("Erro de conexão"))?;
        Ok(self.store.backend_tag())
    }
}
