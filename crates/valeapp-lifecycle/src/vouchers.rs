// SPDX-License-Identifier: Apache-2.0

use crate::{LifecycleError, VoucherLifecycle};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use valeapp_geo::{
    collect_geolocation, device_snapshot, ClientDevice, PositionFix, ReportedPosition,
};
use valeapp_ingest::{IngestEvent, IngestStage, NormalizeOptions};
use valeapp_model::{
    compute_stats, AdminStats, ArchivedVoucher, Justification, JustificationForm, PromaxCode,
    Role, SessionUser, Voucher, VoucherKey, VoucherStats,
};
use valeapp_store::StoreErrorCode;

pub const VOUCHER_NOT_FOUND: &str = "Vale não encontrado.";
pub const VOUCHER_NOT_OWNED: &str = "Este vale não pertence ao seu código Promax.";
pub const VOUCHER_ALREADY_JUSTIFIED: &str = "Este vale já foi justificado.";
pub const ADMIN_CANNOT_JUSTIFY: &str = "Apenas funcionários podem justificar vales.";

/// Everything the employee's device sends with a justification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JustifySubmission {
    #[serde(flatten)]
    pub form: JustificationForm,
    #[serde(default)]
    pub device: ClientDevice,
    /// Fix the device obtained before submitting, if any.
    #[serde(default)]
    pub position: Option<PositionFix>,
    /// Address the request came from, filled in by the transport.
    #[serde(skip)]
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JustifyOutcome {
    pub voucher: Voucher,
    /// False when the archive copy could not be written; the justification
    /// itself still stands.
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub events: Vec<IngestEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub archived: usize,
    pub deleted: usize,
}

fn trace_ingest_events(events: &[IngestEvent]) {
    for e in events {
        debug!(stage = ?e.stage, event = %e.name, fields = ?e.fields, "ingest event");
    }
}

impl VoucherLifecycle {
    pub async fn list_for_employee(
        &self,
        promax: &PromaxCode,
    ) -> Result<Vec<Voucher>, LifecycleError> {
        self.store
            .list_vouchers(Some(promax))
            .await
            .map_err(LifecycleError::store("Erro ao carregar vales"))
    }

    pub async fn list_all(&self) -> Result<Vec<Voucher>, LifecycleError> {
        self.store
            .list_vouchers(None)
            .await
            .map_err(LifecycleError::store("Erro ao carregar vales"))
    }

    /// Admins see every voucher; employees only those owned by their promax code.
    pub async fn vouchers_for(&self, user: &SessionUser) -> Result<Vec<Voucher>, LifecycleError> {
        match (user.role, &user.promax) {
            (Role::Admin, _) => self.list_all().await,
            (Role::Employee, Some(promax)) => self.list_for_employee(promax).await,
            (Role::Employee, None) => Ok(Vec::new()),
        }
    }

    #[must_use]
    pub fn stats(vouchers: &[Voucher]) -> VoucherStats {
        compute_stats(vouchers)
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, LifecycleError> {
        let vouchers = self.list_all().await?;
        let total_employees = self
            .store
            .count_employees()
            .await
            .map_err(LifecycleError::store("Erro ao carregar estatísticas"))?;
        Ok(AdminStats {
            vouchers: compute_stats(&vouchers),
            total_employees,
        })
    }

    /// Normalizes every row of the workbook, then inserts the whole batch.
    /// Nothing is written unless every row normalized.
    pub async fn import_batch(
        &self,
        workbook: &[u8],
        opts: &NormalizeOptions,
    ) -> Result<ImportSummary, LifecycleError> {
        let batch = match valeapp_ingest::normalize_workbook(workbook, opts) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "import rejected during normalization");
                return Err(e.into());
            }
        };
        trace_ingest_events(&batch.events);
        let mut events = batch.events;
        let inserted = self
            .store
            .insert_vouchers(&batch.vouchers)
            .await
            .map_err(LifecycleError::store("Erro ao salvar dados"))?;
        let insert_event = IngestEvent {
            stage: IngestStage::Insert,
            name: "ingest.insert.complete".to_string(),
            fields: BTreeMap::from([
                ("inserted".to_string(), inserted.to_string()),
                ("backend".to_string(), self.store.backend_tag().to_string()),
            ]),
        };
        trace_ingest_events(std::slice::from_ref(&insert_event));
        events.push(insert_event);
        info!(inserted, "voucher import complete");
        Ok(ImportSummary { inserted, events })
    }

    /// Validates the form, checks ownership, records device and location,
    /// then flips the voucher to `Justificado` with a conditional write. The
    /// archive copy is best effort.
    pub async fn justify(
        &self,
        user: &SessionUser,
        key: &VoucherKey,
        submission: JustifySubmission,
    ) -> Result<JustifyOutcome, LifecycleError> {
        let promax = match (user.role, &user.promax) {
            (Role::Employee, Some(promax)) => promax,
            _ => return Err(LifecycleError::Forbidden(ADMIN_CANNOT_JUSTIFY.to_string())),
        };
        let kind = submission
            .form
            .validate()
            .map_err(|e| LifecycleError::Validation(e.0))?;

        let current = self
            .store
            .find_voucher(key)
            .await
            .map_err(LifecycleError::store("Erro ao enviar justificativa"))?
            .ok_or_else(|| LifecycleError::NotFound(VOUCHER_NOT_FOUND.to_string()))?;
        if !current.is_owned_by(promax) {
            warn!(voucher = %key, user = %user.id, "justify refused: not the owner");
            return Err(LifecycleError::Forbidden(VOUCHER_NOT_OWNED.to_string()));
        }
        if !current.is_pending() {
            return Err(LifecycleError::Conflict(VOUCHER_ALREADY_JUSTIFIED.to_string()));
        }

        let geo = collect_geolocation(
            &ReportedPosition(submission.position),
            self.geo.as_ref(),
            submission.client_ip.as_deref(),
        )
        .await;
        debug!(voucher = %key, source = ?geo.source, "location collected");

        let justification = Justification {
            kind,
            observation: submission.form.observation(),
            measure: submission.form.measure(),
            justified_at: Utc::now(),
            device: device_snapshot(&submission.device, &geo),
        };
        let voucher = self
            .store
            .justify_voucher(key, &justification)
            .await
            .map_err(|e| match e.code {
                StoreErrorCode::Conflict => {
                    LifecycleError::Conflict(VOUCHER_ALREADY_JUSTIFIED.to_string())
                }
                StoreErrorCode::NotFound => LifecycleError::NotFound(VOUCHER_NOT_FOUND.to_string()),
                _ => LifecycleError::store("Erro ao enviar justificativa")(e),
            })?;
        info!(voucher = %key, kind = %kind, user = %user.id, "voucher justified");

        let archived = match self
            .store
            .insert_archived(&voucher.to_archived(&user.name, Utc::now()))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(voucher = %key, error = %e, "archive copy failed; justification kept");
                false
            }
        };
        Ok(JustifyOutcome { voucher, archived })
    }

    /// Copies every justified voucher into the archive, then deletes the
    /// whole working table, pending rows included. Irreversible.
    pub async fn cleanup_archive_and_purge(
        &self,
        admin_name: &str,
    ) -> Result<CleanupSummary, LifecycleError> {
        let justified = self
            .store
            .list_justified_vouchers()
            .await
            .map_err(LifecycleError::store("Erro na limpeza"))?;
        let archived = if justified.is_empty() {
            info!("no justified vouchers to archive");
            0
        } else {
            let now = Utc::now();
            let rows: Vec<ArchivedVoucher> = justified
                .iter()
                .map(|v| v.to_archived(admin_name, now))
                .collect();
            match self.store.insert_archived_batch(&rows).await {
                Ok(n) => n,
                Err(e) if e.code == StoreErrorCode::Conflict => {
                    debug!(error = %e, "archive has duplicates; retrying as upsert");
                    self.store
                        .upsert_archived_batch(&rows)
                        .await
                        .map_err(LifecycleError::store("Erro na limpeza"))?
                }
                Err(e) => return Err(LifecycleError::store("Erro na limpeza")(e)),
            }
        };
        let deleted = self
            .store
            .delete_all_vouchers()
            .await
            .map_err(LifecycleError::store("Erro na limpeza"))?;
        info!(archived, deleted, admin = admin_name, "working table purged");
        Ok(CleanupSummary { archived, deleted })
    }
}
