// SPDX-License-Identifier: Apache-2.0

use crate::{emit_ok, CliError, OutputMode};
use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use valeapp_auth::{AuthConfig, PasswordHasher};
use valeapp_core::{ErrorCode, ResultExt};
use valeapp_geo::DisabledGeoLookup;
use valeapp_ingest::NormalizeOptions;
use valeapp_lifecycle::{ExportDataset, VoucherLifecycle};
use valeapp_store::{open_store, StoreConfig};

#[derive(Subcommand)]
pub(crate) enum AdminCommand {
    Add {
        #[arg(long)]
        login: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    List,
}

#[derive(Subcommand)]
pub(crate) enum EmployeeCommand {
    Add {
        #[arg(long)]
        cpf: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        promax: String,
    },
    List {
        /// Matches name, CPF or promax code.
        #[arg(long)]
        search: Option<String>,
    },
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|e| CliError::internal(e.to_string()))
}

fn store_config() -> Result<StoreConfig, CliError> {
    StoreConfig::from_env().map_err(|e| CliError::new(ErrorCode::ConfigError, e.message))
}

/// The CLI never justifies, so location lookups stay disabled.
fn open_lifecycle() -> Result<VoucherLifecycle, CliError> {
    let store = open_store(&store_config()?).map_err(|e| CliError::dependency(e.message))?;
    let hasher = PasswordHasher::new(AuthConfig::from_env().password_iterations);
    Ok(VoucherLifecycle::new(store, Arc::new(DisabledGeoLookup), hasher))
}

fn read_workbook(file: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(file)
        .with_context("failed to read workbook")
        .map_err(|e| CliError::usage(format!("{e} ({})", file.display())))
}

fn normalize_options(fallback_date: Option<NaiveDate>) -> NormalizeOptions {
    fallback_date.map_or_else(NormalizeOptions::default, |fallback_date| {
        NormalizeOptions { fallback_date }
    })
}

pub(crate) fn normalize(
    file: &Path,
    fallback_date: Option<NaiveDate>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let bytes = read_workbook(file)?;
    let batch = valeapp_ingest::normalize_workbook(&bytes, &normalize_options(fallback_date))
        .map_err(|e| CliError::new(ErrorCode::ValidationError, format!("Erro no upload: {e}")))?;
    emit_ok(
        output_mode,
        &json!({
            "command": "normalize",
            "rows": batch.vouchers.len(),
            "vouchers": to_json(&batch.vouchers)?,
            "events": to_json(&batch.events)?,
        }),
    )
}

pub(crate) async fn import(
    file: &Path,
    fallback_date: Option<NaiveDate>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let bytes = read_workbook(file)?;
    let lifecycle = open_lifecycle()?;
    let summary = lifecycle
        .import_batch(&bytes, &normalize_options(fallback_date))
        .await?;
    emit_ok(
        output_mode,
        &json!({
            "command": "import",
            "inserted": summary.inserted,
            "events": to_json(&summary.events)?,
        }),
    )
}

pub(crate) async fn export(
    dataset: &str,
    out_dir: &Path,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let dataset = ExportDataset::parse(dataset)?;
    let lifecycle = open_lifecycle()?;
    let file = lifecycle.export(dataset).await?;
    std::fs::create_dir_all(out_dir)
        .with_context("failed to create output directory")
        .map_err(|e| CliError::dependency(e.to_string()))?;
    let path = out_dir.join(&file.file_name);
    std::fs::write(&path, &file.bytes)
        .with_context("failed to write export")
        .map_err(|e| CliError::dependency(e.to_string()))?;
    info!(path = %path.display(), rows = file.rows, "export written");
    emit_ok(
        output_mode,
        &json!({
            "command": "export",
            "dataset": dataset.as_str(),
            "rows": file.rows,
            "path": path,
        }),
    )
}

pub(crate) async fn cleanup(
    admin: &str,
    yes: bool,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::usage(
            "cleanup deletes every voucher, pending ones included; pass --yes to confirm",
        ));
    }
    let admin = admin.trim();
    if admin.is_empty() {
        return Err(CliError::usage("--admin must name who runs the cleanup"));
    }
    let lifecycle = open_lifecycle()?;
    warn!(admin, "cleanup confirmed; purging working table");
    let summary = lifecycle.cleanup_archive_and_purge(admin).await?;
    emit_ok(
        output_mode,
        &json!({
            "command": "cleanup",
            "archived": summary.archived,
            "deleted": summary.deleted,
        }),
    )
}

pub(crate) async fn run_admin(
    command: AdminCommand,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let lifecycle = open_lifecycle()?;
    match command {
        AdminCommand::Add {
            login,
            name,
            password,
        } => {
            let admin = lifecycle.add_admin(&login, &name, &password).await?;
            emit_ok(
                output_mode,
                &json!({"command": "admin add", "admin": to_json(&admin)?}),
            )
        }
        AdminCommand::List => {
            let admins = lifecycle.list_admins().await?;
            emit_ok(
                output_mode,
                &json!({"command": "admin list", "admins": to_json(&admins)?}),
            )
        }
    }
}

pub(crate) async fn run_employee(
    command: EmployeeCommand,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let lifecycle = open_lifecycle()?;
    match command {
        EmployeeCommand::Add {
            cpf,
            name,
            department,
            promax,
        } => {
            let employee = lifecycle
                .add_employee(&cpf, &name, department.as_deref(), &promax)
                .await?;
            emit_ok(
                output_mode,
                &json!({"command": "employee add", "employee": to_json(&employee)?}),
            )
        }
        EmployeeCommand::List { search } => {
            let employees = lifecycle.list_employees(search.as_deref()).await?;
            emit_ok(
                output_mode,
                &json!({"command": "employee list", "employees": to_json(&employees)?}),
            )
        }
    }
}

pub(crate) async fn stats(output_mode: OutputMode) -> Result<(), CliError> {
    let stats = open_lifecycle()?.admin_stats().await?;
    let mut payload = to_json(&stats)?;
    if let Some(map) = payload.as_object_mut() {
        map.insert("command".to_string(), json!("stats"));
    }
    emit_ok(output_mode, &payload)
}

/// Configuration errors exit with `DependencyFailure` before any ping is attempted.
pub(crate) async fn doctor(output_mode: OutputMode) -> Result<(), CliError> {
    let config = store_config()?;
    let lifecycle = open_lifecycle()?;
    let backend = lifecycle.ping().await?;
    emit_ok(
        output_mode,
        &json!({
            "command": "doctor",
            "status": "ok",
            "backend": backend,
            "configured_backend": config.backend_tag(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
