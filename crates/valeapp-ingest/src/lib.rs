// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod export;
mod fields;
mod logging;
mod normalize;
mod row;
mod workbook;

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use valeapp_model::NewVoucher;

pub const CRATE_NAME: &str = "valeapp-ingest";

pub use export::{export_file_name, export_records, EXPORT_SHEET_NAME};
pub use fields::{resolve_field, FieldCandidates, FIELDS};
pub use logging::{IngestEvent, IngestLog, IngestStage};
pub use normalize::normalize_row;
pub use row::{CellValue, SheetRow};
pub use workbook::read_first_sheet;

#[derive(Debug)]
pub struct IngestError(pub String);
impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for IngestError {}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Date stored when a row has no decodable date.
    pub fallback_date: NaiveDate,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            fallback_date: Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub vouchers: Vec<NewVoucher>,
    pub events: Vec<IngestEvent>,
}

/// Normalizes every row or none: the first failing row aborts the batch.
pub fn normalize_rows(
    rows: &[SheetRow],
    opts: &NormalizeOptions,
) -> Result<NormalizedBatch, IngestError> {
    let mut log = IngestLog::default();
    let vouchers = normalize_rows_into(rows, opts, &mut log)?;
    Ok(NormalizedBatch {
        vouchers,
        events: log.into_events(),
    })
}

/// Reads the first sheet of an `.xlsx`/`.xls`/`.ods` workbook and
/// normalizes its rows.
pub fn normalize_workbook(
    bytes: &[u8],
    opts: &NormalizeOptions,
) -> Result<NormalizedBatch, IngestError> {
    let mut log = IngestLog::default();
    log.emit(IngestStage::Read, "ingest.read.begin", BTreeMap::new());
    let rows = read_first_sheet(bytes)?;
    log.emit(
        IngestStage::Read,
        "ingest.read.complete",
        BTreeMap::from([("rows".to_string(), rows.len().to_string())]),
    );
    let vouchers = normalize_rows_into(&rows, opts, &mut log)?;
    Ok(NormalizedBatch {
        vouchers,
        events: log.into_events(),
    })
}

fn normalize_rows_into(
    rows: &[SheetRow],
    opts: &NormalizeOptions,
    log: &mut IngestLog,
) -> Result<Vec<NewVoucher>, IngestError> {
    if rows.is_empty() {
        return Err(IngestError(
            "planilha vazia: nenhuma linha de dados encontrada".to_string(),
        ));
    }
    log.emit(
        IngestStage::Normalize,
        "ingest.normalize.begin",
        BTreeMap::new(),
    );
    let vouchers = rows
        .iter()
        .map(|row| normalize_row(row, opts, log))
        .collect::<Result<Vec<_>, _>>()?;
    log.emit(
        IngestStage::Normalize,
        "ingest.normalize.complete",
        BTreeMap::from([("vouchers".to_string(), vouchers.len().to_string())]),
    );
    Ok(vouchers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        let err = normalize_rows(&[], &NormalizeOptions::default()).expect_err("empty");
        assert!(err.0.contains("vazia"), "unexpected error: {}", err.0);
    }

    #[test]
    fn one_bad_row_aborts_the_batch() {
        let good = SheetRow::from_pairs(1, [("Coditem_mapa", CellValue::text("A_1"))]);
        let bad = SheetRow::from_pairs(2, [("Cliente", CellValue::text("Bar do Zé"))]);
        let err = normalize_rows(&[good, bad], &NormalizeOptions::default())
            .expect_err("second row has no key");
        assert!(err.0.starts_with("Linha 2:"), "unexpected error: {}", err.0);
    }
}
