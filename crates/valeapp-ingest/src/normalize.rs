// SPDX-License-Identifier: Apache-2.0

use crate::fields::{self, FieldCandidates};
use crate::logging::{IngestLog, IngestStage};
use crate::row::{CellValue, SheetRow};
use crate::{IngestError, NormalizeOptions};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use valeapp_core::dates;
use valeapp_model::{NewVoucher, PromaxCode, VoucherKey};

fn text(row: &SheetRow, field: &FieldCandidates) -> Option<String> {
    field.resolve(row).and_then(CellValue::to_text)
}

fn row_fields(row: &SheetRow, extra: &[(&str, String)]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::from([("row".to_string(), row.number.to_string())]);
    for (k, v) in extra {
        fields.insert((*k).to_string(), v.clone());
    }
    fields
}

fn resolve_key(row: &SheetRow, log: &mut IngestLog) -> Result<VoucherKey, IngestError> {
    let invalid = |e: valeapp_model::ValidationError| {
        IngestError(format!("Linha {}: {}", row.number, e))
    };
    if let Some(direct) = text(row, &fields::KEY) {
        return VoucherKey::parse(&direct).map_err(invalid);
    }
    if let (Some(item_code), Some(map_id)) =
        (text(row, &fields::ITEM_CODE), text(row, &fields::MAP_ID))
    {
        let key = VoucherKey::from_parts(&item_code, &map_id).map_err(invalid)?;
        log.emit(
            IngestStage::Normalize,
            "ingest.normalize.key_synthesized",
            row_fields(row, &[("key", key.as_str().to_string())]),
        );
        return Ok(key);
    }
    let available = row.columns().collect::<Vec<_>>().join(", ");
    Err(IngestError(format!(
        "Linha {}: Campo '{}' é obrigatório e não foi encontrado. Colunas disponíveis: {available}",
        row.number,
        fields::KEY.field
    )))
}

fn resolve_date(row: &SheetRow, opts: &NormalizeOptions, log: &mut IngestLog) -> String {
    let decoded = match fields::DATE.resolve(row) {
        Some(CellValue::Int(serial)) => dates::decode_serial(*serial).map(|d| d.to_string()),
        #[allow(clippy::cast_possible_truncation)]
        Some(CellValue::Float(serial)) => {
            dates::decode_serial(serial.trunc() as i64).map(|d| d.to_string())
        }
        Some(other) => other.to_text().and_then(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.to_string())
                .or_else(|| dates::to_iso(&raw))
                .or_else(|| dates::calendar_text_to_iso(&raw))
        }),
        None => None,
    };
    decoded.unwrap_or_else(|| {
        let fallback = opts.fallback_date.to_string();
        log.emit(
            IngestStage::Normalize,
            "ingest.normalize.date_fallback",
            row_fields(row, &[("date", fallback.clone())]),
        );
        fallback
    })
}

/// Discrepancy quantity: absent and explicit zero both store 0, but the log
/// records which one it was.
fn resolve_quantity_difference(row: &SheetRow, log: &mut IngestLog) -> i64 {
    match fields::QUANTITY_DIFFERENCE.resolve(row) {
        None => {
            log.emit(
                IngestStage::Normalize,
                "ingest.normalize.quantity_difference.absent",
                row_fields(row, &[]),
            );
            0
        }
        Some(cell) => match cell.to_int() {
            Some(value) => {
                if value == 0 {
                    log.emit(
                        IngestStage::Normalize,
                        "ingest.normalize.quantity_difference.zero",
                        row_fields(row, &[]),
                    );
                }
                value
            }
            None => {
                log.emit(
                    IngestStage::Normalize,
                    "ingest.normalize.quantity_difference.invalid",
                    row_fields(row, &[("raw", cell.to_text().unwrap_or_default())]),
                );
                0
            }
        },
    }
}

fn resolve_owner(row: &SheetRow, log: &mut IngestLog) -> Option<PromaxCode> {
    let raw = text(row, &fields::PROMAX);
    let owner = raw.as_deref().and_then(|p| PromaxCode::parse(p).ok());
    if owner.is_none() {
        log.emit(
            IngestStage::Normalize,
            "ingest.normalize.owner_missing",
            row_fields(row, &[("raw", raw.unwrap_or_default())]),
        );
    }
    owner
}

/// Maps one spreadsheet row onto a voucher awaiting justification.
pub fn normalize_row(
    row: &SheetRow,
    opts: &NormalizeOptions,
    log: &mut IngestLog,
) -> Result<NewVoucher, IngestError> {
    let key = resolve_key(row, log)?;
    let date = resolve_date(row, opts, log);
    let quantity_difference = resolve_quantity_difference(row, log);
    let owner = resolve_owner(row, log);
    let int = |field: &FieldCandidates| {
        field
            .resolve(row)
            .and_then(CellValue::to_int)
            .unwrap_or(0)
    };

    Ok(NewVoucher {
        key,
        date,
        map_id: text(row, &fields::MAP_ID),
        client_code: text(row, &fields::CLIENT_CODE),
        client_name: text(row, &fields::CLIENT_NAME),
        voucher_number: text(row, &fields::VOUCHER_NUMBER),
        issued_at: text(row, &fields::ISSUED_AT),
        item_ti: text(row, &fields::ITEM_TI),
        item_code: text(row, &fields::ITEM_CODE),
        item: text(row, &fields::ITEM).unwrap_or_default(),
        unit: text(row, &fields::UNIT),
        quantity_out: int(&fields::QUANTITY_OUT),
        loose_out: text(row, &fields::LOOSE_OUT),
        quantity_returned: int(&fields::QUANTITY_RETURNED),
        loose_returned: text(row, &fields::LOOSE_RETURNED),
        quantity_difference,
        loose_difference: text(row, &fields::LOOSE_DIFFERENCE),
        value: fields::VALUE
            .resolve(row)
            .and_then(CellValue::to_float)
            .unwrap_or(0.0),
        reviewer: text(row, &fields::REVIEWER),
        owner,
        measure: text(row, &fields::MEASURE),
    })
}
