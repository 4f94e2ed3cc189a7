// SPDX-License-Identifier: Apache-2.0

use crate::IngestError;
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::{Map, Value};

pub const EXPORT_SHEET_NAME: &str = "Data";

/// `{name}_{YYYY-MM-DD}.xlsx`
#[must_use]
pub fn export_file_name(name: &str, date: NaiveDate) -> String {
    format!("{name}_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Nested objects become dotted column names (`justification.kind`).
fn flatten_into(prefix: &str, value: Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let name = if prefix.is_empty() {
                    k
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(&name, v, out);
            }
        }
        other => out.push((prefix.to_string(), other)),
    }
}

fn flatten_record(value: Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    match value {
        Value::Object(_) => flatten_into("", value, &mut out),
        other => out.push(("value".to_string(), other)),
    }
    out
}

/// Writes one row per record under a header row built from the union of
/// field names, in first-seen order. Returns the `.xlsx` bytes.
pub fn export_records<T: Serialize>(records: &[T]) -> Result<Vec<u8>, IngestError> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Map<String, Value>> = Vec::with_capacity(records.len());
    for record in records {
        let value = serde_json::to_value(record)
            .map_err(|e| IngestError(format!("export serialization failed: {e}")))?;
        let mut row = Map::new();
        for (name, cell) in flatten_record(value) {
            if !columns.contains(&name) {
                columns.push(name.clone());
            }
            row.insert(name, cell);
        }
        rows.push(row);
    }

    let to_err = |e: rust_xlsxwriter::XlsxError| IngestError(format!("export write failed: {e}"));
    let mut workbook = Workbook::new();
    let header_fmt = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME).map_err(to_err)?;

    for (col, name) in columns.iter().enumerate() {
        let col = u16::try_from(col)
            .map_err(|_| IngestError("too many columns for a worksheet".to_string()))?;
        worksheet
            .write_string_with_format(0, col, name, &header_fmt)
            .map_err(to_err)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let line = u32::try_from(idx + 1)
            .map_err(|_| IngestError("too many rows for a worksheet".to_string()))?;
        for (col, name) in columns.iter().enumerate() {
            let col = u16::try_from(col)
                .map_err(|_| IngestError("too many columns for a worksheet".to_string()))?;
            match row.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(line, col, *b).map_err(to_err)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(line, col, f).map_err(to_err)?;
                    }
                    None => {
                        worksheet
                            .write_string(line, col, n.to_string())
                            .map_err(to_err)?;
                    }
                },
                Some(Value::String(s)) => {
                    worksheet.write_string(line, col, s).map_err(to_err)?;
                }
                Some(other) => {
                    worksheet
                        .write_string(line, col, other.to_string())
                        .map_err(to_err)?;
                }
            }
        }
    }
    workbook.save_to_buffer().map_err(to_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 17).expect("date");
        assert_eq!(export_file_name("vales", date), "vales_2025-09-17.xlsx");
    }

    #[test]
    fn nested_records_flatten_to_dotted_columns() {
        let flat = flatten_record(serde_json::json!({
            "key": "A_1",
            "justification": {"kind": "Troca", "device": {"ip": "1.2.3.4"}},
        }));
        let names: Vec<_> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"key"));
        assert!(names.contains(&"justification.kind"));
        assert!(names.contains(&"justification.device.ip"));
    }
}
