// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;
use valeapp_ingest::{
    export_records, normalize_workbook, read_first_sheet, CellValue, IngestStage,
    NormalizeOptions, EXPORT_SHEET_NAME,
};

fn opts() -> NormalizeOptions {
    NormalizeOptions {
        fallback_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"),
    }
}

fn write_fixture(path: &std::path::Path, headers: &[&str], rows: &[Vec<CellValue>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, h) in headers.iter().enumerate() {
        sheet
            .write_string(0, u16::try_from(col).expect("col"), *h)
            .expect("header");
    }
    for (r, row) in rows.iter().enumerate() {
        let line = u32::try_from(r + 1).expect("row");
        for (c, cell) in row.iter().enumerate() {
            let col = u16::try_from(c).expect("col");
            match cell {
                CellValue::Int(i) => {
                    sheet.write_number(line, col, *i as f64).expect("int");
                }
                CellValue::Float(f) => {
                    sheet.write_number(line, col, *f).expect("float");
                }
                CellValue::Text(s) => {
                    sheet.write_string(line, col, s).expect("text");
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(line, col, *b).expect("bool");
                }
                CellValue::Empty => {}
            }
        }
    }
    // A second sheet must be ignored.
    workbook
        .add_worksheet()
        .write_string(0, 0, "Coditem_mapa")
        .expect("second sheet");
    workbook.save(path).expect("save fixture");
}

#[test]
fn first_sheet_rows_normalize_into_vouchers() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("vales.xlsx");
    write_fixture(
        &path,
        &["Data", "Mapa", "coditem", "Item", "Qtde Diferença", "Valor", "Promax_unico"],
        &[
            vec![
                CellValue::Int(45917),
                CellValue::Int(88001),
                CellValue::Int(1020),
                CellValue::text("Cerveja 350ml"),
                CellValue::Int(-3),
                CellValue::Float(12.5),
                CellValue::text("P-77"),
            ],
            vec![CellValue::Empty; 7],
            vec![
                CellValue::text("01/01/45918"),
                CellValue::Int(88002),
                CellValue::Int(1021),
                CellValue::text("Refrigerante"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::text("P-88"),
            ],
        ],
    );
    let bytes = std::fs::read(&path).expect("read fixture");

    let rows = read_first_sheet(&bytes).expect("rows");
    assert_eq!(rows.len(), 2, "blank rows are skipped");
    assert_eq!(rows[1].number, 2);

    let batch = normalize_workbook(&bytes, &opts()).expect("normalize");
    assert_eq!(batch.vouchers.len(), 2);
    let first = &batch.vouchers[0];
    assert_eq!(first.key.as_str(), "1020_88001");
    assert_eq!(first.date, "2025-09-17");
    assert_eq!(first.quantity_difference, -3);
    let second = &batch.vouchers[1];
    assert_eq!(second.key.as_str(), "1021_88002");
    assert_eq!(second.date, "2025-09-18");
    assert_eq!(second.value, 0.0);
    assert!(batch
        .events
        .iter()
        .any(|e| e.stage == IngestStage::Read && e.name == "ingest.read.complete"));
    assert!(batch
        .events
        .iter()
        .any(|e| e.name == "ingest.normalize.quantity_difference.absent"));
}

#[test]
fn missing_key_columns_fail_the_whole_workbook() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("sem_chave.xlsx");
    write_fixture(
        &path,
        &["Coditem_mapa", "Cliente", "Valor"],
        &[
            vec![
                CellValue::text("A_1"),
                CellValue::text("Bar"),
                CellValue::Int(3),
            ],
            vec![CellValue::Empty, CellValue::text("Mercado"), CellValue::Int(4)],
        ],
    );
    let bytes = std::fs::read(&path).expect("read fixture");
    let err = normalize_workbook(&bytes, &opts()).expect_err("row 2 lacks key");
    assert!(err.0.contains("Linha 2"), "unexpected error: {}", err.0);
    assert!(
        err.0.contains("Cliente") && err.0.contains("Valor"),
        "unexpected error: {}",
        err.0
    );
}

#[test]
fn export_writes_a_data_sheet_with_flattened_headers() {
    #[derive(serde::Serialize)]
    struct Line<'a> {
        key: &'a str,
        value: f64,
        owner: Option<&'a str>,
    }
    let bytes = export_records(&[
        Line {
            key: "A_1",
            value: 1.5,
            owner: Some("P-1"),
        },
        Line {
            key: "B_2",
            value: 2.0,
            owner: None,
        },
    ])
    .expect("export");

    use calamine::{open_workbook_auto_from_rs, Reader};
    let mut workbook =
        open_workbook_auto_from_rs(std::io::Cursor::new(bytes.clone())).expect("reopen");
    assert_eq!(workbook.sheet_names(), vec![EXPORT_SHEET_NAME.to_string()]);

    let rows = read_first_sheet(&bytes).expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("key"), Some(&CellValue::text("A_1")));
    assert_eq!(rows[1].get("owner"), None);
}
