use crate::row::{CellValue, SheetRow};
use crate::IngestError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::BTreeMap;
use std::io::Cursor;

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            CellValue::Text(s.clone())
        }
        // Spreadsheet dates are serial day counts; keep the raw serial.
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Header names: blank headers are skipped, repeated names get `_1`, `_2`...
fn header_names(header_row: &[Data]) -> Vec<Option<String>> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    header_row
        .iter()
        .map(|cell| {
            let name = cell_value(cell).to_text()?;
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}_{count}")
            };
            *count += 1;
            Some(unique)
        })
        .collect()
}

/// Reads the first worksheet. The first row holds headers; every following
/// non-blank row becomes one [`SheetRow`] carrying only its non-blank cells.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError(format!("não foi possível ler a planilha: {e}")))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError("a planilha não possui abas".to_string()))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| IngestError(format!("não foi possível ler a aba '{first}': {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = header_names(header_row);

    let mut out = Vec::new();
    for cells in rows {
        let mut row = SheetRow::new(out.len() + 1);
        for (name, cell) in headers.iter().zip(cells) {
            let Some(name) = name else { continue };
            let value = cell_value(cell);
            if !value.is_blank() {
                row.push(name.clone(), value);
            }
        }
        if !row.is_empty() {
            out.push(row);
        }
    }
    Ok(out)
}
