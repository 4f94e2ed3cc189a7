use serde::{Deserialize, Serialize};

/// A spreadsheet cell after decoding, independent of the workbook format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Empty cells and blank strings count as absent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Float(f) => f.is_nan(),
            Self::Int(_) | Self::Bool(_) => false,
        }
    }

    /// Renders the cell the way a spreadsheet user would read it:
    /// whole floats lose their fractional part.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{f:.0}"))
            }
            Self::Float(f) if f.is_finite() => Some(f.to_string()),
            Self::Float(_) => None,
            Self::Bool(b) => Some(b.to_string()),
        }
    }

    /// Integer reading: floats truncate, text contributes its leading digits.
    #[must_use]
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Self::Text(s) => leading_number(s.trim(), false)?.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Decimal reading; a lone comma is accepted as the decimal separator.
    #[must_use]
    pub fn to_float(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::Text(s) => {
                let trimmed = s.trim();
                let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
                    trimmed.replace(',', ".")
                } else {
                    trimmed.to_string()
                };
                leading_number(&normalized, true)?.parse::<f64>().ok()
            }
            _ => None,
        }
    }
}

fn leading_number(s: &str, allow_fraction: bool) -> Option<&str> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in s.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }
    seen_digit.then(|| s[..end].trim_end_matches('.'))
}

/// One data row keyed by its header text, in sheet column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetRow {
    /// 1-based position among the data rows (the header row is not counted).
    pub number: usize,
    cells: Vec<(String, CellValue)>,
}

impl SheetRow {
    #[must_use]
    pub fn new(number: usize) -> Self {
        Self {
            number,
            cells: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_pairs<K: Into<String>>(
        number: usize,
        pairs: impl IntoIterator<Item = (K, CellValue)>,
    ) -> Self {
        let mut row = Self::new(number);
        for (name, value) in pairs {
            row.push(name, value);
        }
        row
    }

    /// Later cells with an already present name replace the earlier value.
    pub fn push(&mut self, name: impl Into<String>, value: CellValue) {
        let name = name.into();
        if let Some(slot) = self.cells.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.cells.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_readings_follow_spreadsheet_habits() {
        assert_eq!(CellValue::text("12abc").to_int(), Some(12));
        assert_eq!(CellValue::text("-3").to_int(), Some(-3));
        assert_eq!(CellValue::text("abc").to_int(), None);
        assert_eq!(CellValue::Float(3.9).to_int(), Some(3));
        assert_eq!(CellValue::text("12,50").to_float(), Some(12.5));
        assert_eq!(CellValue::text("7.25 R$").to_float(), Some(7.25));
        assert_eq!(CellValue::text("7.").to_float(), Some(7.0));
        assert_eq!(CellValue::Bool(true).to_float(), None);
    }

    #[test]
    fn text_rendering_drops_whole_float_fraction() {
        assert_eq!(CellValue::Float(45917.0).to_text().as_deref(), Some("45917"));
        assert_eq!(CellValue::Float(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::text("  ").to_text(), None);
    }

    #[test]
    fn row_keeps_column_order_and_last_value() {
        let mut row = SheetRow::new(4);
        row.push("Mapa", CellValue::Int(1));
        row.push("Item", CellValue::text("X"));
        row.push("Mapa", CellValue::Int(2));
        assert_eq!(row.columns().collect::<Vec<_>>(), ["Mapa", "Item"]);
        assert_eq!(row.get("Mapa"), Some(&CellValue::Int(2)));
    }
}
