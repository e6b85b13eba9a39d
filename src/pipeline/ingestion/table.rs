use serde::{Deserialize, Serialize};

/// A single raw cell as supplied by the spreadsheet-reading collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Blank,
}

impl RawCell {
    pub fn is_blank(&self) -> bool {
        matches!(self, RawCell::Blank)
    }

    /// Render the cell for display in anomaly descriptions.
    pub fn display(&self) -> String {
        match self {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            RawCell::Blank => String::new(),
        }
    }
}

/// One spreadsheet row, positionally aligned with the header list.
pub type RawRow = Vec<RawCell>;

/// A parsed legacy sheet: header strings plus data rows. Rows may be ragged;
/// cells past a row's end read as blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

static BLANK: RawCell = RawCell::Blank;

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&BLANK)
    }
}
