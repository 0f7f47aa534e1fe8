use crate::constants::COMMERCIAL_PREFIX;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as delivered by the sheet reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet error value such as `#REF!` or `#N/A`
    Error(String),
}

impl CellValue {
    /// Empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual form of the cell, `None` when blank. Integral numbers are
    /// rendered without a fractional part so that `1234.0` reads as `1234`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Error(e) => Some(e.clone()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// One spreadsheet row, cells positioned by column index
pub type RawRow = Vec<CellValue>;

/// Rectangular-ish grid of the first worksheet. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    rows: Vec<RawRow>,
}

impl SheetGrid {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    /// Total number of rows including the header
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&RawRow> {
        self.rows.first()
    }

    /// Header cells as text (blank headers become empty strings)
    pub fn header_texts(&self) -> Vec<String> {
        self.header()
            .map(|row| row.iter().map(|c| c.as_text().unwrap_or_default()).collect())
            .unwrap_or_default()
    }

    /// Data rows paired with their sheet row index (the header is row 0)
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &RawRow)> {
        self.rows.iter().enumerate().skip(1)
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }
}

/// Classification derived from the RO number alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Normal,
    Commercial,
}

impl RecordKind {
    pub fn of(ro_num: &str) -> Self {
        if ro_num.starts_with(COMMERCIAL_PREFIX) {
            RecordKind::Commercial
        } else {
            RecordKind::Normal
        }
    }
}

/// The canonical, immutable RO record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Value of the ID column, or the sheet row index when absent
    pub id: u64,
    /// Business key
    pub ro_num: String,
    /// Revision token as found in the sheet (e.g. `.10`, `01`)
    pub ro_rev: String,
    pub ro_date: Option<NaiveDate>,
    pub country: String,
    /// Display name resolved through the agent lookup table
    pub agent_name: String,
    /// Raw agent cell, kept for code-based filtering
    pub agent_code: Option<String>,
    pub offer_value: f64,
    pub outcome: String,
    pub contract_value: f64,
    /// Display name resolved through the category lookup table
    pub category: String,
    /// Raw category cell, kept for code-based filtering
    pub category_code: Option<String>,
    pub description: String,
    /// Probability of realization, 0..=100
    pub completion_percent: f64,
    /// Sheet row the record was built from
    pub source_row: usize,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        RecordKind::of(&self.ro_num)
    }

    pub fn is_commercial(&self) -> bool {
        self.kind() == RecordKind::Commercial
    }

    pub fn is_normal(&self) -> bool {
        !self.is_commercial()
    }

    /// `YYYY-MM` of the record date, if any
    pub fn month(&self) -> Option<String> {
        self.ro_date.map(|d| d.format("%Y-%m").to_string())
    }
}
