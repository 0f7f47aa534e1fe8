use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::FAILURE_PREVIEW_CELLS;
use crate::pipeline::processing::columns::{ColumnMap, ColumnWarning};
use crate::pipeline::processing::dedup::ClassificationStats;
use crate::pipeline::processing::normalize::DegradedCells;
use crate::types::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The row could not carry a record at all
    Structural,
    /// A record was built but broke a record invariant
    Validation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Structural => "structural",
            FailureKind::Validation => "validation",
        }
    }
}

/// A sampled row failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// Sheet row index, the header being row 0
    pub row_index: usize,
    pub kind: FailureKind,
    pub reason: String,
    /// Leading cells of the row as text
    pub preview: Vec<String>,
}

impl RowFailure {
    pub fn new(row_index: usize, kind: FailureKind, reason: impl Into<String>, row: &RawRow) -> Self {
        Self {
            row_index,
            kind,
            reason: reason.into(),
            preview: row
                .iter()
                .take(FAILURE_PREVIEW_CELLS)
                .map(|c| c.as_text().unwrap_or_default())
                .collect(),
        }
    }
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} ({}): {} [{}]",
            self.row_index,
            self.kind.as_str(),
            self.reason,
            self.preview.join(" | ")
        )
    }
}

/// Outcome summary of one ingestion run.
///
/// Carries no timestamps or generated ids: ingesting the same grid twice
/// yields equal reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Data rows in the sheet, header excluded
    pub total_rows: usize,
    /// Non-blank data rows examined
    pub rows_processed: usize,
    pub blank_rows_skipped: usize,
    pub validation_failures: usize,
    pub row_errors: usize,
    /// Records admitted before deduplication
    pub records_accepted: usize,
    pub accepted_with_warnings: usize,
    pub duplicates_removed: usize,
    pub final_count: usize,
    pub classification: ClassificationStats,
    pub degraded_cells: DegradedCells,
    pub column_warnings: Vec<ColumnWarning>,
    pub columns: ColumnMap,
    /// Capped sample of failed rows, in sheet order
    pub failure_samples: Vec<RowFailure>,
    pub batches: usize,
}

impl IngestionReport {
    pub fn rejected(&self) -> usize {
        self.validation_failures + self.row_errors
    }

    pub fn has_failures(&self) -> bool {
        self.rejected() > 0
    }

    /// Failures that happened but were not kept as samples
    pub fn unsampled_failures(&self) -> usize {
        self.rejected().saturating_sub(self.failure_samples.len())
    }
}

impl fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows in sheet:          {}", self.total_rows)?;
        writeln!(f, "Rows processed:         {}", self.rows_processed)?;
        writeln!(f, "Blank rows skipped:     {}", self.blank_rows_skipped)?;
        writeln!(
            f,
            "Rows rejected:          {} ({} validation, {} structural)",
            self.rejected(),
            self.validation_failures,
            self.row_errors
        )?;
        writeln!(
            f,
            "Records accepted:       {} ({} with warnings)",
            self.records_accepted, self.accepted_with_warnings
        )?;
        writeln!(f, "Duplicates removed:     {}", self.duplicates_removed)?;
        writeln!(
            f,
            "Final records:          {} ({} normal, {} commercial)",
            self.final_count, self.classification.normal, self.classification.commercial
        )?;
        write!(
            f,
            "Degraded cells:         {} ({} numeric, {} percentage, {} date)",
            self.degraded_cells.total(),
            self.degraded_cells.numeric,
            self.degraded_cells.percentage,
            self.degraded_cells.date
        )?;
        for warning in &self.column_warnings {
            write!(f, "\nWarning: {}", warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    #[test]
    fn test_failure_preview_takes_leading_cells() {
        let row: RawRow = vec!["RO-1".into(), CellValue::Empty, 12.0.into(), "extra".into()];
        let failure = RowFailure::new(4, FailureKind::Validation, "bad", &row);
        assert_eq!(failure.preview, vec!["RO-1", "", "12"]);
        assert_eq!(failure.to_string(), "row 4 (validation): bad [RO-1 |  | 12]");
    }

    #[test]
    fn test_unsampled_failures() {
        let report = IngestionReport {
            validation_failures: 12,
            row_errors: 1,
            failure_samples: vec![
                RowFailure::new(1, FailureKind::Structural, "x", &vec![]);
                10
            ],
            ..Default::default()
        };
        assert_eq!(report.rejected(), 13);
        assert_eq!(report.unsampled_failures(), 3);
        assert!(report.has_failures());
    }
}
