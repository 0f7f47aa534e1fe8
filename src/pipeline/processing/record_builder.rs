use crate::constants::{
    AGENT_UNSPECIFIED, CATEGORY_UNSPECIFIED, COUNTRY_UNSPECIFIED, DEFAULT_REVISION,
    OUTCOME_IN_PROGRESS, SYNTHESIZED_RO_PREFIX,
};
use crate::error::RowError;
use crate::pipeline::processing::columns::{CanonicalField, ColumnMap};
use crate::pipeline::processing::lookup::CodeLookupTable;
use crate::pipeline::processing::normalize::{
    clean_string, normalize_date, normalize_numeric, normalize_percentage, parse_numeric_value,
    DegradedCells, ValueKind,
};
use crate::types::{CellValue, RawRow, Record};

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Turns one raw row into a [`Record`].
///
/// Data-quality problems never fail a build: they fall back to defaults and
/// are tallied in the caller's [`DegradedCells`]. Only a row that cannot
/// carry an RO number at all is refused.
pub struct RecordBuilder<'a> {
    columns: &'a ColumnMap,
    lookups: &'a CodeLookupTable,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(columns: &'a ColumnMap, lookups: &'a CodeLookupTable) -> Self {
        Self { columns, lookups }
    }

    pub fn build(
        &self,
        row: &RawRow,
        row_index: usize,
        degraded: &mut DegradedCells,
    ) -> Result<Record, RowError> {
        self.check_structure(row)?;

        let ro_num = self
            .raw_text(row, CanonicalField::RoNum)
            .unwrap_or_else(|| format!("{}{}", SYNTHESIZED_RO_PREFIX, row_index));

        // Placeholder revisions stay as written and rank lowest; only a
        // blank cell gets the default.
        let ro_rev = self
            .raw_text(row, CanonicalField::RoRev)
            .unwrap_or_else(|| DEFAULT_REVISION.to_string());

        let date = normalize_date(self.cell(row, CanonicalField::RoDate));
        degraded.observe(ValueKind::Date, date.quality);

        let offer = normalize_numeric(self.cell(row, CanonicalField::OfferValue));
        degraded.observe(ValueKind::Numeric, offer.quality);

        let contract = normalize_numeric(self.cell(row, CanonicalField::ContractValue));
        degraded.observe(ValueKind::Numeric, contract.quality);

        let completion = normalize_percentage(self.cell(row, CanonicalField::CompletionPercent));
        degraded.observe(ValueKind::Percentage, completion.quality);

        let agent_code = self.text(row, CanonicalField::AgentName);
        let agent_name = agent_code
            .as_deref()
            .map(|code| self.lookups.agent_name(code).to_string())
            .unwrap_or_else(|| AGENT_UNSPECIFIED.to_string());

        let category_code = self.text(row, CanonicalField::Category);
        let category = category_code
            .as_deref()
            .map(|code| self.lookups.category_name(code).to_string())
            .unwrap_or_else(|| CATEGORY_UNSPECIFIED.to_string());

        Ok(Record {
            id: self.id(row, row_index),
            ro_num,
            ro_rev,
            ro_date: date.value,
            country: self
                .text(row, CanonicalField::Country)
                .unwrap_or_else(|| COUNTRY_UNSPECIFIED.to_string()),
            agent_name,
            agent_code,
            offer_value: offer.value,
            outcome: self
                .text(row, CanonicalField::OfferOutcome)
                .unwrap_or_else(|| OUTCOME_IN_PROGRESS.to_string()),
            contract_value: contract.value,
            category,
            category_code,
            description: self.text(row, CanonicalField::Description).unwrap_or_default(),
            completion_percent: completion.value,
            source_row: row_index,
        })
    }

    fn check_structure(&self, row: &RawRow) -> Result<(), RowError> {
        let Some(ro_index) = self.columns.get(CanonicalField::RoNum) else {
            return Ok(());
        };

        match row.get(ro_index) {
            None if row.iter().any(|c| !c.is_blank()) => Err(RowError::Truncated {
                len: row.len(),
                expected: ro_index,
            }),
            Some(CellValue::Error(e)) => Err(RowError::ErrorCell(e.clone())),
            _ => Ok(()),
        }
    }

    fn cell<'r>(&self, row: &'r RawRow, field: CanonicalField) -> &'r CellValue {
        self.columns
            .get(field)
            .and_then(|i| row.get(i))
            .unwrap_or(&EMPTY_CELL)
    }

    fn text(&self, row: &RawRow, field: CanonicalField) -> Option<String> {
        clean_string(self.cell(row, field))
    }

    /// Trimmed cell text with no placeholder filtering
    fn raw_text(&self, row: &RawRow, field: CanonicalField) -> Option<String> {
        self.cell(row, field)
            .as_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn id(&self, row: &RawRow, row_index: usize) -> u64 {
        let id = parse_numeric_value(self.cell(row, CanonicalField::Id));
        if id.is_finite() && id >= 1.0 {
            id.trunc() as u64
        } else {
            row_index as u64
        }
    }
}
