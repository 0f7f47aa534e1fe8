use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::analysis::filter::RecordFilter;
use crate::pipeline::orchestrator::IngestionOutcome;
use crate::pipeline::report::IngestionReport;
use crate::types::Record;

/// A published, read-only dataset
#[derive(Debug)]
pub struct Dataset {
    pub records: Arc<[Record]>,
    pub report: IngestionReport,
    /// Where the records came from, usually the workbook path
    pub source: String,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Filtered view over a dataset. Holds indices, never copies records.
#[derive(Debug, Clone)]
pub struct DatasetView {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl DatasetView {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.indices.iter().map(move |&i| &self.dataset.records[i])
    }

    /// Owned copy of the matching records, in dataset order
    pub fn to_records(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }
}

/// Holds at most one published dataset. Publishing swaps it in whole, so
/// readers see either the previous dataset or the new one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<Mutex<Option<Arc<Dataset>>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<Dataset>>> {
        // A panic elsewhere never leaves the slot half-written.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn publish(&self, outcome: IngestionOutcome, source: impl Into<String>) -> Arc<Dataset> {
        let dataset = Arc::new(Dataset {
            records: outcome.records.into(),
            report: outcome.report,
            source: source.into(),
        });
        let previous = self.slot().replace(Arc::clone(&dataset));
        info!(
            source = %dataset.source,
            records = dataset.len(),
            replaced = previous.is_some(),
            "Dataset published"
        );
        dataset
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.slot().clone()
    }

    /// Records of the current dataset matching `filter`. `None` when nothing
    /// has been published.
    pub fn filtered(&self, filter: &RecordFilter) -> Option<DatasetView> {
        let dataset = self.current()?;
        let indices: Vec<usize> = dataset
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();
        debug!(
            active_filters = filter.active_count(),
            matched = indices.len(),
            total = dataset.len(),
            "Filter applied"
        );
        Some(DatasetView { dataset, indices })
    }

    pub fn clear(&self) {
        if self.slot().take().is_some() {
            info!("Session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::filter::KindFilter;
    use crate::constants::{AGENT_UNSPECIFIED, CATEGORY_UNSPECIFIED, OUTCOME_IN_PROGRESS};

    fn record(ro_num: &str, row: usize) -> Record {
        Record {
            id: row as u64,
            ro_num: ro_num.to_string(),
            ro_rev: "01".to_string(),
            ro_date: None,
            country: "Italia".to_string(),
            agent_name: AGENT_UNSPECIFIED.to_string(),
            agent_code: None,
            offer_value: 100.0,
            outcome: OUTCOME_IN_PROGRESS.to_string(),
            contract_value: 0.0,
            category: CATEGORY_UNSPECIFIED.to_string(),
            category_code: None,
            description: String::new(),
            completion_percent: 0.0,
            source_row: row,
        }
    }

    fn outcome(ro_nums: &[&str]) -> IngestionOutcome {
        IngestionOutcome {
            records: ro_nums.iter().enumerate().map(|(i, r)| record(r, i + 1)).collect(),
            report: IngestionReport::default(),
        }
    }

    #[test]
    fn test_empty_session() {
        let session = Session::new();
        assert!(session.current().is_none());
        assert!(session.filtered(&RecordFilter::new()).is_none());
    }

    #[test]
    fn test_publish_replaces_previous_dataset() {
        let session = Session::new();
        let first = session.publish(outcome(&["RO-1", "RO-2"]), "a.xlsx");
        let second = session.publish(outcome(&["RO-3"]), "b.xlsx");

        // Holders of the old dataset keep it intact
        assert_eq!(first.len(), 2);
        let current = session.current().unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(current.source, "b.xlsx");
    }

    #[test]
    fn test_filtered_view_keeps_dataset_order() {
        let session = Session::new();
        session.publish(outcome(&["C-1", "RO-1", "C-2"]), "a.xlsx");

        let filter = RecordFilter {
            kind: KindFilter::Commercial,
            ..RecordFilter::new()
        };
        let view = session.filtered(&filter).unwrap();
        let nums: Vec<&str> = view.iter().map(|r| r.ro_num.as_str()).collect();
        assert_eq!(nums, vec!["C-1", "C-2"]);
        assert_eq!(view.dataset().len(), 3);
    }

    #[test]
    fn test_clear_and_shared_handles() {
        let session = Session::new();
        let handle = session.clone();
        session.publish(outcome(&["RO-1"]), "a.xlsx");
        assert!(handle.current().is_some());
        handle.clear();
        assert!(session.current().is_none());
    }
}
