//! Metrics for the ingestion pipeline.
//!
//! Recording goes through the `metrics` facade, so every function here is a
//! no-op until a recorder is installed. The CLI installs the Prometheus
//! recorder with [`init`] and prints [`render`] on request.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run lifecycle
    RunsStarted,
    RunsCompleted,
    RunsFailed,
    RunDuration,

    // Row processing
    RowsProcessed,
    RowsBlankSkipped,
    RowsRejected,
    RecordsAccepted,
    RecordsAcceptedWithWarnings,
    BatchesProcessed,
    BatchSize,
    DegradedCells,

    // Dedup
    DuplicatesRemoved,
    RecordsPublished,

    // Sheet reader
    SheetReadDuration,
    SheetRows,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsStarted => "ro_ingest_runs_started_total",
            MetricName::RunsCompleted => "ro_ingest_runs_completed_total",
            MetricName::RunsFailed => "ro_ingest_runs_failed_total",
            MetricName::RunDuration => "ro_ingest_run_duration_seconds",

            MetricName::RowsProcessed => "ro_ingest_rows_processed_total",
            MetricName::RowsBlankSkipped => "ro_ingest_rows_blank_skipped_total",
            MetricName::RowsRejected => "ro_ingest_rows_rejected_total",
            MetricName::RecordsAccepted => "ro_ingest_records_accepted_total",
            MetricName::RecordsAcceptedWithWarnings => "ro_ingest_records_accepted_with_warnings_total",
            MetricName::BatchesProcessed => "ro_ingest_batches_processed_total",
            MetricName::BatchSize => "ro_ingest_batch_size",
            MetricName::DegradedCells => "ro_ingest_degraded_cells_total",

            MetricName::DuplicatesRemoved => "ro_ingest_duplicates_removed_total",
            MetricName::RecordsPublished => "ro_ingest_records_published_total",

            MetricName::SheetReadDuration => "ro_ingest_sheet_read_duration_seconds",
            MetricName::SheetRows => "ro_ingest_sheet_rows",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RunsStarted,
            RunsCompleted,
            RunsFailed,
            RunDuration,
            RowsProcessed,
            RowsBlankSkipped,
            RowsRejected,
            RecordsAccepted,
            RecordsAcceptedWithWarnings,
            BatchesProcessed,
            BatchSize,
            DegradedCells,
            DuplicatesRemoved,
            RecordsPublished,
            SheetReadDuration,
            SheetRows,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::RunsStarted => ("run", "Ingestion runs started", None),
            MetricName::RunsCompleted => ("run", "Ingestion runs that published a dataset", None),
            MetricName::RunsFailed => ("run", "Ingestion runs aborted by a structural error", None),
            MetricName::RunDuration => ("run", "Wall time of a run", Some("s")),

            MetricName::RowsProcessed => ("rows", "Non-blank data rows examined", None),
            MetricName::RowsBlankSkipped => ("rows", "Fully blank rows skipped", None),
            MetricName::RowsRejected => ("rows", "Rows rejected by structure or validation", None),
            MetricName::RecordsAccepted => ("rows", "Records admitted before dedup", None),
            MetricName::RecordsAcceptedWithWarnings => ("rows", "Records admitted with warnings", None),
            MetricName::BatchesProcessed => ("rows", "Row batches processed", None),
            MetricName::BatchSize => ("rows", "Rows per batch", None),
            MetricName::DegradedCells => ("rows", "Cells that fell back to a default", None),

            MetricName::DuplicatesRemoved => ("dedup", "Superseded revisions discarded", None),
            MetricName::RecordsPublished => ("dedup", "Records in published datasets", None),

            MetricName::SheetReadDuration => ("sheet", "Workbook read time", Some("s")),
            MetricName::SheetRows => ("sheet", "Rows in the first worksheet", None),
        }
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    PROMETHEUS_HANDLE.set(handle).ok();

    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

// ============================================================================
// Ingestion run metrics
// ============================================================================

pub mod run {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::RunsStarted.as_str()).increment(1);
    }

    pub fn completed(published: usize, secs: f64) {
        ::metrics::counter!(MetricName::RunsCompleted.as_str()).increment(1);
        ::metrics::counter!(MetricName::RecordsPublished.as_str()).increment(published as u64);
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }

    pub fn failed(reason: &'static str, secs: f64) {
        ::metrics::counter!(MetricName::RunsFailed.as_str(), "reason" => reason).increment(1);
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Row processing metrics
// ============================================================================

pub mod rows {
    use super::MetricName;
    use crate::pipeline::processing::normalize::{DegradedCells, ValueKind};

    pub fn batch_processed(size: usize) {
        ::metrics::counter!(MetricName::BatchesProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::BatchSize.as_str()).record(size as f64);
    }

    pub fn processed(count: usize) {
        ::metrics::counter!(MetricName::RowsProcessed.as_str()).increment(count as u64);
    }

    pub fn blank_skipped(count: usize) {
        ::metrics::counter!(MetricName::RowsBlankSkipped.as_str()).increment(count as u64);
    }

    /// `kind` is `structural` or `validation`
    pub fn rejected(kind: &'static str) {
        ::metrics::counter!(MetricName::RowsRejected.as_str(), "kind" => kind).increment(1);
    }

    pub fn accepted(count: usize, with_warnings: usize) {
        ::metrics::counter!(MetricName::RecordsAccepted.as_str()).increment(count as u64);
        ::metrics::counter!(MetricName::RecordsAcceptedWithWarnings.as_str())
            .increment(with_warnings as u64);
    }

    pub fn degraded(cells: &DegradedCells) {
        for (kind, count) in [
            (ValueKind::Numeric, cells.numeric),
            (ValueKind::Percentage, cells.percentage),
            (ValueKind::Date, cells.date),
        ] {
            if count > 0 {
                ::metrics::counter!(MetricName::DegradedCells.as_str(), "kind" => kind.as_str())
                    .increment(count as u64);
            }
        }
    }
}

pub mod dedup {
    use super::MetricName;

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::DuplicatesRemoved.as_str()).increment(count as u64);
    }
}

pub mod sheet {
    use super::MetricName;

    pub fn read(rows: usize, secs: f64) {
        ::metrics::histogram!(MetricName::SheetRows.as_str()).record(rows as f64);
        ::metrics::histogram!(MetricName::SheetReadDuration.as_str()).record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|n| n.starts_with("ro_ingest_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        run::started();
        rows::processed(3);
        dedup::duplicates_removed(1);
        assert_eq!(MetricName::RowsProcessed.to_string(), "ro_ingest_rows_processed_total");
    }
}
