//! The ingestion run: grid in, deduplicated records plus report out.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, IngestionConfig};
use crate::error::{IngestError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::columns::{ColumnMap, ColumnResolver};
use crate::pipeline::processing::dedup::Deduplicator;
use crate::pipeline::processing::lookup::CodeLookupTable;
use crate::pipeline::processing::normalize::DegradedCells;
use crate::pipeline::processing::quality_gate::{DefaultQualityGate, QualityDecision, QualityGate};
use crate::pipeline::processing::record_builder::RecordBuilder;
use crate::pipeline::report::{FailureKind, IngestionReport, RowFailure};
use crate::types::{RawRow, Record, SheetGrid};

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    ColumnsResolved,
    Processing,
    Deduplicating,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, ColumnsResolved)
            | (ColumnsResolved, Processing)
            | (Processing, Deduplicating)
            | (Deduplicating, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Snapshot sent after each batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Data rows consumed so far, blank rows included
    pub rows_done: usize,
    pub total_rows: usize,
    pub batch: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total_rows == 0 {
            100.0
        } else {
            self.rows_done as f64 * 100.0 / self.total_rows as f64
        }
    }
}

pub trait ProgressReporter: Send {
    fn report(&mut self, progress: Progress);
}

/// Emits progress as debug-level tracing events
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&mut self, progress: Progress) {
        debug!(
            batch = progress.batch,
            rows_done = progress.rows_done,
            total_rows = progress.total_rows,
            "Ingestion progress {:.0}%",
            progress.percent()
        );
    }
}

#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _progress: Progress) {}
}

/// Everything a run needs from its caller
#[derive(Debug, Clone, Default)]
pub struct IngestionContext {
    pub config: IngestionConfig,
    pub lookups: CodeLookupTable,
    pub resolver: ColumnResolver,
    pub gate: DefaultQualityGate,
}

impl IngestionContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.ingestion.clone(),
            lookups: CodeLookupTable::from_config(&config.lookups),
            ..Self::default()
        }
    }
}

/// Published result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionOutcome {
    pub records: Vec<Record>,
    pub report: IngestionReport,
}

/// One ingestion run. `run` consumes the pipeline.
pub struct IngestionPipeline {
    context: IngestionContext,
    reporter: Box<dyn ProgressReporter>,
    state: PipelineState,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run accumulators
#[derive(Default)]
struct RunState {
    accepted: Vec<Record>,
    report: IngestionReport,
}

impl RunState {
    fn record_failure(&mut self, failure: RowFailure, max_samples: usize) {
        match failure.kind {
            FailureKind::Structural => self.report.row_errors += 1,
            FailureKind::Validation => self.report.validation_failures += 1,
        }
        metrics::rows::rejected(failure.kind.as_str());

        if self.report.failure_samples.len() < max_samples {
            warn!(
                row = failure.row_index,
                kind = failure.kind.as_str(),
                preview = ?failure.preview,
                "Row rejected: {}",
                failure.reason
            );
            self.report.failure_samples.push(failure);
        }
    }
}

impl IngestionPipeline {
    pub fn new() -> Self {
        Self::with_context(IngestionContext::default(), Box::new(LogProgress))
    }

    pub fn with_context(context: IngestionContext, reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            context,
            reporter,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    fn fail(&mut self, error: IngestError, started: Instant) -> IngestError {
        self.transition(PipelineState::Failed);
        let reason = match &error {
            IngestError::EmptySheet { .. } => "empty_sheet",
            IngestError::MissingColumns { .. } => "missing_columns",
            IngestError::NoValidRecords { .. } => "no_valid_records",
            _ => "other",
        };
        metrics::run::failed(reason, started.elapsed().as_secs_f64());
        warn!("Ingestion failed: {}", error);
        error
    }

    /// Run the full pipeline over a grid whose row 0 is the header
    #[instrument(skip_all, fields(rows = grid.len()))]
    pub async fn run(mut self, grid: &SheetGrid) -> Result<IngestionOutcome> {
        let started = Instant::now();
        metrics::run::started();
        info!("Starting ingestion of {} row(s)", grid.len());

        if grid.len() < 2 {
            let error = IngestError::EmptySheet { rows: grid.len() };
            return Err(self.fail(error, started));
        }

        let columns = self.context.resolver.resolve(&grid.header_texts());
        let column_warnings = match self.context.resolver.validate(&columns) {
            Ok(warnings) => warnings,
            Err(e) => return Err(self.fail(e, started)),
        };
        info!(
            resolved = columns.iter().count(),
            missing = ?columns.missing(),
            "Columns resolved"
        );
        self.transition(PipelineState::ColumnsResolved);

        self.transition(PipelineState::Processing);
        let mut run = self.process_rows(grid, &columns).await;
        run.report.columns = columns;
        run.report.column_warnings = column_warnings;

        self.transition(PipelineState::Deduplicating);
        if run.accepted.is_empty() {
            let error = IngestError::NoValidRecords {
                rows_processed: run.report.rows_processed,
                rejected: run.report.rejected(),
            };
            return Err(self.fail(error, started));
        }

        let outcome = Deduplicator::new().dedup(run.accepted);
        metrics::dedup::duplicates_removed(outcome.duplicates_removed);
        if outcome.records.is_empty() {
            let error = IngestError::NoValidRecords {
                rows_processed: run.report.rows_processed,
                rejected: run.report.rejected(),
            };
            return Err(self.fail(error, started));
        }

        let mut report = run.report;
        report.duplicates_removed = outcome.duplicates_removed;
        report.final_count = outcome.records.len();
        report.classification = outcome.classification;

        self.transition(PipelineState::Complete);
        metrics::run::completed(report.final_count, started.elapsed().as_secs_f64());
        info!(
            final_count = report.final_count,
            duplicates_removed = report.duplicates_removed,
            rejected = report.rejected(),
            degraded_cells = report.degraded_cells.total(),
            "Ingestion complete: {} normal, {} commercial",
            report.classification.normal,
            report.classification.commercial
        );

        Ok(IngestionOutcome {
            records: outcome.records,
            report,
        })
    }

    async fn process_rows(&mut self, grid: &SheetGrid, columns: &ColumnMap) -> RunState {
        let batch_size = self.context.config.batch_size.max(1);
        let max_samples = self.context.config.max_failure_samples;
        let builder = RecordBuilder::new(columns, &self.context.lookups);
        let gate = &self.context.gate;

        let data: Vec<(usize, &RawRow)> = grid.data_rows().collect();
        let total_rows = data.len();

        let mut run = RunState::default();
        run.report.total_rows = total_rows;
        let mut degraded = DegradedCells::default();
        let mut rows_done = 0;

        for (batch_no, batch) in data.chunks(batch_size).enumerate() {
            let processed_before = run.report.rows_processed;
            let blank_before = run.report.blank_rows_skipped;

            for (row_index, row) in batch {
                let (row_index, row) = (*row_index, *row);

                if row.iter().all(|c| c.is_blank()) {
                    run.report.blank_rows_skipped += 1;
                    continue;
                }
                run.report.rows_processed += 1;

                let record = match builder.build(row, row_index, &mut degraded) {
                    Ok(record) => record,
                    Err(e) => {
                        let failure = RowFailure::new(row_index, FailureKind::Structural, e.to_string(), row);
                        run.record_failure(failure, max_samples);
                        continue;
                    }
                };

                let assessment = gate.assess(&record);
                match assessment.decision {
                    QualityDecision::Reject => {
                        let reason = assessment.rejection_reason().unwrap_or("validation failed");
                        let failure = RowFailure::new(row_index, FailureKind::Validation, reason, row);
                        run.record_failure(failure, max_samples);
                    }
                    QualityDecision::AcceptWithWarnings => {
                        run.report.accepted_with_warnings += 1;
                        run.accepted.push(record);
                    }
                    QualityDecision::Accept => run.accepted.push(record),
                }
            }

            rows_done += batch.len();
            run.report.batches += 1;
            metrics::rows::batch_processed(batch.len());
            metrics::rows::processed(run.report.rows_processed - processed_before);
            metrics::rows::blank_skipped(run.report.blank_rows_skipped - blank_before);

            self.reporter.report(Progress {
                rows_done,
                total_rows,
                batch: batch_no + 1,
            });

            tokio::task::yield_now().await;
        }

        run.report.records_accepted = run.accepted.len();
        run.report.degraded_cells = degraded;
        metrics::rows::accepted(run.accepted.len(), run.report.accepted_with_warnings);
        metrics::rows::degraded(&degraded);

        run
    }
}

/// Ingest a grid with default configuration and lookups
pub async fn ingest(grid: &SheetGrid) -> Result<IngestionOutcome> {
    IngestionPipeline::new().run(grid).await
}
