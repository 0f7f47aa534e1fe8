// Ingestion pipeline: sheet reading, row processing, orchestration and the published session

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod report;
pub mod storage;

pub use orchestrator::{
    ingest, IngestionContext, IngestionOutcome, IngestionPipeline, LogProgress, NoProgress,
    PipelineState, Progress, ProgressReporter,
};
pub use report::{FailureKind, IngestionReport, RowFailure};
pub use storage::{Dataset, DatasetView, Session};
