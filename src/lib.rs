pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod observability;
pub mod pipeline;
pub mod types;

pub use error::{IngestError, Result};
pub use pipeline::{ingest, IngestionOutcome, IngestionPipeline, IngestionReport, Session};
pub use types::{CellValue, RawRow, Record, RecordKind, SheetGrid};
