use thiserror::Error;

/// Fatal errors: nothing is published when one of these is returned.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Sheet is empty or has no data rows (found {rows} row(s), need a header and at least one record)")]
    EmptySheet { rows: usize },

    #[error("Missing mandatory column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("No valid records found ({rows_processed} row(s) processed, {rejected} rejected)")]
    NoValidRecords { rows_processed: usize, rejected: usize },

    #[error("Unsupported file format '{file}': expected one of {}", .supported.join(", "))]
    UnsupportedFormat { file: String, supported: Vec<String> },

    #[error("File '{0}' is empty")]
    EmptyFile(String),

    #[error("File '{file}' is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { file: String, size: u64, limit: u64 },

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Workbook could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Row-level structural problems. Recovered locally by the pipeline: the row
/// is counted, sampled into the report and skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("row ends at column {len} before the RO number column {expected}")]
    Truncated { len: usize, expected: usize },

    #[error("RO number cell holds spreadsheet error {0}")]
    ErrorCell(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
