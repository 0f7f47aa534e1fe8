use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info, instrument};

use crate::config::FileConfig;
use crate::error::{IngestError, Result};
use crate::observability::metrics;
use crate::types::{CellValue, RawRow, SheetGrid};

/// Check extension and size before the workbook is opened. Returns the file
/// size in bytes.
pub fn validate_file(path: &Path, config: &FileConfig) -> Result<u64> {
    let file = path.display().to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    let supported = config
        .supported_extensions
        .iter()
        .any(|s| s.to_lowercase() == extension);
    if !supported {
        return Err(IngestError::UnsupportedFormat {
            file,
            supported: config.supported_extensions.clone(),
        });
    }

    let size = fs::metadata(path)?.len();
    if size == 0 {
        return Err(IngestError::EmptyFile(file));
    }
    let limit = config.max_file_size_bytes();
    if size > limit {
        return Err(IngestError::FileTooLarge { file, size, limit });
    }

    Ok(size)
}

/// Read the first worksheet of a workbook into a grid. Row 0 of the grid is
/// the first row of the used range.
#[instrument(skip(config), fields(path = %path.display()))]
pub fn read_grid(path: &Path, config: &FileConfig) -> Result<SheetGrid> {
    let started = Instant::now();
    let size = validate_file(path, config)?;
    debug!(bytes = size, "File accepted");

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook.sheet_names().first().cloned().ok_or(IngestError::NoWorksheet)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)??;

    let rows: Vec<RawRow> = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    let secs = started.elapsed().as_secs_f64();
    metrics::sheet::read(rows.len(), secs);
    info!(sheet = %sheet_name, rows = rows.len(), "Worksheet loaded in {:.3}s", secs);

    Ok(SheetGrid::new(rows))
}

/// [`read_grid`] on the blocking pool, for callers inside a runtime
pub async fn load_grid(path: impl Into<PathBuf>, config: FileConfig) -> Result<SheetGrid> {
    let path = path.into();
    tokio::task::spawn_blocking(move || read_grid(&path, &config)).await?
}

pub fn convert_cell(value: &Data) -> CellValue {
    match value {
        Data::Empty => CellValue::Empty,
        Data::Bool(v) => CellValue::Bool(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::String(v) => CellValue::Text(v.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(v) => CellValue::Number(v.as_f64()),
        Data::DateTimeIso(v) => CellValue::Text(v.clone()),
        Data::DurationIso(v) => CellValue::Text(v.clone()),
    }
}
