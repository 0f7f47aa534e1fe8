use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::analysis::filter::RecordFilter;
use crate::error::Result;
use crate::pipeline::report::IngestionReport;
use crate::types::Record;

pub mod xlsx;

pub use xlsx::write_xlsx;

pub const CSV_HEADER: [&str; 9] = [
    "RO Number",
    "Date",
    "Country",
    "Agent",
    "Offer Value",
    "Outcome",
    "Contract Value",
    "Completion %",
    "Category",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const FILE_PREFIX: &str = "ro_export";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    report: &'a IngestionReport,
    records: &'a [Record],
}

/// `ro_export_<timestamp>.<ext>` inside `output_dir`
pub fn timestamped_path(output_dir: &Path, format: ExportFormat) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("{FILE_PREFIX}_{timestamp}.{}", format.extension()))
}

/// Write records to a timestamped file in `output_dir`, creating the
/// directory if needed. `filter` is the selection that produced `records`,
/// described in the workbook summary. Returns the written path.
pub fn export_to_dir<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    report: &IngestionReport,
    filter: &RecordFilter,
    output_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = timestamped_path(output_dir, format);
    match format {
        ExportFormat::Csv => {
            write_csv(records, &path)?;
        }
        ExportFormat::Json => {
            let records: Vec<Record> = records.into_iter().cloned().collect();
            write_json(&records, report, &path)?;
        }
        ExportFormat::Xlsx => {
            let records: Vec<Record> = records.into_iter().cloned().collect();
            write_xlsx(&records, filter, &path)?;
        }
    }
    Ok(path)
}

/// CSV with a UTF-8 byte order mark so spreadsheet tools pick the encoding
pub fn write_csv<'a>(records: impl IntoIterator<Item = &'a Record>, path: &Path) -> Result<usize> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(CSV_HEADER)?;

    let mut written = 0;
    for record in records {
        writer.write_record(csv_row(record))?;
        written += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), records = written, "CSV export written");
    Ok(written)
}

fn csv_row(record: &Record) -> [String; 9] {
    [
        record.ro_num.clone(),
        record.ro_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        record.country.clone(),
        record.agent_name.clone(),
        record.offer_value.to_string(),
        record.outcome.clone(),
        record.contract_value.to_string(),
        record.completion_percent.to_string(),
        record.category.clone(),
    ]
}

pub fn write_json(records: &[Record], report: &IngestionReport, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(&JsonExport { report, records })?;
    fs::write(path, content)?;
    info!(path = %path.display(), records = records.len(), "JSON export written");
    Ok(())
}
