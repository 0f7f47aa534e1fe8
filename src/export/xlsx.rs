//! Four-sheet workbook report: summary, filtered records, per-agent and
//! per-month analysis.

use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::analysis::filter::{Facets, RecordFilter};
use crate::analysis::summary::{AgentStats, MonthlyPoint, Summary};
use crate::error::Result;
use crate::types::Record;

pub const SUMMARY_SHEET: &str = "Summary";
pub const DATA_SHEET: &str = "Filtered Data";
pub const AGENTS_SHEET: &str = "Agent Analysis";
pub const MONTHLY_SHEET: &str = "Monthly Analysis";

const DATA_HEADER: [&str; 10] = [
    "RO Number",
    "Date",
    "Country",
    "Agent",
    "Offer Value",
    "Outcome",
    "Contract Value",
    "Completion %",
    "Category",
    "Description",
];

const AGENT_HEADER: [&str; 9] = [
    "Agent",
    "RO Count",
    "Total Offer Value",
    "Total Contract Value",
    "Won",
    "Success Rate %",
    "Average Offer Value",
    "Value Conversion %",
    "Average Probability %",
];

const MONTHLY_HEADER: [&str; 5] = [
    "Period",
    "RO Count",
    "Offer Value",
    "Average Value",
    "Average Probability %",
];

/// Write the workbook for `records`, the already filtered selection.
pub fn write_xlsx(records: &[Record], filter: &RecordFilter, path: &Path) -> Result<()> {
    let summary = Summary::of(records);
    let facets = Facets::from_records(records);
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    workbook.push_worksheet(summary_sheet(&summary, &facets, filter, &bold)?);
    workbook.push_worksheet(data_sheet(records, &bold)?);
    workbook.push_worksheet(agents_sheet(&summary.agents, &bold)?);
    workbook.push_worksheet(monthly_sheet(&summary.monthly_trend, &bold)?);
    workbook.save(path)?;

    info!(path = %path.display(), records = records.len(), "Workbook export written");
    Ok(())
}

fn header_row(sheet: &mut Worksheet, header: &[&str], bold: &Format) -> std::result::Result<(), XlsxError> {
    for (col, title) in header.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, bold)?;
    }
    Ok(())
}

fn summary_sheet(
    summary: &Summary,
    facets: &Facets,
    filter: &RecordFilter,
    bold: &Format,
) -> std::result::Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(SUMMARY_SHEET)?;
    header_row(&mut sheet, &["Metric", "Value"], bold)?;

    let numbers = [
        ("Total RO", summary.total_ro as f64),
        ("Normal RO", summary.normal_count as f64),
        ("Commercial RO", summary.commercial_count as f64),
        ("Total Offer Value", summary.total_offer_value),
        ("Total Contract Value", summary.total_contract_value),
        ("Probable Value", summary.probabilistic_value),
        ("Contracts Won", summary.won_count as f64),
        ("Success Rate %", round2(summary.success_rate)),
        ("Average Value per RO", round2(summary.avg_offer_value)),
        ("Value Conversion %", round2(summary.conversion_rate)),
        ("Average Probability %", round2(summary.avg_probability)),
    ];
    let mut row = 1;
    for (label, value) in numbers {
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, value)?;
        row += 1;
    }

    let period = match facets.date_range {
        Some((from, to)) => format!("{} - {}", from, to),
        None => "no dated records".to_string(),
    };
    let texts = [
        ("Analysis Period", period),
        ("Filters Applied", filter.to_string()),
        ("Export Date", Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    ];
    for (label, value) in texts {
        sheet.write_string(row, 0, label)?;
        sheet.write_string(row, 1, value)?;
        row += 1;
    }

    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 32)?;
    Ok(sheet)
}

fn data_sheet(records: &[Record], bold: &Format) -> std::result::Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(DATA_SHEET)?;
    header_row(&mut sheet, &DATA_HEADER, bold)?;

    for (i, r) in records.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &r.ro_num)?;
        if let Some(date) = r.ro_date {
            sheet.write_string(row, 1, date.format("%Y-%m-%d").to_string())?;
        }
        sheet.write_string(row, 2, &r.country)?;
        sheet.write_string(row, 3, &r.agent_name)?;
        sheet.write_number(row, 4, r.offer_value)?;
        sheet.write_string(row, 5, &r.outcome)?;
        sheet.write_number(row, 6, r.contract_value)?;
        sheet.write_number(row, 7, r.completion_percent)?;
        sheet.write_string(row, 8, &r.category)?;
        sheet.write_string(row, 9, &r.description)?;
    }
    Ok(sheet)
}

fn agents_sheet(agents: &[AgentStats], bold: &Format) -> std::result::Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(AGENTS_SHEET)?;
    header_row(&mut sheet, &AGENT_HEADER, bold)?;

    for (i, a) in agents.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &a.agent)?;
        let values = [
            a.count as f64,
            a.total_value,
            a.contract_value,
            a.won_count as f64,
            round2(a.success_rate),
            round2(a.avg_offer_value),
            round2(a.conversion_rate),
            round2(a.avg_probability),
        ];
        for (col, value) in values.into_iter().enumerate() {
            sheet.write_number(row, col as u16 + 1, value)?;
        }
    }
    Ok(sheet)
}

fn monthly_sheet(months: &[MonthlyPoint], bold: &Format) -> std::result::Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(MONTHLY_SHEET)?;
    header_row(&mut sheet, &MONTHLY_HEADER, bold)?;

    for (i, m) in months.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &m.month)?;
        sheet.write_number(row, 1, m.count as f64)?;
        sheet.write_number(row, 2, m.value)?;
        sheet.write_number(row, 3, round2(m.avg_value))?;
        sheet.write_number(row, 4, round2(m.avg_probability))?;
    }
    Ok(sheet)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
