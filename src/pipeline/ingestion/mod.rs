// Pipeline ingestion: workbook files into raw sheet grids

pub mod sheet_reader;

pub use sheet_reader::{load_grid, read_grid, validate_file};
