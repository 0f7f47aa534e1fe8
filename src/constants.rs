/// Sentinel and default values shared by the record builder, the quality
/// gate and the downstream filters. Each "not specified" sentinel is distinct
/// so that a filter can exclude exactly one field's placeholder.

// Record defaults
pub const DEFAULT_REVISION: &str = "01";
pub const OUTCOME_IN_PROGRESS: &str = "In progress";
pub const COUNTRY_UNSPECIFIED: &str = "Country not specified";
pub const AGENT_UNSPECIFIED: &str = "Agent not specified";
pub const CATEGORY_UNSPECIFIED: &str = "Category not specified";

/// Prefix of synthesized RO numbers for rows with an empty key cell
pub const SYNTHESIZED_RO_PREFIX: &str = "RO-";

/// RO numbers starting with this prefix are commercial; all others are normal
pub const COMMERCIAL_PREFIX: &str = "C-";

/// Minimum number of characters of a valid RO number
pub const MIN_RO_NUM_LEN: usize = 2;

// Ingestion defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_FAILURE_SAMPLES: usize = 10;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Number of leading cells copied into a failure sample
pub const FAILURE_PREVIEW_CELLS: usize = 3;

/// Cell texts that mean "no value" (compared case-insensitively, after trimming)
pub const PLACEHOLDER_TOKENS: &[&str] = &["-", "--", "n/a", "na", "null", "undefined", "#n/a", "n/d"];

/// Dates an empty cell turns into when a spreadsheet misreads it
pub const SENTINEL_DATES: &[&str] = &["1900-01-01", "1900-01-02", "1900-01-03"];

/// Plausible window for spreadsheet serial dates (exclusive, roughly 1968..2173)
pub const SERIAL_DATE_MIN: f64 = 25_000.0;
pub const SERIAL_DATE_MAX: f64 = 100_000.0;

/// Accepted years are strictly inside this window
pub const MIN_YEAR_EXCLUSIVE: i32 = 1900;
pub const MAX_YEAR_EXCLUSIVE: i32 = 2100;

/// Built-in agent code -> display name table
pub const AGENT_CODES: &[(&str, &str)] = &[
    ("1", "Sig. Bacco"),
    ("2", "Renato Bacco"),
    ("3", "Serena Padrono"),
    ("4", "Luca De Gaetano"),
    ("5", "Andrea Zara"),
    ("6", "Mattia Arata"),
    ("7", "Arrigo Bussinello"),
    ("8", "Francesco"),
    ("P01", "Terapeutico"),
];

/// Built-in category code -> display name table
pub const CATEGORY_CODES: &[(&str, &str)] = &[
    ("P02", "Benessere"),
    ("P03", "Grandi impianti"),
    ("P04", "Privato"),
    ("P05", "Top Class"),
    ("P06", "Extra"),
    ("P07", "Eccezionale"),
    ("P08", "Residence"),
    ("P09", "Assistenza"),
];

/// Minimum offer value for the high-value quick filter
pub const HIGH_VALUE_THRESHOLD: f64 = 50_000.0;

/// Outcome fragments that mark an offer as won (matched case-insensitively)
pub const WON_OUTCOME_KEYWORDS: &[&str] =
    &["presa", "chiusa", "vinta", "aggiudicata", "confermata", "won", "closed"];
