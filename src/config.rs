use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_FAILURE_SAMPLES, DEFAULT_MAX_FILE_SIZE_MB,
    DEFAULT_SUPPORTED_EXTENSIONS,
};
use crate::error::{IngestError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const ENV_BATCH_SIZE: &str = "RO_INGEST_BATCH_SIZE";
const ENV_MAX_FAILURE_SAMPLES: &str = "RO_INGEST_MAX_FAILURE_SAMPLES";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ingestion: IngestionConfig,
    pub files: FileConfig,
    pub lookups: LookupConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestionConfig {
    pub batch_size: usize,
    pub max_failure_samples: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_failure_samples: DEFAULT_MAX_FAILURE_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub max_file_size_mb: u64,
    pub supported_extensions: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Extra code -> display name entries layered over the built-in tables
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    pub agents: HashMap<String, String>,
    pub categories: HashMap<String, String>,
}

impl Config {
    /// Load `config.toml` from the working directory, or defaults if it is absent
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from(DEFAULT_CONFIG_PATH)
        } else {
            let mut config = Self::default();
            config.apply_env()?;
            config.validate()?;
            Ok(config)
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let mut config = Self::from_toml(&config_content)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_usize(ENV_BATCH_SIZE)? {
            self.ingestion.batch_size = v;
        }
        if let Some(v) = env_usize(ENV_MAX_FAILURE_SAMPLES)? {
            self.ingestion.max_failure_samples = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingestion.batch_size == 0 {
            return Err(IngestError::Config("ingestion.batch_size must be greater than 0".to_string()));
        }
        if self.files.supported_extensions.is_empty() {
            return Err(IngestError::Config("files.supported_extensions must not be empty".to_string()));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| IngestError::Config(format!("{} must be a non-negative integer: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.ingestion.batch_size, 100);
        assert_eq!(config.ingestion.max_failure_samples, 10);
        assert_eq!(config.files.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.files.supported_extensions, vec![".xlsx", ".xls"]);
        assert!(config.lookups.agents.is_empty());
    }

    #[test]
    fn test_parses_lookups_and_partial_sections() {
        let config = Config::from_toml(
            r#"
            [ingestion]
            batch_size = 25

            [lookups.agents]
            "9" = "Marta Ferri"
            "#,
        )
        .unwrap();
        assert_eq!(config.ingestion.batch_size, 25);
        assert_eq!(config.ingestion.max_failure_samples, 10);
        assert_eq!(config.lookups.agents.get("9").map(String::as_str), Some("Marta Ferri"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::default();
        config.ingestion.batch_size = 0;
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[files]\nmax_file_size_mb = 5").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.files.max_file_size_mb, 5);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(Config::from_toml("[ingestion\n"), Err(IngestError::Toml(_))));
    }
}
