use std::collections::HashMap;

use crate::config::LookupConfig;
use crate::constants::{AGENT_CODES, CATEGORY_CODES};

/// Agent and category code -> display name tables.
///
/// Unmapped codes pass through unchanged, so a sheet that already carries
/// names instead of codes is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLookupTable {
    agents: HashMap<String, String>,
    categories: HashMap<String, String>,
}

impl Default for CodeLookupTable {
    fn default() -> Self {
        Self {
            agents: to_map(AGENT_CODES),
            categories: to_map(CATEGORY_CODES),
        }
    }
}

impl CodeLookupTable {
    pub fn empty() -> Self {
        Self { agents: HashMap::new(), categories: HashMap::new() }
    }

    /// Built-in tables extended (and overridden) by configured entries
    pub fn from_config(config: &LookupConfig) -> Self {
        let mut table = Self::default();
        table.agents.extend(config.agents.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
            .categories
            .extend(config.categories.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    pub fn agent_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.agents.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn category_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.categories.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect()
}
