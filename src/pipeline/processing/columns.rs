//! Header auto-detection.
//!
//! Spreadsheets arrive with Italian, English or mixed headers. Each canonical
//! field owns a ranked alias list; a header matches when its lower-cased,
//! trimmed text equals or contains an alias. Headers are scanned left to
//! right, so the earliest matching column wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "RO_num")]
    RoNum,
    #[serde(rename = "RO_rev")]
    RoRev,
    #[serde(rename = "RO_date")]
    RoDate,
    Country,
    AgentName,
    OfferValue,
    OfferOutcome,
    ContractValue,
    Category,
    Description,
    CompletionPercent,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::Id,
        CanonicalField::RoNum,
        CanonicalField::RoRev,
        CanonicalField::RoDate,
        CanonicalField::Country,
        CanonicalField::AgentName,
        CanonicalField::OfferValue,
        CanonicalField::OfferOutcome,
        CanonicalField::ContractValue,
        CanonicalField::Category,
        CanonicalField::Description,
        CanonicalField::CompletionPercent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Id => "ID",
            CanonicalField::RoNum => "RO_num",
            CanonicalField::RoRev => "RO_rev",
            CanonicalField::RoDate => "RO_date",
            CanonicalField::Country => "Country",
            CanonicalField::AgentName => "AgentName",
            CanonicalField::OfferValue => "OfferValue",
            CanonicalField::OfferOutcome => "OfferOutcome",
            CanonicalField::ContractValue => "ContractValue",
            CanonicalField::Category => "Category",
            CanonicalField::Description => "Description",
            CanonicalField::CompletionPercent => "CompletionPercent",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type AliasTable = &'static [(CanonicalField, &'static [&'static str])];

/// Ranked aliases per field, as seen in the RO exports in circulation
pub const DEFAULT_ALIASES: AliasTable = &[
    (CanonicalField::Id, &["ID", "id", "Id"]),
    (
        CanonicalField::RoNum,
        &["RO_num", "RO Numero", "Numero RO", "RO Number", "NumRO", "N. RO"],
    ),
    (
        CanonicalField::RoRev,
        &["RO_rev", "RO Rev", "Revisione", "Rev", "RO_revisione"],
    ),
    (
        CanonicalField::RoDate,
        &["RO_data", "RO Data", "Data RO", "Date", "Data", "Data Creazione"],
    ),
    (
        CanonicalField::Country,
        &["Nazione", "Nation", "Country", "Paese", "Stato", "Cliente Nazione"],
    ),
    (
        CanonicalField::AgentName,
        &["Agente_nome", "Agente Nome", "Agent", "Agente", "Nome Agente", "Responsabile"],
    ),
    (
        CanonicalField::OfferValue,
        &["Offerta_Valore", "Valore Offerta", "Offer Value", "Valore", "Importo", "Prezzo"],
    ),
    (
        CanonicalField::OfferOutcome,
        &["Offerta_Esito", "Esito Offerta", "Outcome", "Esito", "Status", "Stato"],
    ),
    (
        CanonicalField::ContractValue,
        &["Valore_Contratto", "Contract Value", "Contratto", "Valore Contratto", "Importo Contratto"],
    ),
    (
        CanonicalField::Category,
        &["Offerta_Categoria", "Category", "Categoria", "Tipo", "Settore", "Prodotto"],
    ),
    (
        CanonicalField::Description,
        &["Offerta_Descrizione", "Description", "Descrizione", "Note", "Dettagli"],
    ),
    (
        CanonicalField::CompletionPercent,
        &["Perc_realizzazione", "Percentuale Realizzazione", "Perc Realizzazione", "% Realizzazione"],
    ),
];

/// Fields whose absence degrades analysis but does not stop ingestion
pub const RECOMMENDED_FIELDS: &[CanonicalField] = &[
    CanonicalField::RoRev,
    CanonicalField::RoDate,
    CanonicalField::CompletionPercent,
];

/// Canonical field -> column index. Built once per sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    resolved: BTreeMap<CanonicalField, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.resolved.get(&field).copied()
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.resolved.contains_key(&field)
    }

    pub fn missing(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| !self.contains(*f))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, usize)> + '_ {
        self.resolved.iter().map(|(f, i)| (*f, *i))
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(CanonicalField, usize)]) -> Self {
        Self { resolved: pairs.iter().copied().collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnWarning {
    /// Recommended columns are absent; defaults will be used
    MissingRecommended { fields: Vec<CanonicalField> },
    /// Neither offer value nor contract value resolved
    NoValueColumns,
}

impl fmt::Display for ColumnWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnWarning::MissingRecommended { fields } => {
                let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                write!(f, "Recommended columns missing: {}", names.join(", "))
            }
            ColumnWarning::NoValueColumns => f.write_str(
                "No offer or contract value column found: economic analysis will be limited",
            ),
        }
    }
}

/// Resolves a header row against an alias table
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver {
    aliases: AliasTable,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self { aliases: DEFAULT_ALIASES }
    }
}

impl ColumnResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aliases(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> ColumnMap {
        let lowered: Vec<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();

        let mut resolved = BTreeMap::new();
        for (field, aliases) in self.aliases {
            if let Some(index) = find_column(&lowered, aliases) {
                debug!(field = field.as_str(), column = index, header = %headers[index].as_ref(), "Column resolved");
                resolved.insert(*field, index);
            }
        }
        ColumnMap { resolved }
    }

    /// Check a resolved map: a missing RO number column is fatal, gaps in
    /// the recommended or value columns only produce warnings.
    pub fn validate(&self, map: &ColumnMap) -> Result<Vec<ColumnWarning>> {
        if !map.contains(CanonicalField::RoNum) {
            return Err(IngestError::MissingColumns {
                missing: vec![CanonicalField::RoNum.as_str().to_string()],
            });
        }

        let mut warnings = Vec::new();

        let missing: Vec<CanonicalField> = RECOMMENDED_FIELDS
            .iter()
            .copied()
            .filter(|f| !map.contains(*f))
            .collect();
        if !missing.is_empty() {
            warnings.push(ColumnWarning::MissingRecommended { fields: missing });
        }

        if !map.contains(CanonicalField::OfferValue) && !map.contains(CanonicalField::ContractValue) {
            warnings.push(ColumnWarning::NoValueColumns);
        }

        for w in &warnings {
            warn!("{}", w);
        }
        Ok(warnings)
    }
}

fn find_column(lowered_headers: &[String], aliases: &[&str]) -> Option<usize> {
    lowered_headers.iter().position(|header| {
        !header.is_empty()
            && aliases.iter().any(|alias| {
                let alias = alias.to_lowercase();
                *header == alias || header.contains(&alias)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_italian_headers() {
        let map = ColumnResolver::new().resolve(&["Numero RO", "Data RO", "Valore"]);
        assert_eq!(map.get(CanonicalField::RoNum), Some(0));
        assert_eq!(map.get(CanonicalField::RoDate), Some(1));
        assert_eq!(map.get(CanonicalField::OfferValue), Some(2));
        assert_eq!(map.get(CanonicalField::ContractValue), None);
        assert_eq!(map.get(CanonicalField::RoRev), None);
    }

    #[test]
    fn test_canonical_headers() {
        let headers = [
            "ID", "RO_num", "RO_rev", "RO_data", "Nazione", "Agente_nome", "Offerta_Valore",
            "Offerta_Esito", "Valore_Contratto", "Offerta_Categoria", "Offerta_Descrizione",
            "Perc_realizzazione",
        ];
        let map = ColumnResolver::new().resolve(&headers);
        for (i, field) in CanonicalField::ALL.iter().enumerate() {
            assert_eq!(map.get(*field), Some(i), "{field}");
        }
        assert!(map.missing().is_empty());
    }

    #[test]
    fn test_case_whitespace_and_containment() {
        let map = ColumnResolver::new().resolve(&["  ro number (primary) ", "COUNTRY"]);
        assert_eq!(map.get(CanonicalField::RoNum), Some(0));
        assert_eq!(map.get(CanonicalField::Country), Some(1));
    }

    #[test]
    fn test_earliest_column_wins() {
        let map = ColumnResolver::new().resolve(&["Importo", "Valore Offerta"]);
        assert_eq!(map.get(CanonicalField::OfferValue), Some(0));
    }

    #[test]
    fn test_blank_headers_never_match() {
        let map = ColumnResolver::new().resolve(&["", "   ", "RO_num"]);
        assert_eq!(map.get(CanonicalField::RoNum), Some(2));
    }

    #[test]
    fn test_missing_ro_num_is_fatal() {
        let resolver = ColumnResolver::new();
        let map = resolver.resolve(&["Data", "Valore"]);
        match resolver.validate(&map) {
            Err(IngestError::MissingColumns { missing }) => assert_eq!(missing, vec!["RO_num"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_warnings_do_not_abort() {
        let resolver = ColumnResolver::new();
        let map = resolver.resolve(&["RO_num", "Nazione"]);
        let warnings = resolver.validate(&map).unwrap();
        assert_eq!(
            warnings,
            vec![
                ColumnWarning::MissingRecommended {
                    fields: vec![
                        CanonicalField::RoRev,
                        CanonicalField::RoDate,
                        CanonicalField::CompletionPercent
                    ]
                },
                ColumnWarning::NoValueColumns,
            ]
        );
    }

    #[test]
    fn test_custom_alias_table() {
        const ALIASES: AliasTable = &[(CanonicalField::RoNum, &["pratica"])];
        let map = ColumnResolver::with_aliases(ALIASES).resolve(&["Codice", "Pratica"]);
        assert_eq!(map.get(CanonicalField::RoNum), Some(1));
        assert_eq!(map.get(CanonicalField::Id), None);
    }
}
