//! Record filtering and facet extraction over a published dataset.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::analysis::summary::is_won;
use crate::constants::{
    AGENT_UNSPECIFIED, CATEGORY_UNSPECIFIED, COUNTRY_UNSPECIFIED, HIGH_VALUE_THRESHOLD,
};
use crate::types::{Record, RecordKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    #[default]
    All,
    Normal,
    Commercial,
}

impl KindFilter {
    pub fn matches(&self, kind: RecordKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Normal => kind == RecordKind::Normal,
            KindFilter::Commercial => kind == RecordKind::Commercial,
        }
    }
}

impl FromStr for KindFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(KindFilter::All),
            "normal" => Ok(KindFilter::Normal),
            "commercial" => Ok(KindFilter::Commercial),
            other => Err(format!("unknown RO type '{}' (all, normal, commercial)", other)),
        }
    }
}

/// Completion-percentage bands, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityBand {
    NearCertain,
    Probable,
    Possible,
    Low,
    Unspecified,
}

impl ProbabilityBand {
    pub const ALL: [ProbabilityBand; 5] = [
        ProbabilityBand::NearCertain,
        ProbabilityBand::Probable,
        ProbabilityBand::Possible,
        ProbabilityBand::Low,
        ProbabilityBand::Unspecified,
    ];

    pub fn of(percent: f64) -> Self {
        if percent >= 90.0 {
            ProbabilityBand::NearCertain
        } else if percent >= 60.0 {
            ProbabilityBand::Probable
        } else if percent >= 30.0 {
            ProbabilityBand::Possible
        } else if percent >= 10.0 {
            ProbabilityBand::Low
        } else {
            ProbabilityBand::Unspecified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbabilityBand::NearCertain => "90% - Near certain",
            ProbabilityBand::Probable => "60% - Probable",
            ProbabilityBand::Possible => "30% - Possible",
            ProbabilityBand::Low => "10% - Low",
            ProbabilityBand::Unspecified => "0% - Unspecified",
        }
    }
}

impl fmt::Display for ProbabilityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProbabilityBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "90" | "near_certain" => Ok(ProbabilityBand::NearCertain),
            "60" | "probable" => Ok(ProbabilityBand::Probable),
            "30" | "possible" => Ok(ProbabilityBand::Possible),
            "10" | "low" => Ok(ProbabilityBand::Low),
            "0" | "unspecified" => Ok(ProbabilityBand::Unspecified),
            other => Err(format!("unknown probability band '{}'", other)),
        }
    }
}

/// One-click presets. Each replaces every criterion except the RO type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    ThisMonth,
    LastMonth,
    ThisQuarter,
    HighValue,
    Won,
    HighProbability,
    MediumProbability,
    LowProbability,
}

impl QuickFilter {
    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::ThisMonth => "This month",
            QuickFilter::LastMonth => "Last month",
            QuickFilter::ThisQuarter => "This quarter",
            QuickFilter::HighValue => "High value",
            QuickFilter::Won => "Won",
            QuickFilter::HighProbability => "High probability",
            QuickFilter::MediumProbability => "Medium probability",
            QuickFilter::LowProbability => "Low probability",
        }
    }
}

impl FromStr for QuickFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "this_month" => Ok(QuickFilter::ThisMonth),
            "last_month" => Ok(QuickFilter::LastMonth),
            "this_quarter" => Ok(QuickFilter::ThisQuarter),
            "high_value" => Ok(QuickFilter::HighValue),
            "won" => Ok(QuickFilter::Won),
            "high_probability" => Ok(QuickFilter::HighProbability),
            "medium_probability" => Ok(QuickFilter::MediumProbability),
            "low_probability" => Ok(QuickFilter::LowProbability),
            other => Err(format!("unknown quick filter '{}'", other)),
        }
    }
}

/// Conjunction of optional criteria. An unset criterion matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub kind: KindFilter,
    pub band: Option<ProbabilityBand>,
    /// `YYYY-MM` prefix of the record date
    pub month: Option<String>,
    pub country: Option<String>,
    /// Agent display name or raw agent code
    pub agent: Option<String>,
    pub outcome: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_offer: Option<f64>,
    pub max_offer: Option<f64>,
    /// Case-insensitive substring over the record's text fields
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter for a preset, relative to `today`. `Won` selects the first
    /// outcome in `outcomes` that reads as won; with none it leaves the
    /// outcome unset.
    pub fn quick(preset: QuickFilter, kind: KindFilter, today: NaiveDate, outcomes: &[FacetValue]) -> Self {
        let mut filter = RecordFilter { kind, ..Self::default() };
        match preset {
            QuickFilter::ThisMonth => filter.month = Some(today.format("%Y-%m").to_string()),
            QuickFilter::LastMonth => {
                filter.month = today
                    .checked_sub_months(Months::new(1))
                    .map(|d| d.format("%Y-%m").to_string());
            }
            QuickFilter::ThisQuarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                filter.date_from = NaiveDate::from_ymd_opt(today.year(), first_month, 1);
            }
            QuickFilter::HighValue => filter.min_offer = Some(HIGH_VALUE_THRESHOLD),
            QuickFilter::Won => {
                filter.outcome = outcomes.iter().find(|o| is_won(&o.value)).map(|o| o.value.clone());
            }
            QuickFilter::HighProbability => filter.band = Some(ProbabilityBand::NearCertain),
            QuickFilter::MediumProbability => filter.band = Some(ProbabilityBand::Probable),
            QuickFilter::LowProbability => filter.band = Some(ProbabilityBand::Low),
        }
        filter
    }

    pub fn active_count(&self) -> usize {
        [
            self.kind != KindFilter::All,
            self.band.is_some(),
            self.month.is_some(),
            self.country.is_some(),
            self.agent.is_some(),
            self.outcome.is_some(),
            self.date_from.is_some(),
            self.date_to.is_some(),
            self.min_offer.is_some(),
            self.max_offer.is_some(),
            self.search.as_deref().is_some_and(|s| !s.trim().is_empty()),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Records without a date pass the month and date-range criteria.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.kind.matches(record.kind()) {
            return false;
        }

        if let Some(band) = self.band {
            if ProbabilityBand::of(record.completion_percent) != band {
                return false;
            }
        }

        if let (Some(month), Some(record_month)) = (&self.month, record.month()) {
            if !record_month.starts_with(month.as_str()) {
                return false;
            }
        }

        if self.country.as_ref().is_some_and(|c| *c != record.country) {
            return false;
        }

        if let Some(agent) = &self.agent {
            let by_code = record.agent_code.as_deref() == Some(agent.as_str());
            if *agent != record.agent_name && !by_code {
                return false;
            }
        }

        if self.outcome.as_ref().is_some_and(|o| *o != record.outcome) {
            return false;
        }

        if let Some(date) = record.ro_date {
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }

        if self.min_offer.is_some_and(|min| record.offer_value < min) {
            return false;
        }
        if self.max_offer.is_some_and(|max| record.offer_value > max) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => search_text(record).contains(&term.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

impl fmt::Display for RecordFilter {
    /// Active criteria as `name: value` pairs, or `none`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.kind != KindFilter::All {
            parts.push(format!("type: {:?}", self.kind).to_lowercase());
        }
        if let Some(band) = self.band {
            parts.push(format!("probability: {}", band));
        }
        let text = [
            ("month", &self.month),
            ("country", &self.country),
            ("agent", &self.agent),
            ("outcome", &self.outcome),
            ("search", &self.search),
        ];
        for (name, value) in text {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                parts.push(format!("{}: {}", name, v));
            }
        }
        if let Some(d) = self.date_from {
            parts.push(format!("from: {}", d));
        }
        if let Some(d) = self.date_to {
            parts.push(format!("to: {}", d));
        }
        if let Some(v) = self.min_offer {
            parts.push(format!("min offer: {}", v));
        }
        if let Some(v) = self.max_offer {
            parts.push(format!("max offer: {}", v));
        }

        if parts.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

fn search_text(record: &Record) -> String {
    [
        record.ro_num.as_str(),
        record.country.as_str(),
        record.agent_name.as_str(),
        record.outcome.as_str(),
        record.category.as_str(),
        record.description.as_str(),
        &record.offer_value.to_string(),
        &record.contract_value.to_string(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<&str>>()
    .join(" ")
    .to_lowercase()
}

/// A distinct value and how many records carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: usize,
}

/// Choices available for building a filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    /// Most recent month first
    pub months: Vec<FacetValue>,
    pub countries: Vec<FacetValue>,
    pub agents: Vec<FacetValue>,
    pub outcomes: Vec<FacetValue>,
    pub categories: Vec<FacetValue>,
    /// Highest band first; empty bands omitted
    pub bands: Vec<(ProbabilityBand, usize)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl Facets {
    pub fn from_records(records: &[Record]) -> Self {
        let mut months = counted(records.iter().filter_map(|r| r.month()));
        months.sort_by(|a, b| b.value.cmp(&a.value));

        let mut band_counts: HashMap<ProbabilityBand, usize> = HashMap::new();
        for r in records {
            *band_counts.entry(ProbabilityBand::of(r.completion_percent)).or_default() += 1;
        }
        let bands = ProbabilityBand::ALL
            .iter()
            .filter_map(|b| band_counts.get(b).map(|c| (*b, *c)))
            .collect();

        let dates = records.iter().filter_map(|r| r.ro_date);
        let date_range = dates
            .clone()
            .min()
            .zip(dates.max());

        Self {
            months,
            countries: by_count(counted(
                records
                    .iter()
                    .map(|r| r.country.clone())
                    .filter(|c| c != COUNTRY_UNSPECIFIED),
            )),
            agents: by_count(counted(
                records
                    .iter()
                    .map(|r| r.agent_name.clone())
                    .filter(|a| a != AGENT_UNSPECIFIED),
            )),
            outcomes: by_count(counted(records.iter().map(|r| r.outcome.clone()))),
            categories: by_count(counted(
                records
                    .iter()
                    .map(|r| r.category.clone())
                    .filter(|c| c != CATEGORY_UNSPECIFIED),
            )),
            bands,
            date_range,
        }
    }
}

/// Tally values in first-seen order
fn counted(values: impl Iterator<Item = String>) -> Vec<FacetValue> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<FacetValue> = Vec::new();
    for value in values.filter(|v| !v.is_empty()) {
        match index.get(&value) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(value.clone(), out.len());
                out.push(FacetValue { value, count: 1 });
            }
        }
    }
    out
}

/// Stable: ties keep first-seen order
fn by_count(mut values: Vec<FacetValue>) -> Vec<FacetValue> {
    values.sort_by(|a, b| b.count.cmp(&a.count));
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ro_num: &str) -> Record {
        Record {
            id: 1,
            ro_num: ro_num.to_string(),
            ro_rev: "01".to_string(),
            ro_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            country: "Italia".to_string(),
            agent_name: "Serena Padrono".to_string(),
            agent_code: Some("3".to_string()),
            offer_value: 50_000.0,
            outcome: "Presa".to_string(),
            contract_value: 45_000.0,
            category: "Top Class".to_string(),
            category_code: Some("P05".to_string()),
            description: "Piscina interrata".to_string(),
            completion_percent: 60.0,
            source_row: 1,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = RecordFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&record("RO-1")));
        assert!(filter.matches(&record("C-1")));
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quick_filters_relative_to_today() {
        let today = day(2024, 1, 20);

        let this_month = RecordFilter::quick(QuickFilter::ThisMonth, KindFilter::All, today, &[]);
        assert_eq!(this_month.month.as_deref(), Some("2024-01"));

        let last_month = RecordFilter::quick(QuickFilter::LastMonth, KindFilter::Commercial, today, &[]);
        assert_eq!(last_month.month.as_deref(), Some("2023-12"));
        assert_eq!(last_month.kind, KindFilter::Commercial);
        assert_eq!(last_month.active_count(), 2);

        let quarter = RecordFilter::quick(QuickFilter::ThisQuarter, KindFilter::All, day(2024, 8, 5), &[]);
        assert_eq!(quarter.date_from, Some(day(2024, 7, 1)));
        assert_eq!(quarter.date_to, None);
    }

    #[test]
    fn test_filter_description() {
        assert_eq!(RecordFilter::new().to_string(), "none");
        let filter = RecordFilter {
            kind: KindFilter::Commercial,
            country: Some("Italia".into()),
            min_offer: Some(1000.0),
            ..RecordFilter::new()
        };
        assert_eq!(filter.to_string(), "type: commercial, country: Italia, min offer: 1000");
    }

    #[test]
    fn test_quick_filter_presets() {
        let today = day(2024, 3, 1);
        let high = RecordFilter::quick(QuickFilter::HighValue, KindFilter::All, today, &[]);
        assert!(high.matches(&record("RO-1")));
        let mut small = record("RO-2");
        small.offer_value = 49_999.0;
        assert!(!high.matches(&small));

        let band = RecordFilter::quick(QuickFilter::MediumProbability, KindFilter::All, today, &[]);
        assert_eq!(band.band, Some(ProbabilityBand::Probable));

        let outcomes = vec![
            FacetValue { value: "Persa".into(), count: 4 },
            FacetValue { value: "Presa".into(), count: 2 },
        ];
        let won = RecordFilter::quick(QuickFilter::Won, KindFilter::All, today, &outcomes);
        assert_eq!(won.outcome.as_deref(), Some("Presa"));
        let none = RecordFilter::quick(QuickFilter::Won, KindFilter::All, today, &outcomes[..1]);
        assert!(none.is_empty());

        assert_eq!("this-quarter".parse::<QuickFilter>(), Ok(QuickFilter::ThisQuarter));
        assert!("someday".parse::<QuickFilter>().is_err());
    }

    #[test]
    fn test_kind_filter() {
        let filter = RecordFilter { kind: KindFilter::Commercial, ..Default::default() };
        assert!(filter.matches(&record("C-1")));
        assert!(!filter.matches(&record("RO-1")));
        assert_eq!(filter.active_count(), 1);
    }

    #[test]
    fn test_probability_bands() {
        assert_eq!(ProbabilityBand::of(95.0), ProbabilityBand::NearCertain);
        assert_eq!(ProbabilityBand::of(60.0), ProbabilityBand::Probable);
        assert_eq!(ProbabilityBand::of(59.9), ProbabilityBand::Possible);
        assert_eq!(ProbabilityBand::of(10.0), ProbabilityBand::Low);
        assert_eq!(ProbabilityBand::of(0.0), ProbabilityBand::Unspecified);
        assert_eq!("near-certain".parse::<ProbabilityBand>(), Ok(ProbabilityBand::NearCertain));
        assert_eq!("60".parse::<ProbabilityBand>(), Ok(ProbabilityBand::Probable));
    }

    #[test]
    fn test_undated_records_pass_date_criteria() {
        let filter = RecordFilter {
            month: Some("2023-01".into()),
            date_from: NaiveDate::from_ymd_opt(2023, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2023, 1, 31),
            ..Default::default()
        };
        let mut undated = record("RO-1");
        undated.ro_date = None;
        assert!(filter.matches(&undated));
        assert!(!filter.matches(&record("RO-2")));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15);
        let filter = RecordFilter { date_from: day, date_to: day, ..Default::default() };
        assert!(filter.matches(&record("RO-1")));
    }

    #[test]
    fn test_agent_matches_name_or_code() {
        let by_name = RecordFilter { agent: Some("Serena Padrono".into()), ..Default::default() };
        let by_code = RecordFilter { agent: Some("3".into()), ..Default::default() };
        let other = RecordFilter { agent: Some("4".into()), ..Default::default() };
        let r = record("RO-1");
        assert!(by_name.matches(&r));
        assert!(by_code.matches(&r));
        assert!(!other.matches(&r));
    }

    #[test]
    fn test_offer_range_and_search() {
        let r = record("RO-77");
        assert!(!RecordFilter { min_offer: Some(60_000.0), ..Default::default() }.matches(&r));
        assert!(RecordFilter { max_offer: Some(50_000.0), ..Default::default() }.matches(&r));
        assert!(RecordFilter { search: Some("PISCINA".into()), ..Default::default() }.matches(&r));
        assert!(RecordFilter { search: Some("45000".into()), ..Default::default() }.matches(&r));
        assert!(!RecordFilter { search: Some("sauna".into()), ..Default::default() }.matches(&r));
        assert!(RecordFilter { search: Some("   ".into()), ..Default::default() }.matches(&r));
    }

    #[test]
    fn test_facets() {
        let mut a = record("RO-1");
        a.ro_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        let mut b = record("RO-2");
        b.country = "Francia".into();
        b.completion_percent = 95.0;
        let mut c = record("RO-3");
        c.country = COUNTRY_UNSPECIFIED.into();
        c.agent_name = AGENT_UNSPECIFIED.into();

        let facets = Facets::from_records(&[a, b, c]);
        let months: Vec<&str> = facets.months.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(months, vec!["2024-03", "2024-01"]);
        assert_eq!(facets.countries[0], FacetValue { value: "Italia".into(), count: 1 });
        assert_eq!(facets.countries.len(), 2);
        assert_eq!(facets.agents, vec![FacetValue { value: "Serena Padrono".into(), count: 2 }]);
        assert_eq!(
            facets.bands,
            vec![(ProbabilityBand::NearCertain, 1), (ProbabilityBand::Probable, 2)]
        );
        assert_eq!(
            facets.date_range,
            NaiveDate::from_ymd_opt(2024, 1, 5).zip(NaiveDate::from_ymd_opt(2024, 3, 15))
        );
    }
}
