//! Summary metrics over a record slice: headline KPIs, probability
//! distribution, category and monthly breakdowns, per-agent figures and
//! data-quality indicators.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::filter::ProbabilityBand;
use crate::constants::{
    AGENT_UNSPECIFIED, CATEGORY_UNSPECIFIED, COUNTRY_UNSPECIFIED, OUTCOME_IN_PROGRESS,
    WON_OUTCOME_KEYWORDS,
};
use crate::types::Record;

const TOP_CATEGORIES: usize = 5;

/// Whether an outcome text marks the offer as won
pub fn is_won(outcome: &str) -> bool {
    let lowered = outcome.to_lowercase();
    WON_OUTCOME_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_ro: usize,
    pub normal_count: usize,
    pub commercial_count: usize,
    pub total_offer_value: f64,
    pub total_contract_value: f64,
    pub won_count: usize,
    /// Won offers as a percentage of all offers
    pub success_rate: f64,
    pub avg_offer_value: f64,
    /// Contract value as a percentage of offer value
    pub conversion_rate: f64,
    /// Offer values weighted by completion probability
    pub probabilistic_value: f64,
    pub avg_probability: f64,
    pub probability_distribution: Vec<(ProbabilityBand, usize)>,
    pub top_categories: Vec<CategoryValue>,
    pub monthly_trend: Vec<MonthlyPoint>,
    pub agents: Vec<AgentStats>,
    pub data_quality: DataQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
    pub value: f64,
    pub avg_value: f64,
    pub avg_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent: String,
    pub count: usize,
    pub total_value: f64,
    pub contract_value: f64,
    pub won_count: usize,
    pub success_rate: f64,
    pub avg_offer_value: f64,
    /// Contract value as a percentage of offered value
    pub conversion_rate: f64,
    pub avg_probability: f64,
}

/// Share (0..=1) of records carrying each kind of information
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub dated: f64,
    pub valued: f64,
    pub agent_specified: f64,
    pub outcome_specified: f64,
    pub country_specified: f64,
    pub category_specified: f64,
    pub probability_specified: f64,
    /// Mean of the date, value, agent and country shares
    pub overall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    pub fn of(score: f64) -> Self {
        if score >= 0.9 {
            QualityGrade::Excellent
        } else if score >= 0.7 {
            QualityGrade::Good
        } else if score >= 0.5 {
            QualityGrade::Fair
        } else {
            QualityGrade::Poor
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl DataQuality {
    pub fn of(records: &[Record]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let dated = share(records, |r| r.ro_date.is_some());
        let valued = share(records, |r| r.offer_value > 0.0);
        let agent_specified = share(records, |r| r.agent_name != AGENT_UNSPECIFIED);
        let country_specified = share(records, |r| r.country != COUNTRY_UNSPECIFIED);

        Self {
            dated,
            valued,
            agent_specified,
            outcome_specified: share(records, |r| r.outcome != OUTCOME_IN_PROGRESS),
            country_specified,
            category_specified: share(records, |r| r.category != CATEGORY_UNSPECIFIED),
            probability_specified: share(records, |r| r.completion_percent > 0.0),
            overall: (dated + valued + agent_specified + country_specified) / 4.0,
        }
    }

    pub fn grade(&self) -> QualityGrade {
        QualityGrade::of(self.overall)
    }

    /// `overall` on a 0..=100 scale, for display
    pub fn overall_percent(&self) -> f64 {
        self.overall * 100.0
    }
}

impl Summary {
    pub fn of(records: &[Record]) -> Self {
        let total_ro = records.len();
        let commercial_count = records.iter().filter(|r| r.is_commercial()).count();
        let total_offer_value: f64 = records.iter().map(|r| r.offer_value).sum();
        let total_contract_value: f64 = records.iter().map(|r| r.contract_value).sum();
        let won_count = records.iter().filter(|r| is_won(&r.outcome)).count();
        let probabilistic_value: f64 = records
            .iter()
            .map(|r| r.offer_value * r.completion_percent / 100.0)
            .sum();
        let probability_sum: f64 = records.iter().map(|r| r.completion_percent).sum();

        Self {
            total_ro,
            normal_count: total_ro - commercial_count,
            commercial_count,
            total_offer_value,
            total_contract_value,
            won_count,
            success_rate: percent(won_count as f64, total_ro as f64),
            avg_offer_value: ratio(total_offer_value, total_ro as f64),
            conversion_rate: percent(total_contract_value, total_offer_value),
            probabilistic_value,
            avg_probability: ratio(probability_sum, total_ro as f64),
            probability_distribution: probability_distribution(records),
            top_categories: top_categories(records),
            monthly_trend: monthly_trend(records),
            agents: agent_analysis(records),
            data_quality: DataQuality::of(records),
        }
    }
}

fn share(records: &[Record], pred: impl Fn(&Record) -> bool) -> f64 {
    ratio(records.iter().filter(|r| pred(r)).count() as f64, records.len() as f64)
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn percent(num: f64, den: f64) -> f64 {
    ratio(num, den) * 100.0
}

/// Every band, highest first, including empty ones
pub fn probability_distribution(records: &[Record]) -> Vec<(ProbabilityBand, usize)> {
    let mut counts: HashMap<ProbabilityBand, usize> = HashMap::new();
    for r in records {
        *counts.entry(ProbabilityBand::of(r.completion_percent)).or_default() += 1;
    }
    ProbabilityBand::ALL
        .iter()
        .map(|b| (*b, counts.get(b).copied().unwrap_or(0)))
        .collect()
}

pub fn top_categories(records: &[Record]) -> Vec<CategoryValue> {
    let mut order: Vec<CategoryValue> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in records {
        match index.get(r.category.as_str()) {
            Some(&i) => order[i].value += r.offer_value,
            None => {
                index.insert(r.category.as_str(), order.len());
                order.push(CategoryValue { category: r.category.clone(), value: r.offer_value });
            }
        }
    }
    order.sort_by(|a, b| b.value.total_cmp(&a.value));
    order.truncate(TOP_CATEGORIES);
    order
}

/// Dated records grouped by month, oldest first
pub fn monthly_trend(records: &[Record]) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<String, (usize, f64, f64)> = BTreeMap::new();
    for r in records {
        if let Some(month) = r.month() {
            let entry = months.entry(month).or_default();
            entry.0 += 1;
            entry.1 += r.offer_value;
            entry.2 += r.completion_percent;
        }
    }
    months
        .into_iter()
        .map(|(month, (count, value, probability_sum))| MonthlyPoint {
            month,
            count,
            value,
            avg_value: ratio(value, count as f64),
            avg_probability: ratio(probability_sum, count as f64),
        })
        .collect()
}

/// Per-agent figures sorted by total offer value, unassigned records excluded
pub fn agent_analysis(records: &[Record]) -> Vec<AgentStats> {
    let mut by_agent: Vec<(AgentStats, f64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for r in records.iter().filter(|r| r.agent_name != AGENT_UNSPECIFIED) {
        let slot = *index.entry(r.agent_name.as_str()).or_insert_with(|| {
            by_agent.push((
                AgentStats {
                    agent: r.agent_name.clone(),
                    count: 0,
                    total_value: 0.0,
                    contract_value: 0.0,
                    won_count: 0,
                    success_rate: 0.0,
                    avg_offer_value: 0.0,
                    conversion_rate: 0.0,
                    avg_probability: 0.0,
                },
                0.0,
            ));
            by_agent.len() - 1
        });

        let (stats, probability_sum) = &mut by_agent[slot];
        stats.count += 1;
        stats.total_value += r.offer_value;
        stats.contract_value += r.contract_value;
        if is_won(&r.outcome) {
            stats.won_count += 1;
        }
        *probability_sum += r.completion_percent;
    }

    let mut agents: Vec<AgentStats> = by_agent
        .into_iter()
        .map(|(mut stats, probability_sum)| {
            stats.success_rate = percent(stats.won_count as f64, stats.count as f64);
            stats.avg_offer_value = ratio(stats.total_value, stats.count as f64);
            stats.conversion_rate = percent(stats.contract_value, stats.total_value);
            stats.avg_probability = ratio(probability_sum, stats.count as f64);
            stats
        })
        .collect();
    agents.sort_by(|a, b| b.total_value.total_cmp(&a.total_value));
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(ro_num: &str, agent: &str, offer: f64, outcome: &str, pct: f64) -> Record {
        Record {
            id: 1,
            ro_num: ro_num.to_string(),
            ro_rev: "01".to_string(),
            ro_date: NaiveDate::from_ymd_opt(2024, 2, 10),
            country: "Italia".to_string(),
            agent_name: agent.to_string(),
            agent_code: None,
            offer_value: offer,
            outcome: outcome.to_string(),
            contract_value: if is_won(outcome) { offer } else { 0.0 },
            category: "Privato".to_string(),
            category_code: None,
            description: String::new(),
            completion_percent: pct,
            source_row: 1,
        }
    }

    #[test]
    fn test_won_keywords() {
        assert!(is_won("Offerta PRESA"));
        assert!(is_won("chiusa positivamente"));
        assert!(!is_won("In progress"));
        assert!(!is_won("Persa"));
    }

    #[test]
    fn test_headline_kpis() {
        let records = vec![
            record("RO-1", "Andrea Zara", 100.0, "Presa", 100.0),
            record("RO-2", "Andrea Zara", 300.0, "In progress", 50.0),
            record("C-3", "Mattia Arata", 600.0, "Persa", 0.0),
            record("RO-4", AGENT_UNSPECIFIED, 0.0, "Vinta", 10.0),
        ];
        let s = Summary::of(&records);
        assert_eq!(s.total_ro, 4);
        assert_eq!(s.commercial_count, 1);
        assert_eq!(s.normal_count, 3);
        assert_eq!(s.total_offer_value, 1000.0);
        assert_eq!(s.total_contract_value, 100.0);
        assert_eq!(s.won_count, 2);
        assert_eq!(s.success_rate, 50.0);
        assert_eq!(s.avg_offer_value, 250.0);
        assert_eq!(s.conversion_rate, 10.0);
        assert_eq!(s.probabilistic_value, 250.0);
        assert_eq!(s.avg_probability, 40.0);
    }

    #[test]
    fn test_empty_slice_has_zero_rates() {
        let s = Summary::of(&[]);
        assert_eq!(s.total_ro, 0);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.conversion_rate, 0.0);
        assert_eq!(s.data_quality, DataQuality::default());
        assert_eq!(s.probability_distribution.len(), 5);
    }

    #[test]
    fn test_agent_analysis_sorted_and_excludes_unassigned() {
        let records = vec![
            record("RO-1", "Andrea Zara", 100.0, "Presa", 100.0),
            record("RO-2", "Andrea Zara", 300.0, "In progress", 50.0),
            record("RO-3", "Mattia Arata", 600.0, "Persa", 0.0),
            record("RO-4", AGENT_UNSPECIFIED, 5000.0, "Presa", 0.0),
        ];
        let agents = agent_analysis(&records);
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].agent, "Mattia Arata");
        assert_eq!(agents[1].agent, "Andrea Zara");
        assert_eq!(agents[1].count, 2);
        assert_eq!(agents[1].success_rate, 50.0);
        assert_eq!(agents[1].avg_probability, 75.0);
        assert_eq!(agents[1].avg_offer_value, 200.0);
        assert_eq!(agents[1].conversion_rate, 25.0);
        assert_eq!(agents[0].conversion_rate, 0.0);
    }

    #[test]
    fn test_monthly_trend_sorted_and_skips_undated() {
        let mut jan = record("RO-1", "Andrea Zara", 10.0, "", 0.0);
        jan.ro_date = NaiveDate::from_ymd_opt(2024, 1, 31);
        let feb = record("RO-2", "Andrea Zara", 20.0, "", 40.0);
        let feb_late = record("RO-4", "Andrea Zara", 60.0, "", 80.0);
        let mut undated = record("RO-3", "Andrea Zara", 40.0, "", 0.0);
        undated.ro_date = None;

        let trend = monthly_trend(&[feb, undated, jan, feb_late]);
        assert_eq!(
            trend,
            vec![
                MonthlyPoint {
                    month: "2024-01".into(),
                    count: 1,
                    value: 10.0,
                    avg_value: 10.0,
                    avg_probability: 0.0,
                },
                MonthlyPoint {
                    month: "2024-02".into(),
                    count: 2,
                    value: 80.0,
                    avg_value: 40.0,
                    avg_probability: 60.0,
                },
            ]
        );
    }

    #[test]
    fn test_top_categories_capped() {
        let records: Vec<Record> = (0..7)
            .map(|i| {
                let mut r = record(&format!("RO-{}", i), "Andrea Zara", i as f64 * 10.0, "", 0.0);
                r.category = format!("Cat {}", i);
                r
            })
            .collect();
        let top = top_categories(&records);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].category, "Cat 6");
    }

    #[test]
    fn test_data_quality() {
        let mut a = record("RO-1", "Andrea Zara", 10.0, "Presa", 50.0);
        a.ro_date = None;
        let b = record("RO-2", AGENT_UNSPECIFIED, 0.0, OUTCOME_IN_PROGRESS, 0.0);
        let q = DataQuality::of(&[a, b]);
        assert_eq!(q.dated, 0.5);
        assert_eq!(q.valued, 0.5);
        assert_eq!(q.agent_specified, 0.5);
        assert_eq!(q.outcome_specified, 0.5);
        assert_eq!(q.country_specified, 1.0);
        assert_eq!(q.overall, 0.625);
        assert_eq!(q.overall_percent(), 62.5);
        assert_eq!(q.grade(), QualityGrade::Fair);
    }
}
