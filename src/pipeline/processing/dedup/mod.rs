//! Revision-based deduplication.
//!
//! Records sharing an RO number are revisions of the same opportunity. The
//! highest revision survives; on equal ranks the first record seen is kept.

pub mod revision;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Record, RecordKind};

pub use revision::Revision;

/// Commercial/normal split over a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub normal: usize,
    pub commercial: usize,
    pub total: usize,
}

impl ClassificationStats {
    pub fn of(records: &[Record]) -> Self {
        let commercial = records
            .iter()
            .filter(|r| r.kind() == RecordKind::Commercial)
            .count();
        Self {
            normal: records.len() - commercial,
            commercial,
            total: records.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// One record per RO number, groups in order of first appearance
    pub records: Vec<Record>,
    pub duplicates_removed: usize,
    pub classification: ClassificationStats,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn dedup(&self, records: Vec<Record>) -> DedupOutcome {
        let mut slots: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut survivors: Vec<(Revision, Record)> = Vec::with_capacity(records.len());
        let mut duplicates_removed = 0;

        for record in records {
            let rank = Revision::parse(&record.ro_rev);
            match slots.get(&record.ro_num) {
                Some(&slot) => {
                    duplicates_removed += 1;
                    let (kept_rank, kept) = &survivors[slot];
                    if rank > *kept_rank {
                        debug!(
                            ro_num = %record.ro_num,
                            kept_rev = %record.ro_rev,
                            dropped_rev = %kept.ro_rev,
                            "Newer revision supersedes earlier one"
                        );
                        survivors[slot] = (rank, record);
                    } else {
                        debug!(
                            ro_num = %record.ro_num,
                            kept_rev = %kept.ro_rev,
                            dropped_rev = %record.ro_rev,
                            "Duplicate revision discarded"
                        );
                    }
                }
                None => {
                    slots.insert(record.ro_num.clone(), survivors.len());
                    survivors.push((rank, record));
                }
            }
        }

        let records: Vec<Record> = survivors.into_iter().map(|(_, r)| r).collect();
        let classification = ClassificationStats::of(&records);

        DedupOutcome {
            records,
            duplicates_removed,
            classification,
        }
    }
}
