// Pipeline processing: cell normalization, column detection, record
// construction, validation and deduplication

pub mod columns;
pub mod dedup;
pub mod lookup;
pub mod normalize;
pub mod quality_gate;
pub mod record_builder;

pub use columns::{CanonicalField, ColumnMap, ColumnResolver, ColumnWarning};
pub use dedup::{ClassificationStats, DedupOutcome, Deduplicator};
pub use lookup::CodeLookupTable;
pub use normalize::DegradedCells;
pub use quality_gate::{DefaultQualityGate, QualityGate};
pub use record_builder::RecordBuilder;
