// Read-only analysis over published records: filtering, facets and summary metrics

pub mod filter;
pub mod summary;

pub use filter::{FacetValue, Facets, KindFilter, ProbabilityBand, QuickFilter, RecordFilter};
pub use summary::{DataQuality, Summary};
