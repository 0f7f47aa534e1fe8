// Caller-owned state for the dataset published by an ingestion run

pub mod in_memory;

pub use in_memory::{Dataset, DatasetView, Session};
