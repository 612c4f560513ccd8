//! Transformation module.
//!
//! This module turns raw tables into normalized ones:
//! - Rename: column selection and renaming
//! - Derive: row filters and computed columns
//! - Aggregate: null-key drop, group-sum, pivot
//! - Pipeline: declarative per-dataset steps
//! - Datasets: the seven ONS sources

pub mod aggregate;
pub mod datasets;
pub mod derive;
pub mod pipeline;
pub mod rename;

pub use aggregate::{drop_duplicates, drop_missing_key, group_sum, pivot, Aggregation};
pub use datasets::*;
pub use derive::{RowFilter, SumColumns};
pub use pipeline::{run_dataset, DatasetSpec};
pub use rename::{select_rename, RenameSpec};
