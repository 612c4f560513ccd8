//! # ons-normalizer - ONS local-authority statistics, made joinable
//!
//! Turns CSV files exported by hand from ONS spreadsheets (population,
//! wellbeing, crime, rents, property sales and prices, earnings ratios) into
//! tables that share one join key, `la_code`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│    Transform     │────▶│  Normalized │
//! │ (exported)  │     │ (raw Table) │     │ (DatasetSpec)    │     │    Table    │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! Every transform is a pure function of one input file: nothing is cached
//! and nothing is written.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ons_normalizer::{parse_crime, parse_population_age};
//!
//! let crime = parse_crime("data/csv")?;
//! let population = parse_population_age("data/csv")?;
//! println!("{} authorities with crime data", crime.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error hierarchy
//! - [`config`] - Canonical names, file names, directory configuration
//! - [`models`] - Table and cell helpers
//! - [`parser`] - CSV loading with encoding detection
//! - [`transform`] - Rename specs, filters, aggregation, dataset pipeline
//! - [`logs`] - Progress log broadcaster

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConfigError, LoadError, NormalizeError, TransformError};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Config, LA_CODE, LA_NAME, WARD_CODE, WARD_NAME};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{is_missing, Row, Table, NA_VALUES};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_file, load_table, parse_bytes,
    parse_str, ParseResult, ReadOptions,
};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    all_datasets, parse_crime, parse_earnings_to_house_price, parse_population_age,
    parse_property_prices, parse_property_sales, parse_rental_summary, parse_wellbeing,
    parse_wellbeing_for_period, parse_wellbeing_wide, run_dataset, select_rename, wellbeing_to_wide,
    Aggregation, Dataset, DatasetSpec, RenameSpec, RowFilter, SumColumns,
};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{LogEntry, LogLevel, LOG_BROADCASTER};
