//! Error types for the normalization pipeline.
//!
//! This module defines a small hierarchy of error types:
//!
//! - [`LoadError`] - reading and parsing a CSV file into a raw table
//! - [`TransformError`] - projecting, filtering and aggregating a table
//! - [`NormalizeError`] - top-level error returned by every dataset transform
//! - [`ConfigError`] - resolving the CSV directory
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading a CSV file into a [`crate::Table`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file does not exist.
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The input file exists but could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be decoded with the requested encoding.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// The content is not valid tabular data.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// No header row was found.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while transforming a table.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A referenced source column is absent from the table.
    #[error("Missing source column: '{column}'")]
    MissingColumn { column: String },

    /// Two source columns are renamed to the same canonical field.
    #[error("Canonical field '{target}' is produced by more than one column")]
    DuplicateTarget { target: String },

    /// Dataset name not recognised.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}

impl TransformError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

// =============================================================================
// Normalization Errors (top-level)
// =============================================================================

/// Top-level error returned by the per-dataset transforms.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Loading the input file failed.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Transforming the loaded table failed.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No directory given and `ONS_CSV_DIR` unset.
    #[error("No CSV directory given (pass --dir or set ONS_CSV_DIR)")]
    MissingCsvDir,

    /// The configured path is not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for dataset transforms.
pub type NormalizeResult<T> = Result<T, NormalizeError>;
