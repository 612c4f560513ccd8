//! Canonical names and runtime configuration.
//!
//! The constants here are shared by every dataset transform. They are plain
//! string literals; nothing in this module holds mutable state.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::parser::ReadOptions;

// =============================================================================
// Canonical field names
// =============================================================================

/// Join key present in every normalized table.
pub const LA_CODE: &str = "la_code";

/// Local authority name, kept for convenience where the source has it.
pub const LA_NAME: &str = "la_name";

pub const WARD_CODE: &str = "ward_code";
pub const WARD_NAME: &str = "ward_name";

// =============================================================================
// Input file names
// =============================================================================

pub const WELLBEING_FILE: &str = "wellbeing.csv";
pub const POPULATION_FILE: &str = "population_by_age.csv";
pub const RENTAL_FILE: &str = "rental.csv";
pub const CRIME_FILE: &str = "crime.csv";
pub const PROPERTY_SALES_FILE: &str = "property_sales.csv";
pub const HOUSE_PRICES_FILE: &str = "house_prices.csv";
pub const EARNINGS_RATIO_FILE: &str = "earnings_price_ratio.csv";

/// Wellbeing rows with this estimate type are kept; the rest are
/// confidence intervals, sample sizes and similar.
pub const WELLBEING_AVERAGE: &str = "average-mean";

/// Environment variable consulted by [`Config::from_env`].
pub const CSV_DIR_ENV: &str = "ONS_CSV_DIR";

// =============================================================================
// Age buckets
// =============================================================================

/// A fixed range of single-year-of-age columns summed into one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBucket {
    /// Canonical output field.
    pub name: &'static str,
    /// First single-year column, inclusive.
    pub first_age: u8,
    /// Last single-year column, inclusive.
    pub last_age: u8,
    /// Extra open-ended column (`"90+"`) folded into the bucket.
    pub open_ended: Option<&'static str>,
}

impl AgeBucket {
    /// Raw column names making up this bucket, in age order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = (self.first_age..=self.last_age)
            .map(|age| age.to_string())
            .collect();
        if let Some(open) = self.open_ended {
            columns.push(open.to_string());
        }
        columns
    }
}

pub const CHILD: AgeBucket = AgeBucket {
    name: "child",
    first_age: 0,
    last_age: 18,
    open_ended: None,
};

pub const ADULT: AgeBucket = AgeBucket {
    name: "adult",
    first_age: 19,
    last_age: 64,
    open_ended: None,
};

pub const ELDERLY: AgeBucket = AgeBucket {
    name: "elderly",
    first_age: 65,
    last_age: 89,
    open_ended: Some("90+"),
};

/// Buckets in output order.
pub const AGE_BUCKETS: [AgeBucket; 3] = [CHILD, ADULT, ELDERLY];

// =============================================================================
// Runtime configuration
// =============================================================================

/// Where to read input files from and how to read them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the exported CSV files.
    pub csv_dir: PathBuf,
    pub read_options: ReadOptions,
}

impl Config {
    /// Configuration for an existing directory with default read options.
    pub fn new(csv_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let csv_dir = csv_dir.as_ref().to_path_buf();
        if !csv_dir.is_dir() {
            return Err(ConfigError::NotADirectory(csv_dir));
        }
        Ok(Self {
            csv_dir,
            read_options: ReadOptions::default(),
        })
    }

    /// Configuration from [`CSV_DIR_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CSV_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Err(ConfigError::MissingCsvDir),
        }
    }

    /// Use `dir` when given, otherwise fall back to the environment.
    pub fn resolve(dir: Option<&Path>) -> Result<Self, ConfigError> {
        match dir {
            Some(dir) => Self::new(dir),
            None => Self::from_env(),
        }
    }

    pub fn with_read_options(mut self, read_options: ReadOptions) -> Self {
        self.read_options = read_options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let child = CHILD.columns();
        assert_eq!(child.len(), 19);
        assert_eq!(child.first().map(String::as_str), Some("0"));
        assert_eq!(child.last().map(String::as_str), Some("18"));

        let adult = ADULT.columns();
        assert_eq!(adult.len(), 46);
        assert_eq!(adult.first().map(String::as_str), Some("19"));
        assert_eq!(adult.last().map(String::as_str), Some("64"));

        let elderly = ELDERLY.columns();
        assert_eq!(elderly.len(), 26);
        assert_eq!(elderly.first().map(String::as_str), Some("65"));
        assert_eq!(&elderly[24], "89");
        assert_eq!(&elderly[25], "90+");
    }

    #[test]
    fn test_buckets_do_not_overlap() {
        let mut all: Vec<String> = AGE_BUCKETS.iter().flat_map(|b| b.columns()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(total, 91);
    }

    #[test]
    fn test_config_rejects_missing_dir() {
        let result = Config::new("/definitely/not/here");
        assert!(matches!(result, Err(ConfigError::NotADirectory(_))));
    }

    #[test]
    fn test_config_accepts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path()).unwrap();
        assert_eq!(config.csv_dir, dir.path());
        assert_eq!(config.read_options.delimiter, b',');
    }

    #[test]
    fn test_config_with_read_options() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path())
            .unwrap()
            .with_read_options(ReadOptions::default().with_encoding("windows-1252"));
        assert_eq!(config.read_options.encoding.as_deref(), Some("windows-1252"));
        assert_eq!(config.read_options.delimiter, b',');
    }
}
