//! Declarative dataset pipeline.
//!
//! Every source file goes through the same steps:
//!
//! ```text
//! load ─▶ filter rows ─▶ derive columns ─▶ select + rename ─▶ drop null keys ─▶ dedup ─▶ aggregate
//! ```
//!
//! A [`DatasetSpec`] says which of those steps apply and with what
//! parameters; [`run_dataset`] executes it. Steps that a spec leaves empty
//! are skipped.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::aggregate::{drop_duplicates, drop_missing_key, Aggregation};
use super::derive::{RowFilter, SumColumns};
use super::rename::{select_rename, RenameSpec};
use crate::error::NormalizeError;
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::models::Table;
use crate::parser::{load_table, ReadOptions};

/// Everything needed to turn one raw file into a normalized table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Short name used in logs and on the command line
    pub name: String,

    /// File read from the CSV directory
    pub file_name: String,

    /// Rows must match every filter to be kept
    #[serde(default)]
    pub filters: Vec<RowFilter>,

    /// Columns computed on the raw table before projection
    #[serde(default)]
    pub derived: Vec<SumColumns>,

    /// Raw to canonical column mapping
    pub rename: RenameSpec,

    /// Canonical column whose missing values cause the row to be dropped
    #[serde(default)]
    pub required_key: Option<String>,

    /// Canonical columns identifying a row; later repeats are dropped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_by: Vec<String>,

    /// Final reduction, if any
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
}

impl DatasetSpec {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, rename: RenameSpec) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            filters: Vec::new(),
            derived: Vec::new(),
            rename,
            required_key: None,
            unique_by: Vec::new(),
            aggregation: None,
        }
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_derived(mut self, derived: SumColumns) -> Self {
        self.derived.push(derived);
        self
    }

    pub fn require_key(mut self, key: impl Into<String>) -> Self {
        self.required_key = Some(key.into());
        self
    }

    /// Keep only the first row for each combination of `columns`.
    pub fn unique_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Apply every step after loading to an in-memory raw table.
    pub fn apply(&self, raw: Table) -> Result<Table, NormalizeError> {
        let mut table = raw;
        let loaded = table.len();

        for filter in &self.filters {
            filter.apply(&mut table)?;
        }
        if !self.filters.is_empty() {
            log_info_indent(format!("{} of {} rows match filters", table.len(), loaded), 1);
        }

        for derived in &self.derived {
            derived.apply(&mut table)?;
        }

        let mut table = select_rename(&table, &self.rename)?;

        if let Some(key) = &self.required_key {
            let dropped = drop_missing_key(&mut table, key)?;
            if dropped > 0 {
                log_info_indent(format!("Dropped {} rows without {}", dropped, key), 1);
            }
        }

        if !self.unique_by.is_empty() {
            let dropped = drop_duplicates(&mut table, &self.unique_by)?;
            if dropped > 0 {
                log_info_indent(
                    format!("Dropped {} repeated {} rows", dropped, self.unique_by.join("/")),
                    1,
                );
            }
        }

        if let Some(aggregation) = &self.aggregation {
            let rows = table.len();
            table = aggregation.apply(&table)?;
            log_info_indent(format!("Aggregated {} rows into {}", rows, table.len()), 1);
        }

        Ok(table)
    }
}

/// Load the spec's file from `csv_dir` and normalize it.
pub fn run_dataset(
    csv_dir: &Path,
    spec: &DatasetSpec,
    options: &ReadOptions,
) -> Result<Table, NormalizeError> {
    log_info(format!("Normalizing {} ({})", spec.name, spec.file_name));
    let table = load_table(csv_dir, &spec.file_name, options)
        .map_err(NormalizeError::from)
        .and_then(|raw| {
            log_info_indent(
                format!("Read {} rows, {} columns", raw.len(), raw.columns().len()),
                1,
            );
            spec.apply(raw)
        })
        .map_err(|e| {
            log_error(format!("{} failed: {}", spec.name, e));
            e
        })?;
    if table.is_empty() {
        log_warning(format!("{} produced no rows", spec.name));
    } else {
        log_success(format!("{}: {} rows", spec.name, table.len()));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use serde_json::{json, Value};

    fn rental_spec() -> DatasetSpec {
        DatasetSpec::new(
            "rental",
            "rental.csv",
            RenameSpec::new()
                .rename("Area Code1", "la_code")
                .rename("Median", "median_rent"),
        )
        .require_key("la_code")
    }

    #[test]
    fn test_apply_projects_and_drops() {
        let raw = Table::from_values(
            vec!["Area Code1".into(), "Area".into(), "Median".into()],
            vec![
                vec![json!("E001"), json!("Hartlepool"), json!(500)],
                vec![Value::Null, json!("ENGLAND"), json!(800)],
            ],
        );
        let out = rental_spec().apply(raw).unwrap();

        assert_eq!(
            out.to_json(),
            json!([{ "la_code": "E001", "median_rent": 500 }])
        );
    }

    #[test]
    fn test_apply_missing_column_no_output() {
        let raw = Table::from_values(vec!["Area Code1".into()], vec![vec![json!("E001")]]);
        let err = rental_spec().apply(raw).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Transform(TransformError::MissingColumn { ref column }) if column == "Median"
        ));
    }

    #[test]
    fn test_apply_keeps_first_of_repeated_keys() {
        let raw = Table::from_values(
            vec!["Area Code1".into(), "Median".into()],
            vec![
                vec![json!("E001"), json!(500)],
                vec![json!("E002"), json!(610)],
                vec![json!("E001"), json!(520)],
            ],
        );
        let out = rental_spec().unique_by(["la_code"]).apply(raw).unwrap();

        assert_eq!(
            out.to_json(),
            json!([
                { "la_code": "E001", "median_rent": 500 },
                { "la_code": "E002", "median_rent": 610 }
            ])
        );
    }

    #[test]
    fn test_unique_by_unknown_column_fails() {
        let raw = Table::from_values(
            vec!["Area Code1".into(), "Median".into()],
            vec![vec![json!("E001"), json!(500)]],
        );
        let err = rental_spec().unique_by(["period"]).apply(raw).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Transform(TransformError::MissingColumn { ref column }) if column == "period"
        ));
    }

    #[test]
    fn test_spec_without_unique_by_deserializes() {
        let json = r#"{"name":"rental","file_name":"rental.csv","rename":{"Area Code1":"la_code"}}"#;
        let spec: DatasetSpec = serde_json::from_str(json).unwrap();
        assert!(spec.unique_by.is_empty());
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn test_spec_round_trips_through_json() {
        let spec = rental_spec().unique_by(["la_code"]).with_aggregation(Aggregation::GroupSum {
            by: vec!["la_code".into()],
            sum: vec!["median_rent".into()],
        });
        let json = serde_json::to_string(&spec).unwrap();
        let back: DatasetSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_run_dataset_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_dataset(dir.path(), &rental_spec(), &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Load(crate::error::LoadError::NotFound { .. })
        ));
    }
}
