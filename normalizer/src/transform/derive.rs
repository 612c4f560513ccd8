//! Row filters and derived columns applied to raw tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AgeBucket;
use crate::error::TransformError;
use crate::models::{sum_values, Table};

/// Keep rows whose `column` equals `value` (compared as text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn matches(&self, cell: &Value) -> bool {
        match cell {
            Value::String(s) => *s == self.value,
            Value::Number(n) => n.to_string() == self.value,
            _ => false,
        }
    }

    /// Apply to `table` in place. Fails if the column is absent.
    pub fn apply(&self, table: &mut Table) -> Result<(), TransformError> {
        table.require_column(&self.column)?;
        table.retain(|row| row.get(&self.column).is_some_and(|cell| self.matches(cell)));
        Ok(())
    }
}

/// A new column computed as the per-row sum of existing columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumColumns {
    pub name: String,
    pub sources: Vec<String>,
}

impl SumColumns {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    /// Sum of a bucket's single-year columns.
    pub fn from_bucket(bucket: &AgeBucket) -> Self {
        Self::new(bucket.name, bucket.columns())
    }

    /// Add the column to `table`. Every source column must exist; missing and
    /// non-numeric cells count as nothing.
    pub fn apply(&self, table: &mut Table) -> Result<(), TransformError> {
        for source in &self.sources {
            table.require_column(source)?;
        }
        table.add_column(&self.name, |row| {
            sum_values(self.sources.iter().filter_map(|col| row.get(col))).into_value()
        });
        Ok(())
    }
}
