//! Tabular data model shared by the loader and every transform.
//!
//! - [`Table`] - ordered columns plus ordered rows
//! - [`Row`] - one record, column name to scalar
//! - [`Numeric`] - numeric view of a cell used by aggregation
//!
//! Cells are `serde_json::Value`s restricted to `Null`, `Number` and `String`.
//! With the `preserve_order` feature a [`Row`] keeps its keys in column order,
//! so serialized output matches the table's column order.

use std::io::Write;

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::TransformError;

/// A single record: column name to scalar value.
pub type Row = Map<String, Value>;

// =============================================================================
// Table
// =============================================================================

/// An ordered sequence of rows sharing one ordered set of columns.
///
/// Every row holds exactly the table's columns, in the table's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and positional values.
    ///
    /// Short value lists are padded with nulls, extra values are ignored.
    pub fn from_values(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in values {
            table.push_values(row);
        }
        table
    }

    /// Append a row given positionally.
    pub fn push_values(&mut self, values: Vec<Value>) {
        let mut values = values.into_iter();
        let row: Row = self
            .columns
            .iter()
            .map(|col| (col.clone(), values.next().unwrap_or(Value::Null)))
            .collect();
        self.rows.push(row);
    }

    /// Append a row given by name. Columns the row lacks become null and
    /// keys that are not table columns are ignored.
    pub fn push_row(&mut self, mut row: Row) {
        let ordered: Row = self
            .columns
            .iter()
            .map(|col| (col.clone(), row.remove(col).unwrap_or(Value::Null)))
            .collect();
        self.rows.push(ordered);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Fail with `MissingColumn` unless `name` is a column of this table.
    pub fn require_column(&self, name: &str) -> Result<(), TransformError> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(TransformError::missing_column(name))
        }
    }

    /// Values of one column in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TransformError> {
        self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(name).unwrap_or(&Value::Null))
            .collect())
    }

    /// Keep only rows matching `predicate`, preserving order.
    pub fn retain<F>(&mut self, predicate: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(predicate);
    }

    /// Add (or overwrite) a column, computing each row's value with `f`.
    pub fn add_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&Row) -> Value,
    {
        for row in &mut self.rows {
            let value = f(row);
            row.insert(name.to_string(), value);
        }
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Rows as a JSON array of objects.
    pub fn to_json(&self) -> Value {
        Value::Array(self.rows.iter().cloned().map(Value::Object).collect())
    }

    /// Write the table as CSV with a header row. Nulls become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|col| cell_to_string(row.get(col).unwrap_or(&Value::Null)))
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

// =============================================================================
// Cells
// =============================================================================

/// Cell text read as "no value", matching the markers spreadsheet and
/// statistics exports write for empty cells.
pub const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for blank text and the [`NA_VALUES`] markers.
pub fn is_na_text(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_VALUES.contains(&trimmed)
}

/// True for null, blank strings and NA markers.
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_na_text(s),
        _ => false,
    }
}

/// Interpret raw cell text: blank or NA is null, integers and floats become
/// numbers, anything else stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    if is_na_text(raw) {
        return Value::Null;
    }
    match parse_number(raw) {
        Some(n) => n.into_value(),
        None => Value::String(raw.to_string()),
    }
}

/// Plain textual representation used for CSV output.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(raw: &str) -> Option<Numeric> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Numeric::Int(i));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(Numeric::Float(f)),
        _ => None,
    }
}

/// Numeric cell content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    /// Numeric view of a cell. Strings count when they parse as a number;
    /// anything else is treated as missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Numeric::Int)
                .or_else(|| n.as_f64().map(Numeric::Float)),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    /// Add, staying integral while both sides are integers.
    pub fn add(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => match a.checked_add(b) {
                Some(sum) => Numeric::Int(sum),
                None => Numeric::Float(a as f64 + b as f64),
            },
            (a, b) => Numeric::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::from(i),
            Numeric::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        }
    }
}

/// Sum the numeric cells in `values`, skipping missing and non-numeric ones.
/// An empty or all-missing input sums to integer zero.
pub fn sum_values<'a, I>(values: I) -> Numeric
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .filter_map(Numeric::from_value)
        .fold(Numeric::Int(0), Numeric::add)
}
