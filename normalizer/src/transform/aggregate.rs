//! Row-reducing steps: null-key drop, de-duplication, group-sum and pivot.
//!
//! Grouped and pivoted output is ordered by key, so repeated runs over the
//! same input always produce the same table.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransformError;
use crate::models::{cell_to_string, is_missing, Numeric, Row, Table};

/// How a normalized table is reduced after projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    /// One row per distinct `by` key, with `sum` columns added up.
    GroupSum { by: Vec<String>, sum: Vec<String> },

    /// Long to wide: one row per `index`, one column per distinct `columns`
    /// label holding the `values` cell.
    Pivot {
        index: String,
        columns: String,
        values: String,
    },
}

impl Aggregation {
    pub fn apply(&self, table: &Table) -> Result<Table, TransformError> {
        match self {
            Aggregation::GroupSum { by, sum } => group_sum(table, by, sum),
            Aggregation::Pivot {
                index,
                columns,
                values,
            } => pivot(table, index, columns, values),
        }
    }
}

/// Remove rows whose `key` is null or blank. Returns how many were dropped.
pub fn drop_missing_key(table: &mut Table, key: &str) -> Result<usize, TransformError> {
    table.require_column(key)?;
    let before = table.len();
    table.retain(|row| row.get(key).is_some_and(|v| !is_missing(v)));
    Ok(before - table.len())
}

/// Keep the first row for each distinct combination of `subset` values.
pub fn drop_duplicates(table: &mut Table, subset: &[String]) -> Result<usize, TransformError> {
    for col in subset {
        table.require_column(col)?;
    }
    let before = table.len();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    table.retain(|row| seen.insert(key_of(row, subset)));
    Ok(before - table.len())
}

/// Group rows by `by` and sum the `sum` columns within each group.
///
/// Rows with a missing key are left out. Non-numeric cells count as missing;
/// a group with nothing to add sums to zero.
pub fn group_sum(table: &Table, by: &[String], sum: &[String]) -> Result<Table, TransformError> {
    for col in by.iter().chain(sum) {
        table.require_column(col)?;
    }

    let mut groups: BTreeMap<Vec<String>, (Vec<Value>, Vec<Numeric>)> = BTreeMap::new();
    for row in table.rows() {
        let key_values: Vec<&Value> = by.iter().map(|col| cell(row, col)).collect();
        if key_values.iter().any(|v| is_missing(v)) {
            continue;
        }
        let (_, totals) = groups.entry(key_of(row, by)).or_insert_with(|| {
            (
                key_values.iter().map(|v| (*v).clone()).collect(),
                vec![Numeric::Int(0); sum.len()],
            )
        });
        for (total, col) in totals.iter_mut().zip(sum) {
            if let Some(n) = Numeric::from_value(cell(row, col)) {
                *total = total.add(n);
            }
        }
    }

    let columns: Vec<String> = by.iter().chain(sum).cloned().collect();
    let mut out = Table::new(columns);
    for (_, (keys, totals)) in groups {
        let mut values = keys;
        values.extend(totals.into_iter().map(Numeric::into_value));
        out.push_values(values);
    }
    Ok(out)
}

/// Reshape long rows into one row per `index` value.
///
/// Labels from `columns` become new columns in ascending order after the
/// index column. When an (index, label) pair repeats, the first row wins.
/// Cells with no source row are null.
pub fn pivot(
    table: &Table,
    index: &str,
    columns: &str,
    values: &str,
) -> Result<Table, TransformError> {
    for col in [index, columns, values] {
        table.require_column(col)?;
    }

    let mut labels: BTreeSet<String> = BTreeSet::new();
    let mut wide: BTreeMap<String, (Value, BTreeMap<String, Value>)> = BTreeMap::new();
    for row in table.rows() {
        let index_value = cell(row, index);
        let label_value = cell(row, columns);
        if is_missing(index_value) || is_missing(label_value) {
            continue;
        }
        let label = cell_to_string(label_value);
        labels.insert(label.clone());

        let (_, cells) = wide
            .entry(cell_to_string(index_value))
            .or_insert_with(|| (index_value.clone(), BTreeMap::new()));
        cells
            .entry(label)
            .or_insert_with(|| cell(row, values).clone());
    }

    if labels.contains(index) {
        return Err(TransformError::DuplicateTarget {
            target: index.to_string(),
        });
    }

    let mut out_columns = vec![index.to_string()];
    out_columns.extend(labels.iter().cloned());
    let mut out = Table::new(out_columns);
    for (_, (index_value, mut cells)) in wide {
        let mut values = vec![index_value];
        values.extend(
            labels
                .iter()
                .map(|label| cells.remove(label).unwrap_or(Value::Null)),
        );
        out.push_values(values);
    }
    Ok(out)
}

fn cell<'a>(row: &'a Row, col: &str) -> &'a Value {
    row.get(col).unwrap_or(&Value::Null)
}

fn key_of(row: &Row, cols: &[String]) -> Vec<String> {
    cols.iter().map(|col| cell_to_string(cell(row, col))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_drop_missing_key() {
        let mut table = Table::from_values(
            strings(&["la_code", "total_crime"]),
            vec![
                vec![json!("E001"), json!(10)],
                vec![json!(""), json!(99)],
                vec![Value::Null, json!(500)],
                vec![json!("E002"), json!(20)],
            ],
        );
        let dropped = drop_missing_key(&mut table, "la_code").unwrap();

        assert_eq!(dropped, 2);
        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|r| !is_missing(&r["la_code"])));
    }

    #[test]
    fn test_group_sum_single_key() {
        let table = Table::from_values(
            strings(&["la_code", "ward_code", "num_sold"]),
            vec![
                vec![json!("E002"), json!("W1"), json!(10)],
                vec![json!("E001"), json!("W2"), json!(4)],
                vec![json!("E002"), json!("W3"), json!(15)],
            ],
        );
        let out = group_sum(&table, &strings(&["la_code"]), &strings(&["num_sold"])).unwrap();

        assert_eq!(out.columns(), ["la_code", "num_sold"]);
        assert_eq!(
            out.to_json(),
            json!([
                { "la_code": "E001", "num_sold": 4 },
                { "la_code": "E002", "num_sold": 25 }
            ])
        );
    }

    #[test]
    fn test_group_sum_skips_missing_keys_and_values() {
        let table = Table::from_values(
            strings(&["la_code", "la_name", "total"]),
            vec![
                vec![json!("E001"), json!("Hartlepool"), json!(1)],
                vec![json!("E001"), json!("Hartlepool"), Value::Null],
                vec![Value::Null, json!("England"), json!(1000)],
                vec![json!("E003"), json!("York"), Value::Null],
            ],
        );
        let out = group_sum(&table, &strings(&["la_code", "la_name"]), &strings(&["total"])).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0]["total"], 1);
        assert_eq!(out.rows()[1]["la_name"], "York");
        assert_eq!(out.rows()[1]["total"], 0);
    }

    #[test]
    fn test_group_sum_missing_column() {
        let table = Table::new(strings(&["la_code"]));
        let err = group_sum(&table, &strings(&["la_code"]), &strings(&["num_sold"])).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn { .. }));
    }

    #[test]
    fn test_pivot_long_to_wide() {
        let table = Table::from_values(
            strings(&["la_code", "wellbeing_measure", "wellbeing_score"]),
            vec![
                vec![json!("E002"), json!("happiness"), json!(7.5)],
                vec![json!("E001"), json!("life-satisfaction"), json!(7.1)],
                vec![json!("E001"), json!("happiness"), json!(7.2)],
                vec![json!("E001"), json!("happiness"), json!(9.9)],
            ],
        );
        let out = pivot(&table, "la_code", "wellbeing_measure", "wellbeing_score").unwrap();

        assert_eq!(out.columns(), ["la_code", "happiness", "life-satisfaction"]);
        assert_eq!(
            out.to_json(),
            json!([
                { "la_code": "E001", "happiness": 7.2, "life-satisfaction": 7.1 },
                { "la_code": "E002", "happiness": 7.5, "life-satisfaction": null }
            ])
        );
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let mut table = Table::from_values(
            strings(&["la_code", "measure", "score"]),
            vec![
                vec![json!("E001"), json!("anxiety"), json!(3.1)],
                vec![json!("E001"), json!("anxiety"), json!(2.0)],
                vec![json!("E001"), json!("happiness"), json!(7.0)],
            ],
        );
        let dropped = drop_duplicates(&mut table, &strings(&["la_code", "measure"])).unwrap();

        assert_eq!(dropped, 1);
        assert_eq!(table.rows()[0]["score"], json!(3.1));
    }

    #[test]
    fn test_aggregation_serde_tag() {
        let agg = Aggregation::GroupSum {
            by: strings(&["la_code"]),
            sum: strings(&["num_sold"]),
        };
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["type"], "group_sum");
        let back: Aggregation = serde_json::from_value(json).unwrap();
        assert_eq!(back, agg);
    }
}
