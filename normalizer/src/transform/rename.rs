//! Column selection and renaming.
//!
//! A [`RenameSpec`] maps raw source column names to canonical field names.
//! It decides both which columns survive and what they are called; the two
//! are never done separately.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransformError;
use crate::models::{Row, Table};

/// Ordered mapping from raw column name to canonical field name.
///
/// Keys are unique: renaming a column that is already mapped replaces its
/// target and keeps its position. Serialized as a map in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSpec {
    entries: Vec<(String, String)>,
}

impl RenameSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `source` to `target`.
    pub fn rename(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.insert(source, target);
        self
    }

    /// Keep `column` under its own name.
    pub fn keep(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.rename(column.clone(), column)
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        match self.entries.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((source, target)),
        }
    }

    /// Raw column names, in order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    /// Canonical field names, in order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First source column `table` lacks, if any.
    pub fn first_missing<'a>(&'a self, table: &Table) -> Option<&'a str> {
        self.sources().find(|col| !table.has_column(col))
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for RenameSpec {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut spec = RenameSpec::new();
        for (source, target) in iter {
            spec.insert(source, target);
        }
        spec
    }
}

impl Serialize for RenameSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for RenameSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RenameSpecVisitor;

        impl<'de> Visitor<'de> for RenameSpecVisitor {
            type Value = RenameSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of source column to canonical field")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RenameSpec, A::Error> {
                let mut spec = RenameSpec::new();
                while let Some((source, target)) = map.next_entry::<String, String>()? {
                    spec.insert(source, target);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(RenameSpecVisitor)
    }
}

/// Project `table` onto the spec's source columns, renamed to their targets.
///
/// Every source column must exist; the check runs before any row is built,
/// so a failure never yields partial output. Row count and order are kept.
pub fn select_rename(table: &Table, spec: &RenameSpec) -> Result<Table, TransformError> {
    if let Some(missing) = spec.first_missing(table) {
        return Err(TransformError::missing_column(missing));
    }

    let mut targets: Vec<String> = Vec::with_capacity(spec.len());
    for target in spec.targets() {
        if targets.iter().any(|t| t == target) {
            return Err(TransformError::DuplicateTarget {
                target: target.to_string(),
            });
        }
        targets.push(target.to_string());
    }

    let mut out = Table::new(targets);
    for row in table.rows() {
        let projected: Row = spec
            .iter()
            .map(|(source, target)| {
                let value = row.get(source).cloned().unwrap_or_default();
                (target.to_string(), value)
            })
            .collect();
        out.push_row(projected);
    }
    Ok(out)
}
