//! Flattened row tables.
//!
//! A [`Table`] is an ordered column list plus rows of single-level JSON
//! values. Nested objects are flattened into dotted column names; anything
//! that still is an array or object afterwards is kept as-is here and turned
//! into text when the column type is resolved.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::constants::store::COLUMN_SEPARATOR;
use crate::types::ColumnName;

/// One flattened row: column name to value. Absent columns read as null.
pub type Row = Map<String, Value>;

/// Physical type a column is stored with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-null value is a boolean.
    Boolean,
    /// Every non-null value is an integer that fits `i64`.
    Int64,
    /// Every non-null value is numeric, at least one is not an `i64`.
    Double,
    /// Anything else; values are rendered as text.
    Utf8,
}

/// Flattened, column-ordered row set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: IndexSet<ColumnName>,
    rows: Vec<Row>,
}

impl Table {
    /// Empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table that still declares `columns`.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Flatten each object record into a row. Non-object records are skipped.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut table = Self::new();
        for record in records {
            if let Value::Object(object) = record {
                table.push_row(flatten_object(object));
            }
        }
        table
    }

    /// Append an already flat row, registering any new columns in first-seen order.
    pub fn push_row(&mut self, row: Row) {
        for column in row.keys() {
            if !self.columns.contains(column) {
                self.columns.insert(column.clone());
            }
        }
        self.rows.push(row);
    }

    /// Declare `column` if it is not already present.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.columns.contains(column) {
            self.columns.insert(column.to_string());
        }
    }

    /// Column names in table order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// True if `column` is declared.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Rows in table order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of `column` in row order; absent cells are `Value::Null`.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&Value::Null))
    }

    /// Append all rows of `other` after this table's rows; columns are unioned.
    pub fn concat(mut self, other: Table) -> Table {
        for column in other.columns {
            self.columns.insert(column);
        }
        self.rows.extend(other.rows);
        self
    }

    /// Drop rows whose `key` duplicates a later row, keeping the last occurrence
    /// in its position. Null keys compare equal to each other.
    pub fn dedup_keep_last(mut self, key: &str) -> Table {
        let mut seen: HashSet<String> = HashSet::with_capacity(self.rows.len());
        let mut keep = vec![false; self.rows.len()];
        for (idx, row) in self.rows.iter().enumerate().rev() {
            let key_text = key_text(row.get(key).unwrap_or(&Value::Null));
            keep[idx] = seen.insert(key_text);
        }
        let mut flags = keep.into_iter();
        self.rows.retain(|_| flags.next().unwrap_or(false));
        self
    }

    /// Resolve the stored type for `column`.
    pub fn column_kind(&self, column: &str) -> ColumnKind {
        infer_kind(self.column_values(column))
    }
}

/// Flatten nested objects into dotted keys. Empty nested objects vanish;
/// arrays and scalars are kept as values.
pub fn flatten_object(object: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(&mut row, None, object);
    row
}

fn flatten_into(row: &mut Row, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{prefix}{COLUMN_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(row, Some(&name), nested),
            other => {
                row.insert(name, other.clone());
            }
        }
    }
}

/// Infer the narrowest stored type that holds every non-null value.
pub fn infer_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let value_kind = match value {
            Value::Null => continue,
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Number(number) if number.as_i64().is_some() => ColumnKind::Int64,
            Value::Number(_) => ColumnKind::Double,
            _ => return ColumnKind::Utf8,
        };
        kind = Some(match (kind, value_kind) {
            (None, next) => next,
            (Some(current), next) if current == next => current,
            (Some(ColumnKind::Int64), ColumnKind::Double)
            | (Some(ColumnKind::Double), ColumnKind::Int64) => ColumnKind::Double,
            _ => return ColumnKind::Utf8,
        });
    }
    kind.unwrap_or(ColumnKind::Utf8)
}

/// Text rendering used for string-coerced columns. Strings are kept verbatim;
/// arrays and objects become compact JSON.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn key_text(value: &Value) -> String {
    match value {
        Value::Null => "\u{0}null".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                (float as i64).to_string()
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}
