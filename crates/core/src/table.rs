//! Row tables passed between pipeline stages.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    /// Text form of the cell, borrowing when the cell already holds text.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Table exactly as read from disk: a header and string records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Positions of the key columns inside a [`ChatTable`] header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumns {
    pub conversation: usize,
    pub speaker: usize,
    pub message: usize,
}

/// One message (or collapsed turn).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    /// Position of this row within its conversation, starting at 0.
    pub sequence_index: usize,
    /// Cells aligned with the owning table's columns.
    pub cells: Vec<Value>,
}

/// Ordered rows sharing one header, keyed by conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTable {
    columns: Vec<String>,
    keys: KeyColumns,
    rows: Vec<ChatRow>,
}

impl ChatTable {
    /// Build a table, checking that every row matches the header width and
    /// that the key columns exist.
    pub fn new(columns: Vec<String>, keys: KeyColumns, rows: Vec<ChatRow>) -> Result<Self> {
        let width = columns.len();
        for (name, idx) in [
            ("conversation", keys.conversation),
            ("speaker", keys.speaker),
            ("message", keys.message),
        ] {
            if idx >= width {
                return Err(Error::Schema(format!(
                    "{name} key column index {idx} is outside a {width}-column header"
                )));
            }
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.cells.len() != width) {
            return Err(Error::Schema(format!(
                "row {i} has {} cells but the header has {width} columns",
                row.cells.len()
            )));
        }
        Ok(Self { columns, keys, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> KeyColumns {
        self.keys
    }

    pub fn rows(&self) -> &[ChatRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ChatRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn conversation_id<'a>(&self, row: &'a ChatRow) -> Cow<'a, str> {
        row.cells[self.keys.conversation].to_text()
    }

    pub fn speaker_id<'a>(&self, row: &'a ChatRow) -> Cow<'a, str> {
        row.cells[self.keys.speaker].to_text()
    }

    pub fn message<'a>(&self, row: &'a ChatRow) -> Cow<'a, str> {
        row.cells[self.keys.message].to_text()
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r.cells[idx]).collect())
    }

    /// Distinct conversation ids in order of first appearance.
    pub fn conversation_ids(&self) -> Vec<String> {
        let mut seen: HashSet<Cow<'_, str>> = HashSet::new();
        let mut ids = Vec::new();
        for row in &self.rows {
            let id = self.conversation_id(row);
            if seen.insert(id.clone()) {
                ids.push(id.into_owned());
            }
        }
        ids
    }

    /// A new table with the same header and the given rows.
    pub fn with_rows(&self, rows: Vec<ChatRow>) -> Self {
        Self {
            columns: self.columns.clone(),
            keys: self.keys,
            rows,
        }
    }

    /// Append columns to the right of the header; `values[i]` extends row `i`.
    pub fn append_columns(self, names: Vec<String>, values: Vec<Vec<Value>>) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(Error::Schema(format!(
                "{} value rows supplied for a table of {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        let ChatTable {
            mut columns,
            keys,
            rows,
        } = self;
        columns.extend(names);
        let rows = rows
            .into_iter()
            .zip(values)
            .map(|(mut row, extra)| {
                row.cells.extend(extra);
                row
            })
            .collect();
        ChatTable::new(columns, keys, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChatTable {
        let columns = vec!["conversation_num".into(), "speaker_nickname".into(), "message".into()];
        let keys = KeyColumns {
            conversation: 0,
            speaker: 1,
            message: 2,
        };
        let rows = [("b", "x", "hi"), ("a", "y", "hey"), ("b", "y", "yo")]
            .iter()
            .enumerate()
            .map(|(i, (c, s, m))| ChatRow {
                sequence_index: i,
                cells: vec![(*c).into(), (*s).into(), (*m).into()],
            })
            .collect();
        ChatTable::new(columns, keys, rows).unwrap()
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(4i64).to_string(), "4");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(1.0).to_string(), "1");
        assert_eq!(Value::from(true).to_string(), "1");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_conversation_ids_first_appearance() {
        assert_eq!(sample().conversation_ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let keys = KeyColumns {
            conversation: 0,
            speaker: 0,
            message: 0,
        };
        let rows = vec![ChatRow {
            sequence_index: 0,
            cells: vec![],
        }];
        assert!(matches!(
            ChatTable::new(vec!["c".into()], keys, rows),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_append_columns_aligns_by_row() {
        let table = sample()
            .append_columns(
                vec!["n".into()],
                vec![vec![1i64.into()], vec![2i64.into()], vec![3i64.into()]],
            )
            .unwrap();
        assert_eq!(table.columns().last().unwrap(), "n");
        let n: Vec<String> = table.column("n").unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(n, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_append_columns_rejects_wrong_length() {
        let result = sample().append_columns(vec!["n".into()], vec![vec![1i64.into()]]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }
}
