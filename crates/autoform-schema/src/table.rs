//! Materialized tables.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::grid::{IndexKey, IndexLevels};

/// Column label of an externally built table: a field name or bare title, or
/// a `(section, title)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLabel {
    /// Field name or bare title.
    Text(SmolStr),
    /// `(section, title)`.
    Pair(SmolStr, SmolStr),
}

impl From<&IndexKey> for ColumnLabel {
    fn from(key: &IndexKey) -> Self {
        match &key.section {
            Some(section) => Self::Pair(section.clone(), key.title.clone()),
            None => Self::Text(key.title.clone()),
        }
    }
}

impl From<&str> for ColumnLabel {
    fn from(text: &str) -> Self {
        Self::Text(SmolStr::new(text))
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Pair(section, title) => write!(f, "({section}, {title})"),
        }
    }
}

/// Table with arbitrary column labels, as supplied from outside the engine.
///
/// Rows shorter than `columns` leave the trailing columns unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatTable {
    /// Column labels, in cell order.
    pub columns: Vec<ColumnLabel>,
    /// Cells of each row.
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl From<&Table> for FlatTable {
    fn from(table: &Table) -> Self {
        Self {
            columns: table.columns.iter().map(ColumnLabel::from).collect(),
            rows: table.rows.iter().map(|row| row.cells.clone()).collect(),
        }
    }
}

/// One materialized row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Stable row identity.
    pub id: u64,
    /// Position in the materialized order.
    pub position: usize,
    /// Cells in column order.
    pub cells: Vec<Value>,
}

/// Records projected onto a declared column index.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Depth of the column index.
    pub levels: IndexLevels,
    /// Column keys, in cell order.
    pub columns: Vec<IndexKey>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Engine-owned columns that never appear in a record.
    #[must_use]
    pub fn synthetic_columns() -> [&'static str; 2] {
        ["id", "position"]
    }

    /// Table with the given columns and no rows.
    #[must_use]
    pub fn empty(levels: IndexLevels, columns: Vec<IndexKey>) -> Self {
        Self {
            levels,
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of the column `key`.
    #[must_use]
    pub fn column(&self, key: &IndexKey) -> Option<usize> {
        self.columns.iter().position(|column| column == key)
    }

    /// Cell at `row`, `key`.
    #[must_use]
    pub fn cell(&self, row: usize, key: &IndexKey) -> Option<&Value> {
        let column = self.column(key)?;
        self.rows.get(row)?.cells.get(column)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
