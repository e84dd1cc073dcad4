use autoform_schema::{IndexKey, IndexLevels};
use serde_json::Value;
use smol_str::SmolStr;

use crate::grid::RowId;

/// One displayed record.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub id: RowId,
    /// Position in the collection, independent of filter and sort.
    pub position: usize,
    /// Cells of the visible columns.
    pub cells: Vec<Value>,
}

/// Snapshot of what a grid displays.
///
/// Records are listed in display order whatever the orientation; when
/// `transposed` is set a renderer lays each record out as a column.
#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub levels: IndexLevels,
    pub columns: Vec<IndexKey>,
    /// Field name of each column.
    pub names: Vec<SmolStr>,
    /// Significant figures of each column.
    pub precision: Vec<Option<u8>>,
    pub rows: Vec<ViewRow>,
    pub transposed: bool,
    pub by_title: bool,
}

impl GridView {
    /// Record displayed at `display`, counting along records in either orientation.
    #[must_use]
    pub fn record_at(&self, display: usize) -> Option<RowId> {
        self.rows.get(display).map(|row| row.id)
    }

    /// Label of column `column`: the title, or the field name when not
    /// labelling by title.
    #[must_use]
    pub fn label(&self, column: usize) -> Option<&str> {
        if self.by_title {
            self.columns.get(column).map(|key| key.title.as_str())
        } else {
            self.names.get(column).map(SmolStr::as_str)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
