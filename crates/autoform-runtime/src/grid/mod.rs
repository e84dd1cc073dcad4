//! Tabular collection engine.
//!
//! The engine owns the records of one collection field. Every record gets a
//! [`RowId`] that is never reused while the engine lives; selection and
//! edits address rows by id, never by position. View transforms (visible
//! columns, row filter, sort, orientation) change what is displayed, never
//! the order of the records themselves.

#![allow(missing_docs)]

mod render;
mod view;

use std::collections::BTreeSet;
use std::fmt;

use autoform_schema::{
    FlatTable, GridIndex, GridSchema, IndexLevels, SchemaError, Table, TableRow, ValueError,
};
use serde_json::{Map, Value};
use smol_str::SmolStr;

pub use render::render_text;
pub use view::{GridView, ViewRow};

use crate::channel::{Channel, SubscriptionId};
use crate::config::GridOptions;

/// Stable row identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub id: RowId,
    pub record: Map<String, Value>,
}

/// Published on committed changes only.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    RecordsChanged { revision: u64 },
    SelectionChanged { selected: Vec<RowId> },
    ViewChanged,
}

/// Single-key sort of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: SmolStr,
    pub descending: bool,
}

pub type RowFilter = Box<dyn Fn(&Map<String, Value>) -> bool>;

pub struct TabularCollectionEngine {
    schema: GridSchema,
    rows: Vec<GridRow>,
    next_id: u64,
    transposed: bool,
    by_title: bool,
    selected: BTreeSet<RowId>,
    visible_columns: Option<Vec<SmolStr>>,
    row_filter: Option<RowFilter>,
    sort: Option<SortKey>,
    revision: u64,
    events: Channel<GridEvent>,
}

impl TabularCollectionEngine {
    /// Engine holding the collection's default records.
    #[must_use]
    pub fn new(schema: GridSchema) -> Self {
        Self::with_options(schema, &GridOptions::default())
    }

    #[must_use]
    pub fn with_options(schema: GridSchema, options: &GridOptions) -> Self {
        let mut engine = Self {
            schema,
            rows: Vec::new(),
            next_id: 0,
            transposed: options.transposed,
            by_title: options.by_title,
            selected: BTreeSet::new(),
            visible_columns: None,
            row_filter: None,
            sort: None,
            revision: 0,
            events: Channel::new(),
        };
        let rows: Vec<GridRow> = engine
            .schema
            .default_records()
            .into_iter()
            .map(|record| engine.new_row(record))
            .collect();
        engine.rows = rows;
        engine
    }

    #[must_use]
    pub fn schema(&self) -> &GridSchema {
        &self.schema
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Records in collection order.
    #[must_use]
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows.iter().map(|row| row.record.clone()).collect()
    }

    #[must_use]
    pub fn record(&self, id: RowId) -> Option<&Map<String, Value>> {
        self.rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| &row.record)
    }

    #[must_use]
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Incremented on every committed change to the records.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace every record. Rows get fresh ids; the selection is kept by
    /// position.
    pub fn load(&mut self, records: Vec<Map<String, Value>>) {
        let selected_positions: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.selected.contains(&row.id))
            .map(|(position, _)| position)
            .collect();
        let rows: Vec<GridRow> = records
            .into_iter()
            .map(|record| {
                let record = self.schema.complete_record(&record);
                self.new_row(record)
            })
            .collect();
        self.rows = rows;
        let selected: BTreeSet<RowId> = selected_positions
            .into_iter()
            .filter_map(|position| self.rows.get(position).map(|row| row.id))
            .collect();
        tracing::debug!(path = %self.schema.path(), rows = self.rows.len(), "records loaded");
        self.records_changed();
        self.replace_selection(selected);
    }

    /// Load an externally built table, mapping its columns onto the index.
    pub fn load_table(&mut self, table: &FlatTable) -> Result<(), ValueError> {
        let table = self.schema.coerce(table)?;
        let records = self.schema.records_from_table(&table);
        self.load(records);
        Ok(())
    }

    /// Validate `record` and add it at the end. Missing fields take the
    /// row schema's defaults.
    pub fn append(&mut self, record: &Map<String, Value>) -> Result<RowId, ValueError> {
        let position = self.rows.len();
        let ids = self.insert_at(position, std::slice::from_ref(record))?;
        ids.first()
            .copied()
            .ok_or_else(|| ValueError::new(self.schema.path().clone(), "no row was added"))
    }

    /// Validate `records` and insert them before `position`. Either every
    /// record is inserted or none is.
    pub fn insert_at(
        &mut self,
        position: usize,
        records: &[Map<String, Value>],
    ) -> Result<Vec<RowId>, ValueError> {
        let mut conformed = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let path = self.schema.path().index(position + offset);
            let value = self
                .schema
                .schema()
                .conform_record(self.schema.record(), &Value::Object(record.clone()), &path)?;
            if let Value::Object(map) = value {
                conformed.push(map);
            }
        }
        Ok(self.splice(position, conformed))
    }

    /// Insert copies of the rows `ids`, as stored, before `position`.
    /// Unknown ids are skipped.
    pub fn duplicate(&mut self, ids: &[RowId], position: usize) -> Vec<RowId> {
        let records: Vec<Map<String, Value>> = ids
            .iter()
            .filter_map(|id| self.record(*id).cloned())
            .collect();
        if records.is_empty() {
            return Vec::new();
        }
        self.splice(position, records)
    }

    /// Validate `record` and replace the row `id` in place.
    pub fn replace(&mut self, id: RowId, record: &Map<String, Value>) -> Result<(), ValueError> {
        let position = self.position_of(id).ok_or_else(|| {
            ValueError::new(self.schema.path().clone(), format!("no row with id {id}"))
        })?;
        let path = self.schema.path().index(position);
        let value = self
            .schema
            .schema()
            .conform_record(self.schema.record(), &Value::Object(record.clone()), &path)?;
        if let Value::Object(map) = value {
            self.rows[position].record = map;
        }
        self.records_changed();
        Ok(())
    }

    /// Remove the rows `ids`. Returns how many rows were removed.
    pub fn remove(&mut self, ids: &[RowId]) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !ids.contains(&row.id));
        let removed = before - self.rows.len();
        if removed > 0 {
            self.records_changed();
            let selected = self
                .selected
                .iter()
                .copied()
                .filter(|id| !ids.contains(id))
                .collect();
            self.replace_selection(selected);
        }
        removed
    }

    /// Select the rows `ids`; unknown ids are ignored.
    pub fn select(&mut self, ids: impl IntoIterator<Item = RowId>) {
        let selected = ids
            .into_iter()
            .filter(|id| self.position_of(*id).is_some())
            .collect();
        self.replace_selection(selected);
    }

    /// Select records by position in the collection. Index N is record N in
    /// either orientation.
    pub fn select_indexes(&mut self, positions: &[usize]) {
        let ids: Vec<RowId> = positions
            .iter()
            .filter_map(|position| self.rows.get(*position).map(|row| row.id))
            .collect();
        self.select(ids);
    }

    pub fn clear_selection(&mut self) {
        self.replace_selection(BTreeSet::new());
    }

    /// Selected ids in collection order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<RowId> {
        self.rows
            .iter()
            .filter(|row| self.selected.contains(&row.id))
            .map(|row| row.id)
            .collect()
    }

    #[must_use]
    pub fn selected_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .filter(|row| self.selected.contains(&row.id))
            .map(|row| row.record.clone())
            .collect()
    }

    /// Content of the rows `ids`, restricted to the visible fields when
    /// `visible_only` is set.
    #[must_use]
    pub fn records_for(&self, ids: &[RowId], visible_only: bool) -> Vec<(RowId, Map<String, Value>)> {
        let visible = visible_only.then(|| self.visible_fields());
        self.rows
            .iter()
            .filter(|row| ids.contains(&row.id))
            .map(|row| {
                let record = match &visible {
                    Some(names) => names
                        .iter()
                        .filter_map(|name| {
                            row.record
                                .get(name.as_str())
                                .map(|value| (name.to_string(), value.clone()))
                        })
                        .collect(),
                    None => row.record.clone(),
                };
                (row.id, record)
            })
            .collect()
    }

    #[must_use]
    pub fn transposed(&self) -> bool {
        self.transposed
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        if self.transposed != transposed {
            self.transposed = transposed;
            self.events.emit(&GridEvent::ViewChanged);
        }
    }

    #[must_use]
    pub fn by_title(&self) -> bool {
        self.by_title
    }

    /// Show only the columns of `names`, in that order. `None` shows every column.
    pub fn set_visible_columns(&mut self, names: Option<&[&str]>) -> Result<(), SchemaError> {
        self.visible_columns = match names {
            Some(names) => Some(self.schema.index_for_order(names)?.field_names().to_vec()),
            None => None,
        };
        self.events.emit(&GridEvent::ViewChanged);
        Ok(())
    }

    pub fn set_row_filter(&mut self, filter: Option<RowFilter>) {
        self.row_filter = filter;
        self.events.emit(&GridEvent::ViewChanged);
    }

    pub fn set_sort(&mut self, sort: Option<SortKey>) -> Result<(), SchemaError> {
        if let Some(key) = &sort {
            if self.schema.index().position_of(&key.field).is_none() {
                return Err(SchemaError::UnknownOrderField {
                    path: self.schema.path().clone(),
                    name: key.field.clone(),
                });
            }
        }
        self.sort = sort;
        self.events.emit(&GridEvent::ViewChanged);
        Ok(())
    }

    /// Column index after the visibility filter, in display order.
    #[must_use]
    pub fn visible_index(&self) -> GridIndex {
        match &self.visible_columns {
            Some(names) => self.schema.index().restrict(names),
            None => self.schema.index().clone(),
        }
    }

    /// Field names of the visible columns, in index order.
    ///
    /// A single-level index matches visible titles; a two-level index
    /// matches the title level of the visible keys.
    #[must_use]
    pub fn visible_fields(&self) -> Vec<SmolStr> {
        let visible = self.visible_index();
        let index = self.schema.index();
        let keys = index.keys().iter().zip(index.field_names());
        match index.levels() {
            IndexLevels::Title => keys
                .filter(|(key, _)| visible.keys().contains(*key))
                .map(|(_, name)| name.clone())
                .collect(),
            IndexLevels::SectionTitle => {
                let titles: Vec<&SmolStr> = visible.keys().iter().map(|key| &key.title).collect();
                keys.filter(|(key, _)| titles.contains(&&key.title))
                    .map(|(_, name)| name.clone())
                    .collect()
            }
        }
    }

    /// Rows after filter and sort, projected onto the visible columns.
    #[must_use]
    pub fn view(&self) -> GridView {
        let index = self.visible_index();
        let mut rows: Vec<(usize, &GridRow)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.row_filter.as_ref().is_none_or(|keep| keep(&row.record)))
            .collect();
        if let Some(key) = &self.sort {
            rows.sort_by(|(_, left), (_, right)| {
                let ordering = compare_values(
                    left.record.get(key.field.as_str()),
                    right.record.get(key.field.as_str()),
                );
                if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        let precision = index
            .field_names()
            .iter()
            .map(|name| self.schema.record().field(name).and_then(|field| field.precision))
            .collect();
        let names = index.field_names().to_vec();
        let rows = rows
            .into_iter()
            .map(|(position, row)| ViewRow {
                id: row.id,
                position,
                cells: names
                    .iter()
                    .map(|name| row.record.get(name.as_str()).cloned().unwrap_or(Value::Null))
                    .collect(),
            })
            .collect();
        GridView {
            levels: index.levels(),
            columns: index.keys().to_vec(),
            names,
            precision,
            rows,
            transposed: self.transposed,
            by_title: self.by_title,
        }
    }

    /// Every record projected onto the declared index. With no records this
    /// is an empty table with the declared columns.
    #[must_use]
    pub fn table(&self) -> Table {
        let index = self.schema.index();
        Table {
            levels: index.levels(),
            columns: index.keys().to_vec(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .map(|(position, row)| TableRow {
                    id: row.id.0,
                    position,
                    cells: self.schema.cells_for(&row.record),
                })
                .collect(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GridEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn splice(&mut self, position: usize, records: Vec<Map<String, Value>>) -> Vec<RowId> {
        let position = position.min(self.rows.len());
        let new_rows: Vec<GridRow> = records
            .into_iter()
            .map(|record| self.new_row(record))
            .collect();
        let ids = new_rows.iter().map(|row| row.id).collect();
        self.rows.splice(position..position, new_rows);
        self.records_changed();
        ids
    }

    fn new_row(&mut self, record: Map<String, Value>) -> GridRow {
        let id = RowId(self.next_id);
        self.next_id += 1;
        GridRow { id, record }
    }

    fn records_changed(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        self.events.emit(&GridEvent::RecordsChanged { revision });
    }

    fn replace_selection(&mut self, selected: BTreeSet<RowId>) {
        if selected == self.selected {
            return;
        }
        self.selected = selected;
        let selected = self.selected_ids();
        tracing::debug!(path = %self.schema.path(), ?selected, "selection changed");
        self.events.emit(&GridEvent::SelectionChanged { selected });
    }
}

impl fmt::Debug for TabularCollectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabularCollectionEngine")
            .field("path", self.schema.path())
            .field("rows", &self.rows.len())
            .field("selected", &self.selected)
            .field("transposed", &self.transposed)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (left, right) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (Some(Value::Bool(left)), Some(Value::Bool(right))) => left.cmp(right),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(left), Some(right)) => left.to_string().cmp(&right.to_string()),
    }
}
