//! Collection index derivation.
//!
//! A collection field (a list of records) is displayed as a table whose
//! columns are the row record's fields. When at least one row field declares
//! a `section`, columns are keyed by `(section, title)` and grouped by the
//! order in which sections first appear; otherwise they are keyed by title.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::error::{SchemaError, ValueError};
use crate::field::{NormalizedField, RecordSchema};
use crate::index::SchemaIndex;
use crate::path::FieldPath;
use crate::raw::IndexNameDecl;
use crate::table::{ColumnLabel, FlatTable, Table, TableRow};

/// Level scheme of a collection index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexLevels {
    /// One level of titles.
    Title,
    /// `(section, title)` pairs.
    SectionTitle,
}

impl IndexLevels {
    pub(crate) fn from_decl(decl: &IndexNameDecl, path: &FieldPath) -> Result<Self, SchemaError> {
        let invalid = |name: String| SchemaError::InvalidIndexName {
            path: path.clone(),
            name: SmolStr::new(name),
        };
        match decl {
            IndexNameDecl::One(name) if name == "title" => Ok(Self::Title),
            IndexNameDecl::Many(names) if names.len() == 1 && names[0] == "title" => Ok(Self::Title),
            IndexNameDecl::Many(names)
                if names.len() == 2 && names[0] == "section" && names[1] == "title" =>
            {
                Ok(Self::SectionTitle)
            }
            IndexNameDecl::One(name) => Err(invalid(name.clone())),
            IndexNameDecl::Many(names) => Err(invalid(names.join(", "))),
        }
    }

    /// Level names, as declared in `datagrid_index_name`.
    #[must_use]
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::Title => &["title"],
            Self::SectionTitle => &["section", "title"],
        }
    }
}

/// Column key of a collection index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey {
    pub section: Option<SmolStr>,
    pub title: SmolStr,
}

impl IndexKey {
    #[must_use]
    pub fn title(title: impl Into<SmolStr>) -> Self {
        Self {
            section: None,
            title: title.into(),
        }
    }

    #[must_use]
    pub fn pair(section: impl Into<SmolStr>, title: impl Into<SmolStr>) -> Self {
        Self {
            section: Some(section.into()),
            title: title.into(),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "({section}, {})", self.title),
            None => f.write_str(&self.title),
        }
    }
}

/// Ordered column keys plus the field each key stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIndex {
    levels: IndexLevels,
    keys: Vec<IndexKey>,
    names: Vec<SmolStr>,
}

impl GridIndex {
    #[must_use]
    pub fn levels(&self) -> IndexLevels {
        self.levels
    }

    #[must_use]
    pub fn keys(&self) -> &[IndexKey] {
        &self.keys
    }

    /// Field names in key order.
    #[must_use]
    pub fn field_names(&self) -> &[SmolStr] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of the column for field `name`.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Field name behind `key`.
    #[must_use]
    pub fn name_for_key(&self, key: &IndexKey) -> Option<&SmolStr> {
        let position = self.keys.iter().position(|candidate| candidate == key)?;
        self.names.get(position)
    }

    /// Same columns keyed by title only.
    #[must_use]
    pub fn titles_only(&self) -> GridIndex {
        GridIndex {
            levels: IndexLevels::Title,
            keys: self
                .keys
                .iter()
                .map(|key| IndexKey::title(key.title.clone()))
                .collect(),
            names: self.names.clone(),
        }
    }

    /// Keep the columns of `names`, in that order; unknown names are skipped.
    #[must_use]
    pub fn restrict(&self, names: &[SmolStr]) -> GridIndex {
        let positions: Vec<usize> = names.iter().filter_map(|name| self.position_of(name)).collect();
        GridIndex {
            levels: self.levels,
            keys: positions.iter().map(|idx| self.keys[*idx].clone()).collect(),
            names: positions.iter().map(|idx| self.names[*idx].clone()).collect(),
        }
    }
}

/// Grid description of one collection field.
#[derive(Debug, Clone)]
pub struct GridSchema {
    schema: Arc<SchemaIndex>,
    path: FieldPath,
    field: NormalizedField,
    record: Arc<RecordSchema>,
    index: GridIndex,
}

impl GridSchema {
    /// Grid of the collection declared at the schema root.
    pub fn from_root(schema: Arc<SchemaIndex>) -> Result<Self, SchemaError> {
        let field = schema
            .root_collection()
            .cloned()
            .ok_or_else(|| SchemaError::NotACollection(FieldPath::root()))?;
        Self::for_field(schema, FieldPath::root(), field)
    }

    /// Grid of the collection field at `path`.
    pub fn at(schema: Arc<SchemaIndex>, path: &FieldPath) -> Result<Self, SchemaError> {
        let field = schema.field_at(path)?.clone();
        Self::for_field(schema, path.clone(), field)
    }

    /// Grid of `field`, a collection located at `path`.
    pub fn for_field(
        schema: Arc<SchemaIndex>,
        path: FieldPath,
        field: NormalizedField,
    ) -> Result<Self, SchemaError> {
        let record = match field.kind.record() {
            Some(record) if field.kind.is_collection() => Arc::clone(schema.record(record)?),
            _ => return Err(SchemaError::NotACollection(path)),
        };
        let index = derive_index(&record);
        if field.index_levels == Some(IndexLevels::SectionTitle)
            && index.levels != IndexLevels::SectionTitle
        {
            return Err(SchemaError::MissingSections(path));
        }
        Ok(Self {
            schema,
            path,
            field,
            record,
            index,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaIndex> {
        &self.schema
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// The collection field itself.
    #[must_use]
    pub fn field(&self) -> &NormalizedField {
        &self.field
    }

    /// Row record type.
    #[must_use]
    pub fn record(&self) -> &Arc<RecordSchema> {
        &self.record
    }

    /// True iff at least one row field declares a section.
    #[must_use]
    pub fn is_multiindex(&self) -> bool {
        self.index.levels == IndexLevels::SectionTitle
    }

    /// Declared column index.
    #[must_use]
    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    /// Index restricted to `order`, keeping the order given.
    pub fn index_for_order(&self, order: &[&str]) -> Result<GridIndex, SchemaError> {
        let mut names = Vec::with_capacity(order.len());
        for name in order {
            if self.index.position_of(name).is_none() {
                return Err(SchemaError::UnknownOrderField {
                    path: self.path.clone(),
                    name: SmolStr::new(name),
                });
            }
            names.push(SmolStr::new(name));
        }
        Ok(self.index.restrict(&names))
    }

    /// Column key of field `name`.
    #[must_use]
    pub fn key_for(&self, name: &str) -> Option<&IndexKey> {
        self.index.position_of(name).map(|idx| &self.index.keys[idx])
    }

    /// Field named by an external column label: a field name, a bare title or
    /// a `(section, title)` pair.
    #[must_use]
    pub fn name_for_label(&self, label: &ColumnLabel) -> Option<&SmolStr> {
        match label {
            ColumnLabel::Text(text) => self
                .index
                .names
                .iter()
                .find(|name| *name == text)
                .or_else(|| {
                    let position = self.index.keys.iter().position(|key| key.title == *text)?;
                    self.index.names.get(position)
                }),
            ColumnLabel::Pair(section, title) => {
                let position = self.index.keys.iter().position(|key| {
                    key.title == *title
                        && key.section.as_ref().map_or(section.is_empty(), |own| own == section)
                })?;
                self.index.names.get(position)
            }
        }
    }

    /// Declared default of every row field, `null` where none is declared.
    #[must_use]
    pub fn default_row(&self) -> Map<String, Value> {
        self.record
            .fields()
            .iter()
            .map(|field| {
                (
                    field.name.to_string(),
                    field.default.clone().unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// Starting value for a new row editor: field defaults with zero values
    /// where nothing is declared.
    #[must_use]
    pub fn blank_record(&self) -> Value {
        self.schema.record_default(&self.record)
    }

    /// `record` with every row field present, missing ones taken from
    /// [`GridSchema::default_row`]. Keys follow field order.
    #[must_use]
    pub fn complete_record(&self, record: &Map<String, Value>) -> Map<String, Value> {
        let mut defaults = self.default_row();
        for (name, slot) in &mut defaults {
            if let Some(value) = record.get(name) {
                slot.clone_from(value);
            }
        }
        defaults
    }

    /// The collection's declared default rows, completed from the row default.
    #[must_use]
    pub fn default_records(&self) -> Vec<Map<String, Value>> {
        let Some(Value::Array(rows)) = &self.field.default else {
            return Vec::new();
        };
        rows.iter()
            .filter_map(|row| match row {
                Value::Object(record) => Some(self.complete_record(record)),
                other => {
                    tracing::warn!(path = %self.path, row = %other, "skipping non-object default row");
                    None
                }
            })
            .collect()
    }

    /// Project records onto the declared index. Row ids equal positions.
    #[must_use]
    pub fn table_from_records(&self, records: &[Map<String, Value>]) -> Table {
        let rows = records
            .iter()
            .enumerate()
            .map(|(position, record)| TableRow {
                id: position as u64,
                position,
                cells: self.cells_for(record),
            })
            .collect();
        Table {
            levels: self.index.levels,
            columns: self.index.keys.clone(),
            rows,
        }
    }

    /// Cells of `record` in index order; absent fields take the row default.
    #[must_use]
    pub fn cells_for(&self, record: &Map<String, Value>) -> Vec<Value> {
        let defaults = self.default_row();
        self.index
            .names
            .iter()
            .map(|name| {
                record
                    .get(name.as_str())
                    .or_else(|| defaults.get(name.as_str()))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    /// Declared default rows as a table. With no default rows this is an empty
    /// table with exactly the declared columns.
    #[must_use]
    pub fn default_table(&self) -> Table {
        self.table_from_records(&self.default_records())
    }

    /// Map an externally built table onto the declared index.
    ///
    /// Columns may be labelled by field name, bare title or `(section, title)`.
    /// Columns missing from `table` take the row default.
    pub fn coerce(&self, table: &FlatTable) -> Result<Table, ValueError> {
        let mut targets = Vec::with_capacity(table.columns.len());
        for label in &table.columns {
            let name = self.name_for_label(label).ok_or_else(|| {
                ValueError::new(
                    self.path.child(label.to_string()),
                    "column has no matching field",
                )
            })?;
            targets.push(self.index.position_of(name));
        }
        let defaults = self.cells_for(&Map::new());
        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                let mut cells = defaults.clone();
                for (column, value) in row.iter().enumerate() {
                    if let Some(Some(target)) = targets.get(column) {
                        cells[*target] = value.clone();
                    }
                }
                TableRow {
                    id: position as u64,
                    position,
                    cells,
                }
            })
            .collect();
        Ok(Table {
            levels: self.index.levels,
            columns: self.index.keys.clone(),
            rows,
        })
    }

    /// Records of a table laid out on this index.
    #[must_use]
    pub fn records_from_table(&self, table: &Table) -> Vec<Map<String, Value>> {
        let names: Vec<Option<&SmolStr>> = table
            .columns
            .iter()
            .map(|key| self.index.name_for_key(key))
            .collect();
        table
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (name, value) in names.iter().zip(&row.cells) {
                    if let Some(name) = name {
                        record.insert(name.to_string(), value.clone());
                    }
                }
                self.complete_record(&record)
            })
            .collect()
    }

    /// Check one row against the row record.
    pub fn conform_row(&self, value: &Value) -> Result<Value, ValueError> {
        self.schema.conform_record(&self.record, value, &self.path)
    }
}

fn derive_index(record: &RecordSchema) -> GridIndex {
    let fields = record.fields();
    if !fields.iter().any(|field| field.section.is_some()) {
        return GridIndex {
            levels: IndexLevels::Title,
            keys: fields
                .iter()
                .map(|field| IndexKey::title(field.title.clone()))
                .collect(),
            names: record.field_names(),
        };
    }
    let mut sections: Vec<SmolStr> = Vec::new();
    for field in fields {
        let section = field.section.clone().unwrap_or_default();
        if !sections.contains(&section) {
            sections.push(section);
        }
    }
    let mut keys = Vec::with_capacity(fields.len());
    let mut names = Vec::with_capacity(fields.len());
    for section in &sections {
        for field in fields
            .iter()
            .filter(|field| field.section.as_ref().map_or(section.is_empty(), |own| own == section))
        {
            keys.push(IndexKey::pair(section.clone(), field.title.clone()));
            names.push(field.name.clone());
        }
    }
    GridIndex {
        levels: IndexLevels::SectionTitle,
        keys,
        names,
    }
}
