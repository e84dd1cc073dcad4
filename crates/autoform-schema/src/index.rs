//! Schema index construction and lookup.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::field::{
    humanize, Constraints, FieldKind, NormalizedField, RecordRef, RecordSchema, ScalarType,
};
use crate::grid::IndexLevels;
use crate::path::{FieldPath, PathSegment};
use crate::raw::{RawSchema, TypeDecl};
use crate::{MAX_NESTING_DEPTH, MAX_REF_DEPTH, RESERVED_NAMES};

/// Field name given to a collection declared at the schema root.
pub const ROOT_FIELD: &str = "__root__";

#[derive(Debug, Clone)]
enum Root {
    Record(Arc<RecordSchema>),
    Collection(NormalizedField),
}

/// Normalized view of one schema document.
///
/// Named definitions reachable from the root are normalized once and shared
/// through [`RecordRef::Named`]; nothing is expanded eagerly, so recursive
/// schemas stay finite.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    title: Option<SmolStr>,
    root: Root,
    definitions: IndexMap<SmolStr, Arc<RecordSchema>>,
}

impl SchemaIndex {
    /// Parse and normalize a schema from JSON text.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| SchemaError::InvalidDocument(SmolStr::new(err.to_string())))?;
        Self::from_value(value)
    }

    /// Normalize a schema document.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        if !value.is_object() {
            return Err(SchemaError::InvalidDocument(SmolStr::new(
                "expected a JSON object",
            )));
        }
        let raw: RawSchema = serde_json::from_value(value)
            .map_err(|err| SchemaError::InvalidDocument(SmolStr::new(err.to_string())))?;

        let mut raw_definitions = raw.definitions.clone();
        raw_definitions.extend(raw.defs.clone());
        let mut normalizer = Normalizer::new(&raw_definitions);

        let root_path = FieldPath::root();
        let resolved = normalizer.resolve(&raw)?;
        let root = if resolved.raw.is_record() {
            if resolved.raw.is_tabular() || resolved.raw.datagrid_index_name.is_some() {
                return Err(SchemaError::NotListLike(root_path));
            }
            let record = normalizer.record(&resolved.raw, resolved.target.clone(), &root_path, 0)?;
            Root::Record(Arc::new(record))
        } else {
            let field = normalizer.field(ROOT_FIELD, &raw, true, &root_path, 0)?;
            match &field.kind {
                FieldKind::RecordArray(_) => {}
                FieldKind::ScalarArray(_) => return Err(SchemaError::ItemsNotRecord(root_path)),
                FieldKind::Scalar(_) | FieldKind::Object(_) => {
                    return Err(SchemaError::UnsupportedType {
                        path: root_path,
                        ty: SmolStr::new(field.kind.label()),
                    })
                }
            }
            Root::Collection(field)
        };
        normalizer.drain()?;

        let index = Self {
            title: raw.title.as_deref().map(SmolStr::new),
            root,
            definitions: normalizer.records,
        };
        index.check_collections()?;
        tracing::debug!(
            definitions = index.definitions.len(),
            collection_root = index.root_collection().is_some(),
            "schema normalized"
        );
        Ok(index)
    }

    #[must_use]
    pub fn title(&self) -> Option<&SmolStr> {
        self.title.as_ref()
    }

    /// Root record, unless the root is a collection.
    #[must_use]
    pub fn root_record(&self) -> Option<&Arc<RecordSchema>> {
        match &self.root {
            Root::Record(record) => Some(record),
            Root::Collection(_) => None,
        }
    }

    /// Root collection field (named [`ROOT_FIELD`]), if the root is list-like.
    #[must_use]
    pub fn root_collection(&self) -> Option<&NormalizedField> {
        match &self.root {
            Root::Collection(field) => Some(field),
            Root::Record(_) => None,
        }
    }

    /// Named record definition.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&Arc<RecordSchema>> {
        self.definitions.get(name)
    }

    /// Names of the normalized definitions.
    pub fn definition_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.definitions.keys()
    }

    /// Resolve a record reference.
    pub fn record<'a>(&'a self, record: &'a RecordRef) -> Result<&'a Arc<RecordSchema>, SchemaError> {
        match record {
            RecordRef::Inline(schema) => Ok(schema),
            RecordRef::Named(name) => self
                .definitions
                .get(name)
                .ok_or_else(|| SchemaError::UnresolvedRef(name.clone())),
        }
    }

    /// Field addressed by `path`. Sequence positions are skipped, so
    /// `rules[0].name` and `rules.name` both name the row field `name`.
    pub fn field_at(&self, path: &FieldPath) -> Result<&NormalizedField, SchemaError> {
        let mut current: Option<&NormalizedField> = self.root_collection();
        for segment in path.segments() {
            let PathSegment::Field(name) = segment else {
                continue;
            };
            let record = match current {
                None => self.root_record(),
                Some(field) => match field.kind.record() {
                    Some(record) => Some(self.record(record)?),
                    None => None,
                },
            };
            current = Some(
                record
                    .and_then(|record| record.field(name))
                    .ok_or_else(|| SchemaError::UnknownField(path.clone()))?,
            );
        }
        current.ok_or_else(|| SchemaError::UnknownField(path.clone()))
    }

    /// Record whose fields sit directly under `path`: the root record for the
    /// root path, the nested record of an object field, or the row record of a
    /// collection.
    pub fn record_at(&self, path: &FieldPath) -> Result<&Arc<RecordSchema>, SchemaError> {
        if path.is_root() {
            if let Some(record) = self.root_record() {
                return Ok(record);
            }
        }
        let field = self.field_at(path)?;
        match field.kind.record() {
            Some(record) => self.record(record),
            None => Err(SchemaError::UnknownField(path.clone())),
        }
    }

    fn check_collections(&self) -> Result<(), SchemaError> {
        let mut stack: Vec<(&RecordSchema, FieldPath)> = Vec::new();
        match &self.root {
            Root::Record(record) => stack.push((record.as_ref(), FieldPath::root())),
            Root::Collection(field) => {
                self.check_collection(field, &FieldPath::root())?;
                if let Some(RecordRef::Inline(inner)) = field.kind.record() {
                    stack.push((inner.as_ref(), FieldPath::root()));
                }
            }
        }
        for (name, record) in &self.definitions {
            stack.push((
                record.as_ref(),
                FieldPath::root().child("definitions").child(name.clone()),
            ));
        }
        while let Some((record, path)) = stack.pop() {
            for field in record.fields() {
                let field_path = path.child(field.name.clone());
                if field.kind.is_collection() {
                    self.check_collection(field, &field_path)?;
                }
                if let Some(RecordRef::Inline(inner)) = field.kind.record() {
                    stack.push((inner.as_ref(), field_path));
                }
            }
        }
        Ok(())
    }

    fn check_collection(&self, field: &NormalizedField, path: &FieldPath) -> Result<(), SchemaError> {
        let Some(record) = field.kind.record() else {
            return Ok(());
        };
        let record = self.record(record)?;
        let mut titles = FxHashSet::default();
        for row_field in record.fields() {
            if RESERVED_NAMES.contains(&row_field.name.as_str()) {
                return Err(SchemaError::ReservedName {
                    path: path.clone(),
                    name: row_field.name.clone(),
                });
            }
            if !titles.insert(row_field.title.clone()) {
                return Err(SchemaError::DuplicateTitle {
                    path: path.clone(),
                    title: row_field.title.clone(),
                });
            }
        }
        let sectioned = record.fields().iter().any(|row_field| row_field.section.is_some());
        if field.index_levels == Some(IndexLevels::SectionTitle) && !sectioned {
            return Err(SchemaError::MissingSections(path.clone()));
        }
        Ok(())
    }
}

struct Resolved {
    raw: RawSchema,
    /// Definition the node resolved to, when it can be shared by name.
    target: Option<SmolStr>,
    nullable: bool,
}

struct Normalizer<'a> {
    definitions: &'a IndexMap<String, RawSchema>,
    records: IndexMap<SmolStr, Arc<RecordSchema>>,
    pending: Vec<SmolStr>,
    queued: FxHashSet<SmolStr>,
}

impl<'a> Normalizer<'a> {
    fn new(definitions: &'a IndexMap<String, RawSchema>) -> Self {
        Self {
            definitions,
            records: IndexMap::new(),
            pending: Vec::new(),
            queued: FxHashSet::default(),
        }
    }

    /// Follow `$ref` aliases, overlaying the referring node's keys on the target.
    fn resolve(&self, raw: &RawSchema) -> Result<Resolved, SchemaError> {
        let mut current = raw.clone();
        let mut target = None;
        let mut nullable = unwrap_nullable(&mut current);
        let mut hops = 0;
        while let Some(reference) = detach_ref(&mut current) {
            if hops == MAX_REF_DEPTH {
                return Err(SchemaError::RefDepth(SmolStr::new(reference)));
            }
            hops += 1;
            let name = definition_name(&reference)?;
            let mut next = self
                .definitions
                .get(name)
                .cloned()
                .ok_or_else(|| SchemaError::UnresolvedRef(SmolStr::new(&reference)))?;
            next.overlay(&current);
            current = next;
            nullable |= unwrap_nullable(&mut current);
            target = Some(SmolStr::new(name));
        }
        if target.is_some() {
            // definition titles name the record, not the referring field
            current.title.clone_from(&raw.title);
        }
        if !raw.properties.is_empty() {
            target = None;
        }
        Ok(Resolved {
            raw: current,
            target,
            nullable,
        })
    }

    fn field(
        &mut self,
        name: &str,
        raw: &RawSchema,
        required: bool,
        path: &FieldPath,
        depth: usize,
    ) -> Result<NormalizedField, SchemaError> {
        let resolved = self.resolve(raw)?;
        let node = &resolved.raw;
        let (declared, null_in_type) = node.ty.as_ref().map_or((None, false), TypeDecl::split);
        let ty = declared
            .or_else(|| infer_type(node))
            .ok_or_else(|| unsupported(path, "<missing>"))?;

        let mut constraints = constraints_of(node);
        let kind = match ty {
            "object" => FieldKind::Object(self.record_ref(&resolved, path, depth)?),
            "array" => {
                let items = node
                    .items
                    .as_deref()
                    .ok_or_else(|| unsupported(path, "array without items"))?;
                let item = self.resolve(items)?;
                if item.raw.is_record() {
                    FieldKind::RecordArray(self.record_ref(&item, path, depth)?)
                } else {
                    let item_ty = scalar_of(&item.raw).ok_or_else(|| {
                        unsupported(path, &format!("array of {}", type_name(&item.raw)))
                    })?;
                    let item_constraints = constraints_of(&item.raw);
                    constraints.enum_values = item_constraints.enum_values;
                    constraints.minimum = item_constraints.minimum;
                    constraints.maximum = item_constraints.maximum;
                    constraints.min_length = item_constraints.min_length;
                    constraints.max_length = item_constraints.max_length;
                    FieldKind::ScalarArray(item_ty)
                }
            }
            other => FieldKind::Scalar(ScalarType::parse(other).ok_or_else(|| unsupported(path, other))?),
        };

        if node.is_tabular() || node.datagrid_index_name.is_some() {
            match &kind {
                FieldKind::RecordArray(_) => {}
                FieldKind::ScalarArray(_) => return Err(SchemaError::ItemsNotRecord(path.clone())),
                FieldKind::Scalar(_) | FieldKind::Object(_) => {
                    return Err(SchemaError::NotListLike(path.clone()))
                }
            }
        }
        let index_levels = node
            .datagrid_index_name
            .as_ref()
            .map(|decl| IndexLevels::from_decl(decl, path))
            .transpose()?;

        Ok(NormalizedField {
            name: SmolStr::new(name),
            title: node
                .title
                .as_deref()
                .map_or_else(|| humanize(name), SmolStr::new),
            description: node.description.as_deref().map(SmolStr::new),
            kind,
            section: node
                .section
                .as_deref()
                .filter(|section| !section.is_empty())
                .map(SmolStr::new),
            width: node.column_width,
            precision: node.precision,
            constraints,
            default: node.default.clone(),
            nullable: node.nullable || null_in_type || resolved.nullable,
            required,
            disabled: node.disabled,
            format: node.format.as_deref().map(SmolStr::new),
            widget: node.widget.as_deref().map(SmolStr::new),
            index_levels,
            order_index: 0,
        })
    }

    fn record_ref(
        &mut self,
        resolved: &Resolved,
        path: &FieldPath,
        depth: usize,
    ) -> Result<RecordRef, SchemaError> {
        if let Some(name) = &resolved.target {
            if self.queued.insert(name.clone()) {
                self.pending.push(name.clone());
            }
            return Ok(RecordRef::Named(name.clone()));
        }
        if depth + 1 > MAX_NESTING_DEPTH {
            return Err(SchemaError::NestingDepth {
                path: path.clone(),
                limit: MAX_NESTING_DEPTH,
            });
        }
        let record = self.record(&resolved.raw, None, path, depth + 1)?;
        Ok(RecordRef::Inline(Arc::new(record)))
    }

    fn record(
        &mut self,
        raw: &RawSchema,
        name: Option<SmolStr>,
        path: &FieldPath,
        depth: usize,
    ) -> Result<RecordSchema, SchemaError> {
        let required: FxHashSet<&str> = raw.required.iter().map(String::as_str).collect();
        let mut fields = Vec::with_capacity(raw.properties.len());
        for (field_name, field_raw) in &raw.properties {
            let field_path = path.child(field_name.as_str());
            let field = self.field(
                field_name,
                field_raw,
                required.contains(field_name.as_str()),
                &field_path,
                depth,
            )?;
            fields.push(field);
        }
        let fields = apply_order(fields, raw.order.as_deref(), path)?;
        Ok(RecordSchema::new(
            name,
            raw.title.as_deref().map(SmolStr::new),
            raw.default.clone(),
            fields,
        ))
    }

    /// Normalize every definition queued by a named reference.
    fn drain(&mut self) -> Result<(), SchemaError> {
        while let Some(name) = self.pending.pop() {
            let raw = self
                .definitions
                .get(name.as_str())
                .ok_or_else(|| SchemaError::UnresolvedRef(name.clone()))?;
            let resolved = self.resolve(raw)?;
            let path = FieldPath::root().child("definitions").child(name.clone());
            let mut record = self.record(&resolved.raw, Some(name.clone()), &path, 0)?;
            if record.title.is_none() {
                record.title = raw.title.as_deref().map(SmolStr::new);
            }
            self.records.insert(name, Arc::new(record));
        }
        Ok(())
    }
}

/// Collapse `anyOf: [X, {"type": "null"}]` into `X`, reporting nullability.
fn unwrap_nullable(raw: &mut RawSchema) -> bool {
    if raw.any_of.len() != 2 {
        return false;
    }
    let Some(null_at) = raw.any_of.iter().position(is_null_schema) else {
        return false;
    };
    let mut branches = std::mem::take(&mut raw.any_of);
    let mut inner = branches.swap_remove(1 - null_at);
    inner.overlay(raw);
    if raw.reference.is_some() && inner.reference.is_none() {
        inner.reference = raw.reference.take();
    }
    *raw = inner;
    true
}

fn is_null_schema(raw: &RawSchema) -> bool {
    matches!(raw.ty.as_ref().map(TypeDecl::split), Some((None, true)))
}

/// Take the reference off a `$ref` node or a single-entry `allOf` wrapper.
fn detach_ref(raw: &mut RawSchema) -> Option<String> {
    if let Some(reference) = raw.reference.take() {
        return Some(reference);
    }
    if raw.all_of.len() == 1 && raw.all_of[0].reference.is_some() {
        let mut wrapped = raw.all_of.remove(0);
        return wrapped.reference.take();
    }
    None
}

fn definition_name(reference: &str) -> Result<&str, SchemaError> {
    reference
        .strip_prefix("#/definitions/")
        .or_else(|| reference.strip_prefix("#/$defs/"))
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| SchemaError::UnresolvedRef(SmolStr::new(reference)))
}

fn infer_type(node: &RawSchema) -> Option<&'static str> {
    if !node.properties.is_empty() {
        return Some("object");
    }
    if node.items.is_some() {
        return Some("array");
    }
    let first = node.enum_values.as_ref()?.first()?;
    ScalarType::of_value(first).map(ScalarType::as_str)
}

fn scalar_of(node: &RawSchema) -> Option<ScalarType> {
    let (declared, _) = node.ty.as_ref().map_or((None, false), TypeDecl::split);
    match declared {
        Some(name) => ScalarType::parse(name),
        None => infer_type(node).and_then(ScalarType::parse),
    }
}

fn type_name(node: &RawSchema) -> String {
    match node.ty.as_ref().map(TypeDecl::split) {
        Some((Some(name), _)) => name.to_string(),
        _ => "<missing>".to_string(),
    }
}

fn constraints_of(node: &RawSchema) -> Constraints {
    Constraints {
        enum_values: node.enum_values.clone(),
        minimum: node.minimum,
        maximum: node.maximum,
        min_items: node.min_items,
        max_items: node.max_items,
        min_length: node.min_length,
        max_length: node.max_length,
    }
}

fn unsupported(path: &FieldPath, ty: &str) -> SchemaError {
    SchemaError::UnsupportedType {
        path: path.clone(),
        ty: SmolStr::new(ty),
    }
}

/// Put fields named by `order` first, then the rest in declaration order.
fn apply_order(
    mut fields: Vec<NormalizedField>,
    order: Option<&[String]>,
    path: &FieldPath,
) -> Result<Vec<NormalizedField>, SchemaError> {
    if let Some(order) = order {
        let mut ordered = Vec::with_capacity(fields.len());
        for name in order {
            let position = fields
                .iter()
                .position(|field| field.name == name.as_str())
                .ok_or_else(|| SchemaError::UnknownOrderField {
                    path: path.clone(),
                    name: SmolStr::new(name),
                })?;
            ordered.push(fields.remove(position));
        }
        ordered.append(&mut fields);
        fields = ordered;
    }
    for (order_index, field) in fields.iter_mut().enumerate() {
        field.order_index = order_index;
    }
    Ok(fields)
}
