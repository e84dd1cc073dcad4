//! Standard controls.

use std::fmt;
use std::sync::Arc;

use autoform_schema::{
    FieldPath, GridSchema, NormalizedField, RecordSchema, ScalarType, SchemaError, SchemaIndex,
    ValueError,
};
use serde_json::{Map, Number, Value};
use smol_str::SmolStr;

use crate::binder::control::{unsupported, Control, ControlInput};
use crate::binder::registry::{ControlContext, ControlRegistry, WidgetKind};
use crate::binder::FieldWidgetBinder;
use crate::config::{RendererMap, UiConfig};
use crate::crud::CrudController;
use crate::grid::TabularCollectionEngine;

/// Text, number, slider, checkbox, dropdown and path controls.
#[derive(Debug)]
pub struct ScalarControl {
    kind: WidgetKind,
    field: NormalizedField,
    path: FieldPath,
    schema: Arc<SchemaIndex>,
    value: Value,
    buffer: Option<String>,
    renderers: RendererMap,
}

impl ScalarControl {
    pub fn new(ctx: &ControlContext<'_>) -> Result<Self, SchemaError> {
        if ctx.field.kind.scalar().is_none() {
            return Err(SchemaError::UnsupportedType {
                path: ctx.path.clone(),
                ty: SmolStr::new(ctx.field.kind.label()),
            });
        }
        Ok(Self {
            kind: ctx.kind.clone(),
            field: ctx.field.clone(),
            path: ctx.path.clone(),
            schema: Arc::clone(ctx.schema),
            value: ctx.value.clone(),
            buffer: None,
            renderers: ctx.config.renderers.clone(),
        })
    }

    fn scalar_type(&self) -> ScalarType {
        self.field.kind.scalar().unwrap_or(ScalarType::String)
    }

    fn commit(&mut self, value: &Value) -> Result<Option<Value>, ValueError> {
        let value = self.schema.conform_field(&self.field, value, &self.path)?;
        self.value = value.clone();
        self.buffer = None;
        Ok(Some(value))
    }

    fn commit_text(&mut self, text: &str) -> Result<Option<Value>, ValueError> {
        let value = match option_for_text(&self.field, text) {
            Some(option) => option,
            None => parse_scalar(self.scalar_type(), text, &self.field, &self.path)?,
        };
        self.commit(&value)
    }
}

impl Control for ScalarControl {
    fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    fn field(&self) -> &NormalizedField {
        &self.field
    }

    fn path(&self) -> &FieldPath {
        &self.path
    }

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: &Value) {
        self.value = value.clone();
        self.buffer = None;
    }

    fn handle(&mut self, input: ControlInput) -> Result<Option<Value>, ValueError> {
        match input {
            ControlInput::Edit(text) if self.kind.buffers_input() => {
                self.buffer = Some(text);
                Ok(None)
            }
            ControlInput::Edit(text) => self.commit_text(&text),
            ControlInput::Set(value) => self.commit(&value),
            ControlInput::Toggle if self.scalar_type() == ScalarType::Boolean => {
                let flipped = !self.value.as_bool().unwrap_or(false);
                self.commit(&Value::Bool(flipped))
            }
            ControlInput::Commit | ControlInput::Blur => match self.buffer.clone() {
                Some(text) => self.commit_text(&text),
                None => Ok(None),
            },
            ControlInput::Cancel => {
                self.buffer = None;
                Ok(None)
            }
            other => Err(unsupported(&self.path, &other)),
        }
    }

    fn is_editing(&self) -> bool {
        self.buffer.is_some()
    }

    fn pending(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    fn renderer(&self) -> Option<SmolStr> {
        if self.kind != WidgetKind::Path {
            return None;
        }
        self.renderers.renderer_for(self.value.as_str()?).cloned()
    }
}

/// Editable list of scalars. Text input is a comma separated item list.
#[derive(Debug)]
pub struct ListControl {
    kind: WidgetKind,
    field: NormalizedField,
    path: FieldPath,
    schema: Arc<SchemaIndex>,
    value: Value,
    buffer: Option<String>,
}

impl ListControl {
    pub fn new(ctx: &ControlContext<'_>) -> Result<Self, SchemaError> {
        if ctx.field.kind.scalar().is_none() {
            return Err(SchemaError::UnsupportedType {
                path: ctx.path.clone(),
                ty: SmolStr::new(ctx.field.kind.label()),
            });
        }
        Ok(Self {
            kind: ctx.kind.clone(),
            field: ctx.field.clone(),
            path: ctx.path.clone(),
            schema: Arc::clone(ctx.schema),
            value: ctx.value.clone(),
            buffer: None,
        })
    }

    fn items(&self) -> Vec<Value> {
        self.value.as_array().cloned().unwrap_or_default()
    }

    fn commit(&mut self, value: &Value) -> Result<Option<Value>, ValueError> {
        let value = self.schema.conform_field(&self.field, value, &self.path)?;
        self.value = value.clone();
        self.buffer = None;
        Ok(Some(value))
    }

    fn commit_text(&mut self, text: &str) -> Result<Option<Value>, ValueError> {
        let ty = self.field.kind.scalar().unwrap_or(ScalarType::String);
        let items = text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .enumerate()
            .map(|(idx, part)| parse_scalar(ty, part, &self.field, &self.path.index(idx)))
            .collect::<Result<Vec<_>, _>>()?;
        self.commit(&Value::Array(items))
    }
}

impl Control for ListControl {
    fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    fn field(&self) -> &NormalizedField {
        &self.field
    }

    fn path(&self) -> &FieldPath {
        &self.path
    }

    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: &Value) {
        self.value = value.clone();
        self.buffer = None;
    }

    fn handle(&mut self, input: ControlInput) -> Result<Option<Value>, ValueError> {
        match input {
            ControlInput::Insert(item) => {
                let mut items = self.items();
                items.push(item);
                self.commit(&Value::Array(items))
            }
            ControlInput::Remove(position) => {
                let mut items = self.items();
                if position >= items.len() {
                    return Err(ValueError::new(
                        self.path.index(position),
                        format!("no item at position {position}"),
                    ));
                }
                items.remove(position);
                self.commit(&Value::Array(items))
            }
            ControlInput::Set(value) => self.commit(&value),
            ControlInput::Edit(text) if self.kind.buffers_input() => {
                self.buffer = Some(text);
                Ok(None)
            }
            ControlInput::Edit(text) => self.commit_text(&text),
            ControlInput::Commit | ControlInput::Blur => match self.buffer.clone() {
                Some(text) => self.commit_text(&text),
                None => Ok(None),
            },
            ControlInput::Cancel => {
                self.buffer = None;
                Ok(None)
            }
            other @ ControlInput::Toggle => Err(unsupported(&self.path, &other)),
        }
    }

    fn is_editing(&self) -> bool {
        self.buffer.is_some()
    }

    fn pending(&self) -> Option<&str> {
        self.buffer.as_deref()
    }
}

/// Sub-form for an object field.
///
/// The inner binder is built when the field first holds an object, so a
/// recursive record whose default is `null` does not expand.
pub struct NestedControl {
    kind: WidgetKind,
    field: NormalizedField,
    path: FieldPath,
    schema: Arc<SchemaIndex>,
    record: Arc<RecordSchema>,
    registry: ControlRegistry,
    config: UiConfig,
    value: Value,
    binder: Option<Box<FieldWidgetBinder>>,
}

impl NestedControl {
    pub fn new(ctx: &ControlContext<'_>) -> Result<Self, SchemaError> {
        let record = match ctx.field.kind.record() {
            Some(record) if !ctx.field.kind.is_collection() => Arc::clone(ctx.schema.record(record)?),
            _ => {
                return Err(SchemaError::UnsupportedType {
                    path: ctx.path.clone(),
                    ty: SmolStr::new(ctx.field.kind.label()),
                })
            }
        };
        let mut control = Self {
            kind: ctx.kind.clone(),
            field: ctx.field.clone(),
            path: ctx.path.clone(),
            schema: Arc::clone(ctx.schema),
            record,
            registry: ctx.registry.clone(),
            config: ctx.config.clone(),
            value: ctx.value.clone(),
            binder: None,
        };
        control.sync_binder()?;
        Ok(control)
    }

    fn sync_binder(&mut self) -> Result<(), SchemaError> {
        if !self.value.is_object() {
            self.binder = None;
            return Ok(());
        }
        match &mut self.binder {
            Some(binder) => binder.sync_from(&self.value),
            None => {
                let binder = FieldWidgetBinder::new(
                    Arc::clone(&self.schema),
                    Arc::clone(&self.record),
                    self.path.clone(),
                    &self.registry,
                    &self.config,
                    &self.value,
                )?;
                self.binder = Some(Box::new(binder));
            }
        }
        Ok(())
    }
}

impl Control for NestedControl {
    fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    fn field(&self) -> &NormalizedField {
        &self.field
    }

    fn path(&self) -> &FieldPath {
        &self.path
    }

    fn value(&self) -> Value {
        match &self.binder {
            Some(binder) => binder.value(),
            None => self.value.clone(),
        }
    }

    fn set_value(&mut self, value: &Value) {
        self.value = value.clone();
        if let Err(err) = self.sync_binder() {
            tracing::warn!(path = %self.path, %err, "nested form could not be built");
            self.binder = None;
        }
    }

    fn handle(&mut self, input: ControlInput) -> Result<Option<Value>, ValueError> {
        match input {
            ControlInput::Set(value) => {
                let value = self.schema.conform_field(&self.field, &value, &self.path)?;
                self.set_value(&value);
                Ok(Some(value))
            }
            ControlInput::Commit | ControlInput::Blur | ControlInput::Cancel => Ok(None),
            other => Err(unsupported(&self.path, &other)),
        }
    }

    fn nested(&self) -> Option<&FieldWidgetBinder> {
        self.binder.as_deref()
    }

    fn nested_mut(&mut self) -> Option<&mut FieldWidgetBinder> {
        self.binder.as_deref_mut()
    }
}

impl fmt::Debug for NestedControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedControl")
            .field("path", &self.path)
            .field("record", &self.record.name)
            .field("binder", &self.binder)
            .finish_non_exhaustive()
    }
}

/// Editable grid for a collection field, driven by a [`CrudController`].
pub struct GridControl {
    kind: WidgetKind,
    field: NormalizedField,
    path: FieldPath,
    crud: CrudController,
}

impl GridControl {
    pub fn new(ctx: &ControlContext<'_>) -> Result<Self, SchemaError> {
        let grid = GridSchema::for_field(Arc::clone(ctx.schema), ctx.path.clone(), ctx.field.clone())?;
        let mut engine = TabularCollectionEngine::with_options(grid, &ctx.config.grid);
        engine.load(records_of(ctx.value));
        Ok(Self {
            kind: ctx.kind.clone(),
            field: ctx.field.clone(),
            path: ctx.path.clone(),
            crud: CrudController::with_binder(engine, ctx.config, ctx.registry),
        })
    }

    #[must_use]
    pub fn crud(&self) -> &CrudController {
        &self.crud
    }

    pub fn crud_mut(&mut self) -> &mut CrudController {
        &mut self.crud
    }
}

impl Control for GridControl {
    fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    fn field(&self) -> &NormalizedField {
        &self.field
    }

    fn path(&self) -> &FieldPath {
        &self.path
    }

    fn value(&self) -> Value {
        Value::Array(
            self.crud
                .grid()
                .records()
                .into_iter()
                .map(Value::Object)
                .collect(),
        )
    }

    fn set_value(&mut self, value: &Value) {
        self.crud.grid_mut().load(records_of(value));
    }

    fn handle(&mut self, input: ControlInput) -> Result<Option<Value>, ValueError> {
        match input {
            ControlInput::Set(value) => {
                let value = self
                    .crud
                    .grid()
                    .schema()
                    .schema()
                    .conform_field(&self.field, &value, &self.path)?;
                self.set_value(&value);
                Ok(Some(value))
            }
            ControlInput::Commit | ControlInput::Blur | ControlInput::Cancel => Ok(None),
            other => Err(unsupported(&self.path, &other)),
        }
    }

    fn grid(&self) -> Option<&CrudController> {
        Some(&self.crud)
    }

    fn grid_mut(&mut self) -> Option<&mut CrudController> {
        Some(&mut self.crud)
    }
}

impl fmt::Debug for GridControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridControl")
            .field("path", &self.path)
            .field("crud", &self.crud)
            .finish_non_exhaustive()
    }
}

fn records_of(value: &Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(rows) => rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Enum option whose display text is `text`.
fn option_for_text(field: &NormalizedField, text: &str) -> Option<Value> {
    let options = field.constraints.enum_values.as_ref()?;
    options
        .iter()
        .find(|option| match option {
            Value::String(option) => option == text,
            other => other.to_string() == text.trim(),
        })
        .cloned()
}

/// Parse typed text into a scalar. Blank input is `null` for fields that accept it.
pub(crate) fn parse_scalar(
    ty: ScalarType,
    text: &str,
    field: &NormalizedField,
    path: &FieldPath,
) -> Result<Value, ValueError> {
    let trimmed = text.trim();
    if trimmed.is_empty() && ty != ScalarType::String && field.accepts_null() {
        return Ok(Value::Null);
    }
    match ty {
        ScalarType::String => Ok(Value::String(text.to_string())),
        ScalarType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ValueError::new(path.clone(), format!("'{trimmed}' is not an integer"))),
        ScalarType::Number => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| ValueError::new(path.clone(), format!("'{trimmed}' is not a number"))),
        ScalarType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(ValueError::new(
                path.clone(),
                format!("'{trimmed}' is not a boolean"),
            )),
        },
    }
}
