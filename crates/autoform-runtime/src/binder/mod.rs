//! Field-to-control binding.
//!
//! A [`FieldWidgetBinder`] holds one control per record field, keyed by field
//! name. Controls report committed values; the binder turns them into
//! [`Commit`]s addressed by absolute [`FieldPath`]. Values pushed back from the
//! store only reach controls whose displayed value differs.

#![allow(missing_docs)]

mod control;
mod registry;
mod widgets;

use std::sync::Arc;

use autoform_schema::{FieldPath, PathSegment, RecordSchema, SchemaError, SchemaIndex, ValueError};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use smol_str::SmolStr;

pub use control::{Control, ControlInput};
pub use registry::{widget_for_field, ControlContext, ControlFactory, ControlRegistry, WidgetKind};
pub use widgets::{GridControl, ListControl, NestedControl, ScalarControl};

use crate::config::UiConfig;
use crate::crud::RowEditor;
use crate::error::FormError;

/// Value committed by a control.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub path: FieldPath,
    pub value: Value,
}

#[derive(Debug)]
pub struct FieldWidgetBinder {
    schema: Arc<SchemaIndex>,
    record: Arc<RecordSchema>,
    path: FieldPath,
    field_controls: IndexMap<SmolStr, Box<dyn Control>>,
    order: Vec<SmolStr>,
    errors: IndexMap<SmolStr, ValueError>,
    baseline: Value,
}

impl FieldWidgetBinder {
    /// Build one control per field of `record`, showing `value`. Fields
    /// missing from `value` show their default.
    pub fn new(
        schema: Arc<SchemaIndex>,
        record: Arc<RecordSchema>,
        path: FieldPath,
        registry: &ControlRegistry,
        config: &UiConfig,
        value: &Value,
    ) -> Result<Self, SchemaError> {
        let mut field_controls = IndexMap::with_capacity(record.len());
        for field in record.fields() {
            let initial = match value.get(field.name.as_str()) {
                Some(initial) => initial.clone(),
                None => schema.default_for(field),
            };
            let field_path = path.child(field.name.clone());
            let control = registry.build(&ControlContext {
                kind: widget_for_field(field),
                field,
                path: &field_path,
                schema: &schema,
                registry,
                config,
                value: &initial,
            })?;
            field_controls.insert(field.name.clone(), control);
        }
        let order = record.field_names();
        let mut binder = Self {
            schema,
            record,
            path,
            field_controls,
            order,
            errors: IndexMap::new(),
            baseline: Value::Null,
        };
        binder.baseline = binder.value();
        Ok(binder)
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[must_use]
    pub fn record(&self) -> &Arc<RecordSchema> {
        &self.record
    }

    /// Field names in the current render order.
    #[must_use]
    pub fn order(&self) -> &[SmolStr] {
        &self.order
    }

    #[must_use]
    pub fn control(&self, name: &str) -> Option<&dyn Control> {
        self.field_controls.get(name).map(|control| &**control)
    }

    pub fn control_mut(&mut self, name: &str) -> Option<&mut (dyn Control + 'static)> {
        self.field_controls.get_mut(name).map(|control| &mut **control)
    }

    /// Control at `path`, relative to this binder, descending into nested forms.
    #[must_use]
    pub fn control_at(&self, path: &FieldPath) -> Option<&dyn Control> {
        let (PathSegment::Field(name), rest) = path.split_first()? else {
            return None;
        };
        let control = self.control(name)?;
        if rest.is_root() {
            return Some(control);
        }
        control.nested()?.control_at(&rest)
    }

    pub fn control_at_mut(&mut self, path: &FieldPath) -> Option<&mut (dyn Control + 'static)> {
        let (PathSegment::Field(name), rest) = path.split_first()? else {
            return None;
        };
        let name = name.clone();
        let control = self.control_mut(&name)?;
        if rest.is_root() {
            return Some(control);
        }
        control.nested_mut()?.control_at_mut(&rest)
    }

    /// Controls in render order.
    pub fn visible_controls(&self) -> impl Iterator<Item = &dyn Control> {
        self.order.iter().filter_map(|name| self.control(name))
    }

    /// Current record value, keys in field order.
    #[must_use]
    pub fn value(&self) -> Value {
        let map: Map<String, Value> = self
            .field_controls
            .iter()
            .map(|(name, control)| (name.to_string(), control.value()))
            .collect();
        Value::Object(map)
    }

    /// Validate `value` against the record and display it.
    ///
    /// A rejected value is still displayed as far as it goes, with the error
    /// recorded against the offending field, so the user can correct it.
    pub fn set_value(&mut self, value: &Value) -> Result<(), ValueError> {
        match self.schema.conform_record(&self.record, value, &self.path) {
            Ok(conformed) => {
                self.errors.clear();
                self.sync_from(&conformed);
                Ok(())
            }
            Err(err) => {
                self.sync_from(value);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Push `value` into controls whose displayed value differs.
    pub fn sync_from(&mut self, value: &Value) {
        let Some(map) = value.as_object() else {
            return;
        };
        for (name, control) in &mut self.field_controls {
            let Some(incoming) = map.get(name.as_str()) else {
                continue;
            };
            if control.value() != *incoming {
                tracing::debug!(path = %control.path(), "control synced from value");
                control.set_value(incoming);
            }
        }
    }

    /// Render only `names`, in that order.
    pub fn render_order(&mut self, names: &[&str]) -> Result<(), ValueError> {
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            if !self.field_controls.contains_key(*name) {
                return Err(ValueError::new(self.path.child(*name), "unknown field"));
            }
            order.push(SmolStr::new(name));
        }
        self.order = order;
        Ok(())
    }

    /// Route `input` to the control at `path`, relative to this binder.
    ///
    /// A rejected input leaves the control open and records a field error.
    pub fn input(
        &mut self,
        path: &FieldPath,
        input: ControlInput,
    ) -> Result<Option<Commit>, FormError> {
        let unknown = || FormError::UnknownField(self.path.join(path));
        let Some((PathSegment::Field(name), rest)) = path.split_first() else {
            return Err(unknown());
        };
        let name = name.clone();
        let Some(control) = self.field_controls.get_mut(&name) else {
            return Err(unknown());
        };
        if !rest.is_root() {
            let nested = control.nested_mut().ok_or_else(unknown)?;
            return nested.input(&rest, input);
        }
        match control.handle(input) {
            Ok(Some(value)) => {
                self.errors.shift_remove(&name);
                Ok(Some(Commit {
                    path: control.path().clone(),
                    value,
                }))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                tracing::warn!(%err, "control input rejected");
                self.errors.insert(name, err.clone());
                Err(FormError::Value(err))
            }
        }
    }

    /// Error recorded for the field at `path`, relative to this binder.
    #[must_use]
    pub fn field_error(&self, path: &FieldPath) -> Option<&ValueError> {
        let (PathSegment::Field(name), rest) = path.split_first()? else {
            return None;
        };
        if rest.is_root() {
            return self.errors.get(name);
        }
        self.control(name)?.nested()?.field_error(&rest)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
            || self
                .field_controls
                .values()
                .filter_map(|control| control.nested())
                .any(FieldWidgetBinder::has_errors)
    }

    pub(crate) fn record_error(&mut self, err: &ValueError) {
        let relative: Vec<PathSegment> = err
            .path
            .segments()
            .iter()
            .skip(self.path.segments().len())
            .cloned()
            .collect();
        if let Some(PathSegment::Field(name)) = relative.first() {
            self.errors.insert(name.clone(), err.clone());
        }
    }

    fn cancel_pending(&mut self) {
        for control in self.field_controls.values_mut() {
            if control.is_editing() {
                let _ = control.handle(ControlInput::Cancel);
            }
        }
    }
}

impl RowEditor for FieldWidgetBinder {
    fn value(&self) -> Value {
        FieldWidgetBinder::value(self)
    }

    fn set_value(&mut self, value: &Value) -> Result<(), ValueError> {
        self.cancel_pending();
        FieldWidgetBinder::set_value(self, value)
    }

    fn render_order(&mut self, names: &[&str]) -> Result<(), ValueError> {
        FieldWidgetBinder::render_order(self, names)
    }

    fn reset_baseline(&mut self) {
        self.baseline = FieldWidgetBinder::value(self);
    }

    fn unsaved_changes(&self) -> bool {
        FieldWidgetBinder::value(self) != self.baseline
    }

    fn revert(&mut self) {
        self.cancel_pending();
        let baseline = self.baseline.clone();
        self.sync_from(&baseline);
        self.errors.clear();
    }
}
