//! Form facade: one schema, one value store, one tree of controls.

#![allow(missing_docs)]

use std::sync::Arc;

use autoform_schema::{FieldPath, SchemaIndex, ValueError};
use serde_json::Value;

use crate::binder::{
    Commit, Control, ControlContext, ControlInput, ControlRegistry, FieldWidgetBinder, WidgetKind,
};
use crate::channel::SubscriptionId;
use crate::config::UiConfig;
use crate::crud::CrudController;
use crate::error::FormError;
use crate::store::{ValueChange, ValueStore};

#[derive(Debug)]
enum FormBody {
    Record(FieldWidgetBinder),
    /// The schema root is itself a collection.
    Collection(Box<dyn Control>),
}

/// Routes control input to the store and pushes stored values back into the
/// controls.
///
/// Every committed control value is written through [`ValueStore::set_at`].
/// A rejected write leaves the store untouched and the controls are resynced
/// from it, with the error recorded against the field.
#[derive(Debug)]
pub struct Form {
    schema: Arc<SchemaIndex>,
    store: ValueStore,
    body: FormBody,
    config: UiConfig,
    registry: ControlRegistry,
}

impl Form {
    /// Form with the default configuration and the standard controls.
    pub fn new(schema: Arc<SchemaIndex>) -> Result<Self, FormError> {
        Self::with_config(schema, UiConfig::default(), ControlRegistry::standard())
    }

    pub fn with_config(
        schema: Arc<SchemaIndex>,
        config: UiConfig,
        registry: ControlRegistry,
    ) -> Result<Self, FormError> {
        let store = ValueStore::new(Arc::clone(&schema));
        let root = FieldPath::root();
        let body = match (schema.root_record(), schema.root_collection()) {
            (Some(record), _) => FormBody::Record(FieldWidgetBinder::new(
                Arc::clone(&schema),
                Arc::clone(record),
                root,
                &registry,
                &config,
                store.get(),
            )?),
            (None, Some(field)) => FormBody::Collection(registry.build(&ControlContext {
                kind: WidgetKind::Grid,
                field,
                path: &root,
                schema: &schema,
                registry: &registry,
                config: &config,
                value: store.get(),
            })?),
            (None, None) => return Err(FormError::NotACollection(root)),
        };
        tracing::debug!(title = ?schema.title(), "form built");
        Ok(Self {
            schema,
            store,
            body,
            config,
            registry,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaIndex> {
        &self.schema
    }

    #[must_use]
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        self.store.get()
    }

    #[must_use]
    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Root binder, unless the root is a collection.
    #[must_use]
    pub fn binder(&self) -> Option<&FieldWidgetBinder> {
        match &self.body {
            FormBody::Record(binder) => Some(binder),
            FormBody::Collection(_) => None,
        }
    }

    /// Replace the whole value and show it.
    pub fn set_value(&mut self, value: &Value) -> Result<(), FormError> {
        self.store.set(value)?;
        self.push_store();
        Ok(())
    }

    /// Deliver `input` to the control at `path`. Returns whether a value was
    /// committed to the store.
    pub fn input(&mut self, path: &FieldPath, input: ControlInput) -> Result<bool, FormError> {
        let commit = match &mut self.body {
            FormBody::Record(binder) => binder.input(path, input)?,
            FormBody::Collection(control) => {
                if !path.is_root() {
                    return Err(FormError::UnknownField(path.clone()));
                }
                control.handle(input)?.map(|value| Commit {
                    path: FieldPath::root(),
                    value,
                })
            }
        };
        let Some(Commit { path, value }) = commit else {
            return Ok(false);
        };
        let written = self.store.set_at(&path, value);
        self.push_store();
        match written {
            Ok(()) => Ok(true),
            Err(err) => {
                self.record_error(&err);
                Err(FormError::Value(err))
            }
        }
    }

    /// Error recorded for the field at `path`.
    #[must_use]
    pub fn field_error(&self, path: &FieldPath) -> Option<&ValueError> {
        match &self.body {
            FormBody::Record(binder) => binder.field_error(path),
            FormBody::Collection(_) => None,
        }
    }

    #[must_use]
    pub fn control(&self, path: &FieldPath) -> Option<&dyn Control> {
        match &self.body {
            FormBody::Record(binder) => binder.control_at(path),
            FormBody::Collection(control) if path.is_root() => Some(&**control),
            FormBody::Collection(_) => None,
        }
    }

    fn control_mut(&mut self, path: &FieldPath) -> Option<&mut (dyn Control + 'static)> {
        match &mut self.body {
            FormBody::Record(binder) => binder.control_at_mut(path),
            FormBody::Collection(control) if path.is_root() => Some(&mut **control),
            FormBody::Collection(_) => None,
        }
    }

    /// CRUD controller of the collection at `path`.
    pub fn crud(&self, path: &FieldPath) -> Result<&CrudController, FormError> {
        let control = self
            .control(path)
            .ok_or_else(|| FormError::UnknownField(path.clone()))?;
        control
            .grid()
            .ok_or_else(|| FormError::NotACollection(path.clone()))
    }

    /// Run `action` against the collection at `path`, then publish the
    /// records to the store if they changed.
    ///
    /// When the store rejects the records the grid is reloaded from the
    /// stored value.
    pub fn grid_action<R>(
        &mut self,
        path: &FieldPath,
        action: impl FnOnce(&mut CrudController) -> R,
    ) -> Result<R, FormError> {
        let control = self
            .control_mut(path)
            .ok_or_else(|| FormError::UnknownField(path.clone()))?;
        let field_path = control.path().clone();
        let crud = control
            .grid_mut()
            .ok_or_else(|| FormError::NotACollection(path.clone()))?;
        let before = crud.grid().revision();
        let result = action(crud);
        if crud.grid().revision() == before {
            return Ok(result);
        }
        let records = Value::Array(
            crud.grid()
                .records()
                .into_iter()
                .map(Value::Object)
                .collect(),
        );
        let written = self.store.set_at(&field_path, records);
        self.push_store();
        match written {
            Ok(()) => Ok(result),
            Err(err) => {
                tracing::warn!(path = %field_path, %err, "grid records rejected by the form");
                Err(FormError::Value(err))
            }
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ValueChange) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    fn push_store(&mut self) {
        let value = self.store.get();
        match &mut self.body {
            FormBody::Record(binder) => binder.sync_from(value),
            FormBody::Collection(control) => {
                if control.value() != *value {
                    control.set_value(value);
                }
            }
        }
    }

    fn record_error(&mut self, err: &ValueError) {
        if let FormBody::Record(binder) = &mut self.body {
            binder.record_error(err);
        }
    }
}
