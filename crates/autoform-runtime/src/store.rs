//! Form value store.
//!
//! The store owns the form value. Every write is checked against the schema
//! first and either replaces the value as a whole or leaves it untouched.

#![allow(missing_docs)]

use std::sync::Arc;

use autoform_schema::{FieldPath, SchemaError, SchemaIndex, ValueError};
use serde_json::Value;

use crate::channel::{Channel, SubscriptionId};

/// Published after every successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    /// Location that was written; the root for whole-value sets.
    pub path: FieldPath,
    pub previous: Value,
    pub current: Value,
}

#[derive(Debug)]
pub struct ValueStore {
    schema: Arc<SchemaIndex>,
    value: Value,
    channel: Channel<ValueChange>,
}

impl ValueStore {
    /// Store holding the schema's default value.
    #[must_use]
    pub fn new(schema: Arc<SchemaIndex>) -> Self {
        let default = schema.default_value();
        let value = match schema.conform(&default) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, "declared defaults do not conform; keeping them as declared");
                default
            }
        };
        Self {
            schema,
            value,
            channel: Channel::new(),
        }
    }

    /// Store holding `value`, which must conform to the schema.
    pub fn with_value(schema: Arc<SchemaIndex>, value: &Value) -> Result<Self, ValueError> {
        let value = schema.conform(value)?;
        Ok(Self {
            schema,
            value,
            channel: Channel::new(),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaIndex> {
        &self.schema
    }

    #[must_use]
    pub fn get(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn get_at(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(&self.value)
    }

    /// Default value of the whole form.
    #[must_use]
    pub fn get_default(&self) -> Value {
        self.schema.default_value()
    }

    /// Default value of the field at `path`.
    pub fn default_at(&self, path: &FieldPath) -> Result<Value, SchemaError> {
        if path.is_root() {
            return Ok(self.get_default());
        }
        let field = self.schema.field_at(path)?;
        Ok(self.schema.default_for(field))
    }

    /// Replace the whole value. Listeners are notified once.
    pub fn set(&mut self, value: &Value) -> Result<(), ValueError> {
        let current = self.schema.conform(value).inspect_err(|err| {
            tracing::warn!(%err, "rejected form value");
        })?;
        self.replace(FieldPath::root(), current);
        Ok(())
    }

    /// Replace the value at `path`. The resulting form value is checked as a
    /// whole, so a rejected write leaves every field untouched.
    pub fn set_at(&mut self, path: &FieldPath, value: Value) -> Result<(), ValueError> {
        if path.is_root() {
            return self.set(&value);
        }
        let mut next = self.value.clone();
        let slot = path
            .lookup_mut(&mut next)
            .ok_or_else(|| ValueError::new(path.clone(), "no value at this path"))?;
        *slot = value;
        let current = self.schema.conform(&next).inspect_err(|err| {
            tracing::warn!(%err, "rejected field value");
        })?;
        self.replace(path.clone(), current);
        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ValueChange) + 'static) -> SubscriptionId {
        self.channel.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    fn replace(&mut self, path: FieldPath, current: Value) {
        let previous = std::mem::replace(&mut self.value, current);
        tracing::debug!(%path, "form value replaced");
        let change = ValueChange {
            path,
            previous,
            current: self.value.clone(),
        };
        self.channel.emit(&change);
    }
}
