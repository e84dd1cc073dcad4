//! Default values derived from normalized fields.

use serde_json::{Map, Number, Value};
use smol_str::SmolStr;

use crate::field::{Constraints, FieldKind, NormalizedField, RecordRef, RecordSchema, ScalarType};
use crate::index::SchemaIndex;

impl SchemaIndex {
    /// Default value of the whole form.
    #[must_use]
    pub fn default_value(&self) -> Value {
        let mut defaults = Defaults::new(self);
        match (self.root_record(), self.root_collection()) {
            (Some(record), _) => defaults.record(record),
            (None, Some(field)) => defaults.field(field),
            (None, None) => Value::Null,
        }
    }

    /// Default value of one field.
    ///
    /// A declared default wins. Otherwise nullable fields are `null`,
    /// sequences are empty, scalars take their zero value (or the first
    /// `enum` option) and nested records are built from their own fields.
    #[must_use]
    pub fn default_for(&self, field: &NormalizedField) -> Value {
        Defaults::new(self).field(field)
    }

    /// Default object for a record: its declared default, or one entry per field.
    #[must_use]
    pub fn record_default(&self, record: &RecordSchema) -> Value {
        Defaults::new(self).record(record)
    }
}

struct Defaults<'a> {
    index: &'a SchemaIndex,
    /// Named records currently being expanded.
    stack: Vec<SmolStr>,
}

impl<'a> Defaults<'a> {
    fn new(index: &'a SchemaIndex) -> Self {
        Self {
            index,
            stack: Vec::new(),
        }
    }

    fn field(&mut self, field: &NormalizedField) -> Value {
        if let Some(default) = &field.default {
            return default.clone();
        }
        if field.nullable {
            return Value::Null;
        }
        match &field.kind {
            FieldKind::Scalar(ty) => scalar_default(*ty, &field.constraints),
            FieldKind::ScalarArray(_) | FieldKind::RecordArray(_) => Value::Array(Vec::new()),
            FieldKind::Object(record) => self.object(record),
        }
    }

    fn object(&mut self, record: &RecordRef) -> Value {
        if let RecordRef::Named(name) = record {
            if self.stack.contains(name) {
                return Value::Null;
            }
        }
        match self.index.record(record) {
            Ok(schema) => self.record(schema),
            Err(_) => Value::Null,
        }
    }

    fn record(&mut self, record: &RecordSchema) -> Value {
        if let Some(default) = &record.default {
            return default.clone();
        }
        if let Some(name) = &record.name {
            self.stack.push(name.clone());
        }
        let object: Map<String, Value> = record
            .fields()
            .iter()
            .map(|field| (field.name.to_string(), self.field(field)))
            .collect();
        if record.name.is_some() {
            self.stack.pop();
        }
        Value::Object(object)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scalar_default(ty: ScalarType, constraints: &Constraints) -> Value {
    if let Some(first) = constraints.enum_values.as_ref().and_then(|options| options.first()) {
        return first.clone();
    }
    // zero, pulled inside the declared bounds
    let bound = match (constraints.minimum, constraints.maximum) {
        (Some(minimum), _) if minimum > 0.0 => Some(minimum),
        (_, Some(maximum)) if maximum < 0.0 => Some(maximum),
        _ => None,
    };
    match (ty, bound) {
        (ScalarType::Integer, Some(bound)) if bound > 0.0 => Value::from(bound.ceil() as i64),
        (ScalarType::Integer, Some(bound)) => Value::from(bound.floor() as i64),
        (ScalarType::Number, Some(bound)) => {
            Number::from_f64(bound).map_or_else(|| ty.zero_value(), Value::Number)
        }
        _ => ty.zero_value(),
    }
}
