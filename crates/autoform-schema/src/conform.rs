//! Value conformance against normalized fields.

use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::error::ValueError;
use crate::field::{Constraints, FieldKind, NormalizedField, RecordRef, RecordSchema, ScalarType};
use crate::index::SchemaIndex;
use crate::path::FieldPath;

impl SchemaIndex {
    /// Check `value` against the whole schema.
    ///
    /// Returns the canonical value: record keys in field order, omitted
    /// optional fields filled with their defaults and integral floats stored
    /// as integers.
    pub fn conform(&self, value: &Value) -> Result<Value, ValueError> {
        let mut conformer = Conformer::new(self);
        let root = FieldPath::root();
        match (self.root_record(), self.root_collection()) {
            (Some(record), _) => conformer.record(record, value, &root),
            (None, Some(field)) => conformer.field(field, value, &root),
            (None, None) => Ok(value.clone()),
        }
    }

    /// Check `value` against one record type; `path` locates it in the form.
    pub fn conform_record(
        &self,
        record: &RecordSchema,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Value, ValueError> {
        Conformer::new(self).record(record, value, path)
    }

    /// Check `value` against one field; `path` locates it in the form.
    pub fn conform_field(
        &self,
        field: &NormalizedField,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Value, ValueError> {
        Conformer::new(self).field(field, value, path)
    }
}

struct Conformer<'a> {
    index: &'a SchemaIndex,
    /// Named records currently being checked.
    stack: Vec<SmolStr>,
}

impl<'a> Conformer<'a> {
    fn new(index: &'a SchemaIndex) -> Self {
        Self {
            index,
            stack: Vec::new(),
        }
    }

    fn field(
        &mut self,
        field: &NormalizedField,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Value, ValueError> {
        if value.is_null() {
            if field.accepts_null() || self.closes_cycle(field) {
                return Ok(Value::Null);
            }
            return Err(ValueError::new(path.clone(), "null is not allowed"));
        }
        match &field.kind {
            FieldKind::Scalar(ty) => scalar(*ty, &field.constraints, value, path),
            FieldKind::ScalarArray(ty) => {
                let items = sequence(value, &field.constraints, path)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(position, item)| scalar(*ty, &field.constraints, item, &path.index(position)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldKind::Object(record) => {
                let schema = resolve(self.index, record, path)?;
                self.record(schema, value, path)
            }
            FieldKind::RecordArray(record) => {
                let rows = sequence(value, &field.constraints, path)?;
                let schema = resolve(self.index, record, path)?;
                rows.iter()
                    .enumerate()
                    .map(|(position, row)| self.record(schema, row, &path.index(position)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }

    fn record(
        &mut self,
        record: &RecordSchema,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Value, ValueError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValueError::new(path.clone(), format!("expected an object, found {}", describe(value))))?;
        if let Some(unknown) = object.keys().find(|key| record.field(key).is_none()) {
            return Err(ValueError::new(path.child(unknown.as_str()), "unknown field"));
        }
        if let Some(name) = &record.name {
            self.stack.push(name.clone());
        }
        let result = self.fields(record, object, path);
        if record.name.is_some() {
            self.stack.pop();
        }
        result
    }

    fn fields(
        &mut self,
        record: &RecordSchema,
        object: &Map<String, Value>,
        path: &FieldPath,
    ) -> Result<Value, ValueError> {
        let mut out = Map::new();
        for field in record.fields() {
            let field_path = path.child(field.name.clone());
            let value = match object.get(field.name.as_str()) {
                Some(value) => self.field(field, value, &field_path)?,
                None if field.required && field.default.is_none() => {
                    return Err(ValueError::new(field_path, "missing required field"));
                }
                None => self.index.default_for(field),
            };
            out.insert(field.name.to_string(), value);
        }
        Ok(Value::Object(out))
    }

    /// A non-nullable reference back into a record being checked may be `null`;
    /// otherwise the value could never be finite.
    fn closes_cycle(&self, field: &NormalizedField) -> bool {
        matches!(&field.kind, FieldKind::Object(RecordRef::Named(name)) if self.stack.contains(name))
    }
}

fn resolve<'r>(
    index: &'r SchemaIndex,
    record: &'r RecordRef,
    path: &FieldPath,
) -> Result<&'r RecordSchema, ValueError> {
    index
        .record(record)
        .map(AsRef::as_ref)
        .map_err(|err| ValueError::new(path.clone(), err.to_string()))
}

fn sequence<'v>(
    value: &'v Value,
    constraints: &Constraints,
    path: &FieldPath,
) -> Result<&'v Vec<Value>, ValueError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValueError::new(path.clone(), format!("expected a list, found {}", describe(value))))?;
    if let Some(min) = constraints.min_items {
        if items.len() < min {
            return Err(ValueError::new(path.clone(), format!("expected at least {min} items")));
        }
    }
    if let Some(max) = constraints.max_items {
        if items.len() > max {
            return Err(ValueError::new(path.clone(), format!("expected at most {max} items")));
        }
    }
    Ok(items)
}

/// 2^63: integral floats must lie in `-2^63..2^63` to fit an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn scalar(
    ty: ScalarType,
    constraints: &Constraints,
    value: &Value,
    path: &FieldPath,
) -> Result<Value, ValueError> {
    if !ty.accepts(value) {
        return Err(ValueError::new(
            path.clone(),
            format!("expected {ty}, found {}", describe(value)),
        ));
    }
    let value = match (ty, value.as_f64()) {
        (ScalarType::Integer, Some(float)) if !value.is_i64() && !value.is_u64() => {
            integral(float).ok_or_else(|| ValueError::new(path.clone(), "out of the integer range"))?
        }
        _ => value.clone(),
    };
    if let Some(options) = &constraints.enum_values {
        if !options.iter().any(|option| same_scalar(option, &value)) {
            return Err(ValueError::new(
                path.clone(),
                format!("{value} is not one of the allowed options"),
            ));
        }
    }
    if let Some(number) = value.as_f64() {
        if let Some(minimum) = constraints.minimum {
            if number < minimum {
                return Err(ValueError::new(path.clone(), format!("must be >= {minimum}")));
            }
        }
        if let Some(maximum) = constraints.maximum {
            if number > maximum {
                return Err(ValueError::new(path.clone(), format!("must be <= {maximum}")));
            }
        }
    }
    if let Some(text) = value.as_str() {
        let length = text.chars().count();
        if let Some(min) = constraints.min_length {
            if length < min {
                return Err(ValueError::new(path.clone(), format!("must be at least {min} characters")));
            }
        }
        if let Some(max) = constraints.max_length {
            if length > max {
                return Err(ValueError::new(path.clone(), format!("must be at most {max} characters")));
            }
        }
    }
    Ok(value)
}

#[allow(clippy::cast_possible_truncation)]
fn integral(float: f64) -> Option<Value> {
    (-I64_BOUND..I64_BOUND)
        .contains(&float)
        .then(|| Value::from(float as i64))
}

#[allow(clippy::float_cmp)]
fn same_scalar(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> SchemaIndex {
        SchemaIndex::from_value(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "count": {"type": "integer", "minimum": 0, "maximum": 10},
                "mode": {"type": "string", "enum": ["fast", "slow"]},
                "tags": {"type": "array", "items": {"type": "string"}, "maxItems": 2}
            }
        }))
        .expect("schema")
    }

    #[test]
    fn omitted_optional_fields_take_defaults() {
        let value = index().conform(&json!({"name": "a"})).expect("conform");
        assert_eq!(value, json!({"name": "a", "count": 0, "mode": "fast", "tags": []}));
    }

    #[test]
    fn integral_floats_become_integers() {
        let value = index().conform(&json!({"name": "a", "count": 3.0})).expect("conform");
        assert_eq!(value["count"], json!(3));
        assert!(value["count"].is_i64());
    }

    #[test]
    fn integral_floats_beyond_i64_are_rejected() {
        let index = SchemaIndex::from_value(json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}}
        }))
        .expect("schema");
        for big in [json!(1e20), json!(-1e19), json!(9_223_372_036_854_775_808.0)] {
            let err = index.conform(&json!({"n": big})).expect_err("rejected");
            assert_eq!(err.path.to_string(), "n");
            assert_eq!(err.message, "out of the integer range");
        }
        let value = index.conform(&json!({"n": -9_223_372_036_854_775_808.0})).expect("conform");
        assert_eq!(value["n"], json!(i64::MIN));
        assert_eq!(index.conform(&json!({"n": u64::MAX})).expect("conform")["n"], json!(u64::MAX));
    }

    #[test]
    fn failures_name_the_offending_path() {
        let index = index();
        let cases = [
            (json!({}), "name", "missing required field"),
            (json!({"name": ""}), "name", "must be at least 1 characters"),
            (json!({"name": "a", "count": 11}), "count", "must be <= 10"),
            (json!({"name": "a", "count": 1.5}), "count", "expected integer, found number"),
            (json!({"name": "a", "mode": "other"}), "mode", "\"other\" is not one of the allowed options"),
            (json!({"name": "a", "tags": ["x", 1]}), "tags[1]", "expected string, found number"),
            (json!({"name": "a", "tags": ["x", "y", "z"]}), "tags", "expected at most 2 items"),
            (json!({"name": "a", "extra": 1}), "extra", "unknown field"),
            (json!({"name": null}), "name", "null is not allowed"),
        ];
        for (value, path, message) in cases {
            let err = index.conform(&value).expect_err("rejected");
            assert_eq!(err.path.to_string(), path, "{value}");
            assert_eq!(err.message, message, "{value}");
        }
    }

    #[test]
    fn explicit_null_default_admits_null() {
        let index = SchemaIndex::from_value(json!({
            "type": "object",
            "properties": {"note": {"type": "string", "default": null}}
        }))
        .expect("schema");
        assert_eq!(index.conform(&json!({"note": null})).expect("conform"), json!({"note": null}));
    }
}
