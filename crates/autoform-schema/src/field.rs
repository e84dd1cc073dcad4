//! Normalized fields and record schemas.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use smol_str::SmolStr;

use crate::grid::IndexLevels;

/// Scalar value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// UTF-8 text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Number,
    /// `true` / `false`.
    Boolean,
}

impl ScalarType {
    /// Map a JSON Schema type name onto a scalar type.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Infer the type of a literal such as an `enum` member.
    #[must_use]
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::String),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(number) if number.is_i64() || number.is_u64() => Some(Self::Integer),
            Value::Number(_) => Some(Self::Number),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// The value a non-nullable field of this type takes when no default is declared.
    #[must_use]
    pub fn zero_value(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer => Value::from(0),
            Self::Number => Value::from(0.0),
            Self::Boolean => Value::Bool(false),
        }
    }

    /// Whether `value` has this type. Integral floats count as integers.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) | (Self::Boolean, Value::Bool(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Integer, Value::Number(number)) => {
                number.is_i64()
                    || number.is_u64()
                    || number.as_f64().is_some_and(|float| float.fract() == 0.0)
            }
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row or nested record type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordRef {
    /// Record declared inline on the field.
    Inline(Arc<RecordSchema>),
    /// Record declared under `definitions` and looked up by name.
    Named(SmolStr),
}

/// Closed set of field shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Single scalar value.
    Scalar(ScalarType),
    /// Nested record.
    Object(RecordRef),
    /// Sequence of scalars.
    ScalarArray(ScalarType),
    /// Sequence of records, edited as a grid.
    RecordArray(RecordRef),
}

impl FieldKind {
    /// Whether this field is a collection displayed as a table.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::RecordArray(_))
    }

    /// Scalar type of a scalar or scalar-array field.
    #[must_use]
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(ty) | Self::ScalarArray(ty) => Some(*ty),
            Self::Object(_) | Self::RecordArray(_) => None,
        }
    }

    /// Record type of an object or collection field.
    #[must_use]
    pub fn record(&self) -> Option<&RecordRef> {
        match self {
            Self::Object(record) | Self::RecordArray(record) => Some(record),
            Self::Scalar(_) | Self::ScalarArray(_) => None,
        }
    }

    /// Short label used in listings, e.g. `string`, `list<integer>`, `object<Rule>`.
    #[must_use]
    pub fn label(&self) -> String {
        fn record_label(record: &RecordRef) -> &str {
            match record {
                RecordRef::Inline(schema) => schema.name.as_deref().unwrap_or("inline"),
                RecordRef::Named(name) => name.as_str(),
            }
        }
        match self {
            Self::Scalar(ty) => ty.as_str().to_string(),
            Self::ScalarArray(ty) => format!("list<{ty}>"),
            Self::Object(record) => format!("object<{}>", record_label(record)),
            Self::RecordArray(record) => format!("grid<{}>", record_label(record)),
        }
    }
}

/// Value constraints. Scalar-array fields carry the constraints of their items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Constraints {
    /// Whether both numeric bounds are set.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.minimum.is_some() && self.maximum.is_some()
    }
}

/// One field of a record after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedField {
    pub name: SmolStr,
    pub title: SmolStr,
    pub description: Option<SmolStr>,
    pub kind: FieldKind,
    /// Grouping label used by two-level grid indexes. Empty sections are `None`.
    pub section: Option<SmolStr>,
    pub width: Option<u32>,
    /// Significant figures for numeric display.
    pub precision: Option<u8>,
    pub constraints: Constraints,
    /// Declared default; `Some(Value::Null)` when `null` was declared explicitly.
    pub default: Option<Value>,
    pub nullable: bool,
    pub required: bool,
    pub disabled: bool,
    pub format: Option<SmolStr>,
    /// Explicit widget override.
    pub widget: Option<SmolStr>,
    /// Declared index naming scheme of a collection field.
    pub index_levels: Option<IndexLevels>,
    /// Position among sibling fields.
    pub order_index: usize,
}

impl NormalizedField {
    /// Whether `null` is an acceptable value for this field.
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        self.nullable || matches!(self.default, Some(Value::Null))
    }
}

/// Ordered fields of one record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    /// Definition name for named records.
    pub name: Option<SmolStr>,
    pub title: Option<SmolStr>,
    /// Declared default of the whole record.
    pub default: Option<Value>,
    fields: Vec<NormalizedField>,
    by_name: FxHashMap<SmolStr, usize>,
}

impl RecordSchema {
    /// Build a record from fields already sorted by `order_index`.
    pub(crate) fn new(
        name: Option<SmolStr>,
        title: Option<SmolStr>,
        default: Option<Value>,
        fields: Vec<NormalizedField>,
    ) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();
        Self {
            name,
            title,
            default,
            fields,
            by_name,
        }
    }

    /// Fields in display order.
    #[must_use]
    pub fn fields(&self) -> &[NormalizedField] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&NormalizedField> {
        self.by_name.get(name).map(|idx| &self.fields[*idx])
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<SmolStr> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Human-readable title for a field name: `int_slider` becomes `Int Slider`.
#[must_use]
pub fn humanize(name: &str) -> SmolStr {
    let words: Vec<String> = name
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect();
    SmolStr::new(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humanize_splits_on_underscores() {
        assert_eq!(humanize("int_slider"), "Int Slider");
        assert_eq!(humanize("floater"), "Floater");
        assert_eq!(humanize("_private__name"), "Private Name");
        assert_eq!(humanize("HTTP_port"), "Http Port");
    }

    #[test]
    fn integer_accepts_integral_floats_only() {
        assert!(ScalarType::Integer.accepts(&json!(3)));
        assert!(ScalarType::Integer.accepts(&json!(3.0)));
        assert!(!ScalarType::Integer.accepts(&json!(3.5)));
        assert!(ScalarType::Number.accepts(&json!(3)));
        assert!(!ScalarType::String.accepts(&json!(3)));
    }

    #[test]
    fn kind_labels() {
        assert_eq!(FieldKind::ScalarArray(ScalarType::Integer).label(), "list<integer>");
        assert_eq!(
            FieldKind::RecordArray(RecordRef::Named("Row".into())).label(),
            "grid<Row>"
        );
    }
}
