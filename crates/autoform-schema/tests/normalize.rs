mod common;

use autoform_schema::{FieldKind, FieldPath, RecordRef, ScalarType, SchemaError, SchemaIndex};
use common::{dataframe, index};
use expect_test::{expect, Expect};
use serde_json::{json, Value};

fn check_fields(schema: Value, expect: Expect) {
    let index = index(schema);
    let record = index.root_record().expect("root record");
    let listing: String = record
        .fields()
        .iter()
        .map(|field| {
            format!(
                "{} {} | {:?} | {} | section={} width={} order={}\n",
                field.order_index,
                field.name,
                field.title.as_str(),
                field.kind.label(),
                field.section.as_deref().unwrap_or("-"),
                field.width.map_or_else(|| "-".to_string(), |width| width.to_string()),
                field.order_index,
            )
        })
        .collect();
    expect.assert_eq(&listing);
}

fn schema_error(schema: Value) -> SchemaError {
    SchemaIndex::from_value(schema).expect_err("schema rejected")
}

#[test]
fn fields_follow_declaration_order_with_humanized_titles() {
    check_fields(
        json!({
            "type": "object",
            "properties": {
                "int_slider": {"type": "integer", "minimum": 0, "maximum": 5},
                "text": {"type": "string", "title": "Free Text", "column_width": 120},
                "tags": {"type": "array", "items": {"type": "string"}},
                "nested": {
                    "type": "object",
                    "properties": {"flag": {"type": "boolean"}}
                },
                "rows": {"type": "array", "items": {"$ref": "#/definitions/Row"}}
            },
            "definitions": {
                "Row": {"type": "object", "properties": {"cell": {"type": "number", "section": "s"}}}
            }
        }),
        expect![[r#"
            0 int_slider | "Int Slider" | integer | section=- width=- order=0
            1 text | "Free Text" | string | section=- width=120 order=1
            2 tags | "Tags" | list<string> | section=- width=- order=2
            3 nested | "Nested" | object<inline> | section=- width=- order=3
            4 rows | "Rows" | grid<Row> | section=- width=- order=4
        "#]],
    );
}

#[test]
fn explicit_order_comes_first() {
    check_fields(
        json!({
            "type": "object",
            "order": ["c", "a"],
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "string"},
                "c": {"type": "string"}
            }
        }),
        expect![[r#"
            0 c | "C" | string | section=- width=- order=0
            1 a | "A" | string | section=- width=- order=1
            2 b | "B" | string | section=- width=- order=2
        "#]],
    );
}

#[test]
fn recursive_definitions_stay_named() {
    let index = index(json!({
        "type": "object",
        "properties": {"tree": {"$ref": "#/definitions/Node"}},
        "definitions": {
            "Node": {
                "type": "object",
                "properties": {
                    "label": {"type": "string"},
                    "children": {"type": "array", "items": {"$ref": "#/definitions/Node"}}
                }
            }
        }
    }));
    let children = index
        .field_at(&FieldPath::from_dotted("tree.children.children.label"))
        .expect("deep path");
    assert_eq!(children.kind, FieldKind::Scalar(ScalarType::String));
    let node = index.definition("Node").expect("definition");
    assert_eq!(
        node.field("children").map(|field| &field.kind),
        Some(&FieldKind::RecordArray(RecordRef::Named("Node".into())))
    );
    assert_eq!(index.definition_names().count(), 1);
}

#[test]
fn all_of_wrappers_and_defs_resolve() {
    let index = index(json!({
        "type": "object",
        "properties": {"inner": {"allOf": [{"$ref": "#/$defs/Inner"}], "description": "wrapped"}},
        "$defs": {"Inner": {"type": "object", "properties": {"x": {"type": "integer"}}}}
    }));
    let inner = index.field_at(&"inner".into()).expect("inner");
    assert_eq!(inner.kind, FieldKind::Object(RecordRef::Named("Inner".into())));
    assert_eq!(inner.description.as_deref(), Some("wrapped"));
    assert_eq!(inner.title, "Inner");
}

#[test]
fn dict_root_with_dataframe_format_is_rejected() {
    let err = schema_error(json!({
        "type": "object",
        "format": "dataframe",
        "additionalProperties": {"$ref": "#/definitions/Row"},
        "definitions": {"Row": {"type": "object", "properties": {"a": {"type": "string"}}}}
    }));
    assert_eq!(err, SchemaError::NotListLike(FieldPath::root()));
}

#[test]
fn tabular_format_on_scalar_field_is_rejected() {
    let err = schema_error(json!({
        "type": "object",
        "properties": {"value": {"type": "string", "format": "DataFrame"}}
    }));
    assert_eq!(err, SchemaError::NotListLike("value".into()));
}

#[test]
fn two_level_index_without_sections_is_rejected() {
    let mut schema = dataframe(json!({"a": {"type": "string"}}), None);
    schema["datagrid_index_name"] = json!(["section", "title"]);
    assert_eq!(schema_error(schema), SchemaError::MissingSections(FieldPath::root()));
}

#[test]
fn unknown_index_scheme_is_rejected() {
    let mut schema = dataframe(json!({"a": {"type": "string"}}), None);
    schema["datagrid_index_name"] = json!("name");
    assert!(matches!(
        schema_error(schema),
        SchemaError::InvalidIndexName { .. }
    ));
}

#[test]
fn collection_items_must_be_records() {
    let err = schema_error(json!({
        "type": "array",
        "format": "dataframe",
        "items": {"type": "integer"}
    }));
    assert_eq!(err, SchemaError::ItemsNotRecord(FieldPath::root()));
}

#[test]
fn collection_rows_reject_duplicate_titles_and_reserved_names() {
    let err = schema_error(dataframe(
        json!({"a": {"type": "string", "title": "Same"}, "b": {"type": "string", "title": "Same"}}),
        None,
    ));
    assert!(matches!(err, SchemaError::DuplicateTitle { ref title, .. } if title == "Same"));

    let err = schema_error(dataframe(json!({"position": {"type": "integer"}}), None));
    assert!(matches!(err, SchemaError::ReservedName { ref name, .. } if name == "position"));
}

#[test]
fn order_naming_an_unknown_field_is_rejected() {
    let err = schema_error(json!({
        "type": "object",
        "order": ["ghost"],
        "properties": {"a": {"type": "string"}}
    }));
    assert!(matches!(err, SchemaError::UnknownOrderField { ref name, .. } if name == "ghost"));
}

#[test]
fn missing_definitions_are_unresolved() {
    let err = schema_error(json!({
        "type": "object",
        "properties": {"a": {"$ref": "#/definitions/Missing"}}
    }));
    assert_eq!(err, SchemaError::UnresolvedRef("#/definitions/Missing".into()));
}

#[test]
fn deep_inline_nesting_is_bounded() {
    let mut schema = json!({"type": "string"});
    for _ in 0..autoform_schema::MAX_NESTING_DEPTH + 2 {
        schema = json!({"type": "object", "properties": {"n": schema}});
    }
    assert!(matches!(
        schema_error(schema),
        SchemaError::NestingDepth { .. }
    ));
}

#[test]
fn unsupported_types_name_the_field() {
    let err = schema_error(json!({
        "type": "object",
        "properties": {"matrix": {"type": "array", "items": {"type": "array", "items": {"type": "number"}}}}
    }));
    assert_eq!(
        err.to_string(),
        "field 'matrix' has unsupported type 'array of array'"
    );
}
