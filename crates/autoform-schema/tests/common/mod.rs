#![allow(dead_code)]

use std::sync::Arc;

use autoform_schema::{GridSchema, SchemaIndex};
use serde_json::{json, Value};

pub fn index(schema: Value) -> Arc<SchemaIndex> {
    Arc::new(SchemaIndex::from_value(schema).expect("schema normalizes"))
}

pub fn root_grid(schema: Value) -> GridSchema {
    GridSchema::from_root(index(schema)).expect("root collection")
}

/// Root collection of `properties` rows, shaped like a pydantic `__root__` list model.
pub fn dataframe(properties: Value, default: Option<Value>) -> Value {
    let mut root = json!({
        "title": "TestGridSchema",
        "type": "array",
        "format": "dataframe",
        "items": {"$ref": "#/definitions/TestProperties"},
        "definitions": {
            "TestProperties": {
                "title": "TestProperties",
                "type": "object",
                "properties": properties
            }
        }
    });
    if let Some(default) = default {
        root["default"] = default;
    }
    root
}

pub fn sectioned_properties() -> Value {
    json!({
        "string": {"title": "String", "type": "string", "column_width": 100, "section": "a"},
        "floater": {
            "title": "Floater",
            "type": "number",
            "default": 1.5,
            "column_width": 70,
            "aui_sig_fig": 3,
            "section": "b"
        },
        "inty": {"title": "Inty", "type": "integer", "default": 1, "section": "b"}
    })
}
