#![no_main]

use autoform_schema::SchemaIndex;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

const SCHEMA: &str = r#"{
    "title": "Fuzz",
    "type": "object",
    "properties": {
        "name": {"type": "string", "default": ""},
        "level": {"type": "integer", "minimum": 0, "maximum": 10},
        "mode": {"type": "string", "enum": ["a", "b"]},
        "rows": {
            "type": "array",
            "maxItems": 4,
            "items": {"$ref": "#/$defs/Row"}
        }
    },
    "$defs": {
        "Row": {
            "type": "object",
            "properties": {
                "x": {"type": "number", "default": 0},
                "child": {"$ref": "#/$defs/Row"}
            }
        }
    }
}"#;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Ok(index) = SchemaIndex::parse(SCHEMA) else {
        return;
    };
    if let Ok(conformed) = index.conform(&value) {
        assert_eq!(index.conform(&conformed).as_ref(), Ok(&conformed));
    }
});
