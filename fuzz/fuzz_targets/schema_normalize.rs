#![no_main]

use autoform_schema::{GridSchema, SchemaIndex};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const MAX_SCHEMA_BYTES: usize = 8192;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_SCHEMA_BYTES)];
    let text = String::from_utf8_lossy(capped);
    let Ok(index) = SchemaIndex::parse(&text) else {
        return;
    };
    let index = Arc::new(index);
    let _ = index.default_value();
    if let Ok(grid) = GridSchema::from_root(index) {
        let _ = grid.default_table();
        let _ = grid.blank_record();
    }
});
