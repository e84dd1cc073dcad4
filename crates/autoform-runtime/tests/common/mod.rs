#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use autoform_runtime::binder::ControlRegistry;
use autoform_runtime::config::{CrudOptions, UiConfig};
use autoform_runtime::crud::{CrudController, DataHandler};
use autoform_runtime::error::HookError;
use autoform_runtime::grid::TabularCollectionEngine;
use autoform_schema::{GridSchema, SchemaIndex};
use serde_json::{json, Map, Value};

pub type Record = Map<String, Value>;

pub fn index(schema: Value) -> Arc<SchemaIndex> {
    Arc::new(SchemaIndex::from_value(schema).expect("schema normalizes"))
}

/// Root collection of people with a name and an age.
pub fn people() -> Value {
    json!({
        "title": "People",
        "type": "array",
        "format": "dataframe",
        "items": {"$ref": "#/definitions/Person"},
        "definitions": {
            "Person": {
                "title": "Person",
                "type": "object",
                "properties": {
                    "name": {"title": "Name", "type": "string", "default": ""},
                    "age": {"title": "Age", "type": "integer", "default": 0}
                }
            }
        }
    })
}

/// Root collection whose fields are grouped into sections.
pub fn sectioned() -> Value {
    json!({
        "title": "Readings",
        "type": "array",
        "format": "dataframe",
        "items": {
            "title": "Reading",
            "type": "object",
            "properties": {
                "string": {"title": "String", "type": "string", "default": "", "section": "a"},
                "floater": {
                    "title": "Floater",
                    "type": "number",
                    "default": 1.5,
                    "aui_sig_fig": 3,
                    "section": "b"
                },
                "inty": {"title": "Inty", "type": "integer", "default": 1, "section": "b"}
            }
        }
    })
}

/// Root collection with a field that has no default, so loaded rows can hold
/// nulls the row schema rejects.
pub fn unfinished() -> Value {
    json!({
        "type": "array",
        "format": "dataframe",
        "items": {
            "type": "object",
            "properties": {
                "string": {"type": "string", "section": "a"},
                "floater": {"type": "number", "default": 1.5, "section": "b"},
                "inty": {"type": "integer", "default": 1, "section": "b"}
            }
        }
    })
}

pub fn records(value: Value) -> Vec<Record> {
    value
        .as_array()
        .expect("list of records")
        .iter()
        .map(|row| row.as_object().expect("record").clone())
        .collect()
}

pub fn engine(schema: Value, rows: Value) -> TabularCollectionEngine {
    let mut engine = TabularCollectionEngine::new(GridSchema::from_root(index(schema)).expect("root grid"));
    engine.load(records(rows));
    engine
}

pub fn controller(rows: Value, crud: CrudOptions) -> CrudController {
    controller_for(people(), rows, crud)
}

pub fn controller_for(schema: Value, rows: Value, crud: CrudOptions) -> CrudController {
    let config = UiConfig {
        crud,
        ..UiConfig::default()
    };
    CrudController::with_binder(engine(schema, rows), &config, &ControlRegistry::standard())
}

pub fn names(crud: &CrudController) -> Vec<String> {
    crud.grid()
        .records()
        .iter()
        .map(|record| record["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// In-memory persistence that records every hook call.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandler {
    pub rows: Rc<RefCell<Vec<Record>>>,
    pub calls: Rc<RefCell<Vec<&'static str>>>,
    pub fail_on: Option<&'static str>,
}

impl MemoryHandler {
    pub fn new(rows: Value) -> Self {
        Self {
            rows: Rc::new(RefCell::new(records(rows))),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, hook: &'static str) -> Self {
        self.fail_on = Some(hook);
        self
    }

    fn call(&self, hook: &'static str) -> Result<(), HookError> {
        self.calls.borrow_mut().push(hook);
        if self.fail_on == Some(hook) {
            return Err(format!("{hook} failed: disk full").into());
        }
        Ok(())
    }
}

impl DataHandler for MemoryHandler {
    fn get_all(&mut self) -> Result<Vec<Record>, HookError> {
        self.call("get_all")?;
        Ok(self.rows.borrow().clone())
    }

    fn create(&mut self, record: &Record) -> Result<(), HookError> {
        self.call("create")?;
        self.rows.borrow_mut().push(record.clone());
        Ok(())
    }

    fn update(&mut self, previous: &Record, record: &Record) -> Result<(), HookError> {
        self.call("update")?;
        let mut rows = self.rows.borrow_mut();
        let slot = rows
            .iter_mut()
            .find(|row| *row == previous)
            .ok_or("no such record")?;
        slot.clone_from(record);
        Ok(())
    }

    fn delete(&mut self, record: &Record) -> Result<(), HookError> {
        self.call("delete")?;
        let mut rows = self.rows.borrow_mut();
        let position = rows
            .iter()
            .position(|row| row == record)
            .ok_or("no such record")?;
        rows.remove(position);
        Ok(())
    }

    fn copy(&mut self, record: &Record) -> Result<(), HookError> {
        self.call("copy")?;
        self.rows.borrow_mut().push(record.clone());
        Ok(())
    }
}
