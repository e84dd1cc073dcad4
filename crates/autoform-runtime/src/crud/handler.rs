//! Persistence hooks.

use serde_json::{Map, Value};

use crate::error::HookError;

/// External persistence for a collection.
///
/// When a handler is attached it is the source of truth: after every
/// successful mutation the engine reloads all records through
/// [`DataHandler::get_all`]. Hook failures are returned unchanged and never
/// retried.
pub trait DataHandler {
    fn get_all(&mut self) -> Result<Vec<Map<String, Value>>, HookError>;

    fn create(&mut self, record: &Map<String, Value>) -> Result<(), HookError>;

    /// Store `record` in place of `previous`.
    fn update(
        &mut self,
        previous: &Map<String, Value>,
        record: &Map<String, Value>,
    ) -> Result<(), HookError>;

    fn delete(&mut self, record: &Map<String, Value>) -> Result<(), HookError>;

    fn copy(&mut self, record: &Map<String, Value>) -> Result<(), HookError>;
}
