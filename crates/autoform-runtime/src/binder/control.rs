//! Control contract shared by the standard and registered controls.

use std::fmt;

use autoform_schema::{FieldPath, NormalizedField, ValueError};
use serde_json::Value;
use smol_str::SmolStr;

use crate::binder::registry::WidgetKind;
use crate::binder::FieldWidgetBinder;
use crate::crud::CrudController;

/// Discrete user interaction delivered to a control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInput {
    /// Keystrokes. Text-like controls buffer them until `Commit` or `Blur`.
    Edit(String),
    /// Whole value picked by the user (dropdown choice, slider position).
    Set(Value),
    /// Flip a checkbox.
    Toggle,
    /// Append an item to a list.
    Insert(Value),
    /// Remove the list item at a position.
    Remove(usize),
    Commit,
    Blur,
    /// Drop buffered keystrokes.
    Cancel,
}

/// One form control bound to a field.
///
/// `handle` returns `Ok(Some(value))` when the input produced a committed
/// value that should be written to the store.
pub trait Control: fmt::Debug {
    fn kind(&self) -> &WidgetKind;

    fn field(&self) -> &NormalizedField;

    /// Absolute location of the field.
    fn path(&self) -> &FieldPath;

    /// Committed value currently displayed.
    fn value(&self) -> Value;

    /// Display `value` without validating it.
    fn set_value(&mut self, value: &Value);

    fn handle(&mut self, input: ControlInput) -> Result<Option<Value>, ValueError>;

    /// Whether buffered, uncommitted input exists.
    fn is_editing(&self) -> bool {
        false
    }

    fn pending(&self) -> Option<&str> {
        None
    }

    fn nested(&self) -> Option<&FieldWidgetBinder> {
        None
    }

    fn nested_mut(&mut self) -> Option<&mut FieldWidgetBinder> {
        None
    }

    fn grid(&self) -> Option<&CrudController> {
        None
    }

    fn grid_mut(&mut self) -> Option<&mut CrudController> {
        None
    }

    /// Renderer selected for the current value of a path control.
    fn renderer(&self) -> Option<SmolStr> {
        None
    }
}

pub(crate) fn unsupported(path: &FieldPath, input: &ControlInput) -> ValueError {
    ValueError::new(path.clone(), format!("control does not accept {input:?}"))
}
