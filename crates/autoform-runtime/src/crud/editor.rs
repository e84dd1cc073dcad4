//! Row editor contract.

use autoform_schema::ValueError;
use serde_json::Value;

/// Row editor driven by the CRUD controller.
pub trait RowEditor {
    /// Current record value.
    fn value(&self) -> Value;

    /// Display `value`. A value that does not conform is still displayed,
    /// with its error, so the user can correct it.
    fn set_value(&mut self, value: &Value) -> Result<(), ValueError>;

    /// Show only `names`, in that order.
    fn render_order(&mut self, names: &[&str]) -> Result<(), ValueError>;

    /// Take the current value as the pre-open content.
    fn reset_baseline(&mut self);

    /// Whether the value differs from the pre-open content.
    fn unsaved_changes(&self) -> bool;

    /// Restore the pre-open content.
    fn revert(&mut self);
}
