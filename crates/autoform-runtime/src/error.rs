//! Runtime errors.

#![allow(missing_docs)]

use autoform_schema::{FieldPath, SchemaError, ValueError};
use smol_str::SmolStr;
use thiserror::Error;

/// Error raised by a persistence hook. Passed through unchanged.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// CRUD action invoked with an unsuitable selection. Advisory: the action is
/// simply not attempted, and the message is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("select exactly one row")]
    ExactlyOne { selected: usize },

    #[error("select at least one row")]
    AtLeastOne,
}

/// Failure of a CRUD commit.
#[derive(Debug, Error)]
pub enum CrudError {
    /// Editor value rejected by the row schema.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Persistence hook failed; records were left untouched.
    #[error("persistence hook failed: {0}")]
    Persistence(#[source] HookError),

    /// A previous commit has not resolved yet.
    #[error("another action is still being committed")]
    Busy,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Commit requested while no action is open.
    #[error("no action is open")]
    NotActive,
}

/// Failure surfaced by the form facade.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("no control at '{0}'")]
    UnknownField(FieldPath),

    #[error("field '{0}' is not a collection")]
    NotACollection(FieldPath),

    #[error(transparent)]
    Crud(#[from] CrudError),
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(SmolStr),

    #[error("parse error: {0}")]
    Parse(SmolStr),

    #[error("invalid option: {0}")]
    InvalidOption(SmolStr),
}
