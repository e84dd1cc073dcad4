//! Schema and value errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use crate::path::FieldPath;

/// Malformed or inconsistent schema declaration. Fatal to form construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Input is not a schema document.
    #[error("invalid schema document: {0}")]
    InvalidDocument(SmolStr),

    /// `$ref` target is missing or uses an unsupported pointer form.
    #[error("unresolved reference '{0}'")]
    UnresolvedRef(SmolStr),

    /// Chain of `$ref` aliases is cyclic or too long.
    #[error("reference chain through '{0}' exceeds {limit} hops", limit = crate::MAX_REF_DEPTH)]
    RefDepth(SmolStr),

    /// Inline object nesting is too deep.
    #[error("schema nesting exceeds {limit} levels at '{path}'")]
    NestingDepth { path: FieldPath, limit: usize },

    /// Field type cannot be mapped onto a field kind.
    #[error("field '{path}' has unsupported type '{ty}'")]
    UnsupportedType { path: FieldPath, ty: SmolStr },

    /// A tabular format was requested on a value that is not list-like.
    #[error("tabular format requested at '{0}' but the value is not a list")]
    NotListLike(FieldPath),

    /// Collection items must be records.
    #[error("collection at '{0}' does not hold records")]
    ItemsNotRecord(FieldPath),

    /// Two-level index requested over fields without section metadata.
    #[error("multi-level index requested at '{0}' but no row field declares a section")]
    MissingSections(FieldPath),

    /// Unknown index naming scheme.
    #[error("invalid index name at '{path}': {name}")]
    InvalidIndexName { path: FieldPath, name: SmolStr },

    /// Titles must be unique inside one collection index.
    #[error("duplicate column title '{title}' at '{path}'")]
    DuplicateTitle { path: FieldPath, title: SmolStr },

    /// Field name collides with an engine-owned synthetic column.
    #[error("field name '{name}' at '{path}' is reserved")]
    ReservedName { path: FieldPath, name: SmolStr },

    /// Explicit `order` lists a field that does not exist.
    #[error("order at '{path}' names unknown field '{name}'")]
    UnknownOrderField { path: FieldPath, name: SmolStr },

    /// Path does not lead to a field.
    #[error("no field at '{0}'")]
    UnknownField(FieldPath),

    /// Path does not lead to a collection field.
    #[error("field '{0}' is not a collection")]
    NotACollection(FieldPath),
}

/// Value failing schema conformance. Names the offending field path.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {message}")]
pub struct ValueError {
    pub path: FieldPath,
    pub message: String,
}

impl ValueError {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}
