//! `autoform-schema` - record schemas normalized for form and grid generation.
//!
//! This crate turns a JSON Schema subset into a [`SchemaIndex`]:
//!
//! - **Normalization**: ordered [`NormalizedField`] lists with titles, kinds and display metadata
//! - **References**: `$ref` targets kept by name and resolved lazily, so recursive schemas stay finite
//! - **Grids**: [`GridSchema`] derives the (optionally two-level) column index of a collection field
//! - **Values**: defaults and conformance checks against the normalized fields
//!
//! # Example
//!
//! ```
//! use autoform_schema::{GridSchema, SchemaIndex};
//!
//! let index = SchemaIndex::parse(r#"{
//!     "type": "array",
//!     "format": "dataframe",
//!     "items": {
//!         "type": "object",
//!         "properties": {
//!             "string": {"type": "string", "default": "string"},
//!             "integer": {"type": "integer", "default": 1}
//!         }
//!     }
//! }"#).unwrap();
//! let grid = GridSchema::from_root(index.into()).unwrap();
//! assert!(!grid.is_multiindex());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod conform;
mod defaults;
/// Schema and value errors.
pub mod error;
/// Normalized fields and record schemas.
pub mod field;
/// Collection index derivation.
pub mod grid;
/// Schema index construction and lookup.
pub mod index;
/// Field paths.
pub mod path;
mod raw;
/// Materialized tables.
pub mod table;

pub use error::{SchemaError, ValueError};
pub use field::{Constraints, FieldKind, NormalizedField, RecordRef, RecordSchema, ScalarType};
pub use grid::{GridIndex, GridSchema, IndexKey, IndexLevels};
pub use index::SchemaIndex;
pub use path::{FieldPath, PathSegment};
pub use table::{ColumnLabel, FlatTable, Table, TableRow};

/// Maximum number of `$ref` hops followed while resolving one schema node.
pub const MAX_REF_DEPTH: usize = 32;

/// Maximum depth of inline (unnamed) nested records.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Field names owned by the grid engine for synthetic columns.
pub const RESERVED_NAMES: [&str; 4] = ["id", "position", "index", "ipydguuid"];
