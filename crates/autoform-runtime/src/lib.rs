//! `autoform-runtime` - headless forms and editable record grids.
//!
//! Built on the normalized schemas of `autoform-schema`:
//!
//! - **Store**: [`ValueStore`] holds the form value and validates every write
//! - **Binding**: [`FieldWidgetBinder`] keeps one [`Control`] per field, built through a [`ControlRegistry`]
//! - **Grids**: [`TabularCollectionEngine`] owns the records of a collection field, with stable row ids
//! - **CRUD**: [`CrudController`] runs add, edit, copy and delete over a grid, locally or through a [`DataHandler`]
//! - **Forms**: [`Form`] ties the pieces together and routes input by field path
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use autoform_runtime::{ControlInput, Form};
//! use autoform_schema::{FieldPath, SchemaIndex};
//!
//! let schema = SchemaIndex::parse(r#"{
//!     "type": "object",
//!     "properties": {
//!         "name": {"type": "string", "default": "pump"},
//!         "count": {"type": "integer", "default": 1}
//!     }
//! }"#).unwrap();
//! let mut form = Form::new(Arc::new(schema)).unwrap();
//! let count = FieldPath::from("count");
//! form.input(&count, ControlInput::Edit("4".into())).unwrap();
//! assert!(form.input(&count, ControlInput::Blur).unwrap());
//! assert_eq!(form.value()["count"], 4);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Field-to-control binding and the control registry.
pub mod binder;
/// Synchronous listener channels.
pub mod channel;
/// UI configuration.
pub mod config;
/// CRUD state machine over a grid.
pub mod crud;
/// Runtime errors.
pub mod error;
/// Form facade.
pub mod form;
/// Tabular collection engine.
pub mod grid;
/// Form value store.
pub mod store;

pub use binder::{Commit, Control, ControlInput, ControlRegistry, FieldWidgetBinder, WidgetKind};
pub use channel::SubscriptionId;
pub use config::{ButtonRole, CopyPlacement, CrudOptions, GridOptions, UiConfig, UiConfigOverlay};
pub use crud::{
    CommitOutcome, CrudController, CrudState, DataHandler, RowEditor, StatusLevel, StatusMessage,
    TriggerOutcome,
};
pub use error::{ConfigError, CrudError, FormError, HookError, SelectionError};
pub use form::Form;
pub use grid::{render_text, GridEvent, GridView, RowId, SortKey, TabularCollectionEngine};
pub use store::{ValueChange, ValueStore};
