//! Add, edit, copy and delete over a tabular collection.
//!
//! At most one action is open at a time. Opening another action reverts the
//! open editor first, and `revert` is the only way back to idle without a
//! commit. Commits run in two phases ([`CrudController::begin_commit`] and
//! [`CrudController::complete_commit`]) so that an embedder running
//! persistence hooks elsewhere keeps the controller locked until the hooks
//! resolve.

#![allow(missing_docs)]

mod editor;
mod handler;
mod policy;

use std::fmt;
use std::sync::Arc;

use autoform_schema::{FieldPath, GridSchema, SchemaError, ValueError};
use serde_json::{Map, Value};
use smol_str::SmolStr;

pub use editor::RowEditor;
pub use handler::DataHandler;
pub use policy::{CopyPolicy, CopyToBeginning, CopyToEnd};

use crate::binder::{ControlRegistry, FieldWidgetBinder};
use crate::config::{ButtonRole, ButtonStyles, CrudOptions, StylePreset, UiConfig};
use crate::error::{CrudError, HookError, SelectionError};
use crate::grid::{RowId, TabularCollectionEngine};

type Record = Map<String, Value>;

pub type EditorFactory<E> = Box<dyn Fn(&GridSchema) -> Result<E, SchemaError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudAction {
    Add,
    Edit,
    Copy,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudState {
    Idle,
    Adding,
    Editing { id: RowId },
    Copying { ids: Vec<RowId> },
    ConfirmingDelete { ids: Vec<RowId> },
}

impl CrudState {
    #[must_use]
    pub fn action(&self) -> Option<CrudAction> {
        match self {
            Self::Idle => None,
            Self::Adding => Some(CrudAction::Add),
            Self::Editing { .. } => Some(CrudAction::Edit),
            Self::Copying { .. } => Some(CrudAction::Copy),
            Self::ConfirmingDelete { .. } => Some(CrudAction::Delete),
        }
    }

    fn has_editor(&self) -> bool {
        matches!(self, Self::Adding | Self::Editing { .. })
    }
}

/// Result of an add, edit, copy or delete trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The action is now open.
    Opened,
    /// The action was already open; nothing changed.
    AlreadyOpen,
    /// The action was committed straight away.
    Completed,
    /// The selection does not suit the action; nothing changed.
    Declined(SelectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
}

/// Advisory message shown next to the button bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: SmolStr,
}

impl StatusMessage {
    fn info(text: &str) -> Self {
        Self {
            level: StatusLevel::Info,
            text: SmolStr::new(text),
        }
    }

    fn warning(text: impl Into<SmolStr>) -> Self {
        Self {
            level: StatusLevel::Warning,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonDescriptor {
    pub role: ButtonRole,
    pub preset: StylePreset,
    /// The button's action is open.
    pub active: bool,
    pub enabled: bool,
}

/// Mutation validated by [`CrudController::begin_commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOp {
    Create {
        record: Record,
    },
    Update {
        id: RowId,
        previous: Record,
        record: Record,
    },
    Copy {
        ids: Vec<RowId>,
        records: Vec<Record>,
        position: usize,
    },
    Delete {
        ids: Vec<RowId>,
        records: Vec<Record>,
    },
}

impl CommitOp {
    fn message(&self) -> &'static str {
        match self {
            Self::Create { .. } => "added row",
            Self::Update { .. } => "saved row",
            Self::Copy { .. } => "copied data",
            Self::Delete { .. } => "deleted rows",
        }
    }
}

/// A commit that has been validated but not yet applied.
#[derive(Debug)]
pub struct PendingCommit {
    op: CommitOp,
}

impl PendingCommit {
    #[must_use]
    pub fn op(&self) -> &CommitOp {
        &self.op
    }
}

/// How a pending commit resolved.
#[derive(Debug)]
pub enum CommitOutcome {
    /// No persistence: apply the mutation to the local records.
    Local,
    /// Hooks succeeded; these are the reloaded records.
    Reloaded(Vec<Record>),
    /// A hook failed; the records stay as they were.
    Failed(HookError),
}

pub struct CrudController<E: RowEditor = FieldWidgetBinder> {
    grid: TabularCollectionEngine,
    editor: Option<E>,
    factory: EditorFactory<E>,
    options: CrudOptions,
    copy_policy: Box<dyn CopyPolicy>,
    handler: Option<Box<dyn DataHandler>>,
    state: CrudState,
    status: Option<StatusMessage>,
    committing: bool,
    styles: ButtonStyles,
}

impl CrudController<FieldWidgetBinder> {
    /// Controller whose row editor is a [`FieldWidgetBinder`] over the row record.
    #[must_use]
    pub fn with_binder(
        grid: TabularCollectionEngine,
        config: &UiConfig,
        registry: &ControlRegistry,
    ) -> Self {
        let registry = registry.clone();
        let editor_config = config.clone();
        Self::new(grid, config.crud, move |schema: &GridSchema| {
            FieldWidgetBinder::new(
                Arc::clone(schema.schema()),
                Arc::clone(schema.record()),
                schema.path().clone(),
                &registry,
                &editor_config,
                &schema.blank_record(),
            )
        })
        .with_styles(config.styles.clone())
    }
}

impl<E: RowEditor> CrudController<E> {
    /// The editor is built by `factory` the first time an action needs one.
    pub fn new(
        grid: TabularCollectionEngine,
        options: CrudOptions,
        factory: impl Fn(&GridSchema) -> Result<E, SchemaError> + 'static,
    ) -> Self {
        Self {
            grid,
            editor: None,
            factory: Box::new(factory),
            options,
            copy_policy: policy::policy_for(options.copy_placement),
            handler: None,
            state: CrudState::Idle,
            status: None,
            committing: false,
            styles: ButtonStyles::default(),
        }
    }

    /// Use `handler` as the source of truth for the records.
    #[must_use]
    pub fn with_handler(mut self, handler: impl DataHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn with_copy_policy(mut self, policy: impl CopyPolicy + 'static) -> Self {
        self.copy_policy = Box::new(policy);
        self
    }

    #[must_use]
    pub fn with_styles(mut self, styles: ButtonStyles) -> Self {
        self.styles = styles;
        self
    }

    #[must_use]
    pub fn grid(&self) -> &TabularCollectionEngine {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TabularCollectionEngine {
        &mut self.grid
    }

    #[must_use]
    pub fn state(&self) -> &CrudState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> CrudOptions {
        self.options
    }

    #[must_use]
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// The row editor, once an action has needed one.
    #[must_use]
    pub fn editor(&self) -> Option<&E> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut E> {
        self.editor.as_mut()
    }

    #[must_use]
    pub fn is_committing(&self) -> bool {
        self.committing
    }

    /// Whether the open editor differs from its pre-open content.
    #[must_use]
    pub fn unsaved_changes(&self) -> bool {
        self.state.has_editor() && self.editor.as_ref().is_some_and(RowEditor::unsaved_changes)
    }

    /// Reload every record from the attached handler.
    pub fn reload(&mut self) -> Result<(), CrudError> {
        let Some(handler) = self.handler.as_mut() else {
            return Ok(());
        };
        let records = handler.get_all().map_err(CrudError::Persistence)?;
        self.grid.load(records);
        Ok(())
    }

    pub fn add(&mut self) -> Result<TriggerOutcome, CrudError> {
        self.guard()?;
        if self.state == CrudState::Adding {
            return Ok(TriggerOutcome::AlreadyOpen);
        }
        self.leave_current();
        let blank = self.grid.schema().blank_record();
        self.open_editor(&blank)?;
        self.transition(CrudState::Adding);
        Ok(TriggerOutcome::Opened)
    }

    /// Edit the single selected row.
    pub fn edit(&mut self) -> Result<TriggerOutcome, CrudError> {
        self.guard()?;
        let selected = self.grid.selected_ids();
        let [id] = selected.as_slice() else {
            return Ok(self.decline(SelectionError::ExactlyOne {
                selected: selected.len(),
            }));
        };
        let id = *id;
        if self.state == (CrudState::Editing { id }) {
            return Ok(TriggerOutcome::AlreadyOpen);
        }
        self.leave_current();
        let record = Value::Object(self.grid.record(id).cloned().unwrap_or_default());
        self.open_editor(&record)?;
        self.transition(CrudState::Editing { id });
        Ok(TriggerOutcome::Opened)
    }

    /// Copy the selected rows, straight away or after `confirm_copy`.
    pub fn copy(&mut self) -> Result<TriggerOutcome, CrudError> {
        self.guard()?;
        let selected = self.grid.selected_ids();
        if selected.is_empty() {
            return Ok(self.decline(SelectionError::AtLeastOne));
        }
        if self.options.show_copy_dialogue {
            if matches!(&self.state, CrudState::Copying { ids } if *ids == selected) {
                return Ok(TriggerOutcome::AlreadyOpen);
            }
            self.leave_current();
            self.transition(CrudState::Copying { ids: selected });
            return Ok(TriggerOutcome::Opened);
        }
        self.leave_current();
        let op = self.copy_op(&selected);
        self.commit(op)?;
        Ok(TriggerOutcome::Completed)
    }

    /// Delete the selected rows, straight away or after `confirm_delete`.
    pub fn delete(&mut self) -> Result<TriggerOutcome, CrudError> {
        self.guard()?;
        let selected = self.grid.selected_ids();
        if selected.is_empty() {
            return Ok(self.decline(SelectionError::AtLeastOne));
        }
        if self.options.warn_on_delete {
            if matches!(&self.state, CrudState::ConfirmingDelete { ids } if *ids == selected) {
                return Ok(TriggerOutcome::AlreadyOpen);
            }
            self.leave_current();
            self.transition(CrudState::ConfirmingDelete { ids: selected });
            return Ok(TriggerOutcome::Opened);
        }
        self.leave_current();
        let op = self.delete_op(&selected);
        self.commit(op)?;
        Ok(TriggerOutcome::Completed)
    }

    /// Commit the open add or edit.
    pub fn save(&mut self) -> Result<(), CrudError> {
        if !self.state.has_editor() {
            return Err(CrudError::NotActive);
        }
        self.run_commit()
    }

    pub fn confirm_copy(&mut self) -> Result<(), CrudError> {
        if !matches!(self.state, CrudState::Copying { .. }) {
            return Err(CrudError::NotActive);
        }
        self.run_commit()
    }

    pub fn confirm_delete(&mut self) -> Result<(), CrudError> {
        if !matches!(self.state, CrudState::ConfirmingDelete { .. }) {
            return Err(CrudError::NotActive);
        }
        self.run_commit()
    }

    /// Discard the open action. A no-op when idle or while a commit is
    /// pending.
    pub fn revert(&mut self) {
        if self.state == CrudState::Idle {
            tracing::debug!(path = %self.grid.schema().path(), "revert while idle");
            return;
        }
        if self.committing {
            tracing::debug!(path = %self.grid.schema().path(), "revert while committing ignored");
            return;
        }
        self.leave_current();
    }

    /// Select rows by id and re-target the open action.
    pub fn select(&mut self, ids: impl IntoIterator<Item = RowId>) {
        self.grid.select(ids);
        self.retarget();
    }

    /// Select rows by collection position and re-target the open action.
    pub fn select_indexes(&mut self, positions: &[usize]) {
        self.grid.select_indexes(positions);
        self.retarget();
    }

    /// Rows awaiting delete confirmation, restricted to the visible fields.
    #[must_use]
    pub fn delete_preview(&self) -> Vec<(RowId, Record)> {
        match &self.state {
            CrudState::ConfirmingDelete { ids } => self.grid.records_for(ids, true),
            _ => Vec::new(),
        }
    }

    /// Buttons to display for the current state.
    #[must_use]
    pub fn button_bar(&self) -> Vec<ButtonDescriptor> {
        let active = self.state.action();
        let enabled = !self.committing;
        let mut bar: Vec<ButtonDescriptor> = [
            (ButtonRole::Add, CrudAction::Add),
            (ButtonRole::Edit, CrudAction::Edit),
            (ButtonRole::Copy, CrudAction::Copy),
            (ButtonRole::Delete, CrudAction::Delete),
        ]
        .into_iter()
        .map(|(role, action)| ButtonDescriptor {
            role,
            preset: self.styles.get(role),
            active: active == Some(action),
            enabled,
        })
        .collect();
        let dialogue = match &self.state {
            CrudState::Idle => None,
            CrudState::Adding | CrudState::Editing { .. } => Some(ButtonRole::Save),
            CrudState::Copying { .. } => Some(ButtonRole::ConfirmCopy),
            CrudState::ConfirmingDelete { .. } => Some(ButtonRole::ConfirmDelete),
        };
        if let Some(confirm) = dialogue {
            for role in [confirm, ButtonRole::Revert] {
                bar.push(ButtonDescriptor {
                    role,
                    preset: self.styles.get(role),
                    active: false,
                    enabled,
                });
            }
        }
        bar
    }

    /// Validate the open action and lock the controller until
    /// [`CrudController::complete_commit`].
    pub fn begin_commit(&mut self) -> Result<PendingCommit, CrudError> {
        self.guard()?;
        let op = match &self.state {
            CrudState::Idle => return Err(CrudError::NotActive),
            CrudState::Adding => CommitOp::Create {
                record: self.editor_record()?,
            },
            CrudState::Editing { id } => {
                let id = *id;
                let previous = self.grid.record(id).cloned().ok_or(CrudError::NotActive)?;
                CommitOp::Update {
                    id,
                    previous,
                    record: self.editor_record()?,
                }
            }
            CrudState::Copying { ids } => self.copy_op(ids),
            CrudState::ConfirmingDelete { ids } => self.delete_op(ids),
        };
        self.committing = true;
        Ok(PendingCommit { op })
    }

    /// Apply a pending commit once its hooks have resolved.
    ///
    /// A failed hook leaves the records and the open action untouched and is
    /// returned unchanged.
    pub fn complete_commit(
        &mut self,
        pending: PendingCommit,
        outcome: CommitOutcome,
    ) -> Result<(), CrudError> {
        self.committing = false;
        let PendingCommit { op } = pending;
        match outcome {
            CommitOutcome::Failed(err) => {
                tracing::warn!(path = %self.grid.schema().path(), %err, "persistence hook failed");
                self.status = Some(StatusMessage::warning(format!("action failed: {err}")));
                return Err(CrudError::Persistence(err));
            }
            CommitOutcome::Reloaded(records) => self.grid.load(records),
            CommitOutcome::Local => self.apply_locally(&op)?,
        }
        tracing::info!(path = %self.grid.schema().path(), action = op.message(), "committed");
        self.status = Some(StatusMessage::info(op.message()));
        self.after_commit();
        Ok(())
    }

    fn run_commit(&mut self) -> Result<(), CrudError> {
        let pending = self.begin_commit()?;
        let outcome = self.run_hooks(pending.op());
        self.complete_commit(pending, outcome)
    }

    fn commit(&mut self, op: CommitOp) -> Result<(), CrudError> {
        self.committing = true;
        let pending = PendingCommit { op };
        let outcome = self.run_hooks(pending.op());
        self.complete_commit(pending, outcome)
    }

    fn run_hooks(&mut self, op: &CommitOp) -> CommitOutcome {
        let Some(handler) = self.handler.as_mut() else {
            return CommitOutcome::Local;
        };
        match persist(handler.as_mut(), op) {
            Ok(records) => CommitOutcome::Reloaded(records),
            Err(err) => CommitOutcome::Failed(err),
        }
    }

    fn apply_locally(&mut self, op: &CommitOp) -> Result<(), CrudError> {
        match op {
            CommitOp::Create { record } => {
                self.grid.append(record)?;
            }
            CommitOp::Update { id, record, .. } => self.grid.replace(*id, record)?,
            CommitOp::Copy { ids, position, .. } => {
                self.grid.duplicate(ids, *position);
            }
            CommitOp::Delete { ids, .. } => {
                self.grid.remove(ids);
            }
        }
        Ok(())
    }

    /// Close the action, or reopen it with fresh content.
    fn after_commit(&mut self) {
        if self.state == CrudState::Idle {
            return;
        }
        if self.options.close_on_action {
            self.transition(CrudState::Idle);
            return;
        }
        let reopened = match &self.state {
            CrudState::Adding => {
                let blank = self.grid.schema().blank_record();
                self.open_editor(&blank).map(|()| CrudState::Adding)
            }
            CrudState::Editing { .. } => match self.grid.selected_ids().as_slice() {
                [id] => {
                    let id = *id;
                    let record = Value::Object(self.grid.record(id).cloned().unwrap_or_default());
                    self.open_editor(&record).map(|()| CrudState::Editing { id })
                }
                _ => Ok(CrudState::Idle),
            },
            CrudState::Copying { .. } => {
                let ids = self.grid.selected_ids();
                Ok(if ids.is_empty() {
                    CrudState::Idle
                } else {
                    CrudState::Copying { ids }
                })
            }
            CrudState::ConfirmingDelete { .. } | CrudState::Idle => Ok(CrudState::Idle),
        };
        match reopened {
            Ok(state) => self.transition(state),
            Err(err) => {
                tracing::warn!(%err, "could not reopen the editor");
                self.transition(CrudState::Idle);
            }
        }
    }

    fn retarget(&mut self) {
        let selected = self.grid.selected_ids();
        match &self.state {
            CrudState::Editing { id } => {
                let [next] = selected.as_slice() else {
                    return;
                };
                if next == id {
                    return;
                }
                let next = *next;
                let record = Value::Object(self.grid.record(next).cloned().unwrap_or_default());
                match self.open_editor(&record) {
                    Ok(()) => self.transition(CrudState::Editing { id: next }),
                    Err(err) => tracing::warn!(%err, "could not re-target the editor"),
                }
            }
            CrudState::Copying { .. } if selected.is_empty() => self.transition(CrudState::Idle),
            CrudState::Copying { .. } => self.transition(CrudState::Copying { ids: selected }),
            CrudState::ConfirmingDelete { .. } if selected.is_empty() => {
                self.transition(CrudState::Idle);
            }
            CrudState::ConfirmingDelete { .. } => {
                self.transition(CrudState::ConfirmingDelete { ids: selected });
            }
            CrudState::Idle | CrudState::Adding => {}
        }
    }

    fn guard(&self) -> Result<(), CrudError> {
        if self.committing {
            return Err(CrudError::Busy);
        }
        Ok(())
    }

    fn decline(&mut self, err: SelectionError) -> TriggerOutcome {
        tracing::debug!(path = %self.grid.schema().path(), %err, "action declined");
        self.status = Some(StatusMessage::warning(err.to_string()));
        TriggerOutcome::Declined(err)
    }

    /// Implicitly revert whatever is open and return to idle.
    fn leave_current(&mut self) {
        if self.state.has_editor() {
            if let Some(editor) = self.editor.as_mut() {
                editor.revert();
            }
        }
        self.transition(CrudState::Idle);
    }

    fn transition(&mut self, next: CrudState) {
        if self.state != next {
            tracing::debug!(
                path = %self.grid.schema().path(),
                from = ?self.state,
                to = ?next,
                "crud state changed"
            );
            self.state = next;
        }
    }

    fn open_editor(&mut self, value: &Value) -> Result<(), CrudError> {
        if self.editor.is_none() {
            let editor = (self.factory)(self.grid.schema())?;
            self.editor = Some(editor);
        }
        let Some(editor) = self.editor.as_mut() else {
            return Err(CrudError::NotActive);
        };
        let rejected = editor.set_value(value).err();
        editor.reset_baseline();
        let names = if self.grid.transposed() {
            self.grid.visible_fields()
        } else {
            self.grid.schema().record().field_names()
        };
        let names: Vec<&str> = names.iter().map(SmolStr::as_str).collect();
        editor.render_order(&names)?;
        if let Some(err) = rejected {
            tracing::warn!(%err, "editor opened on a row that needs correction");
            self.status = Some(StatusMessage::warning(err.to_string()));
        }
        Ok(())
    }

    fn editor_record(&self) -> Result<Record, CrudError> {
        let editor = self.editor.as_ref().ok_or(CrudError::NotActive)?;
        let value = self.grid.schema().conform_row(&editor.value()).inspect_err(|err| {
            tracing::warn!(%err, "row rejected");
        })?;
        match value {
            Value::Object(record) => Ok(record),
            _ => Err(CrudError::Value(ValueError::new(
                self.grid.schema().path().clone(),
                "row is not an object",
            ))),
        }
    }

    fn copy_op(&self, ids: &[RowId]) -> CommitOp {
        let records = ids
            .iter()
            .filter_map(|id| self.grid.record(*id).cloned())
            .collect();
        let positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.grid.position_of(*id))
            .collect();
        CommitOp::Copy {
            ids: ids.to_vec(),
            records,
            position: self.copy_policy.insertion_point(self.grid.len(), &positions),
        }
    }

    fn delete_op(&self, ids: &[RowId]) -> CommitOp {
        CommitOp::Delete {
            ids: ids.to_vec(),
            records: ids
                .iter()
                .filter_map(|id| self.grid.record(*id).cloned())
                .collect(),
        }
    }

    /// Location of the collection this controller edits.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        self.grid.schema().path()
    }
}

fn persist(handler: &mut dyn DataHandler, op: &CommitOp) -> Result<Vec<Record>, HookError> {
    match op {
        CommitOp::Create { record } => handler.create(record)?,
        CommitOp::Update {
            previous, record, ..
        } => handler.update(previous, record)?,
        CommitOp::Copy { records, .. } => {
            for record in records {
                handler.copy(record)?;
            }
        }
        CommitOp::Delete { records, .. } => {
            for record in records {
                handler.delete(record)?;
            }
        }
    }
    handler.get_all()
}

impl<E: RowEditor> fmt::Debug for CrudController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudController")
            .field("grid", &self.grid)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("committing", &self.committing)
            .field("persistent", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
