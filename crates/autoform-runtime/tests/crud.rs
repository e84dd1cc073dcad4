mod common;

use autoform_runtime::binder::{ControlInput, FieldWidgetBinder};
use autoform_runtime::config::{ButtonRole, CopyPlacement, CrudOptions};
use autoform_runtime::crud::{
    CommitOutcome, CopyToBeginning, CrudController, CrudState, RowEditor, StatusLevel,
    TriggerOutcome,
};
use autoform_runtime::error::{CrudError, SelectionError};
use autoform_runtime::grid::RowId;
use autoform_schema::{FieldPath, ValueError};
use serde_json::{json, Value};

use common::{controller, controller_for, names, unfinished, MemoryHandler};

fn two_people() -> Value {
    json!([{"name": "ann", "age": 31}, {"name": "bob", "age": 42}])
}

fn editor(crud: &mut CrudController) -> &mut FieldWidgetBinder {
    crud.editor_mut().expect("editor is open")
}

fn type_into(crud: &mut CrudController, field: &str, text: &str) {
    let path = FieldPath::from(field);
    let binder = editor(crud);
    binder
        .input(&path, ControlInput::Edit(text.to_string()))
        .expect("edit");
    binder.input(&path, ControlInput::Blur).expect("blur");
}

fn status(crud: &CrudController) -> Option<&str> {
    crud.status().map(|status| status.text.as_str())
}

#[test]
fn edit_with_two_rows_selected_is_declined() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0, 1]);

    let outcome = crud.edit().expect("edit");

    assert_eq!(
        outcome,
        TriggerOutcome::Declined(SelectionError::ExactlyOne { selected: 2 })
    );
    assert_eq!(crud.state(), &CrudState::Idle);
    assert_eq!(status(&crud), Some("select exactly one row"));
    assert_eq!(crud.status().map(|status| status.level), Some(StatusLevel::Warning));
}

#[test]
fn copy_and_delete_need_a_selection() {
    let mut crud = controller(two_people(), CrudOptions::default());
    assert_eq!(
        crud.copy().expect("copy"),
        TriggerOutcome::Declined(SelectionError::AtLeastOne)
    );
    assert_eq!(
        crud.delete().expect("delete"),
        TriggerOutcome::Declined(SelectionError::AtLeastOne)
    );
    assert_eq!(status(&crud), Some("select at least one row"));
    assert_eq!(crud.grid().len(), 2);
}

#[test]
fn add_appends_the_edited_row_and_reopens_blank() {
    let mut crud = controller(two_people(), CrudOptions::default());

    assert_eq!(crud.add().expect("add"), TriggerOutcome::Opened);
    assert_eq!(crud.add().expect("add again"), TriggerOutcome::AlreadyOpen);
    assert_eq!(
        RowEditor::value(editor(&mut crud)),
        json!({"name": "", "age": 0})
    );
    type_into(&mut crud, "name", "cy");
    type_into(&mut crud, "age", "7");
    assert!(crud.unsaved_changes());

    crud.save().expect("save");

    assert_eq!(names(&crud), ["ann", "bob", "cy"]);
    assert_eq!(crud.grid().records()[2]["age"], json!(7));
    assert_eq!(status(&crud), Some("added row"));
    assert_eq!(crud.state(), &CrudState::Adding);
    assert_eq!(RowEditor::value(editor(&mut crud))["name"], json!(""));
    assert!(!crud.unsaved_changes());
}

#[test]
fn close_on_action_returns_to_idle() {
    let options = CrudOptions {
        close_on_action: true,
        ..CrudOptions::default()
    };
    let mut crud = controller(two_people(), options);
    crud.add().expect("add");
    type_into(&mut crud, "name", "cy");
    crud.save().expect("save");
    assert_eq!(crud.state(), &CrudState::Idle);
    assert_eq!(crud.grid().len(), 3);
}

#[test]
fn edit_replaces_the_row_in_place() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[1]);
    let id = crud.grid().selected_ids()[0];

    assert_eq!(crud.edit().expect("edit"), TriggerOutcome::Opened);
    assert_eq!(crud.state(), &CrudState::Editing { id });
    assert_eq!(RowEditor::value(editor(&mut crud))["name"], json!("bob"));
    editor(&mut crud)
        .input(&FieldPath::from("age"), ControlInput::Set(json!(43)))
        .expect("set age");
    crud.save().expect("save");

    assert_eq!(crud.grid().record(id).expect("row")["age"], json!(43));
    assert_eq!(crud.grid().position_of(id), Some(1));
    assert_eq!(status(&crud), Some("saved row"));
    assert_eq!(crud.state(), &CrudState::Editing { id });
}

#[test]
fn revert_discards_edits_without_touching_records() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0]);
    crud.edit().expect("edit");
    type_into(&mut crud, "name", "changed");
    assert!(crud.unsaved_changes());

    crud.revert();

    assert_eq!(crud.state(), &CrudState::Idle);
    assert_eq!(names(&crud), ["ann", "bob"]);
    assert_eq!(RowEditor::value(editor(&mut crud))["name"], json!("ann"));
    crud.revert();
    assert_eq!(crud.state(), &CrudState::Idle);
}

#[test]
fn switching_actions_reverts_the_open_editor() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0]);
    crud.edit().expect("edit");
    type_into(&mut crud, "name", "changed");

    assert_eq!(crud.add().expect("add"), TriggerOutcome::Opened);

    assert_eq!(crud.state(), &CrudState::Adding);
    assert_eq!(names(&crud), ["ann", "bob"]);
    assert_eq!(RowEditor::value(editor(&mut crud))["name"], json!(""));
}

#[test]
fn selecting_another_row_retargets_the_editor() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0]);
    crud.edit().expect("edit");
    type_into(&mut crud, "name", "unsaved");

    crud.select_indexes(&[1]);

    let id = crud.grid().selected_ids()[0];
    assert_eq!(crud.state(), &CrudState::Editing { id });
    assert_eq!(RowEditor::value(editor(&mut crud))["name"], json!("bob"));
    assert_eq!(names(&crud), ["ann", "bob"]);
}

#[test]
fn only_one_action_is_open_at_a_time() {
    let options = CrudOptions {
        warn_on_delete: true,
        show_copy_dialogue: true,
        ..CrudOptions::default()
    };
    let mut crud = controller(two_people(), options);
    crud.select_indexes(&[0]);

    assert_eq!(crud.copy().expect("copy"), TriggerOutcome::Opened);
    assert!(matches!(crud.state(), CrudState::Copying { .. }));
    assert_eq!(crud.delete().expect("delete"), TriggerOutcome::Opened);
    assert!(matches!(crud.state(), CrudState::ConfirmingDelete { .. }));

    let bar = crud.button_bar();
    let roles: Vec<&str> = bar.iter().map(|button| button.role.as_str()).collect();
    assert_eq!(
        roles,
        ["add", "edit", "copy", "delete", "confirm_delete", "revert"]
    );
    let active: Vec<ButtonRole> = bar
        .iter()
        .filter(|button| button.active)
        .map(|button| button.role)
        .collect();
    assert_eq!(active, [ButtonRole::Delete]);
    assert_eq!(crud.confirm_copy().unwrap_err().to_string(), "no action is open");
}

#[test]
fn delete_confirmation_shows_the_selected_rows() {
    let options = CrudOptions {
        warn_on_delete: true,
        ..CrudOptions::default()
    };
    let mut crud = controller(two_people(), options);
    crud.select_indexes(&[0, 1]);

    assert_eq!(crud.delete().expect("delete"), TriggerOutcome::Opened);
    let preview: Vec<Value> = crud
        .delete_preview()
        .into_iter()
        .map(|(_, record)| Value::Object(record))
        .collect();
    assert_eq!(
        preview,
        [json!({"name": "ann", "age": 31}), json!({"name": "bob", "age": 42})]
    );
    assert_eq!(crud.grid().len(), 2);

    crud.confirm_delete().expect("confirm");

    assert!(crud.grid().is_empty());
    assert_eq!(crud.state(), &CrudState::Idle);
    assert_eq!(status(&crud), Some("deleted rows"));
}

#[test]
fn delete_without_warning_commits_immediately() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0]);
    assert_eq!(crud.delete().expect("delete"), TriggerOutcome::Completed);
    assert_eq!(names(&crud), ["bob"]);
    assert_eq!(crud.state(), &CrudState::Idle);
}

#[test]
fn copy_appends_duplicates_with_fresh_ids() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.select_indexes(&[0]);
    let original = crud.grid().selected_ids()[0];

    assert_eq!(crud.copy().expect("copy"), TriggerOutcome::Completed);

    assert_eq!(names(&crud), ["ann", "bob", "ann"]);
    let copy = crud.grid().rows()[2].id;
    assert_ne!(copy, original);
    assert_eq!(status(&crud), Some("copied data"));
}

#[test]
fn copy_position_follows_the_policy() {
    let options = CrudOptions {
        copy_placement: CopyPlacement::Beginning,
        ..CrudOptions::default()
    };
    let mut crud = controller(two_people(), options);
    crud.select_indexes(&[1]);
    crud.copy().expect("copy");
    assert_eq!(names(&crud), ["bob", "ann", "bob"]);

    let mut crud = controller(two_people(), CrudOptions::default()).with_copy_policy(CopyToBeginning);
    crud.select_indexes(&[1]);
    crud.copy().expect("copy");
    assert_eq!(names(&crud), ["bob", "ann", "bob"]);
}

#[test]
fn copy_dialogue_waits_for_confirmation() {
    let options = CrudOptions {
        show_copy_dialogue: true,
        ..CrudOptions::default()
    };
    let mut crud = controller(two_people(), options);
    crud.select_indexes(&[0, 1]);
    crud.copy().expect("copy");
    assert_eq!(crud.grid().len(), 2);

    crud.confirm_copy().expect("confirm");

    assert_eq!(names(&crud), ["ann", "bob", "ann", "bob"]);
    assert!(matches!(crud.state(), CrudState::Copying { ids } if ids.len() == 2));
}

#[test]
fn handler_is_the_source_of_truth() {
    let handler = MemoryHandler::new(json!([{"name": "dee", "age": 5}]));
    let calls = handler.calls.clone();
    let stored = handler.rows.clone();
    let mut crud = controller(two_people(), CrudOptions::default()).with_handler(handler);
    crud.reload().expect("reload");
    assert_eq!(names(&crud), ["dee"]);

    crud.add().expect("add");
    type_into(&mut crud, "name", "eve");
    crud.save().expect("save");

    assert_eq!(names(&crud), ["dee", "eve"]);
    assert_eq!(stored.borrow().len(), 2);
    assert_eq!(*calls.borrow(), ["get_all", "create", "get_all"]);

    crud.select_indexes(&[0]);
    crud.edit().expect("edit");
    type_into(&mut crud, "age", "6");
    crud.save().expect("save");
    assert_eq!(stored.borrow()[0]["age"], json!(6));
    assert_eq!(crud.grid().records()[0]["age"], json!(6));
}

#[test]
fn failed_hook_leaves_records_and_state_untouched() {
    let handler = MemoryHandler::new(two_people()).failing_on("create");
    let mut crud = controller(two_people(), CrudOptions::default()).with_handler(handler);
    crud.add().expect("add");
    type_into(&mut crud, "name", "cy");

    let err = crud.save().unwrap_err();

    assert!(matches!(err, CrudError::Persistence(_)));
    assert_eq!(err.to_string(), "persistence hook failed: create failed: disk full");
    assert_eq!(names(&crud), ["ann", "bob"]);
    assert_eq!(crud.state(), &CrudState::Adding);
    assert!(!crud.is_committing());
    assert_eq!(crud.status().map(|status| status.level), Some(StatusLevel::Warning));
}

#[test]
fn actions_are_rejected_while_a_commit_is_pending() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.add().expect("add");
    type_into(&mut crud, "name", "cy");
    let pending = crud.begin_commit().expect("begin");

    assert!(matches!(crud.add(), Err(CrudError::Busy)));
    assert!(matches!(crud.save(), Err(CrudError::Busy)));
    assert!(crud.button_bar().iter().all(|button| !button.enabled));

    crud.complete_commit(pending, CommitOutcome::Local).expect("complete");
    assert_eq!(names(&crud), ["ann", "bob", "cy"]);
    assert!(crud.add().is_ok());
}

#[test]
fn revert_waits_for_a_pending_commit() {
    let mut crud = controller(two_people(), CrudOptions::default());
    crud.add().expect("add");
    type_into(&mut crud, "name", "cy");
    let pending = crud.begin_commit().expect("begin");

    crud.revert();
    assert_eq!(crud.state(), &CrudState::Adding);

    crud.complete_commit(pending, CommitOutcome::Local).expect("complete");
    assert_eq!(names(&crud), ["ann", "bob", "cy"]);
    crud.revert();
    assert_eq!(crud.state(), &CrudState::Idle);
    assert_eq!(crud.grid().len(), 3);
}

#[test]
fn edit_opens_rows_with_missing_values() {
    let mut crud = controller_for(unfinished(), json!([{"floater": 2.0}]), CrudOptions::default());
    assert_eq!(crud.grid().records()[0]["string"], Value::Null);
    crud.select_indexes(&[0]);

    assert_eq!(crud.edit().expect("edit"), TriggerOutcome::Opened);

    assert!(matches!(crud.state(), CrudState::Editing { .. }));
    assert_eq!(crud.status().map(|status| status.level), Some(StatusLevel::Warning));
    let err = editor(&mut crud)
        .field_error(&FieldPath::from("string"))
        .expect("field error")
        .clone();
    assert_eq!(err.message, "null is not allowed");

    type_into(&mut crud, "string", "fixed");
    crud.save().expect("save");
    let records = crud.grid().records();
    assert_eq!(records[0]["string"], json!("fixed"));
    assert_eq!(records[0]["floater"], json!(2.0));
}

#[test]
fn copy_duplicates_rows_as_stored() {
    let mut crud = controller_for(unfinished(), json!([{"floater": 2.0}]), CrudOptions::default());
    crud.select_indexes(&[0]);

    assert_eq!(crud.copy().expect("copy"), TriggerOutcome::Completed);

    let records = crud.grid().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1], records[0]);
    assert_eq!(records[1]["string"], Value::Null);
    assert_ne!(crud.grid().rows()[1].id, crud.grid().rows()[0].id);
}

#[test]
fn transposed_editor_follows_the_visible_columns() {
    let mut crud = controller_for(
        common::sectioned(),
        json!([{"string": "x", "floater": 2.0, "inty": 3}]),
        CrudOptions::default(),
    );
    crud.grid_mut()
        .set_visible_columns(Some(&["inty", "string"][..]))
        .expect("columns");
    crud.select_indexes(&[0]);
    crud.edit().expect("edit");
    assert_eq!(editor(&mut crud).order(), ["string", "floater", "inty"]);

    crud.revert();
    crud.grid_mut().set_transposed(true);
    crud.edit().expect("edit");
    assert_eq!(editor(&mut crud).order(), ["string", "inty"]);
}

#[test]
fn save_without_an_open_editor_is_an_error() {
    let mut crud = controller(two_people(), CrudOptions::default());
    assert!(matches!(crud.save(), Err(CrudError::NotActive)));
    assert!(matches!(crud.confirm_delete(), Err(CrudError::NotActive)));
}

/// Editor that stores whatever it is given.
#[derive(Debug, Default)]
struct RawEditor {
    value: Value,
    baseline: Value,
}

impl RowEditor for RawEditor {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: &Value) -> Result<(), ValueError> {
        self.value = value.clone();
        Ok(())
    }

    fn render_order(&mut self, _names: &[&str]) -> Result<(), ValueError> {
        Ok(())
    }

    fn reset_baseline(&mut self) {
        self.baseline = self.value.clone();
    }

    fn unsaved_changes(&self) -> bool {
        self.value != self.baseline
    }

    fn revert(&mut self) {
        self.value = self.baseline.clone();
    }
}

#[test]
fn rejected_row_keeps_the_editor_open() {
    let engine = common::engine(common::people(), two_people());
    let mut crud = CrudController::new(engine, CrudOptions::default(), |_| Ok(RawEditor::default()));
    crud.add().expect("add");
    crud.editor_mut().expect("editor").value = json!({"name": 5, "age": 1});

    let err = crud.save().unwrap_err();

    let CrudError::Value(err) = err else {
        panic!("expected a value error, got {err:?}");
    };
    assert_eq!(err.path.to_string(), "name");
    assert_eq!(crud.state(), &CrudState::Adding);
    assert_eq!(crud.grid().len(), 2);
    assert!(crud.grid().record(RowId(0)).is_some());
}
