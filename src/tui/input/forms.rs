use crossterm::event::{KeyCode, KeyEvent};

use crate::model::{ProjectMetadata, TaskFields, TaskMetadata};
use crate::ops::fields::{
    ValidationError, parse_due, parse_list, parse_priority, parse_title,
};
use crate::ops::labels::disallowed_labels;
use crate::service::{ProjectInput, TaskInput};
use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{
    FormField, InspectorOrigin, Mode, PickTarget, ProjectField, ProjectFormState, RenameState,
    TaskForm,
};
use crate::tui::undo::{ActionSet, HistoryStep};

use super::actions::{
    open_due_picker, open_inspector, open_label_picker, open_resource_picker, submit_set,
};
use super::is_ctrl;

fn form_mode(form: TaskForm) -> Mode {
    if form.is_edit() {
        Mode::EditTask(form)
    } else {
        Mode::AddTask(form)
    }
}

/// Add-task and edit-task share one handler
pub(super) fn handle_task_form(app: &mut App, mut form: TaskForm, key: KeyEvent) -> Vec<Request> {
    if is_ctrl(&key, 'd') {
        let due = parse_due(form.due.text()).ok().flatten();
        open_due_picker(app, PickTarget::Form, due, form_mode(form));
        return Vec::new();
    }
    if is_ctrl(&key, 'l') {
        let parent = form.parent_id.clone();
        let chosen = parse_list(form.labels.text());
        open_label_picker(app, PickTarget::Form, parent.as_deref(), chosen, form_mode(form));
        return Vec::new();
    }
    if is_ctrl(&key, 'o') {
        return open_form_inspector(app, form);
    }
    if is_ctrl(&key, 'r') {
        if !form.is_edit() {
            form.error = Some("attach resources after the task exists".into());
            app.mode = form_mode(form);
            return Vec::new();
        }
        return open_resource_picker(app, PickTarget::Form, form_mode(form));
    }

    match key.code {
        KeyCode::Esc => {
            app.mode = *form.back;
            return Vec::new();
        }
        KeyCode::Enter => return submit_task_form(app, form),
        KeyCode::Tab => form.cycle_focus(1),
        KeyCode::BackTab => form.cycle_focus(-1),
        KeyCode::Left if form.focus == FormField::Kind => form.cycle_kind(-1),
        KeyCode::Right | KeyCode::Char(' ') if form.focus == FormField::Kind => {
            form.cycle_kind(1)
        }
        _ => {
            if let Some(input) = form.input_mut(form.focus)
                && input.handle_key(&key)
            {
                form.error = None;
            }
        }
    }
    app.mode = form_mode(form);
    Vec::new()
}

fn open_form_inspector(app: &mut App, mut form: TaskForm) -> Vec<Request> {
    let Some(task) = form.task_id.as_ref().and_then(|id| app.tasks.get(id)) else {
        form.error = Some("dependencies can be edited once the task exists".into());
        app.mode = form_mode(form);
        return Vec::new();
    };
    // The inspector starts from what the form currently holds
    let mut owner = task.clone();
    owner.metadata.depends_on = parse_list(form.depends_on.text());
    owner.metadata.blocked_by = parse_list(form.blocked_by.text());
    open_inspector(app, owner, InspectorOrigin::Form, form_mode(form))
}

fn validate(app: &App, form: &TaskForm) -> Result<TaskFields, ValidationError> {
    let title = parse_title(form.title.text())?;
    let priority = parse_priority(form.priority.text())?;
    let due_at = parse_due(form.due.text())?;
    let labels = parse_list(form.labels.text());
    if app.config.labels.enforce_allowed && !form.suggested_labels.is_empty() {
        let bad = disallowed_labels(&labels, &form.suggested_labels);
        if !bad.is_empty() {
            return Err(ValidationError::new(
                "labels",
                format!("not in the allowed list: {}", bad.join(", ")),
            ));
        }
    }
    let own_id = form.task_id.as_deref().unwrap_or_default();
    let links = |text: &str| -> Vec<String> {
        parse_list(text)
            .into_iter()
            .filter(|id| id != own_id)
            .collect()
    };
    Ok(TaskFields {
        title,
        description: form.description.text().trim_end().to_string(),
        priority,
        due_at,
        labels,
        metadata: TaskMetadata {
            depends_on: links(form.depends_on.text()),
            blocked_by: links(form.blocked_by.text()),
            blocked_reason: form.blocked_reason.text().trim().to_string(),
            resource_refs: form.resource_refs.clone(),
        },
    })
}

fn submit_task_form(app: &mut App, mut form: TaskForm) -> Vec<Request> {
    let fields = match validate(app, &form) {
        Ok(fields) => fields,
        Err(e) => {
            form.focus = match e.field {
                "title" => FormField::Title,
                "priority" => FormField::Priority,
                "due" => FormField::Due,
                "labels" => FormField::Labels,
                _ => form.focus,
            };
            form.error = Some(e.to_string());
            app.mode = form_mode(form);
            return Vec::new();
        }
    };
    app.mode = *std::mem::take(&mut form.back);

    match (&form.task_id, form.original) {
        (Some(task_id), Some(before)) => {
            if before == fields {
                app.set_status("no changes");
                return Vec::new();
            }
            let label = format!("edit {}", fields.title);
            let set = ActionSet::single(
                label,
                HistoryStep::Update {
                    task_id: task_id.clone(),
                    before: Box::new(before),
                    after: Box::new(fields),
                },
            );
            submit_set(app, set)
        }
        _ => {
            tracing::debug!(title = %fields.title, kind = form.kind.as_str(), "creating task");
            app.history.begin();
            app.set_status(format!("adding {}…", fields.title));
            vec![Request::CreateTask(TaskInput {
                project_id: form.project_id,
                parent_id: form.parent_id,
                kind: form.kind,
                column_id: form.column_id,
                title: fields.title,
                description: fields.description,
                priority: fields.priority,
                due_at: fields.due_at,
                labels: fields.labels,
                metadata: fields.metadata,
            })]
        }
    }
}

pub(super) fn handle_rename(app: &mut App, mut state: RenameState, key: KeyEvent) -> Vec<Request> {
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let title = match parse_title(state.input.text()) {
                Ok(t) => t,
                Err(e) => {
                    app.set_error(e.to_string());
                    app.mode = Mode::Rename(state);
                    return Vec::new();
                }
            };
            app.mode = Mode::Normal;
            if title == state.original {
                return Vec::new();
            }
            let set = ActionSet::single(
                format!("rename {} to {}", state.original, title),
                HistoryStep::Rename {
                    task_id: state.task_id,
                    from: state.original,
                    to: title,
                },
            );
            submit_set(app, set)
        }
        _ => {
            state.input.handle_key(&key);
            app.mode = Mode::Rename(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_project_form(
    app: &mut App,
    mut state: ProjectFormState,
    key: KeyEvent,
) -> Vec<Request> {
    let fields = ProjectField::ALL;
    let idx = fields.iter().position(|f| *f == state.focus).unwrap_or(0);
    match key.code {
        KeyCode::Esc => {
            app.mode = *state.back;
            return Vec::new();
        }
        KeyCode::Tab => state.focus = fields[(idx + 1) % fields.len()],
        KeyCode::BackTab => state.focus = fields[(idx + fields.len() - 1) % fields.len()],
        KeyCode::Enter => {
            let name = state.name.text().trim().to_string();
            if name.is_empty() {
                state.focus = ProjectField::Name;
                state.error = Some(ValidationError::new("name", "required").to_string());
                app.mode = Mode::ProjectForm(state);
                return Vec::new();
            }
            let input = ProjectInput {
                name,
                slug: state.slug.text().trim().to_string(),
                description: state.description.text().trim_end().to_string(),
                metadata: ProjectMetadata {
                    owner: state.owner.text().trim().to_string(),
                    tags: parse_list(state.tags.text()),
                },
            };
            app.mode = *state.back;
            return vec![Request::SaveProject {
                id: state.project_id,
                input,
            }];
        }
        _ => {
            if state.input_mut(state.focus).handle_key(&key) {
                state.error = None;
            }
        }
    }
    app.mode = Mode::ProjectForm(state);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Config, Project, WorkKind};
    use crate::ops::test_support::{epoch, task};
    use crate::tui::input::test_keys::{code, ctrl, key};
    use crate::tui::input::update;
    use crate::tui::undo::HistoryStep;
    use std::path::PathBuf;

    fn app() -> App {
        let mut config = Config::default();
        config.identity.display_name = "t".into();
        config.labels.global = vec!["bug".into(), "ui".into()];
        let mut app = App::new(config, PathBuf::new(), Some("p".into()), false);
        app.project = Some(Project {
            id: "p1".into(),
            slug: "p".into(),
            name: "P".into(),
            description: String::new(),
            metadata: Default::default(),
            created_at: epoch(),
            archived_at: None,
        });
        app.columns = vec![Column {
            id: "c1".into(),
            project_id: "p1".into(),
            name: "To Do".into(),
            position: 0,
            wip_limit: None,
        }];
        app.tasks.insert("a".into(), task("a", "Alpha"));
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            update(app, key(c));
        }
    }

    #[test]
    fn add_task_submits_create_request() {
        let mut app = app();
        update(&mut app, key('n'));
        type_text(&mut app, "Write docs");
        update(&mut app, code(KeyCode::Tab));
        update(&mut app, code(KeyCode::Tab));
        assert!(matches!(&app.mode, Mode::AddTask(f) if f.focus == FormField::Kind));
        update(&mut app, code(KeyCode::Left));
        assert!(matches!(&app.mode, Mode::AddTask(f) if f.kind == WorkKind::Branch));
        let requests = update(&mut app, code(KeyCode::Enter));
        let [Request::CreateTask(input)] = requests.as_slice() else {
            panic!("expected create, got {:?}", requests);
        };
        assert_eq!(input.title, "Write docs");
        assert_eq!(input.kind, WorkKind::Branch);
        assert_eq!(input.column_id, "c1");
        assert_eq!(app.mode.name(), "normal");
    }

    #[test]
    fn validation_errors_stay_on_the_form() {
        let mut app = app();
        update(&mut app, key('n'));
        let requests = update(&mut app, code(KeyCode::Enter));
        assert!(requests.is_empty());
        let Mode::AddTask(form) = &app.mode else {
            panic!("form closed");
        };
        assert_eq!(form.error.as_deref(), Some("title: title is required"));
    }

    #[test]
    fn enforced_labels_reject_unknown_values() {
        let mut app = app();
        app.config.labels.enforce_allowed = true;
        update(&mut app, key('e'));
        for _ in 0..4 {
            update(&mut app, code(KeyCode::Tab));
        }
        assert!(matches!(&app.mode, Mode::EditTask(f) if f.focus == FormField::Labels));
        type_text(&mut app, "BUG, nope");
        update(&mut app, code(KeyCode::Enter));
        let Mode::EditTask(form) = &app.mode else {
            panic!("form closed");
        };
        assert_eq!(
            form.error.as_deref(),
            Some("labels: not in the allowed list: nope")
        );
    }

    #[test]
    fn edit_submits_an_undoable_update() {
        let mut app = app();
        update(&mut app, key('e'));
        update(&mut app, ctrl('u'));
        type_text(&mut app, "Beta");
        let requests = update(&mut app, code(KeyCode::Enter));
        let [Request::ApplySet { set, .. }] = requests.as_slice() else {
            panic!("expected set, got {:?}", requests);
        };
        let HistoryStep::Update { before, after, .. } = &set.steps[0] else {
            panic!("expected update");
        };
        assert_eq!(before.title, "Alpha");
        assert_eq!(after.title, "Beta");
        assert!(set.undoable);
    }

    #[test]
    fn rename_to_same_title_is_a_no_op() {
        let mut app = app();
        update(&mut app, key('R'));
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        assert_eq!(app.mode.name(), "normal");
        assert!(!app.history.is_busy());
    }

    #[test]
    fn project_form_requires_a_name() {
        let mut app = app();
        app.mode = Mode::ProjectForm(ProjectFormState::new(None, Mode::Normal));
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        assert!(matches!(&app.mode, Mode::ProjectForm(s) if s.error.is_some()));
        type_text(&mut app, "Launch");
        let requests = update(&mut app, code(KeyCode::Enter));
        assert!(matches!(
            requests.as_slice(),
            [Request::SaveProject { id: None, input }] if input.name == "Launch"
        ));
    }
}
