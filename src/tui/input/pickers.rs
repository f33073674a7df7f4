//! Due-date, label and attachment pickers. Each writes either into the task
//! form it was opened from or straight to a task as one undoable update.

use std::path::Path;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};

use crate::io::fs_browse::confine_relative;
use crate::model::{PathMode, ResourceRef};
use crate::ops::fields::{format_due, format_list, parse_due};
use crate::ops::labels::disallowed_labels;
use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{
    DuePickerState, DuePreset, LabelPickerState, Mode, PickTarget, ResourcePickerState, TaskForm,
};
use crate::util::keep_visible;

use super::actions::submit_update;
use super::list_nav;

/// The task form a picker will return to, if it came from one.
fn form_in(mode: &mut Mode) -> Option<&mut TaskForm> {
    match mode {
        Mode::AddTask(form) | Mode::EditTask(form) => Some(form),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Due date
// ---------------------------------------------------------------------------

pub(super) fn handle_due(app: &mut App, mut state: DuePickerState, key: KeyEvent) -> Vec<Request> {
    let custom = DuePreset::ALL.len();
    match key.code {
        KeyCode::Esc => {
            app.mode = *state.back;
            return Vec::new();
        }
        KeyCode::Up => state.selected = state.selected.saturating_sub(1),
        KeyCode::Down => state.selected = (state.selected + 1).min(custom),
        KeyCode::Enter => {
            let due = match DuePreset::ALL.get(state.selected) {
                Some(preset) => preset.resolve(Utc::now()),
                None => match parse_due(state.input.text()) {
                    Ok(due) => due,
                    Err(e) => {
                        state.error = Some(e.to_string());
                        app.mode = Mode::DuePicker(state);
                        return Vec::new();
                    }
                },
            };
            return apply_due(app, state, due);
        }
        _ => {
            if state.input.handle_key(&key) {
                state.selected = custom;
                state.error = None;
            }
        }
    }
    app.mode = Mode::DuePicker(state);
    Vec::new()
}

fn apply_due(
    app: &mut App,
    state: DuePickerState,
    due: Option<chrono::DateTime<Utc>>,
) -> Vec<Request> {
    let mut back = *state.back;
    match state.target {
        PickTarget::Form => {
            if let Some(form) = form_in(&mut back) {
                form.due.set(format_due(due));
                form.error = None;
            }
            app.mode = back;
            Vec::new()
        }
        PickTarget::Task(task_id) => {
            app.mode = back;
            let label = format!("set due date on {}", app.task_title(&task_id));
            submit_update(app, &task_id, label, |fields| fields.due_at = due)
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

fn picker_parent(app: &App, state: &LabelPickerState) -> Option<String> {
    match &state.target {
        PickTarget::Task(id) => app.tasks.get(id).and_then(|t| t.parent_id.clone()),
        PickTarget::Form => match state.back.as_ref() {
            Mode::AddTask(form) | Mode::EditTask(form) => form.parent_id.clone(),
            _ => None,
        },
    }
}

fn toggle_label(chosen: &mut Vec<String>, label: &str) {
    match chosen.iter().position(|c| c.eq_ignore_ascii_case(label)) {
        Some(idx) => {
            chosen.remove(idx);
        }
        None => chosen.push(label.to_string()),
    }
}

pub(super) fn handle_labels(
    app: &mut App,
    mut state: LabelPickerState,
    key: KeyEvent,
) -> Vec<Request> {
    if list_nav(&key, &mut state.selected, state.options.len(), false) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::LabelPicker(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            app.mode = *state.back;
            return Vec::new();
        }
        KeyCode::Char(' ') if state.input.is_empty() => {
            if let Some(label) = state.options.get(state.selected).cloned() {
                toggle_label(&mut state.chosen, &label);
            }
        }
        KeyCode::Enter if state.input.text().trim().is_empty() => {
            return apply_labels(app, state);
        }
        KeyCode::Enter => {
            let label = state.input.text().trim().to_string();
            if app.config.labels.enforce_allowed {
                let parent = picker_parent(app, &state);
                let allowed = app.label_suggestions(parent.as_deref());
                let rejected = disallowed_labels(std::slice::from_ref(&label), &allowed);
                if !allowed.is_empty() && !rejected.is_empty() {
                    app.set_error(format!("label not in the allowed list: {}", label));
                    app.mode = Mode::LabelPicker(state);
                    return Vec::new();
                }
            }
            if !state.options.iter().any(|o| o.eq_ignore_ascii_case(&label)) {
                state.options.push(label.clone());
            }
            if !state.chosen.iter().any(|c| c.eq_ignore_ascii_case(&label)) {
                state.chosen.push(label);
            }
            state.input.clear();
        }
        _ => {
            state.input.handle_key(&key);
        }
    }
    app.mode = Mode::LabelPicker(state);
    Vec::new()
}

fn apply_labels(app: &mut App, state: LabelPickerState) -> Vec<Request> {
    let mut back = *state.back;
    let chosen = state.chosen;
    match state.target {
        PickTarget::Form => {
            if let Some(form) = form_in(&mut back) {
                form.labels.set(format_list(&chosen));
                form.error = None;
            }
            app.mode = back;
            Vec::new()
        }
        PickTarget::Task(task_id) => {
            app.mode = back;
            let label = format!("set labels on {}", app.task_title(&task_id));
            submit_update(app, &task_id, label, |fields| fields.labels = chosen)
        }
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

fn parent_dir(dir: &str) -> String {
    Path::new(dir)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

fn list_request(state: &mut ResourcePickerState, dir: String) -> Vec<Request> {
    state.dir = dir.clone();
    state.entries.clear();
    state.selected = 0;
    state.scroll = 0;
    state.loading = true;
    state.error = None;
    vec![Request::ListDir {
        root: state.root.clone(),
        dir,
    }]
}

pub(super) fn handle_resources(
    app: &mut App,
    mut state: ResourcePickerState,
    key: KeyEvent,
) -> Vec<Request> {
    if list_nav(&key, &mut state.selected, state.entries.len(), true) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::ResourcePicker(state);
        return Vec::new();
    }
    let highlighted = state.entries.get(state.selected).cloned();
    let requests = match key.code {
        KeyCode::Esc => {
            app.mode = *state.back;
            return Vec::new();
        }
        KeyCode::Backspace | KeyCode::Char('h') if !state.dir.is_empty() => {
            let up = parent_dir(&state.dir);
            list_request(&mut state, up)
        }
        KeyCode::Enter | KeyCode::Char('l') => match highlighted {
            Some(entry) if entry.is_dir => list_request(&mut state, entry.rel_path),
            Some(entry) => return attach(app, state, &entry.rel_path),
            None => Vec::new(),
        },
        KeyCode::Char('a') => match highlighted {
            Some(entry) => return attach(app, state, &entry.rel_path),
            None => Vec::new(),
        },
        _ => Vec::new(),
    };
    app.mode = Mode::ResourcePicker(state);
    requests
}

fn attach(app: &mut App, mut state: ResourcePickerState, rel_path: &str) -> Vec<Request> {
    let path = match confine_relative(rel_path) {
        Ok(path) => path,
        Err(e) => {
            state.error = Some(e.to_string());
            app.mode = Mode::ResourcePicker(state);
            return Vec::new();
        }
    };
    let resource = ResourceRef {
        path,
        path_mode: PathMode::Relative,
        base_alias: state.slug.clone(),
    };
    let mut back = *state.back;
    match state.target {
        PickTarget::Form => {
            if let Some(form) = form_in(&mut back)
                && !form.resource_refs.contains(&resource)
            {
                form.resource_refs.push(resource);
            }
            app.mode = back;
            Vec::new()
        }
        PickTarget::Task(task_id) => {
            app.mode = back;
            let label = format!("attach {} to {}", rel_path, app.task_title(&task_id));
            submit_update(app, &task_id, label, |fields| {
                if !fields.metadata.resource_refs.contains(&resource) {
                    fields.metadata.resource_refs.push(resource);
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fs_browse::DirEntry;
    use crate::tui::effects::SetKind;
    use crate::tui::input::test_keys::{code, ctrl, fixture, key};
    use crate::tui::input::update;
    use crate::tui::undo::HistoryStep;
    use tempfile::TempDir;

    fn updated_fields(requests: &[Request]) -> crate::model::TaskFields {
        let [
            Request::ApplySet {
                kind: SetKind::Perform,
                set,
                ..
            },
        ] = requests
        else {
            panic!("expected one set, got {:?}", requests);
        };
        let [HistoryStep::Update { after, .. }] = set.steps.as_slice() else {
            panic!("expected an update step");
        };
        (**after).clone()
    }

    #[test]
    fn typed_due_date_saves_as_an_update() {
        let mut app = fixture();
        update(&mut app, key('d'));
        for c in "2025-06-01".chars() {
            update(&mut app, key(c));
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(format_due(updated_fields(&requests).due_at), "2025-06-01");
        assert_eq!(app.mode.name(), "normal");
    }

    #[test]
    fn bad_due_date_keeps_the_picker_open() {
        let mut app = fixture();
        update(&mut app, key('d'));
        for c in "soon".chars() {
            update(&mut app, key(c));
        }
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        let Mode::DuePicker(state) = &app.mode else {
            panic!("expected due picker");
        };
        assert!(state.error.is_some());
    }

    #[test]
    fn due_picker_from_a_form_fills_the_field() {
        let mut app = fixture();
        update(&mut app, key('n'));
        update(&mut app, ctrl('d'));
        update(&mut app, code(KeyCode::Down));
        update(&mut app, code(KeyCode::Down));
        update(&mut app, code(KeyCode::Down));
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        let Mode::AddTask(form) = &app.mode else {
            panic!("expected the add form back");
        };
        assert_eq!(form.due.text(), "");
    }

    #[test]
    fn label_picker_toggles_and_adds() {
        let mut app = fixture();
        app.config.labels.global = vec!["ops".into(), "web".into()];
        update(&mut app, key('t'));
        update(&mut app, key(' '));
        for c in "urgent".chars() {
            update(&mut app, key(c));
        }
        update(&mut app, code(KeyCode::Enter));
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(
            updated_fields(&requests).labels,
            vec!["ops".to_string(), "urgent".to_string()]
        );
    }

    #[test]
    fn enforced_labels_refuse_unknown_entries() {
        let mut app = fixture();
        app.config.labels.global = vec!["ops".into()];
        app.config.labels.enforce_allowed = true;
        update(&mut app, key('t'));
        for c in "nope".chars() {
            update(&mut app, key(c));
        }
        update(&mut app, code(KeyCode::Enter));
        assert!(app.status.is_error);
        let Mode::LabelPicker(state) = &app.mode else {
            panic!("expected label picker");
        };
        assert!(state.chosen.is_empty());
    }

    #[test]
    fn resource_picker_walks_directories_and_attaches() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs/plan.md"), "x").unwrap();
        let root = tmp.path().to_string_lossy().to_string();

        let mut app = fixture();
        app.config.paths.roots.insert("p".into(), root.clone());
        let requests = crate::tui::input::run_command(
            &mut app,
            crate::tui::command_actions::CommandId::AttachResource,
        );
        assert_eq!(
            requests,
            vec![Request::ListDir {
                root: root.clone(),
                dir: String::new()
            }]
        );
        if let Mode::ResourcePicker(state) = &mut app.mode {
            state.loading = false;
            state.entries = vec![DirEntry {
                name: "docs".into(),
                rel_path: "docs".into(),
                is_dir: true,
            }];
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(
            requests,
            vec![Request::ListDir {
                root: root.clone(),
                dir: "docs".into()
            }]
        );
        if let Mode::ResourcePicker(state) = &mut app.mode {
            state.loading = false;
            state.entries = vec![DirEntry {
                name: "plan.md".into(),
                rel_path: "docs/plan.md".into(),
                is_dir: false,
            }];
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        let refs = updated_fields(&requests).metadata.resource_refs;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "docs/plan.md");
        assert_eq!(refs[0].base_alias, "p");
    }

    #[test]
    fn attaching_a_listed_entry_checks_the_path_only() {
        let mut app = fixture();
        app.config
            .paths
            .roots
            .insert("p".into(), "/no/such/arbor/root".into());
        crate::tui::input::run_command(
            &mut app,
            crate::tui::command_actions::CommandId::AttachResource,
        );
        if let Mode::ResourcePicker(state) = &mut app.mode {
            state.loading = false;
            state.entries = ["../outside.md", "notes/./plan.md"]
                .iter()
                .map(|p| DirEntry {
                    name: p.to_string(),
                    rel_path: p.to_string(),
                    is_dir: false,
                })
                .collect();
        }
        assert!(update(&mut app, key('a')).is_empty());
        let Mode::ResourcePicker(state) = &app.mode else {
            panic!("expected the picker, got {}", app.mode.name());
        };
        assert!(state.error.as_deref().is_some_and(|e| e.contains("escapes root")));

        update(&mut app, code(KeyCode::Down));
        let requests = update(&mut app, key('a'));
        let refs = updated_fields(&requests).metadata.resource_refs;
        assert_eq!(refs[0].path, "notes/plan.md");
    }

    #[test]
    fn parent_of_nested_dir() {
        assert_eq!(parent_dir("docs/specs"), "docs");
        assert_eq!(parent_dir("docs"), "");
    }
}
