use crossterm::event::{KeyCode, KeyEvent};

use crate::ops::deps::StateId;
use crate::ops::fields::format_list;
use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{InspectorFocus, InspectorOrigin, InspectorState, Mode};
use crate::util::keep_visible;

use super::actions::{rebuild_candidates, submit_update};
use super::{is_ctrl, list_nav};

/// All active states, then each one alone.
fn next_states(states: &[StateId]) -> Vec<StateId> {
    match states {
        [StateId::Todo] => vec![StateId::Progress],
        [StateId::Progress] => vec![StateId::Done],
        [StateId::Done] => StateId::ACTIVE.to_vec(),
        _ => vec![StateId::Todo],
    }
}

pub(super) fn handle_inspector(
    app: &mut App,
    mut state: InspectorState,
    key: KeyEvent,
) -> Vec<Request> {
    if is_ctrl(&key, 's') {
        return apply(app, state);
    }
    if is_ctrl(&key, 't') {
        toggle_selected(&mut state);
    } else if is_ctrl(&key, 'r') {
        state.include_archived = !state.include_archived;
        rebuild_candidates(&mut state, app.board_rows_visible());
    } else if is_ctrl(&key, 'p') {
        state.cross_project = !state.cross_project;
        rebuild_candidates(&mut state, app.board_rows_visible());
    } else if is_ctrl(&key, 'f') {
        state.states = next_states(&state.states);
        rebuild_candidates(&mut state, app.board_rows_visible());
    } else if list_nav(&key, &mut state.selected, state.rows.len(), false) {
        state.focus = InspectorFocus::List;
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
    } else {
        match key.code {
            KeyCode::Esc => {
                app.mode = *state.back;
                return Vec::new();
            }
            KeyCode::Tab | KeyCode::BackTab => state.field = state.field.other(),
            KeyCode::Enter if state.origin == InspectorOrigin::TaskInfo => {
                if let Some(found) = state.rows.get(state.selected).and_then(|r| r.found.clone()) {
                    return app.jump_to_task(&found.project_id, &found.task.id);
                }
            }
            KeyCode::Enter => toggle_selected(&mut state),
            _ => {
                if state.query.handle_key(&key) {
                    state.focus = InspectorFocus::Query;
                    state.selected = 0;
                    state.scroll = 0;
                    rebuild_candidates(&mut state, app.board_rows_visible());
                }
            }
        }
    }
    app.mode = Mode::DependencyInspector(state);
    Vec::new()
}

fn toggle_selected(state: &mut InspectorState) {
    if let Some(row) = state.rows.get(state.selected) {
        let id = row.task_id.clone();
        state.pending.toggle(state.field, &id);
    }
}

fn apply(app: &mut App, state: InspectorState) -> Vec<Request> {
    let (depends_on, blocked_by) = state.pending.finalize(&state.owner.id);
    let mut back = *state.back;
    if state.origin == InspectorOrigin::Form {
        if let Mode::AddTask(form) | Mode::EditTask(form) = &mut back {
            form.depends_on.set(format_list(&depends_on));
            form.blocked_by.set(format_list(&blocked_by));
            form.error = None;
        }
        app.mode = back;
        return Vec::new();
    }
    app.mode = back;
    let owner_id = state.owner.id.clone();
    let label = format!("edit dependencies of {}", app.task_title(&owner_id));
    submit_update(app, &owner_id, label, |fields| {
        fields.metadata.depends_on = depends_on;
        fields.metadata.blocked_by = blocked_by;
    })
}
