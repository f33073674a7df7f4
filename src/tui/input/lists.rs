use crossterm::event::{KeyCode, KeyEvent};

use crate::service::SearchFilter;
use crate::tui::app::{ACTIVITY_FETCH_LIMIT, App};
use crate::tui::command_actions::{RankedCommand, rank_commands};
use crate::tui::effects::Request;
use crate::tui::modes::{
    ActivityState, Mode, PaletteState, PendingAction, PickerState, ProjectFormState, QuickState,
    ResultsState, SearchState,
};
use crate::util::keep_visible;
use crate::util::text_input::TextInput;

use super::actions::{perform, run_command};
use super::{is_ctrl, list_nav};

pub const SEARCH_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub(super) fn handle_search(app: &mut App, mut state: SearchState, key: KeyEvent) -> Vec<Request> {
    if is_ctrl(&key, 'p') {
        state.cross_project = !state.cross_project;
        app.mode = Mode::Search(state);
        return Vec::new();
    }
    if is_ctrl(&key, 'r') {
        state.include_archived = !state.include_archived;
        app.mode = Mode::Search(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let query = state.input.text().trim().to_string();
            let project_id = if state.cross_project {
                None
            } else {
                app.project_id().map(str::to_string)
            };
            app.mode = Mode::SearchResults(ResultsState {
                query: query.clone(),
                cross_project: state.cross_project,
                include_archived: state.include_archived,
                matches: Vec::new(),
                selected: 0,
                scroll: 0,
                loading: true,
            });
            vec![Request::Search {
                filter: SearchFilter {
                    project_id,
                    query,
                    include_archived: state.include_archived,
                    limit: SEARCH_LIMIT,
                },
            }]
        }
        _ => {
            state.input.handle_key(&key);
            app.mode = Mode::Search(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_results(
    app: &mut App,
    mut state: ResultsState,
    key: KeyEvent,
) -> Vec<Request> {
    if list_nav(&key, &mut state.selected, state.matches.len(), true) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::SearchResults(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Char('/') => {
            app.mode = Mode::Search(SearchState {
                input: TextInput::with_text(&state.query),
                cross_project: state.cross_project,
                include_archived: state.include_archived,
            });
            Vec::new()
        }
        KeyCode::Enter => match state.matches.get(state.selected) {
            Some(hit) => {
                let project_id = hit.project_id.clone();
                let task_id = hit.task.id.clone();
                app.jump_to_task(&project_id, &task_id)
            }
            None => {
                app.mode = Mode::SearchResults(state);
                Vec::new()
            }
        },
        _ => {
            app.mode = Mode::SearchResults(state);
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Project picker
// ---------------------------------------------------------------------------

pub(super) fn handle_picker(app: &mut App, mut state: PickerState, key: KeyEvent) -> Vec<Request> {
    let visible: Vec<_> = state
        .visible(&app.projects)
        .into_iter()
        .cloned()
        .collect();
    if list_nav(&key, &mut state.selected, visible.len(), true) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::ProjectPicker(state);
        return Vec::new();
    }
    let highlighted = visible.get(state.selected).cloned();
    match key.code {
        KeyCode::Enter => match highlighted {
            Some(project) => app.select_project(&project.id),
            None => {
                app.mode = Mode::ProjectPicker(state);
                Vec::new()
            }
        },
        KeyCode::Char('n') => {
            app.mode = Mode::ProjectForm(ProjectFormState::new(None, Mode::ProjectPicker(state)));
            Vec::new()
        }
        KeyCode::Char('e') => {
            match highlighted {
                Some(project) => {
                    app.mode = Mode::ProjectForm(ProjectFormState::new(
                        Some(&project),
                        Mode::ProjectPicker(state),
                    ));
                }
                None => app.mode = Mode::ProjectPicker(state),
            }
            Vec::new()
        }
        KeyCode::Char('a') => {
            state.show_archived = !state.show_archived;
            state.selected = 0;
            state.scroll = 0;
            app.mode = Mode::ProjectPicker(state);
            Vec::new()
        }
        KeyCode::Char('x') => {
            app.mode = Mode::ProjectPicker(state);
            match highlighted {
                Some(project) if project.is_archived() => {
                    vec![Request::RestoreProject { id: project.id }]
                }
                Some(project) => vec![Request::ArchiveProject { id: project.id }],
                None => Vec::new(),
            }
        }
        KeyCode::Char('D') => {
            app.mode = Mode::ProjectPicker(state);
            match highlighted {
                Some(project) => perform(
                    app,
                    PendingAction::DeleteProject {
                        id: project.id,
                        name: project.name,
                    },
                    false,
                ),
                None => Vec::new(),
            }
        }
        KeyCode::Char('r') => {
            state.loading = true;
            app.mode = Mode::ProjectPicker(state);
            vec![Request::LoadProjects]
        }
        KeyCode::Char('q') => {
            app.mode = Mode::ProjectPicker(state);
            vec![Request::Quit]
        }
        KeyCode::Esc => {
            if app.project.is_some() {
                app.mode = Mode::Normal;
            } else {
                app.mode = Mode::ProjectPicker(state);
                app.set_status("pick a project, or q to quit");
            }
            Vec::new()
        }
        _ => {
            app.mode = Mode::ProjectPicker(state);
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Command palette and quick actions
// ---------------------------------------------------------------------------

/// Run the highlighted command, or report why it cannot run.
fn run_ranked(app: &mut App, row: Option<RankedCommand>) -> Vec<Request> {
    app.mode = Mode::Normal;
    let Some(row) = row else {
        return Vec::new();
    };
    if let Some(reason) = row.unavailable {
        app.set_error(format!("{} unavailable: {}", row.spec.name, reason));
        return Vec::new();
    }
    tracing::debug!(command = row.spec.name, "running command");
    run_command(app, row.spec.id)
}

pub(super) fn handle_palette(app: &mut App, mut state: PaletteState, key: KeyEvent) -> Vec<Request> {
    let rows = rank_commands(app, state.input.text(), false);
    if list_nav(&key, &mut state.selected, rows.len(), false) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::CommandPalette(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let row = rows.get(state.selected).copied();
            run_ranked(app, row)
        }
        _ => {
            if state.input.handle_key(&key) {
                state.selected = 0;
                state.scroll = 0;
            }
            app.mode = Mode::CommandPalette(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_quick_actions(
    app: &mut App,
    mut state: QuickState,
    key: KeyEvent,
) -> Vec<Request> {
    if app.current_task_id().as_deref() != Some(state.task_id.as_str()) {
        app.mode = Mode::Normal;
        app.set_error("task is no longer under the cursor");
        return Vec::new();
    }
    let rows = rank_commands(app, "", true);
    if list_nav(&key, &mut state.selected, rows.len(), true) {
        app.mode = Mode::QuickActions(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('.') => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let row = rows.get(state.selected).copied();
            run_ranked(app, row)
        }
        _ => {
            app.mode = Mode::QuickActions(state);
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

pub(super) fn handle_activity(
    app: &mut App,
    mut state: ActivityState,
    key: KeyEvent,
) -> Vec<Request> {
    let len = app.activity.merged().len();
    if list_nav(&key, &mut state.selected, len, true) {
        state.scroll = keep_visible(state.selected, state.scroll, app.board_rows_visible());
        app.mode = Mode::ActivityLog(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Char('r') => match app.project_id().map(str::to_string) {
            Some(project_id) => {
                state.loading = true;
                app.mode = Mode::ActivityLog(state);
                vec![Request::LoadActivity {
                    project_id,
                    limit: ACTIVITY_FETCH_LIMIT,
                }]
            }
            None => {
                app.mode = Mode::ActivityLog(state);
                Vec::new()
            }
        },
        _ => {
            app.mode = Mode::ActivityLog(state);
            Vec::new()
        }
    }
}
