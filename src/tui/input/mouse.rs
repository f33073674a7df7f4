use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::tui::app::{App, BOARD_TOP};
use crate::tui::command_actions::rank_commands;
use crate::tui::effects::Request;
use crate::tui::modes::Mode;
use crate::tui::render;
use crate::util::keep_visible;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gesture {
    Click { x: u16, y: u16, ctrl: bool },
    WheelUp,
    WheelDown,
}

fn gesture(event: &MouseEvent) -> Option<Gesture> {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Gesture::Click {
            x: event.column,
            y: event.row,
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        }),
        MouseEventKind::ScrollUp => Some(Gesture::WheelUp),
        MouseEventKind::ScrollDown => Some(Gesture::WheelDown),
        _ => None,
    }
}

pub(super) fn handle_mouse(app: &mut App, event: MouseEvent) -> Vec<Request> {
    if app.mouse_selection {
        return Vec::new();
    }
    let Some(gesture) = gesture(&event) else {
        return Vec::new();
    };
    let visible = app.board_rows_visible();
    let mode = std::mem::take(&mut app.mode);
    match mode {
        // The picker is checked before the text-entry rule
        Mode::ProjectPicker(mut state) => {
            let len = state.visible(&app.projects).len();
            let hit = list_gesture(gesture, &mut state.selected, &mut state.scroll, len, visible);
            let opened = match hit {
                ListHit::Again => state
                    .visible(&app.projects)
                    .get(state.selected)
                    .map(|p| p.id.clone()),
                _ => None,
            };
            app.mode = Mode::ProjectPicker(state);
            match opened {
                Some(id) => app.select_project(&id),
                None => Vec::new(),
            }
        }
        mode if mode.is_text_entry() => {
            app.mode = mode;
            Vec::new()
        }
        Mode::Normal => {
            app.mode = Mode::Normal;
            board_gesture(app, gesture);
            Vec::new()
        }
        Mode::SearchResults(mut state) => {
            let len = state.matches.len();
            let hit = list_gesture(gesture, &mut state.selected, &mut state.scroll, len, visible);
            if hit == ListHit::Again
                && let Some(found) = state.matches.get(state.selected)
            {
                let (project_id, task_id) = (found.project_id.clone(), found.task.id.clone());
                return app.jump_to_task(&project_id, &task_id);
            }
            app.mode = Mode::SearchResults(state);
            Vec::new()
        }
        Mode::ActivityLog(mut state) => {
            let len = app.activity.merged().len();
            list_gesture(gesture, &mut state.selected, &mut state.scroll, len, visible);
            app.mode = Mode::ActivityLog(state);
            Vec::new()
        }
        Mode::ResourcePicker(mut state) => {
            let len = state.entries.len();
            list_gesture(gesture, &mut state.selected, &mut state.scroll, len, visible);
            app.mode = Mode::ResourcePicker(state);
            Vec::new()
        }
        Mode::QuickActions(mut state) => {
            let len = rank_commands(app, "", true).len();
            let mut scroll = 0;
            list_gesture(gesture, &mut state.selected, &mut scroll, len, visible);
            app.mode = Mode::QuickActions(state);
            Vec::new()
        }
        other => {
            app.mode = other;
            Vec::new()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListHit {
    Miss,
    Moved,
    /// Clicked the row that was already highlighted
    Again,
}

/// Lists draw their first row at `BOARD_TOP`.
fn list_gesture(
    gesture: Gesture,
    selected: &mut usize,
    scroll: &mut usize,
    len: usize,
    visible: usize,
) -> ListHit {
    if len == 0 {
        return ListHit::Miss;
    }
    match gesture {
        Gesture::WheelUp => {
            *selected = selected.saturating_sub(1);
        }
        Gesture::WheelDown => {
            *selected = (*selected + 1).min(len - 1);
        }
        Gesture::Click { y, .. } => {
            if y < BOARD_TOP {
                return ListHit::Miss;
            }
            let row = *scroll + (y - BOARD_TOP) as usize;
            if row >= len {
                return ListHit::Miss;
            }
            if row == *selected {
                return ListHit::Again;
            }
            *selected = row;
        }
    }
    *scroll = keep_visible(*selected, *scroll, visible);
    ListHit::Moved
}

fn board_gesture(app: &mut App, gesture: Gesture) {
    match gesture {
        Gesture::WheelUp => app.cursor = app.cursor.saturating_sub(1),
        Gesture::WheelDown => {
            let rows = app.column_rows(app.focus_column).len();
            if app.cursor + 1 < rows {
                app.cursor += 1;
            }
        }
        Gesture::Click { x, y, ctrl } => {
            if y < BOARD_TOP || app.columns.is_empty() {
                return;
            }
            let width = render::column_width(app).max(1);
            let column = (x / width) as usize;
            if column >= app.columns.len() {
                return;
            }
            // Scroll belongs to the column as drawn before this click
            let row = render::board_scroll(app, column) + (y - BOARD_TOP) as usize;
            let Some(task_id) = app.column_rows(column).get(row).map(|t| t.id.clone()) else {
                return;
            };
            app.focus_column = column;
            app.cursor = row;
            if ctrl && !app.selection.shift_remove(&task_id) {
                app.selection.insert(task_id);
            }
        }
    }
}
