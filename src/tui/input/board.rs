use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::App;
use crate::tui::command_actions::CommandId;
use crate::tui::effects::Request;
use crate::tui::modes::{Mode, PaletteState, QuickState};

use super::actions::run_command;

fn command_for_key(key: &KeyEvent) -> Option<CommandId> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    let id = match key.code {
        KeyCode::Char('n') => CommandId::AddTask,
        KeyCode::Char('e') => CommandId::EditTask,
        KeyCode::Char('R') => CommandId::RenameTask,
        KeyCode::Char('/') => CommandId::Search,
        KeyCode::Char('p') => CommandId::Projects,
        KeyCode::Enter | KeyCode::Char('i') => CommandId::TaskInfo,
        KeyCode::Char('c') => CommandId::Comments,
        KeyCode::Char('d') => CommandId::DueDate,
        KeyCode::Char('t') => CommandId::Labels,
        KeyCode::Char('b') => CommandId::Dependencies,
        KeyCode::Char('g') => CommandId::Activity,
        KeyCode::Char('[') => CommandId::MoveLeft,
        KeyCode::Char(']') => CommandId::MoveRight,
        KeyCode::Char('x') => CommandId::Archive,
        KeyCode::Char('X') => CommandId::HardDelete,
        KeyCode::Char('v') => CommandId::Restore,
        KeyCode::Char('f') => CommandId::FocusInto,
        KeyCode::Char('F') | KeyCode::Backspace => CommandId::FocusOut,
        KeyCode::Char('u') => CommandId::Undo,
        KeyCode::Char('U') => CommandId::Redo,
        KeyCode::Char('A') => CommandId::ToggleArchived,
        KeyCode::Char('m') => CommandId::ToggleMouse,
        KeyCode::Char('q') => CommandId::Quit,
        _ => return None,
    };
    Some(id)
}

/// Handle a key on the board
pub(super) fn handle_normal(app: &mut App, key: KeyEvent) -> Vec<Request> {
    app.mode = Mode::Normal;
    if let Some(id) = command_for_key(&key) {
        return run_command(app, id);
    }
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => {
            if app.focus_column > 0 {
                app.focus_column -= 1;
                app.clamp_cursor();
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if app.focus_column + 1 < app.columns.len() {
                app.focus_column += 1;
                app.clamp_cursor();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let rows = app.column_rows(app.focus_column).len();
            if app.cursor + 1 < rows {
                app.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            if let Some(id) = app.current_task_id()
                && !app.selection.shift_remove(&id)
            {
                app.selection.insert(id);
            }
        }
        KeyCode::Esc => {
            app.selection.clear();
        }
        KeyCode::Char(':') => {
            app.mode = Mode::CommandPalette(PaletteState::default());
        }
        KeyCode::Char('.') => match app.current_task_id() {
            Some(task_id) => {
                app.mode = Mode::QuickActions(QuickState {
                    task_id,
                    selected: 0,
                });
            }
            None => app.set_error("no task under the cursor"),
        },
        _ => {}
    }
    Vec::new()
}
