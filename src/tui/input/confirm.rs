use crossterm::event::{KeyCode, KeyEvent};

use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{ConfirmState, Mode};

use super::actions::perform;

/// Handle a key while a confirmation prompt is open
pub(super) fn handle_confirm(app: &mut App, state: ConfirmState, key: KeyEvent) -> Vec<Request> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
            app.mode = *state.back;
            perform(app, state.action, true)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.mode = *state.back;
            app.set_status("cancelled");
            Vec::new()
        }
        _ => {
            app.mode = Mode::Confirm(state);
            Vec::new()
        }
    }
}
