//! The update step: every key, mouse event and request result goes through
//! [`update`], which mutates the app and returns the requests to run next.

mod actions;
mod board;
mod confirm;
mod forms;
mod info;
mod inspector;
mod lists;
mod mouse;
mod pickers;
mod results;
mod settings;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::App;
use super::effects::Request;
use super::modes::Mode;
use super::msg::Msg;

pub use actions::run_command;
pub use info::info_children;

/// Apply one message. The only place app state changes.
pub fn update(app: &mut App, msg: Msg) -> Vec<Request> {
    match msg {
        Msg::Key(key) => handle_key(app, key),
        Msg::Mouse(event) => mouse::handle_mouse(app, event),
        Msg::Resize { width, height } => {
            app.size = (width, height);
            Vec::new()
        }
        other => results::apply_result(app, other),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Request> {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) || key.kind == KeyEventKind::Release {
        return Vec::new();
    }
    let mode = std::mem::take(&mut app.mode);
    match mode {
        Mode::Normal => board::handle_normal(app, key),
        Mode::AddTask(form) => forms::handle_task_form(app, form, key),
        Mode::EditTask(form) => forms::handle_task_form(app, form, key),
        Mode::Rename(state) => forms::handle_rename(app, state, key),
        Mode::Search(state) => lists::handle_search(app, state, key),
        Mode::SearchResults(state) => lists::handle_results(app, state, key),
        Mode::ProjectPicker(state) => lists::handle_picker(app, state, key),
        Mode::ProjectForm(state) => forms::handle_project_form(app, state, key),
        Mode::Confirm(state) => confirm::handle_confirm(app, state, key),
        Mode::CommandPalette(state) => lists::handle_palette(app, state, key),
        Mode::QuickActions(state) => lists::handle_quick_actions(app, state, key),
        Mode::TaskInfo(state) => info::handle_task_info(app, state, key),
        Mode::Thread(state) => info::handle_thread(app, state, key),
        Mode::DuePicker(state) => pickers::handle_due(app, state, key),
        Mode::LabelPicker(state) => pickers::handle_labels(app, state, key),
        Mode::DependencyInspector(state) => inspector::handle_inspector(app, state, key),
        Mode::ActivityLog(state) => lists::handle_activity(app, state, key),
        Mode::HighlightColor(state) => settings::handle_color(app, state, key),
        Mode::LabelsConfig(state) => settings::handle_labels_config(app, state, key),
        Mode::PathsRoots(state) => settings::handle_paths(app, state, key),
        Mode::ResourcePicker(state) => pickers::handle_resources(app, state, key),
        Mode::BootstrapSettings(state) => settings::handle_bootstrap(app, state, key),
    }
}

/// `ctrl+<c>`
fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

/// Shared list navigation: returns true when the key moved `selected`.
fn list_nav(key: &KeyEvent, selected: &mut usize, len: usize, vim_keys: bool) -> bool {
    let down = matches!(key.code, KeyCode::Down)
        || (vim_keys && key.code == KeyCode::Char('j'))
        || is_ctrl(key, 'n');
    let up = matches!(key.code, KeyCode::Up)
        || (vim_keys && key.code == KeyCode::Char('k'))
        || is_ctrl(key, 'p');
    if down {
        if *selected + 1 < len {
            *selected += 1;
        }
        true
    } else if up {
        *selected = selected.saturating_sub(1);
        true
    } else {
        match key.code {
            KeyCode::Home => {
                *selected = 0;
                true
            }
            KeyCode::End => {
                *selected = len.saturating_sub(1);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use std::path::PathBuf;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use crate::model::{Column, Config, ConfirmConfig, Project};
    use crate::ops::test_support::{epoch, task};
    use crate::tui::app::App;
    use crate::tui::msg::Msg;

    pub fn key(c: char) -> Msg {
        Msg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    pub fn shift(c: char) -> Msg {
        Msg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT))
    }

    pub fn ctrl(c: char) -> Msg {
        Msg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    pub fn code(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    /// Project `p1` (slug `p`) with columns `c1` and `c2` and top-level
    /// tasks `a` and `b` in `c1`. Confirmation prompts are off.
    pub fn fixture() -> App {
        let mut config = Config::default();
        config.identity.display_name = "Tester".into();
        config.confirm = ConfirmConfig {
            archive: false,
            restore: false,
            hard_delete: false,
            delete_project: false,
        };
        let mut app = App::new(config, PathBuf::from("config.toml"), Some("p".into()), false);
        let project = Project {
            id: "p1".into(),
            slug: "p".into(),
            name: "P".into(),
            description: String::new(),
            metadata: Default::default(),
            created_at: epoch(),
            archived_at: None,
        };
        app.projects = vec![project.clone()];
        app.project = Some(project);
        app.columns = ["To Do", "Done"]
            .iter()
            .enumerate()
            .map(|(i, name)| Column {
                id: format!("c{}", i + 1),
                project_id: "p1".into(),
                name: name.to_string(),
                position: i as i64,
                wip_limit: None,
            })
            .collect();
        let mut b = task("b", "B");
        b.position = 1;
        for t in [task("a", "A"), b] {
            app.tasks.insert(t.id.clone(), t);
        }
        app
    }
}
