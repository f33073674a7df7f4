use crossterm::event::{KeyCode, KeyEvent};

use crate::io::config_io::ConfigEdit;
use crate::ops::fields::parse_list;
use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{
    BootstrapState, ColorState, HIGHLIGHT_COLORS, LabelsConfigState, LabelsField, Mode,
    PathsState, PickerState,
};
use crate::tui::theme::parse_color;

use super::list_nav;

fn save(app: &App, edits: Vec<ConfigEdit>) -> Vec<Request> {
    for edit in &edits {
        tracing::info!(setting = %edit.describe(), "saving setting");
    }
    vec![Request::SaveConfig {
        path: app.config_path.clone(),
        edits,
    }]
}

pub(super) fn handle_color(app: &mut App, mut state: ColorState, key: KeyEvent) -> Vec<Request> {
    if list_nav(&key, &mut state.selected, HIGHLIGHT_COLORS.len(), false) {
        state.input.clear();
        app.mode = Mode::HighlightColor(state);
        return Vec::new();
    }
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let typed = state.input.text().trim().to_string();
            let value = if typed.is_empty() {
                HIGHLIGHT_COLORS[state.selected.min(HIGHLIGHT_COLORS.len() - 1)].to_string()
            } else {
                typed
            };
            if parse_color(&value).is_none() {
                app.set_error(format!("unknown color: {}", value));
                app.mode = Mode::HighlightColor(state);
                return Vec::new();
            }
            app.config.ui.highlight_color = value.clone();
            app.mode = Mode::Normal;
            app.set_status(format!("highlight color set to {}", value));
            save(app, vec![ConfigEdit::HighlightColor(value)])
        }
        _ => {
            state.input.handle_key(&key);
            app.mode = Mode::HighlightColor(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_labels_config(
    app: &mut App,
    mut state: LabelsConfigState,
    key: KeyEvent,
) -> Vec<Request> {
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            if state.slug.is_some() {
                state.focus = match state.focus {
                    LabelsField::Global => LabelsField::Project,
                    LabelsField::Project => LabelsField::Global,
                };
            }
            app.mode = Mode::LabelsConfig(state);
            Vec::new()
        }
        KeyCode::Enter => {
            let global = parse_list(state.global.text());
            app.config.labels.global = global.clone();
            let mut edits = vec![ConfigEdit::GlobalLabels(global)];
            if let Some(slug) = state.slug {
                let labels = parse_list(state.project.text());
                if labels.is_empty() {
                    app.config.labels.projects.remove(&slug);
                } else {
                    app.config.labels.projects.insert(slug.clone(), labels.clone());
                }
                edits.push(ConfigEdit::ProjectLabels { slug, labels });
            }
            app.mode = Mode::Normal;
            app.set_status("labels saved");
            save(app, edits)
        }
        _ => {
            match state.focus {
                LabelsField::Global => state.global.handle_key(&key),
                LabelsField::Project => state.project.handle_key(&key),
            };
            app.mode = Mode::LabelsConfig(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_paths(app: &mut App, mut state: PathsState, key: KeyEvent) -> Vec<Request> {
    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let root = state.input.text().trim().to_string();
            let slug = state.slug;
            let root = if root.is_empty() {
                app.config.paths.roots.remove(&slug);
                app.set_status(format!("attachment root cleared for {}", slug));
                None
            } else {
                app.config.paths.roots.insert(slug.clone(), root.clone());
                app.set_status(format!("attachment root for {} set to {}", slug, root));
                Some(root)
            };
            app.mode = Mode::Normal;
            save(app, vec![ConfigEdit::ProjectRoot { slug, root }])
        }
        _ => {
            state.input.handle_key(&key);
            app.mode = Mode::PathsRoots(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_bootstrap(
    app: &mut App,
    mut state: BootstrapState,
    key: KeyEvent,
) -> Vec<Request> {
    let mandatory = app.config.needs_bootstrap();
    match key.code {
        KeyCode::Esc if mandatory => vec![Request::Quit],
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            Vec::new()
        }
        KeyCode::Enter => {
            let name = state.name.text().trim().to_string();
            if name.is_empty() {
                state.error = Some("display name is required".into());
                app.mode = Mode::BootstrapSettings(state);
                return Vec::new();
            }
            app.config.identity.display_name = name.clone();
            app.set_status(format!("display name set to {}", name));
            let mut requests = save(app, vec![ConfigEdit::DisplayName(name)]);
            if app.project.is_some() {
                app.mode = Mode::Normal;
            } else {
                // The first project list may have landed while this was open
                app.mode = if app.startup_project.is_some() {
                    Mode::Normal
                } else {
                    Mode::ProjectPicker(PickerState {
                        loading: true,
                        ..Default::default()
                    })
                };
                requests.push(Request::LoadProjects);
            }
            requests
        }
        _ => {
            if state.name.handle_key(&key) {
                state.error = None;
            }
            app.mode = Mode::BootstrapSettings(state);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Config;
    use crate::tui::command_actions::CommandId;
    use crate::tui::input::test_keys::{code, fixture, key};
    use crate::tui::input::{run_command, update};
    use crate::tui::msg::Msg;
    use std::path::PathBuf;

    #[test]
    fn bootstrap_requires_a_name_and_cannot_be_skipped() {
        let mut app = App::new(Config::default(), PathBuf::from("c.toml"), None, false);
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        let Mode::BootstrapSettings(state) = &app.mode else {
            panic!("expected bootstrap");
        };
        assert_eq!(state.error.as_deref(), Some("display name is required"));
        assert_eq!(update(&mut app, code(KeyCode::Esc)), vec![Request::Quit]);
    }

    #[test]
    fn bootstrap_saves_then_opens_the_picker() {
        let mut app = App::new(Config::default(), PathBuf::from("c.toml"), None, false);
        for c in "Ana".chars() {
            update(&mut app, key(c));
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(
            requests,
            vec![
                Request::SaveConfig {
                    path: PathBuf::from("c.toml"),
                    edits: vec![ConfigEdit::DisplayName("Ana".into())],
                },
                Request::LoadProjects,
            ]
        );
        assert_eq!(app.config.identity.display_name, "Ana");
        assert_eq!(app.mode.name(), "project-picker");
    }

    #[test]
    fn identity_can_be_left_once_set() {
        let mut app = fixture();
        run_command(&mut app, CommandId::Identity);
        assert_eq!(app.mode.name(), "bootstrap-settings");
        assert!(update(&mut app, code(KeyCode::Esc)).is_empty());
        assert_eq!(app.mode.name(), "normal");
    }

    #[test]
    fn bad_color_is_rejected_and_good_one_saved() {
        let mut app = fixture();
        run_command(&mut app, CommandId::HighlightColor);
        for c in "#zz".chars() {
            update(&mut app, key(c));
        }
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        assert!(app.status.is_error);
        assert_eq!(app.mode.name(), "highlight-color");

        app.mode = Mode::HighlightColor(ColorState {
            selected: 0,
            input: Default::default(),
        });
        update(&mut app, code(KeyCode::Down));
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(app.config.ui.highlight_color, HIGHLIGHT_COLORS[1]);
        assert_eq!(
            requests,
            vec![Request::SaveConfig {
                path: PathBuf::from("config.toml"),
                edits: vec![ConfigEdit::HighlightColor(HIGHLIGHT_COLORS[1].into())],
            }]
        );
    }

    #[test]
    fn labels_config_saves_both_scopes() {
        let mut app = fixture();
        run_command(&mut app, CommandId::LabelsConfig);
        for c in "ops, web".chars() {
            update(&mut app, key(c));
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        let [Request::SaveConfig { edits, .. }] = requests.as_slice() else {
            panic!("expected a save");
        };
        assert_eq!(
            edits,
            &vec![
                ConfigEdit::GlobalLabels(vec![]),
                ConfigEdit::ProjectLabels {
                    slug: "p".into(),
                    labels: vec!["ops".into(), "web".into()],
                },
            ]
        );
        assert_eq!(app.config.project_labels("p"), ["ops", "web"]);
    }

    #[test]
    fn clearing_the_root_removes_it() {
        let mut app = fixture();
        app.config.paths.roots.insert("p".into(), "/tmp/x".into());
        run_command(&mut app, CommandId::PathsRoots);
        let Mode::PathsRoots(state) = &mut app.mode else {
            panic!("expected paths");
        };
        state.input.clear();
        let requests = update(&mut app, code(KeyCode::Enter));
        assert_eq!(
            requests,
            vec![Request::SaveConfig {
                path: PathBuf::from("config.toml"),
                edits: vec![ConfigEdit::ProjectRoot {
                    slug: "p".into(),
                    root: None,
                }],
            }]
        );
        assert!(app.config.project_root("p").is_none());
    }

    #[test]
    fn failed_write_restores_the_previous_settings() {
        let mut app = fixture();
        run_command(&mut app, CommandId::HighlightColor);
        for c in "red".chars() {
            update(&mut app, key(c));
        }
        assert_eq!(update(&mut app, code(KeyCode::Enter)).len(), 1);
        assert_eq!(app.config.ui.highlight_color, "red");
        update(&mut app, Msg::ConfigSaved(Err("read-only".into())));
        assert_eq!(app.config.ui.highlight_color, "cyan");
        assert!(app.status.is_error);

        run_command(&mut app, CommandId::HighlightColor);
        for c in "red".chars() {
            update(&mut app, key(c));
        }
        update(&mut app, code(KeyCode::Enter));
        let saved = app.config.clone();
        update(&mut app, Msg::ConfigSaved(Ok(saved)));
        update(&mut app, Msg::ConfigSaved(Err("read-only".into())));
        assert_eq!(app.config.ui.highlight_color, "red");
    }

    #[test]
    fn failed_bootstrap_write_keeps_the_name_for_the_session() {
        let mut app = App::new(Config::default(), PathBuf::from("c.toml"), None, false);
        for c in "Ana".chars() {
            update(&mut app, key(c));
        }
        update(&mut app, code(KeyCode::Enter));
        update(&mut app, Msg::ConfigSaved(Err("read-only".into())));
        assert_eq!(app.config.identity.display_name, "Ana");
        assert!(app.status.text.contains("could not save settings"));
    }
}
