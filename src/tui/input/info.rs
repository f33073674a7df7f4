use crossterm::event::{KeyCode, KeyEvent};

use crate::model::{CommentTarget, Task};
use crate::ops::projection::direct_children;
use crate::service::CommentInput;
use crate::tui::app::App;
use crate::tui::effects::Request;
use crate::tui::modes::{
    InfoFrame, InspectorOrigin, Mode, PickTarget, TaskForm, TaskInfoState, ThreadState,
};

use super::actions::{open_due_picker, open_inspector, open_label_picker, open_thread};
use super::list_nav;

/// Children listed under a task in the info view.
pub fn info_children<'a>(app: &'a App, task_id: &'a str) -> Vec<&'a Task> {
    direct_children(&app.tasks, task_id)
        .filter(|t| app.show_archived || !t.is_archived())
        .collect()
}

pub(super) fn handle_task_info(
    app: &mut App,
    mut state: TaskInfoState,
    key: KeyEvent,
) -> Vec<Request> {
    let Some(frame) = state.current().cloned() else {
        app.mode = Mode::Normal;
        return Vec::new();
    };
    let Some(task) = app.tasks.get(&frame.task_id).cloned() else {
        state.stack.pop();
        app.set_error("task no longer exists");
        app.mode = if state.stack.is_empty() {
            Mode::Normal
        } else {
            Mode::TaskInfo(state)
        };
        return Vec::new();
    };
    let children: Vec<String> = info_children(app, &task.id)
        .into_iter()
        .map(|t| t.id.clone())
        .collect();

    if let Some(current) = state.current_mut()
        && list_nav(&key, &mut current.child_cursor, children.len(), true)
    {
        app.mode = Mode::TaskInfo(state);
        return Vec::new();
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            state.stack.pop();
            app.mode = if state.stack.is_empty() {
                Mode::Normal
            } else {
                Mode::TaskInfo(state)
            };
            Vec::new()
        }
        KeyCode::Enter => {
            if let Some(child) = children.get(frame.child_cursor) {
                state.stack.push(InfoFrame {
                    task_id: child.clone(),
                    child_cursor: 0,
                });
            }
            app.mode = Mode::TaskInfo(state);
            Vec::new()
        }
        KeyCode::Char('e') => {
            let suggestions = app.label_suggestions(task.parent_id.as_deref());
            app.mode = Mode::EditTask(
                TaskForm::for_edit(&task, suggestions).returning_to(Mode::TaskInfo(state)),
            );
            Vec::new()
        }
        KeyCode::Char('c') => open_thread(
            app,
            CommentTarget::Task(task.id.clone()),
            task.title.clone(),
            Mode::TaskInfo(state),
        ),
        KeyCode::Char('b') => {
            open_inspector(app, task, InspectorOrigin::TaskInfo, Mode::TaskInfo(state))
        }
        KeyCode::Char('d') => {
            open_due_picker(
                app,
                PickTarget::Task(task.id.clone()),
                task.due_at,
                Mode::TaskInfo(state),
            );
            Vec::new()
        }
        KeyCode::Char('t') => {
            open_label_picker(
                app,
                PickTarget::Task(task.id.clone()),
                task.parent_id.as_deref(),
                task.labels.clone(),
                Mode::TaskInfo(state),
            );
            Vec::new()
        }
        KeyCode::Char('f') => {
            app.mode = Mode::Normal;
            app.focus_task(&task.id);
            Vec::new()
        }
        _ => {
            app.mode = Mode::TaskInfo(state);
            Vec::new()
        }
    }
}

pub(super) fn handle_thread(app: &mut App, mut state: ThreadState, key: KeyEvent) -> Vec<Request> {
    match key.code {
        KeyCode::Esc => {
            app.mode = *state.back;
            Vec::new()
        }
        KeyCode::Up => {
            state.scroll = state.scroll.saturating_sub(1);
            app.mode = Mode::Thread(state);
            Vec::new()
        }
        KeyCode::Down => {
            if state.scroll + 1 < state.comments.len() {
                state.scroll += 1;
            }
            app.mode = Mode::Thread(state);
            Vec::new()
        }
        KeyCode::Enter => {
            let body = state.input.text().trim().to_string();
            if body.is_empty() || state.posting {
                app.mode = Mode::Thread(state);
                return Vec::new();
            }
            let project_id = match &state.target {
                CommentTarget::Project(id) => Some(id.clone()),
                CommentTarget::Task(id) => app.tasks.get(id).map(|t| t.project_id.clone()),
            };
            let Some(project_id) = project_id else {
                app.set_error("task no longer exists");
                app.mode = Mode::Thread(state);
                return Vec::new();
            };
            state.posting = true;
            let input = CommentInput {
                project_id,
                target: state.target.clone(),
                author: app.config.identity.display_name.clone(),
                body_markdown: body,
            };
            app.mode = Mode::Thread(state);
            vec![Request::PostComment(input)]
        }
        _ => {
            state.input.handle_key(&key);
            app.mode = Mode::Thread(state);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkKind;
    use crate::ops::test_support::child;
    use crate::tui::input::test_keys::{code, fixture, key};
    use crate::tui::input::update;

    fn with_children() -> App {
        let mut app = fixture();
        if let Some(t) = app.tasks.get_mut("a") {
            t.kind = WorkKind::Phase;
        }
        for t in [
            child("k1", "Kid one", "a", WorkKind::Task),
            child("k2", "Kid two", "a", WorkKind::Task),
            child("g", "Grandkid", "k2", WorkKind::Subtask),
        ] {
            app.tasks.insert(t.id.clone(), t);
        }
        app
    }

    fn stack(app: &App) -> Vec<String> {
        match &app.mode {
            Mode::TaskInfo(state) => state.stack.iter().map(|f| f.task_id.clone()).collect(),
            other => panic!("expected task info, got {}", other.name()),
        }
    }

    #[test]
    fn edit_from_info_returns_to_info() {
        let mut app = with_children();
        update(&mut app, key('i'));
        update(&mut app, key('e'));
        assert_eq!(app.mode.name(), "edit-task");
        update(&mut app, code(KeyCode::Esc));
        assert_eq!(stack(&app), vec!["a"]);

        update(&mut app, key('e'));
        update(&mut app, key('!'));
        let requests = update(&mut app, code(KeyCode::Enter));
        assert!(matches!(requests.as_slice(), [Request::ApplySet { .. }]));
        assert_eq!(stack(&app), vec!["a"]);
    }

    #[test]
    fn enter_descends_and_esc_climbs_back() {
        let mut app = with_children();
        update(&mut app, key('i'));
        assert_eq!(stack(&app), vec!["a"]);
        update(&mut app, key('j'));
        update(&mut app, code(KeyCode::Enter));
        assert_eq!(stack(&app), vec!["a", "k2"]);
        update(&mut app, code(KeyCode::Enter));
        assert_eq!(stack(&app), vec!["a", "k2", "g"]);
        update(&mut app, code(KeyCode::Esc));
        update(&mut app, code(KeyCode::Esc));
        let Mode::TaskInfo(state) = &app.mode else {
            panic!("expected task info");
        };
        assert_eq!(state.current().map(|f| f.child_cursor), Some(1));
        update(&mut app, code(KeyCode::Esc));
        assert_eq!(app.mode.name(), "normal");
    }

    #[test]
    fn archived_children_follow_the_board_toggle() {
        let mut app = with_children();
        if let Some(t) = app.tasks.get_mut("k1") {
            t.archived_at = Some(t.created_at);
        }
        assert_eq!(info_children(&app, "a").len(), 1);
        app.show_archived = true;
        assert_eq!(info_children(&app, "a").len(), 2);
    }

    #[test]
    fn comments_return_to_task_info() {
        let mut app = with_children();
        update(&mut app, key('i'));
        let requests = update(&mut app, key('c'));
        assert_eq!(
            requests,
            vec![Request::LoadComments(CommentTarget::Task("a".into()))]
        );
        for c in "looks good".chars() {
            update(&mut app, key(c));
        }
        let requests = update(&mut app, code(KeyCode::Enter));
        let [Request::PostComment(input)] = requests.as_slice() else {
            panic!("expected a post");
        };
        assert_eq!(input.author, "Tester");
        assert_eq!(input.body_markdown, "looks good");
        assert_eq!(input.project_id, "p1");
        assert!(update(&mut app, code(KeyCode::Enter)).is_empty());
        update(&mut app, code(KeyCode::Esc));
        assert_eq!(stack(&app), vec!["a"]);
    }

    #[test]
    fn focus_jumps_the_board_to_a_nested_task() {
        let mut app = with_children();
        update(&mut app, key('i'));
        update(&mut app, code(KeyCode::Enter));
        update(&mut app, key('f'));
        assert_eq!(app.mode.name(), "normal");
        assert_eq!(app.projection_root.as_deref(), Some("a"));
        assert_eq!(app.current_task_id().as_deref(), Some("k1"));
    }
}
