//! Results coming back from the worker. A result whose context is gone
//! (the mode closed, the project changed) is dropped.

use crate::model::{Project, TaskMatch};
use crate::ops::deps::{StateId, derive_state_id};
use crate::service::ServiceError;
use crate::tui::app::{ActivityEntry, App};
use crate::tui::effects::{Request, SetKind, StepOutcome};
use crate::tui::modes::{Mode, PickerState};
use crate::tui::msg::Msg;
use crate::tui::undo::{ActionSet, HistoryStep};

use super::actions::rebuild_candidates;

pub(super) fn apply_result(app: &mut App, msg: Msg) -> Vec<Request> {
    match msg {
        Msg::ProjectsLoaded(result) => projects_loaded(app, result),
        Msg::BoardLoaded { project_id, result } => {
            if app.project.is_some() && app.project_id() != Some(project_id.as_str()) {
                tracing::debug!(project_id, "dropping board for a closed project");
                return Vec::new();
            }
            match result {
                Ok(board) => {
                    tracing::debug!(tasks = board.tasks.len(), "board loaded");
                    app.apply_board(board);
                }
                Err(e) => {
                    app.board_loading = false;
                    app.set_error(format!("could not load board: {}", e));
                }
            }
            Vec::new()
        }
        Msg::SetApplied {
            project_id,
            kind,
            set,
            result,
        } => set_applied(app, project_id, kind, set, result),
        Msg::TaskCreated(result) => task_created(app, result),
        Msg::ProjectSaved { created, result } => match result {
            Ok(project) => project_saved(app, created, project),
            Err(e) => {
                app.set_error(format!("could not save project: {}", e));
                Vec::new()
            }
        },
        Msg::ProjectDeleted { id, result } => match result {
            Ok(()) => project_deleted(app, &id),
            Err(e) => {
                app.set_error(format!("could not delete project: {}", e));
                Vec::new()
            }
        },
        Msg::SearchLoaded { query, result } => {
            let states = enabled_states(app);
            let Mode::SearchResults(state) = &mut app.mode else {
                return Vec::new();
            };
            if state.query != query {
                return Vec::new();
            }
            state.loading = false;
            match result {
                Ok(matches) => {
                    let include_archived = state.include_archived;
                    state.matches = filter_states(matches, &states, include_archived);
                    state.selected = 0;
                    state.scroll = 0;
                    let count = state.matches.len();
                    let noun = if count == 1 { "match" } else { "matches" };
                    app.set_status(format!("{} {}", count, noun));
                }
                Err(e) => app.set_error(format!("search failed: {}", e)),
            }
            Vec::new()
        }
        Msg::CandidatesLoaded { owner_id, result } => {
            let visible = app.board_rows_visible();
            let Mode::DependencyInspector(state) = &mut app.mode else {
                return Vec::new();
            };
            if state.owner.id != owner_id {
                return Vec::new();
            }
            state.loading = false;
            match result {
                Ok(pool) => {
                    state.pool = pool;
                    rebuild_candidates(state, visible);
                }
                Err(e) => app.set_error(format!("could not load candidates: {}", e)),
            }
            Vec::new()
        }
        Msg::CommentsLoaded { target, result } => {
            let Mode::Thread(state) = &mut app.mode else {
                return Vec::new();
            };
            if state.target != target {
                return Vec::new();
            }
            state.loading = false;
            match result {
                Ok(comments) => {
                    state.comments = comments;
                    state.scroll = 0;
                }
                Err(e) => app.set_error(format!("could not load comments: {}", e)),
            }
            Vec::new()
        }
        Msg::CommentPosted(result) => {
            match result {
                Ok(comment) => {
                    let mut title = None;
                    if let Mode::Thread(state) = &mut app.mode {
                        state.posting = false;
                        if state.target == comment.target {
                            state.input.clear();
                            title = Some(state.title.clone());
                            state.comments.push(comment);
                        }
                    }
                    if let Some(title) = title {
                        app.activity.push(title, "commented");
                    }
                    app.set_status("comment posted");
                }
                Err(e) => {
                    if let Mode::Thread(state) = &mut app.mode {
                        state.posting = false;
                    }
                    app.set_error(format!("could not post comment: {}", e));
                }
            }
            Vec::new()
        }
        Msg::ActivityLoaded { project_id, result } => {
            if app.project_id() != Some(project_id.as_str()) {
                return Vec::new();
            }
            if let Mode::ActivityLog(state) = &mut app.mode {
                state.loading = false;
            }
            match result {
                Ok(events) => {
                    let entries = events
                        .iter()
                        .map(|e| ActivityEntry::from_event(e, &app.tasks))
                        .collect();
                    app.activity.set_persisted(entries);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "change events unavailable");
                    app.set_error(format!("activity unavailable: {}", e));
                }
            }
            Vec::new()
        }
        Msg::RollupLoaded { project_id, result } => {
            if app.project_id() == Some(project_id.as_str()) {
                match result {
                    Ok(rollup) => app.rollup = rollup,
                    Err(e) => tracing::warn!(error = %e, "rollup unavailable"),
                }
            }
            Vec::new()
        }
        Msg::DirListed { dir, result } => {
            let Mode::ResourcePicker(state) = &mut app.mode else {
                return Vec::new();
            };
            if state.dir != dir {
                return Vec::new();
            }
            state.loading = false;
            match result {
                Ok(entries) => {
                    state.entries = entries;
                    state.error = None;
                }
                Err(e) => state.error = Some(e),
            }
            Vec::new()
        }
        Msg::ConfigSaved(result) => {
            match result {
                Ok(config) => {
                    app.saved_config = config.clone();
                    app.config = config;
                }
                Err(e) => {
                    let display_name = std::mem::take(&mut app.config.identity.display_name);
                    app.config = app.saved_config.clone();
                    // Changes still need an author for this session
                    if app.config.needs_bootstrap() {
                        app.config.identity.display_name = display_name;
                    }
                    app.set_error(format!("could not save settings: {}", e));
                }
            }
            Vec::new()
        }
        other @ (Msg::Key(_) | Msg::Mouse(_) | Msg::Resize { .. }) => {
            tracing::debug!(?other, "input routed to result handling");
            Vec::new()
        }
    }
}

fn enabled_states(app: &App) -> Vec<StateId> {
    app.config
        .search
        .states
        .iter()
        .filter_map(|s| StateId::parse(s))
        .collect()
}

/// Keep hits in an enabled state; archived hits only when asked for.
fn filter_states(
    matches: Vec<TaskMatch>,
    states: &[StateId],
    include_archived: bool,
) -> Vec<TaskMatch> {
    matches
        .into_iter()
        .filter(|m| match derive_state_id(&m.task) {
            StateId::Archived => include_archived,
            state => states.is_empty() || states.contains(&state),
        })
        .collect()
}

fn projects_loaded(app: &mut App, result: Result<Vec<Project>, ServiceError>) -> Vec<Request> {
    let projects = match result {
        Ok(projects) => projects,
        Err(e) => {
            if let Mode::ProjectPicker(state) = &mut app.mode {
                state.loading = false;
            }
            app.set_error(format!("could not load projects: {}", e));
            return Vec::new();
        }
    };
    tracing::debug!(count = projects.len(), "projects loaded");
    app.projects = projects;
    if let Some(id) = app.project_id().map(str::to_string) {
        app.project = app.projects.iter().find(|p| p.id == id).cloned();
    }
    if let Mode::ProjectPicker(state) = &mut app.mode {
        state.loading = false;
        let len = state.visible(&app.projects).len();
        state.selected = state.selected.min(len.saturating_sub(1));
    }
    if matches!(app.mode, Mode::BootstrapSettings(_)) {
        return Vec::new();
    }
    let Some(wanted) = app.startup_project.take() else {
        return Vec::new();
    };
    match app
        .projects
        .iter()
        .find(|p| p.slug == wanted || p.id == wanted)
        .map(|p| p.id.clone())
    {
        Some(id) => app.select_project(&id),
        None => {
            app.mode = Mode::ProjectPicker(PickerState::default());
            app.set_error(format!("no project matches {}", wanted));
            Vec::new()
        }
    }
}

fn rollup_request(app: &App) -> Vec<Request> {
    app.project_id()
        .map(|id| Request::LoadRollup {
            project_id: id.to_string(),
        })
        .into_iter()
        .collect()
}

fn set_applied(
    app: &mut App,
    project_id: String,
    kind: SetKind,
    set: ActionSet,
    result: Result<Vec<StepOutcome>, ServiceError>,
) -> Vec<Request> {
    if app.project_id() != Some(project_id.as_str()) {
        tracing::debug!(label = %set.label, "dropping result for a closed project");
        app.history.abandon();
        return Vec::new();
    }
    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            let verb = match kind {
                SetKind::Perform => {
                    app.history.end(None);
                    "could not"
                }
                SetKind::Undo => {
                    app.history.restore_undo(set.clone());
                    "could not undo"
                }
                SetKind::Redo => {
                    app.history.restore_redo(set.clone());
                    "could not redo"
                }
            };
            app.set_error(format!("{} {}: {}", verb, set.label, e));
            return app.reload_board();
        }
    };
    app.apply_outcomes(outcomes);
    let target = match set.steps.as_slice() {
        [only] => app.task_title(only.task_id()),
        steps => format!("{} tasks", steps.len()),
    };
    match kind {
        SetKind::Perform => {
            app.activity.push(target, set.label.clone());
            app.set_status(set.label.clone());
            let moved = set.steps.iter().find_map(|s| match s {
                HistoryStep::Move { task_id, .. } => Some(task_id.clone()),
                _ => None,
            });
            if let Some(id) = moved {
                app.focus_task(&id);
            }
            app.history.end(Some(set));
        }
        SetKind::Undo => {
            app.activity.push(target, format!("undo {}", set.label));
            app.set_status(format!("Undo: {}", set.label));
            app.history.finish_undo(set);
        }
        SetKind::Redo => {
            app.activity.push(target, format!("redo {}", set.label));
            app.set_status(format!("Redo: {}", set.label));
            app.history.finish_redo(set);
        }
    }
    app.clamp_cursor();
    rollup_request(app)
}

fn task_created(app: &mut App, result: Result<crate::model::Task, ServiceError>) -> Vec<Request> {
    let task = match result {
        Ok(task) => task,
        Err(e) => {
            app.history.end(None);
            app.set_error(format!("could not add task: {}", e));
            return Vec::new();
        }
    };
    if app.project_id() != Some(task.project_id.as_str()) {
        app.history.abandon();
        return Vec::new();
    }
    let label = format!("add {}", task.title);
    let id = task.id.clone();
    app.tasks.insert(id.clone(), task);
    let title = app.task_title(&id);
    app.activity.push(title, "added");
    app.history.end(Some(ActionSet::single(
        label.clone(),
        HistoryStep::Create { task_id: id.clone() },
    )));
    app.focus_task(&id);
    app.set_status(label);
    rollup_request(app)
}

fn project_saved(app: &mut App, created: bool, project: Project) -> Vec<Request> {
    match app.projects.iter_mut().find(|p| p.id == project.id) {
        Some(existing) => *existing = project.clone(),
        None => app.projects.push(project.clone()),
    }
    if app.project_id() == Some(project.id.as_str()) {
        app.project = Some(project.clone());
    }
    if let Mode::ProjectPicker(state) = &mut app.mode {
        let len = state.visible(&app.projects).len();
        state.selected = state.selected.min(len.saturating_sub(1));
    }
    if created {
        tracing::info!(slug = %project.slug, "project created");
        app.set_status(format!("created project {}", project.name));
        return app.select_project(&project.id);
    }
    let verb = if project.is_archived() {
        "archived"
    } else {
        "saved"
    };
    app.set_status(format!("{} project {}", verb, project.name));
    Vec::new()
}

fn project_deleted(app: &mut App, id: &str) -> Vec<Request> {
    app.projects.retain(|p| p.id != id);
    app.set_status("project deleted");
    if app.project_id() != Some(id) {
        if let Mode::ProjectPicker(state) = &mut app.mode {
            let len = state.visible(&app.projects).len();
            state.selected = state.selected.min(len.saturating_sub(1));
        }
        return Vec::new();
    }
    tracing::info!(project_id = id, "open project deleted");
    app.project = None;
    app.tasks.clear();
    app.columns.clear();
    app.selection.clear();
    app.projection_root = None;
    app.history.clear();
    app.activity.clear_persisted();
    app.mode = Mode::ProjectPicker(PickerState {
        loading: true,
        ..Default::default()
    });
    vec![Request::LoadProjects]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, CommentTarget, Config};
    use crate::ops::test_support::{epoch, task};
    use crate::tui::input::test_keys::{fixture, key};
    use crate::tui::input::update;
    use crate::tui::modes::{ResultsState, ThreadState};
    use crate::util::text_input::TextInput;
    use std::path::PathBuf;

    fn moved(id: &str, to: &str, position: i64) -> crate::model::Task {
        let mut t = task(id, &id.to_uppercase());
        t.column_id = to.into();
        t.position = position;
        t
    }

    fn perform_move(app: &mut App) -> ActionSet {
        let requests = update(app, key(']'));
        let [Request::ApplySet { set, .. }] = requests.as_slice() else {
            panic!("expected a set, got {:?}", requests);
        };
        set.clone()
    }

    #[test]
    fn successful_perform_lands_on_the_undo_stack() {
        let mut app = fixture();
        let set = perform_move(&mut app);
        assert!(app.history.is_busy());
        let requests = update(
            &mut app,
            Msg::SetApplied {
                project_id: "p1".into(),
                kind: SetKind::Perform,
                set,
                result: Ok(vec![StepOutcome::Saved(moved("a", "c2", 0))]),
            },
        );
        assert_eq!(
            requests,
            vec![Request::LoadRollup {
                project_id: "p1".into()
            }]
        );
        assert!(!app.history.is_busy());
        assert_eq!(app.history.undo_len(), 1);
        assert_eq!(app.status.text, "move 1 task to Done");
        assert_eq!(app.focus_column, 1);
        assert_eq!(app.current_task_id().as_deref(), Some("a"));
    }

    #[test]
    fn failed_perform_records_nothing_and_reloads() {
        let mut app = fixture();
        let set = perform_move(&mut app);
        let requests = update(
            &mut app,
            Msg::SetApplied {
                project_id: "p1".into(),
                kind: SetKind::Perform,
                set,
                result: Err(ServiceError::Storage("disk full".into())),
            },
        );
        assert_eq!(
            requests,
            vec![Request::LoadBoard {
                project_id: "p1".into()
            }]
        );
        assert_eq!(app.history.undo_len(), 0);
        assert!(!app.history.is_busy());
        assert!(app.status.is_error);
    }

    #[test]
    fn failed_undo_keeps_the_entry() {
        let mut app = fixture();
        let set = ActionSet::single(
            "rename A to X",
            HistoryStep::Rename {
                task_id: "a".into(),
                from: "A".into(),
                to: "X".into(),
            },
        );
        app.history.push(set);
        let requests = update(&mut app, key('u'));
        let [Request::ApplySet { set, kind, .. }] = requests.as_slice() else {
            panic!("expected an undo set");
        };
        assert_eq!(*kind, SetKind::Undo);
        update(
            &mut app,
            Msg::SetApplied {
                project_id: "p1".into(),
                kind: SetKind::Undo,
                set: set.clone(),
                result: Err(ServiceError::NotFound {
                    kind: "task",
                    id: "a".into(),
                }),
            },
        );
        assert_eq!(app.history.undo_len(), 1);
        assert_eq!(app.history.redo_len(), 0);
        assert!(app.status.text.starts_with("could not undo rename A to X"));
    }

    #[test]
    fn undo_success_reports_and_enables_redo() {
        let mut app = fixture();
        let set = ActionSet::single(
            "rename A to X",
            HistoryStep::Rename {
                task_id: "a".into(),
                from: "A".into(),
                to: "X".into(),
            },
        );
        app.history.push(set.clone());
        update(&mut app, key('u'));
        update(
            &mut app,
            Msg::SetApplied {
                project_id: "p1".into(),
                kind: SetKind::Undo,
                set,
                result: Ok(vec![StepOutcome::Saved(task("a", "A"))]),
            },
        );
        assert_eq!(app.status.text, "Undo: rename A to X");
        assert_eq!(app.history.redo_len(), 1);
        assert_eq!(app.activity.local_len(), 1);
    }

    #[test]
    fn results_for_a_closed_project_are_dropped() {
        let mut app = fixture();
        let set = perform_move(&mut app);
        if let Some(project) = app.project.as_mut() {
            project.id = "p9".into();
        }
        update(
            &mut app,
            Msg::SetApplied {
                project_id: "p1".into(),
                kind: SetKind::Perform,
                set,
                result: Ok(vec![StepOutcome::Saved(moved("a", "c2", 0))]),
            },
        );
        assert!(!app.history.is_busy());
        assert_eq!(app.history.undo_len(), 0);
        assert_eq!(app.tasks["a"].column_id, "c1");
    }

    #[test]
    fn created_task_becomes_one_undoable_entry() {
        let mut app = fixture();
        app.history.begin();
        let mut created = task("n", "New");
        created.position = 2;
        update(&mut app, Msg::TaskCreated(Ok(created)));
        assert_eq!(
            app.history.peek_undo(),
            Some(&ActionSet::single(
                "add New",
                HistoryStep::Create {
                    task_id: "n".into()
                }
            ))
        );
        assert_eq!(app.current_task_id().as_deref(), Some("n"));
        assert_eq!(app.status.text, "add New");
    }

    #[test]
    fn startup_project_opens_by_slug_or_falls_back_to_picker() {
        let mut config = Config::default();
        config.identity.display_name = "T".into();
        let mut app = App::new(config.clone(), PathBuf::new(), Some("web".into()), false);
        let project = Project {
            id: "p1".into(),
            slug: "web".into(),
            name: "Web".into(),
            description: String::new(),
            metadata: Default::default(),
            created_at: epoch(),
            archived_at: None,
        };
        let requests = update(&mut app, Msg::ProjectsLoaded(Ok(vec![project.clone()])));
        assert_eq!(
            requests,
            vec![Request::LoadBoard {
                project_id: "p1".into()
            }]
        );
        assert_eq!(app.project.as_ref().map(|p| p.name.as_str()), Some("Web"));

        let mut app = App::new(config, PathBuf::new(), Some("nope".into()), false);
        assert!(update(&mut app, Msg::ProjectsLoaded(Ok(vec![project]))).is_empty());
        assert_eq!(app.mode.name(), "project-picker");
        assert_eq!(app.status.text, "no project matches nope");
    }

    #[test]
    fn deleting_the_open_project_returns_to_the_picker() {
        let mut app = fixture();
        let requests = update(
            &mut app,
            Msg::ProjectDeleted {
                id: "p1".into(),
                result: Ok(()),
            },
        );
        assert_eq!(requests, vec![Request::LoadProjects]);
        assert!(app.project.is_none());
        assert!(app.tasks.is_empty());
        assert_eq!(app.mode.name(), "project-picker");
    }

    #[test]
    fn search_results_drop_disabled_states() {
        let mut app = fixture();
        app.config.search.states = vec!["todo".into()];
        app.mode = Mode::SearchResults(ResultsState {
            query: "x".into(),
            cross_project: false,
            include_archived: false,
            matches: vec![],
            selected: 0,
            scroll: 0,
            loading: true,
        });
        let mut done = task("d", "Done");
        done.lifecycle_state = crate::model::LifecycleState::Done;
        let hits = [task("t", "Todo"), done]
            .into_iter()
            .map(|t| TaskMatch {
                project_id: "p1".into(),
                project_name: "P".into(),
                task: t,
            })
            .collect();
        update(
            &mut app,
            Msg::SearchLoaded {
                query: "stale".into(),
                result: Ok(vec![]),
            },
        );
        assert!(matches!(&app.mode, Mode::SearchResults(r) if r.loading));
        update(
            &mut app,
            Msg::SearchLoaded {
                query: "x".into(),
                result: Ok(hits),
            },
        );
        let Mode::SearchResults(state) = &app.mode else {
            panic!("expected results");
        };
        assert!(!state.loading);
        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.matches[0].task.id, "t");
    }

    #[test]
    fn posted_comment_joins_the_open_thread() {
        let mut app = fixture();
        app.mode = Mode::Thread(ThreadState {
            target: CommentTarget::Task("a".into()),
            title: "A".into(),
            comments: vec![],
            loading: false,
            posting: true,
            input: TextInput::with_text("hi"),
            scroll: 0,
            back: Box::new(Mode::Normal),
        });
        update(
            &mut app,
            Msg::CommentPosted(Ok(Comment {
                id: "c".into(),
                project_id: "p1".into(),
                target: CommentTarget::Task("a".into()),
                author: "Tester".into(),
                body_markdown: "hi".into(),
                created_at: epoch(),
            })),
        );
        let Mode::Thread(state) = &app.mode else {
            panic!("expected thread");
        };
        assert!(!state.posting);
        assert!(state.input.is_empty());
        assert_eq!(state.comments.len(), 1);
    }

    #[test]
    fn failed_settings_write_is_reported() {
        let mut app = fixture();
        update(&mut app, Msg::ConfigSaved(Err("read-only".into())));
        assert_eq!(app.status.text, "could not save settings: read-only");
    }
}
