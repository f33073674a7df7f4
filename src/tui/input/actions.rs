//! Command handlers shared by the key map, the palette and quick actions.

use crate::io::config_io::ConfigEdit;
use crate::model::{CommentTarget, Task, TaskFields};
use crate::ops::deps::{CandidateFilter, DepField, PendingLinks, StateId, build_candidates};
use crate::ops::fields::{format_due, format_list};
use crate::ops::labels::merge_label_sources;
use crate::ops::projection::{breadcrumb, can_focus};
use crate::tui::app::{ACTIVITY_FETCH_LIMIT, App};
use crate::tui::command_actions::{CommandId, guard, spec};
use crate::tui::effects::{Request, SetKind};
use crate::tui::modes::{
    ActivityState, BootstrapState, ColorState, DuePickerState, HIGHLIGHT_COLORS, InspectorFocus,
    InspectorOrigin, InspectorState, LabelPickerState, LabelsConfigState, LabelsField, Mode,
    PathsState, PendingAction, PickTarget, PickerState, ProjectFormState, RenameState,
    ResourcePickerState, SearchState, TaskForm, TaskInfoState, ThreadState,
};
use crate::tui::undo::{ActionSet, HistoryStep, UndoOutcome};
use crate::util::keep_visible;
use crate::util::text_input::TextInput;

/// Run a registered command if its guard allows it.
pub fn run_command(app: &mut App, id: CommandId) -> Vec<Request> {
    if let Some(reason) = guard(app, id) {
        let name = spec(id).map(|s| s.name).unwrap_or("command");
        app.set_error(format!("{} unavailable: {}", name, reason));
        return Vec::new();
    }
    let current = app.current_task().cloned();
    match id {
        CommandId::AddTask => {
            let parent = app
                .projection_root
                .as_ref()
                .and_then(|id| app.tasks.get(id))
                .cloned();
            open_add_form(app, parent.as_ref())
        }
        CommandId::AddSubtask => open_add_form(app, current.as_ref()),
        CommandId::EditTask => {
            if let Some(task) = current {
                let suggestions = app.label_suggestions(task.parent_id.as_deref());
                app.mode = Mode::EditTask(TaskForm::for_edit(&task, suggestions));
            }
            Vec::new()
        }
        CommandId::RenameTask => {
            if let Some(task) = current {
                app.mode = Mode::Rename(RenameState {
                    input: TextInput::with_text(&task.title),
                    original: task.title,
                    task_id: task.id,
                });
            }
            Vec::new()
        }
        CommandId::TaskInfo => {
            if let Some(task) = current {
                app.mode = Mode::TaskInfo(TaskInfoState::new(&task.id));
            }
            Vec::new()
        }
        CommandId::Comments => match current {
            Some(task) => open_thread(app, CommentTarget::Task(task.id), task.title, Mode::Normal),
            None => Vec::new(),
        },
        CommandId::ProjectComments => match app.project.clone() {
            Some(project) => open_thread(
                app,
                CommentTarget::Project(project.id),
                project.name,
                Mode::Normal,
            ),
            None => Vec::new(),
        },
        CommandId::DueDate => {
            if let Some(task) = current {
                open_due_picker(app, PickTarget::Task(task.id.clone()), task.due_at, Mode::Normal);
            }
            Vec::new()
        }
        CommandId::Labels => {
            if let Some(task) = current {
                open_label_picker(
                    app,
                    PickTarget::Task(task.id.clone()),
                    task.parent_id.as_deref(),
                    task.labels.clone(),
                    Mode::Normal,
                );
            }
            Vec::new()
        }
        CommandId::Dependencies => match current {
            Some(task) => open_inspector(app, task, InspectorOrigin::Board, Mode::Normal),
            None => Vec::new(),
        },
        CommandId::AttachResource => match current {
            Some(task) => open_resource_picker(app, PickTarget::Task(task.id), Mode::Normal),
            None => Vec::new(),
        },
        CommandId::MoveLeft => move_selection(app, -1),
        CommandId::MoveRight => move_selection(app, 1),
        CommandId::Archive => {
            let ids = app.selected_or_current();
            perform(app, PendingAction::Archive(ids), false)
        }
        CommandId::Restore => {
            let ids = app.selected_or_current();
            perform(app, PendingAction::Restore(ids), false)
        }
        CommandId::HardDelete => {
            let ids = app.selected_or_current();
            perform(app, PendingAction::HardDelete(ids), false)
        }
        CommandId::FocusInto => {
            if let Some(task) = current {
                focus_into(app, &task.id);
            }
            Vec::new()
        }
        CommandId::FocusOut => {
            focus_out(app);
            Vec::new()
        }
        CommandId::ClearSelection => {
            app.selection.clear();
            app.set_status("selection cleared");
            Vec::new()
        }
        CommandId::Undo => undo(app),
        CommandId::Redo => redo(app),
        CommandId::Search => {
            app.mode = Mode::Search(SearchState {
                input: TextInput::new(),
                cross_project: app.config.search.cross_project,
                include_archived: app.config.search.include_archived,
            });
            Vec::new()
        }
        CommandId::Projects => open_project_picker(app),
        CommandId::NewProject => {
            app.mode = Mode::ProjectForm(ProjectFormState::new(None, Mode::Normal));
            Vec::new()
        }
        CommandId::EditProject => {
            let project = app.project.clone();
            app.mode = Mode::ProjectForm(ProjectFormState::new(project.as_ref(), Mode::Normal));
            Vec::new()
        }
        CommandId::ArchiveProject => match app.project_id() {
            Some(id) => vec![Request::ArchiveProject { id: id.to_string() }],
            None => Vec::new(),
        },
        CommandId::DeleteProject => match app.project.clone() {
            Some(project) => perform(
                app,
                PendingAction::DeleteProject {
                    id: project.id,
                    name: project.name,
                },
                false,
            ),
            None => Vec::new(),
        },
        CommandId::Activity => match app.project_id() {
            Some(id) => {
                let project_id = id.to_string();
                app.mode = Mode::ActivityLog(ActivityState {
                    loading: true,
                    ..Default::default()
                });
                vec![Request::LoadActivity {
                    project_id,
                    limit: ACTIVITY_FETCH_LIMIT,
                }]
            }
            None => Vec::new(),
        },
        CommandId::ToggleArchived => {
            app.show_archived = !app.show_archived;
            app.clamp_cursor();
            app.set_status(if app.show_archived {
                "showing archived tasks"
            } else {
                "hiding archived tasks"
            });
            Vec::new()
        }
        CommandId::ToggleMouse => {
            app.mouse_selection = !app.mouse_selection;
            app.set_status(if app.mouse_selection {
                "mouse selection on: the terminal owns the mouse"
            } else {
                "mouse selection off"
            });
            vec![Request::SaveConfig {
                path: app.config_path.clone(),
                edits: vec![ConfigEdit::MouseSelection(app.mouse_selection)],
            }]
        }
        CommandId::HighlightColor => {
            let current = app.config.ui.highlight_color.clone();
            let preset = HIGHLIGHT_COLORS.iter().position(|c| *c == current);
            app.mode = Mode::HighlightColor(ColorState {
                selected: preset.unwrap_or(0),
                input: TextInput::with_text(if preset.is_some() { "" } else { current.as_str() }),
            });
            Vec::new()
        }
        CommandId::LabelsConfig => {
            let slug = app.project.as_ref().map(|p| p.slug.clone());
            let project_labels = slug
                .as_deref()
                .map(|s| format_list(app.config.project_labels(s)))
                .unwrap_or_default();
            app.mode = Mode::LabelsConfig(LabelsConfigState {
                global: TextInput::with_text(format_list(&app.config.labels.global)),
                project: TextInput::with_text(project_labels),
                focus: if slug.is_some() {
                    LabelsField::Project
                } else {
                    LabelsField::Global
                },
                slug,
            });
            Vec::new()
        }
        CommandId::PathsRoots => {
            let slug = app.project_slug().to_string();
            let root = app.config.project_root(&slug).unwrap_or_default().to_string();
            app.mode = Mode::PathsRoots(PathsState {
                slug,
                input: TextInput::with_text(root),
            });
            Vec::new()
        }
        CommandId::Identity => {
            app.mode = Mode::BootstrapSettings(BootstrapState {
                name: TextInput::with_text(&app.config.identity.display_name),
                error: None,
            });
            Vec::new()
        }
        CommandId::Reload => app.reload_board(),
        CommandId::Quit => vec![Request::Quit],
    }
}

// ---------------------------------------------------------------------------
// Opening modes
// ---------------------------------------------------------------------------

pub(super) fn open_add_form(app: &mut App, parent: Option<&Task>) -> Vec<Request> {
    let Some(project_id) = app.project_id().map(str::to_string) else {
        return Vec::new();
    };
    let Some(column) = app.columns.get(app.focus_column) else {
        app.set_error("project has no columns");
        return Vec::new();
    };
    let column_id = column.id.clone();
    let suggestions = app.label_suggestions(parent.map(|p| p.id.as_str()));
    app.mode = Mode::AddTask(TaskForm::for_add(
        &project_id,
        parent,
        &column_id,
        suggestions,
    ));
    Vec::new()
}

pub(super) fn open_project_picker(app: &mut App) -> Vec<Request> {
    let selected = app
        .project_id()
        .and_then(|id| app.projects.iter().position(|p| p.id == id))
        .unwrap_or(0);
    app.mode = Mode::ProjectPicker(PickerState {
        selected,
        loading: true,
        ..Default::default()
    });
    vec![Request::LoadProjects]
}

pub(super) fn open_thread(
    app: &mut App,
    target: CommentTarget,
    title: String,
    back: Mode,
) -> Vec<Request> {
    app.mode = Mode::Thread(ThreadState {
        target: target.clone(),
        title,
        comments: Vec::new(),
        loading: true,
        posting: false,
        input: TextInput::new(),
        scroll: 0,
        back: Box::new(back),
    });
    vec![Request::LoadComments(target)]
}

pub(super) fn open_due_picker(
    app: &mut App,
    target: PickTarget,
    current: Option<chrono::DateTime<chrono::Utc>>,
    back: Mode,
) {
    app.mode = Mode::DuePicker(DuePickerState {
        target,
        selected: 0,
        input: TextInput::with_text(format_due(current)),
        error: None,
        back: Box::new(back),
    });
}

pub(super) fn open_label_picker(
    app: &mut App,
    target: PickTarget,
    parent_id: Option<&str>,
    chosen: Vec<String>,
    back: Mode,
) {
    let suggestions = app.label_suggestions(parent_id);
    let options = merge_label_sources(crate::ops::labels::LabelSources {
        global: &suggestions,
        project: &chosen,
        phase: &[],
    });
    app.mode = Mode::LabelPicker(LabelPickerState {
        target,
        options,
        chosen,
        selected: 0,
        scroll: 0,
        input: TextInput::new(),
        back: Box::new(back),
    });
}

pub(super) fn open_inspector(
    app: &mut App,
    owner: Task,
    origin: InspectorOrigin,
    back: Mode,
) -> Vec<Request> {
    let search = &app.config.search;
    let mut states: Vec<StateId> = search
        .states
        .iter()
        .filter_map(|s| StateId::parse(s))
        .filter(|s| *s != StateId::Archived)
        .collect();
    states.sort();
    states.dedup();
    let include_archived = search.include_archived
        || search
            .states
            .iter()
            .any(|s| StateId::parse(s) == Some(StateId::Archived));
    let mut state = InspectorState {
        pending: PendingLinks::from_task(&owner),
        origin,
        field: DepField::DependsOn,
        focus: InspectorFocus::Query,
        query: TextInput::new(),
        states,
        include_archived,
        cross_project: search.cross_project,
        pool: Vec::new(),
        loading: true,
        rows: Vec::new(),
        selected: 0,
        scroll: 0,
        back: Box::new(back),
        owner,
    };
    rebuild_candidates(&mut state, app.board_rows_visible());
    let request = Request::LoadCandidates {
        owner_id: state.owner.id.clone(),
        project_id: state.owner.project_id.clone(),
        linked: state
            .owner
            .metadata
            .depends_on
            .iter()
            .chain(&state.owner.metadata.blocked_by)
            .cloned()
            .collect(),
    };
    app.mode = Mode::DependencyInspector(state);
    vec![request]
}

/// Refilter the rows, keeping the selection in range and on screen.
pub(super) fn rebuild_candidates(state: &mut InspectorState, visible: usize) {
    let query = state.query.text().to_string();
    state.rows = build_candidates(
        &state.owner,
        &state.pool,
        &CandidateFilter {
            query: &query,
            states: &state.states,
            include_archived: state.include_archived,
            cross_project: state.cross_project,
        },
    );
    state.selected = state.selected.min(state.rows.len().saturating_sub(1));
    state.scroll = keep_visible(state.selected, state.scroll, visible);
}

pub(super) fn open_resource_picker(app: &mut App, target: PickTarget, back: Mode) -> Vec<Request> {
    let slug = app.project_slug().to_string();
    let Some(root) = app.config.project_root(&slug).map(str::to_string) else {
        app.set_error(format!("no attachment root configured for {}", slug));
        app.mode = back;
        return Vec::new();
    };
    app.mode = Mode::ResourcePicker(ResourcePickerState {
        target,
        slug,
        root: root.clone(),
        dir: String::new(),
        entries: Vec::new(),
        selected: 0,
        scroll: 0,
        loading: true,
        error: None,
        back: Box::new(back),
    });
    vec![Request::ListDir {
        root,
        dir: String::new(),
    }]
}

// ---------------------------------------------------------------------------
// Focus
// ---------------------------------------------------------------------------

pub(super) fn focus_into(app: &mut App, task_id: &str) {
    if !can_focus(&app.tasks, task_id, app.show_archived) {
        app.set_status(format!("{} has nothing below it", app.task_title(task_id)));
        return;
    }
    app.projection_root = Some(task_id.to_string());
    app.selection.clear();
    app.cursor = 0;
    app.clamp_cursor();
    app.set_status(format!(
        "focus: {}",
        breadcrumb(&app.tasks, app.projection_root.as_deref())
    ));
}

pub(super) fn focus_out(app: &mut App) {
    let Some(root) = app.projection_root.take() else {
        return;
    };
    app.projection_root = app
        .tasks
        .get(&root)
        .and_then(|t| t.parent_id.clone())
        .filter(|p| app.tasks.contains_key(p));
    app.selection.clear();
    app.focus_task(&root);
    app.clamp_cursor();
    if app.projection_root.is_some() {
        let path = breadcrumb(&app.tasks, app.projection_root.as_deref());
        app.set_status(format!("focus: {}", path));
    } else {
        app.set_status("focus cleared");
    }
}

// ---------------------------------------------------------------------------
// Action sets
// ---------------------------------------------------------------------------

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

/// Send a gesture's steps to the service. History records it once it lands.
pub(super) fn submit_set(app: &mut App, set: ActionSet) -> Vec<Request> {
    if set.steps.is_empty() {
        app.set_status("nothing to change");
        return Vec::new();
    }
    let Some(project_id) = app.project_id().map(str::to_string) else {
        app.set_error("no project open");
        return Vec::new();
    };
    tracing::debug!(label = %set.label, steps = set.steps.len(), "performing action set");
    app.history.begin();
    vec![Request::ApplySet {
        project_id,
        kind: SetKind::Perform,
        set,
    }]
}

/// An undoable field update on one task.
pub(super) fn submit_update(
    app: &mut App,
    task_id: &str,
    label: String,
    edit: impl FnOnce(&mut TaskFields),
) -> Vec<Request> {
    let Some(task) = app.tasks.get(task_id) else {
        app.set_error(format!("task not found: {}", task_id));
        return Vec::new();
    };
    let before = TaskFields::from_task(task);
    let mut after = before.clone();
    edit(&mut after);
    if after == before {
        app.set_status("no changes");
        return Vec::new();
    }
    let set = ActionSet::single(
        label,
        HistoryStep::Update {
            task_id: task_id.to_string(),
            before: Box::new(before),
            after: Box::new(after),
        },
    );
    submit_set(app, set)
}

/// Move the selection (or the current task) `delta` columns. Each task is
/// appended to the end of its target column.
pub(super) fn move_selection(app: &mut App, delta: isize) -> Vec<Request> {
    let ids = app.selected_or_current();
    let mut next_position: std::collections::HashMap<String, i64> = Default::default();
    let mut steps = Vec::new();
    let mut targets = Vec::new();
    for id in &ids {
        let Some(task) = app.tasks.get(id) else {
            continue;
        };
        let Some(from) = app.column_index(&task.column_id) else {
            continue;
        };
        let to = from as isize + delta;
        if to < 0 || to as usize >= app.columns.len() {
            continue;
        }
        let column = &app.columns[to as usize];
        let position = *next_position.entry(column.id.clone()).or_insert_with(|| {
            app.tasks
                .values()
                .filter(|t| t.column_id == column.id)
                .map(|t| t.position)
                .max()
                .map_or(0, |p| p + 1)
        });
        next_position.insert(column.id.clone(), position + 1);
        steps.push(HistoryStep::Move {
            task_id: id.clone(),
            from_column: task.column_id.clone(),
            from_position: task.position,
            to_column: column.id.clone(),
            to_position: position,
        });
        targets.push(column.name.clone());
    }
    if steps.is_empty() {
        app.set_error("nothing can move that way");
        return Vec::new();
    }
    targets.dedup();
    let label = match targets.as_slice() {
        [only] => format!("move {} to {}", plural(steps.len(), "task"), only),
        _ => format!("move {}", plural(steps.len(), "task")),
    };
    submit_set(app, ActionSet::new(label, steps))
}

/// Run an archive, restore or delete, asking first when configured to.
pub(super) fn perform(app: &mut App, action: PendingAction, confirmed: bool) -> Vec<Request> {
    if !confirmed && app.needs_confirm(&action) {
        let back = std::mem::take(&mut app.mode);
        app.mode = Mode::Confirm(crate::tui::modes::ConfirmState {
            action,
            back: Box::new(back),
        });
        return Vec::new();
    }
    match action {
        PendingAction::Archive(ids) => {
            let steps: Vec<HistoryStep> = ids
                .iter()
                .filter(|id| app.tasks.get(*id).is_some_and(|t| !t.is_archived()))
                .map(|id| HistoryStep::Archive {
                    task_id: id.clone(),
                })
                .collect();
            let label = format!("archive {}", plural(steps.len(), "task"));
            submit_set(app, ActionSet::new(label, steps))
        }
        PendingAction::Restore(ids) => {
            let steps: Vec<HistoryStep> = ids
                .iter()
                .filter(|id| app.tasks.get(*id).is_some_and(|t| t.is_archived()))
                .map(|id| HistoryStep::Restore {
                    task_id: id.clone(),
                })
                .collect();
            let label = format!("restore {}", plural(steps.len(), "task"));
            submit_set(app, ActionSet::new(label, steps))
        }
        PendingAction::HardDelete(ids) => {
            let steps: Vec<HistoryStep> = ids
                .iter()
                .filter(|id| app.tasks.contains_key(*id))
                .map(|id| HistoryStep::HardDelete {
                    task_id: id.clone(),
                })
                .collect();
            let label = format!("delete {}", plural(steps.len(), "task"));
            submit_set(app, ActionSet::new(label, steps))
        }
        PendingAction::DeleteProject { id, .. } => vec![Request::DeleteProject { id }],
    }
}

pub(super) fn undo(app: &mut App) -> Vec<Request> {
    let outcome = match app.history.undo() {
        Ok(outcome) => outcome,
        Err(e) => {
            app.set_error(e.to_string());
            return Vec::new();
        }
    };
    match outcome {
        UndoOutcome::Irreversible(set) => {
            tracing::info!(label = %set.label, "dropping irreversible action set");
            app.activity
                .push(set.label.clone(), "could not undo: tasks were permanently deleted");
            app.set_error(format!("could not undo {}: tasks were permanently deleted", set.label));
            Vec::new()
        }
        UndoOutcome::Revert(set) => match app.project_id() {
            Some(id) => vec![Request::ApplySet {
                project_id: id.to_string(),
                kind: SetKind::Undo,
                set,
            }],
            None => {
                app.history.restore_undo(set);
                Vec::new()
            }
        },
    }
}

pub(super) fn redo(app: &mut App) -> Vec<Request> {
    let set = match app.history.redo() {
        Ok(set) => set,
        Err(e) => {
            app.set_error(e.to_string());
            return Vec::new();
        }
    };
    match app.project_id() {
        Some(id) => vec![Request::ApplySet {
            project_id: id.to_string(),
            kind: SetKind::Redo,
            set,
        }],
        None => {
            app.history.restore_redo(set);
            Vec::new()
        }
    }
}
