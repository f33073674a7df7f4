//! Requests the update step hands to the worker, and the worker side that
//! runs them against the service.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::io::config_io::{self, ConfigEdit};
use crate::io::fs_browse;
use crate::model::{Column, CommentTarget, DependencyRollup, Project, Task, TaskMatch};
use crate::service::{
    CommentInput, DeleteMode, ProjectInput, SearchFilter, Service, ServiceError, TaskInput,
};

use super::msg::Msg;
use super::undo::{ActionSet, Direction, StepCall};

/// Side effects requested by `update`. Plain data; executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    LoadProjects,
    LoadBoard { project_id: String },
    ApplySet {
        project_id: String,
        kind: SetKind,
        set: ActionSet,
    },
    CreateTask(TaskInput),
    SaveProject {
        id: Option<String>,
        input: ProjectInput,
    },
    ArchiveProject { id: String },
    RestoreProject { id: String },
    DeleteProject { id: String },
    Search { filter: SearchFilter },
    /// Link candidates for `owner_id`, archived included. `linked` ids are
    /// always resolved, whatever the pool limit cuts.
    LoadCandidates {
        owner_id: String,
        project_id: String,
        linked: Vec<String>,
    },
    LoadComments(CommentTarget),
    PostComment(CommentInput),
    LoadActivity { project_id: String, limit: usize },
    LoadRollup { project_id: String },
    ListDir { root: String, dir: String },
    SaveConfig {
        path: PathBuf,
        edits: Vec<ConfigEdit>,
    },
    Quit,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::LoadProjects => "load_projects",
            Request::LoadBoard { .. } => "load_board",
            Request::ApplySet { .. } => "apply_set",
            Request::CreateTask(_) => "create_task",
            Request::SaveProject { .. } => "save_project",
            Request::ArchiveProject { .. } => "archive_project",
            Request::RestoreProject { .. } => "restore_project",
            Request::DeleteProject { .. } => "delete_project",
            Request::Search { .. } => "search",
            Request::LoadCandidates { .. } => "load_candidates",
            Request::LoadComments(_) => "load_comments",
            Request::PostComment(_) => "post_comment",
            Request::LoadActivity { .. } => "load_activity",
            Request::LoadRollup { .. } => "load_rollup",
            Request::ListDir { .. } => "list_dir",
            Request::SaveConfig { .. } => "save_config",
            Request::Quit => "quit",
        }
    }
}

/// Why an action set is being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// A fresh gesture; pushed onto history once it succeeds
    Perform,
    Undo,
    Redo,
}

impl SetKind {
    pub fn direction(self) -> Direction {
        match self {
            SetKind::Undo => Direction::Backward,
            SetKind::Perform | SetKind::Redo => Direction::Forward,
        }
    }
}

/// What one applied step left behind
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Saved(Task),
    Deleted(String),
}

/// A project's board as loaded from the service
#[derive(Debug, Clone, PartialEq)]
pub struct BoardData {
    pub project: Project,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    pub rollup: DependencyRollup,
}

pub const CANDIDATE_POOL_LIMIT: usize = 2000;

/// The home project in full, then other projects up to `limit`, then any
/// `linked` task the limit left out.
pub fn load_candidates(
    service: &dyn Service,
    project_id: &str,
    linked: &[String],
    limit: usize,
) -> Result<Vec<TaskMatch>, ServiceError> {
    let everything = |limit| SearchFilter {
        project_id: None,
        query: String::new(),
        include_archived: true,
        limit,
    };
    let mut pool = service.search_tasks(&SearchFilter {
        project_id: Some(project_id.to_string()),
        ..everything(0)
    })?;
    let mut seen: HashSet<String> = pool.iter().map(|m| m.task.id.clone()).collect();
    for found in service.search_tasks(&everything(limit))? {
        if pool.len() >= limit {
            break;
        }
        if seen.insert(found.task.id.clone()) {
            pool.push(found);
        }
    }
    let missing: HashSet<&str> = linked
        .iter()
        .map(String::as_str)
        .filter(|id| !seen.contains(*id))
        .collect();
    if !missing.is_empty() {
        tracing::debug!(count = missing.len(), "resolving links outside the pool");
        pool.extend(
            service
                .search_tasks(&everything(0))?
                .into_iter()
                .filter(|m| missing.contains(m.task.id.as_str())),
        );
    }
    Ok(pool)
}

/// Send calls one at a time, stopping at the first failure.
pub fn apply_calls(
    service: &dyn Service,
    calls: Vec<StepCall>,
) -> Result<Vec<StepOutcome>, ServiceError> {
    let mut outcomes = Vec::with_capacity(calls.len());
    for call in calls {
        let outcome = match call {
            StepCall::Move {
                task_id,
                column_id,
                position,
            } => StepOutcome::Saved(service.move_task(&task_id, &column_id, position)?),
            StepCall::Archive { task_id } => {
                match service.delete_task(&task_id, DeleteMode::Archive)? {
                    Some(task) => StepOutcome::Saved(task),
                    None => StepOutcome::Deleted(task_id),
                }
            }
            StepCall::Restore { task_id } => StepOutcome::Saved(service.restore_task(&task_id)?),
            StepCall::HardDelete { task_id } => {
                service.delete_task(&task_id, DeleteMode::Hard)?;
                StepOutcome::Deleted(task_id)
            }
            StepCall::Update { task_id, fields } => {
                StepOutcome::Saved(service.update_task(&task_id, &fields)?)
            }
            StepCall::Rename { task_id, title } => {
                StepOutcome::Saved(service.rename_task(&task_id, &title)?)
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn load_board(service: &dyn Service, project_id: &str) -> Result<BoardData, ServiceError> {
    let project = service
        .list_projects(true)?
        .into_iter()
        .find(|p| p.id == project_id)
        .ok_or_else(|| ServiceError::project_not_found(project_id))?;
    Ok(BoardData {
        columns: service.list_columns(project_id)?,
        tasks: service.list_tasks(project_id, true)?,
        rollup: service.dependency_rollup(project_id)?,
        project,
    })
}

/// Run one request. `Quit` is handled by the runtime and yields nothing here.
pub fn execute(service: &dyn Service, request: Request) -> Option<Msg> {
    tracing::debug!(request = request.name(), "executing request");
    let msg = match request {
        Request::LoadProjects => Msg::ProjectsLoaded(service.list_projects(true)),
        Request::LoadBoard { project_id } => {
            let result = load_board(service, &project_id);
            Msg::BoardLoaded { project_id, result }
        }
        Request::ApplySet {
            project_id,
            kind,
            set,
        } => {
            let result = apply_calls(service, set.calls(kind.direction()));
            if let Err(e) = &result {
                tracing::warn!(label = %set.label, ?kind, error = %e, "action set failed");
            }
            Msg::SetApplied {
                project_id,
                kind,
                set,
                result,
            }
        }
        Request::CreateTask(input) => Msg::TaskCreated(service.create_task(input)),
        Request::SaveProject { id, input } => match id {
            Some(id) => Msg::ProjectSaved {
                created: false,
                result: service.update_project(&id, input),
            },
            None => Msg::ProjectSaved {
                created: true,
                result: service.create_project(input),
            },
        },
        Request::ArchiveProject { id } => Msg::ProjectSaved {
            created: false,
            result: service.archive_project(&id),
        },
        Request::RestoreProject { id } => Msg::ProjectSaved {
            created: false,
            result: service.restore_project(&id),
        },
        Request::DeleteProject { id } => {
            let result = service.delete_project(&id);
            Msg::ProjectDeleted { id, result }
        }
        Request::Search { filter } => Msg::SearchLoaded {
            result: service.search_tasks(&filter),
            query: filter.query,
        },
        Request::LoadCandidates {
            owner_id,
            project_id,
            linked,
        } => Msg::CandidatesLoaded {
            owner_id,
            result: load_candidates(service, &project_id, &linked, CANDIDATE_POOL_LIMIT),
        },
        Request::LoadComments(target) => Msg::CommentsLoaded {
            result: service.list_comments(&target),
            target,
        },
        Request::PostComment(input) => Msg::CommentPosted(service.create_comment(input)),
        Request::LoadActivity { project_id, limit } => Msg::ActivityLoaded {
            result: service.list_change_events(&project_id, limit),
            project_id,
        },
        Request::LoadRollup { project_id } => Msg::RollupLoaded {
            result: service.dependency_rollup(&project_id),
            project_id,
        },
        Request::ListDir { root, dir } => Msg::DirListed {
            result: fs_browse::list_dir(&root, &dir).map_err(|e| e.to_string()),
            dir,
        },
        Request::SaveConfig { path, edits } => Msg::ConfigSaved(
            config_io::save_edits(&path, &edits).map_err(|e| {
                tracing::warn!(error = %e, "config write failed");
                e.to_string()
            }),
        ),
        Request::Quit => return None,
    };
    Some(msg)
}
