//! In-process [`Service`] implementation. Keeps everything in memory behind a
//! mutex and, when opened with a path, mirrors each mutation to a JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::io::atomic::atomic_write;
use crate::model::{
    ChangeEvent, Column, Comment, CommentTarget, DependencyRollup, LifecycleState, Project,
    Task, TaskFields, TaskMatch, WorkKind,
};
use crate::ops::deps::dependency_rollup;
use crate::ops::search::{rank_matches, search_regex, task_matches};
use crate::service::{
    CommentInput, DeleteMode, ProjectInput, SearchFilter, Service, ServiceError, TaskInput,
};

pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub events: Vec<ChangeEvent>,
}

impl StoreData {
    fn project(&self, id: &str) -> Result<&Project, ServiceError> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ServiceError::project_not_found(id))
    }

    fn project_mut(&mut self, id: &str) -> Result<&mut Project, ServiceError> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ServiceError::project_not_found(id))
    }

    fn task(&self, id: &str) -> Result<&Task, ServiceError> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ServiceError::task_not_found(id))
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, ServiceError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ServiceError::task_not_found(id))
    }

    fn column(&self, project_id: &str, column_id: &str) -> Result<&Column, ServiceError> {
        self.columns
            .iter()
            .find(|c| c.id == column_id && c.project_id == project_id)
            .ok_or_else(|| ServiceError::NotFound {
                kind: "column",
                id: column_id.to_string(),
            })
    }

    fn unique_slug(&self, base: &str, skip_project: Option<&str>) -> String {
        let taken = |slug: &str| {
            self.projects
                .iter()
                .any(|p| p.slug == slug && Some(p.id.as_str()) != skip_project)
        };
        if !taken(base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn record(&mut self, project_id: &str, task_id: Option<&str>, operation: &str, actor: &str) {
        self.events.push(ChangeEvent {
            id: new_id(),
            project_id: project_id.to_string(),
            task_id: task_id.map(str::to_string),
            operation: operation.to_string(),
            actor: actor.to_string(),
            occurred_at: Utc::now(),
        });
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lowercase, alphanumeric runs joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Lifecycle state implied by the column a task sits in.
pub fn state_for_column(column: &Column) -> LifecycleState {
    let name = column.name.to_lowercase();
    if name.contains("done") || name.contains("complete") {
        LifecycleState::Done
    } else if name.contains("progress") || name.contains("doing") {
        LifecycleState::InProgress
    } else {
        LifecycleState::Todo
    }
}

fn required(value: &str, what: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Invalid(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

pub struct LocalStore {
    data: Mutex<StoreData>,
    path: Option<PathBuf>,
    actor: String,
}

impl LocalStore {
    pub fn in_memory(actor: &str) -> Self {
        LocalStore {
            data: Mutex::new(StoreData::default()),
            path: None,
            actor: actor.to_string(),
        }
    }

    /// Open a JSON-backed store. A missing file starts empty.
    pub fn open(path: &Path, actor: &str) -> Result<Self, ServiceError> {
        let data = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ServiceError::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                return Err(ServiceError::Storage(format!("{}: {}", path.display(), e)));
            }
        };
        Ok(LocalStore {
            data: Mutex::new(data),
            path: Some(path.to_path_buf()),
            actor: actor.to_string(),
        })
    }

    /// Default data file under the user's data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arbor")
            .join("board.json")
    }

    pub fn set_actor(&mut self, actor: &str) {
        self.actor = actor.to_string();
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreData>, ServiceError> {
        self.data
            .lock()
            .map_err(|_| ServiceError::Storage("store lock poisoned".to_string()))
    }

    fn persist(&self, data: &StoreData) -> Result<(), ServiceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        atomic_write(path, &json).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "store write failed");
            ServiceError::Storage(format!("{}: {}", path.display(), e))
        })
    }

    /// Run a mutation, record its change event, and persist on success.
    fn mutate<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut StoreData) -> Result<(T, String, Option<String>), ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut data = self.lock()?;
        let mut scratch = data.clone();
        let (out, project_id, task_id) = f(&mut scratch)?;
        scratch.record(&project_id, task_id.as_deref(), operation, &self.actor);
        self.persist(&scratch)?;
        *data = scratch;
        tracing::debug!(operation, project = %project_id, task = ?task_id, "store mutation");
        Ok(out)
    }
}

impl Service for LocalStore {
    fn list_projects(&self, include_archived: bool) -> Result<Vec<Project>, ServiceError> {
        let data = self.lock()?;
        Ok(data
            .projects
            .iter()
            .filter(|p| include_archived || !p.is_archived())
            .cloned()
            .collect())
    }

    fn create_project(&self, input: ProjectInput) -> Result<Project, ServiceError> {
        self.mutate("project.create", |data| {
            let name = required(&input.name, "project name")?;
            let base = if input.slug.trim().is_empty() {
                slugify(&name)
            } else {
                slugify(&input.slug)
            };
            let project = Project {
                id: new_id(),
                slug: data.unique_slug(&base, None),
                name,
                description: input.description.trim().to_string(),
                metadata: input.metadata,
                created_at: Utc::now(),
                archived_at: None,
            };
            for (i, name) in DEFAULT_COLUMNS.iter().enumerate() {
                data.columns.push(Column {
                    id: new_id(),
                    project_id: project.id.clone(),
                    name: name.to_string(),
                    position: i as i64,
                    wip_limit: None,
                });
            }
            data.projects.push(project.clone());
            let id = project.id.clone();
            Ok((project, id, None))
        })
    }

    fn update_project(&self, id: &str, input: ProjectInput) -> Result<Project, ServiceError> {
        self.mutate("project.update", |data| {
            let name = required(&input.name, "project name")?;
            let slug = if input.slug.trim().is_empty() {
                None
            } else {
                Some(data.unique_slug(&slugify(&input.slug), Some(id)))
            };
            let project = data.project_mut(id)?;
            project.name = name;
            project.description = input.description.trim().to_string();
            project.metadata = input.metadata;
            if let Some(slug) = slug {
                project.slug = slug;
            }
            Ok((project.clone(), id.to_string(), None))
        })
    }

    fn archive_project(&self, id: &str) -> Result<Project, ServiceError> {
        self.mutate("project.archive", |data| {
            let project = data.project_mut(id)?;
            project.archived_at = Some(Utc::now());
            Ok((project.clone(), id.to_string(), None))
        })
    }

    fn restore_project(&self, id: &str) -> Result<Project, ServiceError> {
        self.mutate("project.restore", |data| {
            let project = data.project_mut(id)?;
            project.archived_at = None;
            Ok((project.clone(), id.to_string(), None))
        })
    }

    fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        let mut data = self.lock()?;
        data.project(id)?;
        let mut scratch = data.clone();
        scratch.projects.retain(|p| p.id != id);
        scratch.columns.retain(|c| c.project_id != id);
        scratch.tasks.retain(|t| t.project_id != id);
        scratch.comments.retain(|c| c.project_id != id);
        scratch.events.retain(|e| e.project_id != id);
        self.persist(&scratch)?;
        *data = scratch;
        tracing::info!(project = id, "project deleted");
        Ok(())
    }

    fn list_columns(&self, project_id: &str) -> Result<Vec<Column>, ServiceError> {
        let data = self.lock()?;
        data.project(project_id)?;
        let mut columns: Vec<Column> = data
            .columns
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.position);
        Ok(columns)
    }

    fn list_tasks(
        &self,
        project_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Task>, ServiceError> {
        let data = self.lock()?;
        data.project(project_id)?;
        Ok(data
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .filter(|t| include_archived || !t.is_archived())
            .cloned()
            .collect())
    }

    fn search_tasks(&self, filter: &SearchFilter) -> Result<Vec<TaskMatch>, ServiceError> {
        let data = self.lock()?;
        let re = search_regex(&filter.query);
        let mut matches: Vec<TaskMatch> = data
            .tasks
            .iter()
            .filter(|t| filter.project_id.as_deref().is_none_or(|p| t.project_id == p))
            .filter(|t| filter.include_archived || !t.is_archived())
            .filter(|t| task_matches(t, re.as_ref()))
            .filter_map(|t| {
                let project = data.projects.iter().find(|p| p.id == t.project_id)?;
                Some(TaskMatch {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    task: t.clone(),
                })
            })
            .collect();
        rank_matches(&mut matches, re.as_ref());
        if filter.limit > 0 {
            matches.truncate(filter.limit);
        }
        Ok(matches)
    }

    fn create_task(&self, input: TaskInput) -> Result<Task, ServiceError> {
        self.mutate("task.create", |data| {
            data.project(&input.project_id)?;
            let title = required(&input.title, "title")?;

            let parent_kind = match &input.parent_id {
                Some(pid) => {
                    let parent = data.task(pid)?;
                    if parent.project_id != input.project_id {
                        return Err(ServiceError::Invalid(
                            "parent belongs to another project".to_string(),
                        ));
                    }
                    Some(parent.kind)
                }
                None => None,
            };
            if !input.kind.allows_parent(parent_kind) {
                return Err(ServiceError::Invalid(format!(
                    "a {} cannot be placed {}",
                    input.kind.as_str(),
                    match parent_kind {
                        Some(k) => format!("under a {}", k.as_str()),
                        None => "at the top level".to_string(),
                    }
                )));
            }

            let column = if input.column_id.is_empty() {
                data.columns
                    .iter()
                    .filter(|c| c.project_id == input.project_id)
                    .min_by_key(|c| c.position)
                    .ok_or_else(|| ServiceError::Invalid("project has no columns".to_string()))?
            } else {
                data.column(&input.project_id, &input.column_id)?
            };
            let column_id = column.id.clone();
            let lifecycle_state = state_for_column(column);
            let position = data
                .tasks
                .iter()
                .filter(|t| t.column_id == column_id)
                .map(|t| t.position + 1)
                .max()
                .unwrap_or(0);

            let now = Utc::now();
            let id = new_id();
            let mut metadata = input.metadata;
            metadata.depends_on.retain(|d| *d != id);
            metadata.blocked_by.retain(|d| *d != id);
            let task = Task {
                id: id.clone(),
                project_id: input.project_id.clone(),
                parent_id: input.parent_id,
                kind: input.kind,
                scope: input.kind.scope(),
                lifecycle_state,
                column_id,
                position,
                title,
                description: input.description,
                priority: input.priority,
                due_at: input.due_at,
                labels: input.labels,
                metadata,
                created_at: now,
                updated_at: now,
                archived_at: None,
            };
            data.tasks.push(task.clone());
            Ok((task, input.project_id, Some(id)))
        })
    }

    fn update_task(&self, id: &str, fields: &TaskFields) -> Result<Task, ServiceError> {
        self.mutate("task.update", |data| {
            let title = required(&fields.title, "title")?;
            let task = data.task_mut(id)?;
            fields.apply_to(task);
            task.title = title;
            task.metadata.depends_on.retain(|d| d != id);
            task.metadata.blocked_by.retain(|d| d != id);
            task.updated_at = Utc::now();
            Ok((task.clone(), task.project_id.clone(), Some(id.to_string())))
        })
    }

    fn move_task(&self, id: &str, column_id: &str, position: i64) -> Result<Task, ServiceError> {
        self.mutate("task.move", |data| {
            let project_id = data.task(id)?.project_id.clone();
            let state = state_for_column(data.column(&project_id, column_id)?);
            let task = data.task_mut(id)?;
            task.column_id = column_id.to_string();
            task.position = position;
            if task.archived_at.is_none() {
                task.lifecycle_state = state;
            }
            task.updated_at = Utc::now();
            Ok((task.clone(), project_id, Some(id.to_string())))
        })
    }

    fn rename_task(&self, id: &str, title: &str) -> Result<Task, ServiceError> {
        self.mutate("task.rename", |data| {
            let title = required(title, "title")?;
            let task = data.task_mut(id)?;
            task.title = title;
            task.updated_at = Utc::now();
            Ok((task.clone(), task.project_id.clone(), Some(id.to_string())))
        })
    }

    fn delete_task(&self, id: &str, mode: DeleteMode) -> Result<Option<Task>, ServiceError> {
        let operation = match mode {
            DeleteMode::Archive => "task.archive",
            DeleteMode::Hard => "task.delete",
        };
        self.mutate(operation, |data| {
            let project_id = data.task(id)?.project_id.clone();
            match mode {
                DeleteMode::Archive => {
                    let task = data.task_mut(id)?;
                    let now = Utc::now();
                    task.archived_at = Some(now);
                    task.lifecycle_state = LifecycleState::Archived;
                    task.updated_at = now;
                    Ok((Some(task.clone()), project_id, Some(id.to_string())))
                }
                DeleteMode::Hard => {
                    // descendants go with it
                    let mut doomed = vec![id.to_string()];
                    let mut i = 0;
                    while i < doomed.len() {
                        let parent = doomed[i].clone();
                        doomed.extend(
                            data.tasks
                                .iter()
                                .filter(|t| t.parent_id.as_deref() == Some(parent.as_str()))
                                .map(|t| t.id.clone()),
                        );
                        i += 1;
                    }
                    data.tasks.retain(|t| !doomed.contains(&t.id));
                    Ok((None, project_id, Some(id.to_string())))
                }
            }
        })
    }

    fn restore_task(&self, id: &str) -> Result<Task, ServiceError> {
        self.mutate("task.restore", |data| {
            let project_id = data.task(id)?.project_id.clone();
            let column_id = data.task(id)?.column_id.clone();
            let state = data
                .column(&project_id, &column_id)
                .map(state_for_column)
                .unwrap_or(LifecycleState::Todo);
            let task = data.task_mut(id)?;
            if task.archived_at.is_some() || task.lifecycle_state == LifecycleState::Archived {
                task.archived_at = None;
                task.lifecycle_state = state;
                task.updated_at = Utc::now();
            }
            Ok((task.clone(), project_id, Some(id.to_string())))
        })
    }

    fn create_comment(&self, input: CommentInput) -> Result<Comment, ServiceError> {
        self.mutate("comment.create", |data| {
            let body = required(&input.body_markdown, "comment body")?;
            data.project(&input.project_id)?;
            if let CommentTarget::Task(id) = &input.target {
                data.task(id)?;
            }
            let author = if input.author.trim().is_empty() {
                "anonymous".to_string()
            } else {
                input.author.trim().to_string()
            };
            let comment = Comment {
                id: new_id(),
                project_id: input.project_id.clone(),
                target: input.target.clone(),
                author,
                body_markdown: body,
                created_at: Utc::now(),
            };
            data.comments.push(comment.clone());
            let task_id = match &input.target {
                CommentTarget::Task(id) => Some(id.clone()),
                CommentTarget::Project(_) => None,
            };
            Ok((comment, input.project_id, task_id))
        })
    }

    fn list_comments(&self, target: &CommentTarget) -> Result<Vec<Comment>, ServiceError> {
        let data = self.lock()?;
        let mut comments: Vec<Comment> = data
            .comments
            .iter()
            .filter(|c| &c.target == target)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    fn list_change_events(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, ServiceError> {
        let data = self.lock()?;
        data.project(project_id)?;
        Ok(data
            .events
            .iter()
            .rev()
            .filter(|e| e.project_id == project_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn dependency_rollup(&self, project_id: &str) -> Result<DependencyRollup, ServiceError> {
        let data = self.lock()?;
        data.project(project_id)?;
        let tasks = data.tasks.iter().filter(|t| t.project_id == project_id);
        Ok(dependency_rollup(tasks, |id| {
            data.tasks.iter().any(|t| t.id == id)
        }))
    }
}

/// Starter content for an empty store so a first launch has something to show.
pub fn seed_welcome(store: &dyn Service) -> Result<(), ServiceError> {
    if !store.list_projects(true)?.is_empty() {
        return Ok(());
    }
    let project = store.create_project(ProjectInput {
        name: "Welcome".to_string(),
        description: "A sample board".to_string(),
        ..Default::default()
    })?;
    let branch = store.create_task(task_input(
        &project.id,
        None,
        WorkKind::Branch,
        "Getting started",
    ))?;
    let phase = store.create_task(task_input(
        &project.id,
        Some(&branch.id),
        WorkKind::Phase,
        "Learn the keys",
    ))?;
    for title in ["Press f to focus into an item", "Press u to undo, U to redo"] {
        store.create_task(task_input(&project.id, Some(&phase.id), WorkKind::Task, title))?;
    }
    store.create_task(task_input(
        &project.id,
        None,
        WorkKind::Task,
        "Press : for the command palette",
    ))?;
    Ok(())
}

fn task_input(project_id: &str, parent: Option<&str>, kind: WorkKind, title: &str) -> TaskInput {
    TaskInput {
        project_id: project_id.to_string(),
        parent_id: parent.map(str::to_string),
        kind,
        column_id: String::new(),
        title: title.to_string(),
        description: String::new(),
        priority: Default::default(),
        due_at: None,
        labels: Vec::new(),
        metadata: Default::default(),
    }
}
