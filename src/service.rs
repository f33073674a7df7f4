//! The persistence boundary. Everything that reads or writes durable board
//! data goes through [`Service`]; the interaction core only ever calls it from
//! the request worker, never from the update step.

use chrono::{DateTime, Utc};

use crate::model::{
    ChangeEvent, Column, Comment, CommentTarget, DependencyRollup, Priority, Project,
    ProjectMetadata, Task, TaskFields, TaskMatch, TaskMetadata, WorkKind,
};

/// Error type for service calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn task_not_found(id: &str) -> Self {
        ServiceError::NotFound {
            kind: "task",
            id: id.to_string(),
        }
    }

    pub fn project_not_found(id: &str) -> Self {
        ServiceError::NotFound {
            kind: "project",
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Archive,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectInput {
    pub name: String,
    /// Derived from the name when empty
    pub slug: String,
    pub description: String,
    pub metadata: ProjectMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskInput {
    pub project_id: String,
    pub parent_id: Option<String>,
    pub kind: WorkKind,
    pub column_id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub metadata: TaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchFilter {
    /// `None` searches every project
    pub project_id: Option<String>,
    pub query: String,
    pub include_archived: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentInput {
    pub project_id: String,
    pub target: CommentTarget,
    pub author: String,
    pub body_markdown: String,
}

pub trait Service: Send + Sync {
    fn list_projects(&self, include_archived: bool) -> Result<Vec<Project>, ServiceError>;
    fn create_project(&self, input: ProjectInput) -> Result<Project, ServiceError>;
    fn update_project(&self, id: &str, input: ProjectInput) -> Result<Project, ServiceError>;
    fn archive_project(&self, id: &str) -> Result<Project, ServiceError>;
    fn restore_project(&self, id: &str) -> Result<Project, ServiceError>;
    fn delete_project(&self, id: &str) -> Result<(), ServiceError>;

    fn list_columns(&self, project_id: &str) -> Result<Vec<Column>, ServiceError>;

    fn list_tasks(&self, project_id: &str, include_archived: bool)
    -> Result<Vec<Task>, ServiceError>;
    fn search_tasks(&self, filter: &SearchFilter) -> Result<Vec<TaskMatch>, ServiceError>;
    fn create_task(&self, input: TaskInput) -> Result<Task, ServiceError>;
    fn update_task(&self, id: &str, fields: &TaskFields) -> Result<Task, ServiceError>;
    fn move_task(&self, id: &str, column_id: &str, position: i64) -> Result<Task, ServiceError>;
    fn rename_task(&self, id: &str, title: &str) -> Result<Task, ServiceError>;
    /// Archive returns the archived task; hard delete returns `None`.
    fn delete_task(&self, id: &str, mode: DeleteMode) -> Result<Option<Task>, ServiceError>;
    fn restore_task(&self, id: &str) -> Result<Task, ServiceError>;

    fn create_comment(&self, input: CommentInput) -> Result<Comment, ServiceError>;
    fn list_comments(&self, target: &CommentTarget) -> Result<Vec<Comment>, ServiceError>;

    /// Newest first, at most `limit` events.
    fn list_change_events(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, ServiceError>;
    fn dependency_rollup(&self, project_id: &str) -> Result<DependencyRollup, ServiceError>;
}
