use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Top-level grouping. The slug keys per-project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: ProjectMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A named lane within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub position: i64,
    #[serde(default)]
    pub wip_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum CommentTarget {
    Project(String),
    Task(String),
}

impl CommentTarget {
    pub fn id(&self) -> &str {
        match self {
            CommentTarget::Project(id) | CommentTarget::Task(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub project_id: String,
    pub target: CommentTarget,
    pub author: String,
    pub body_markdown: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted change recorded by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub operation: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Project-wide dependency totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyRollup {
    pub total_items: usize,
    pub items_with_dependencies: usize,
    pub dependency_edges: usize,
    pub blocked_items: usize,
    pub blocked_by_edges: usize,
    pub unresolved_dependency_edges: usize,
}

/// A task found by search, with enough project context to display and jump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMatch {
    pub project_id: String,
    pub project_name: String,
    pub task: Task,
}
