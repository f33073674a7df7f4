use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flat, id-indexed store of tasks. Parent and dependency links are ids
/// resolved through this map, never owned pointers.
pub type TaskArena = IndexMap<String, Task>;

/// Hierarchy level of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    Branch,
    Phase,
    Subphase,
    Task,
    Subtask,
}

impl WorkKind {
    pub const ALL: [WorkKind; 5] = [
        WorkKind::Branch,
        WorkKind::Phase,
        WorkKind::Subphase,
        WorkKind::Task,
        WorkKind::Subtask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkKind::Branch => "branch",
            WorkKind::Phase => "phase",
            WorkKind::Subphase => "subphase",
            WorkKind::Task => "task",
            WorkKind::Subtask => "subtask",
        }
    }

    pub fn parse(s: &str) -> Option<WorkKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "branch" => Some(WorkKind::Branch),
            "phase" => Some(WorkKind::Phase),
            "subphase" => Some(WorkKind::Subphase),
            "task" => Some(WorkKind::Task),
            "subtask" => Some(WorkKind::Subtask),
            _ => None,
        }
    }

    /// Whether an item of this kind may sit under a parent of kind `parent`
    /// (`None` = top level).
    pub fn allows_parent(self, parent: Option<WorkKind>) -> bool {
        match (self, parent) {
            (WorkKind::Branch, None) => true,
            (WorkKind::Phase, Some(WorkKind::Branch | WorkKind::Phase)) => true,
            (WorkKind::Subphase, Some(WorkKind::Phase | WorkKind::Subphase)) => true,
            (
                WorkKind::Task,
                None | Some(WorkKind::Branch | WorkKind::Phase | WorkKind::Subphase),
            ) => true,
            (WorkKind::Subtask, Some(WorkKind::Task | WorkKind::Subtask)) => true,
            _ => false,
        }
    }

    /// Kind suggested for a new item created under a parent of this kind.
    pub fn default_child(self) -> WorkKind {
        match self {
            WorkKind::Branch => WorkKind::Phase,
            WorkKind::Phase | WorkKind::Subphase => WorkKind::Task,
            WorkKind::Task | WorkKind::Subtask => WorkKind::Subtask,
        }
    }

    /// Phases and subphases both contribute inherited labels.
    pub fn is_phase_like(self) -> bool {
        matches!(self, WorkKind::Phase | WorkKind::Subphase)
    }

    pub fn scope(self) -> KindAppliesTo {
        match self {
            WorkKind::Branch => KindAppliesTo::Branch,
            WorkKind::Phase => KindAppliesTo::Phase,
            WorkKind::Subphase => KindAppliesTo::Subphase,
            WorkKind::Task => KindAppliesTo::Task,
            WorkKind::Subtask => KindAppliesTo::Subtask,
        }
    }
}

/// Scope tag mirroring the kind; keys per-level label and attention lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindAppliesTo {
    Branch,
    Phase,
    Subphase,
    Task,
    Subtask,
}

/// Lifecycle state. Unknown values from the service survive as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    Todo,
    InProgress,
    Done,
    Archived,
    Custom(String),
}

impl LifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Todo => "todo",
            LifecycleState::InProgress => "in_progress",
            LifecycleState::Done => "done",
            LifecycleState::Archived => "archived",
            LifecycleState::Custom(s) => s,
        }
    }

    pub fn parse_lossy(s: &str) -> LifecycleState {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "todo" => LifecycleState::Todo,
            "in_progress" | "progress" => LifecycleState::InProgress,
            "done" => LifecycleState::Done,
            "archived" => LifecycleState::Archived,
            _ => LifecycleState::Custom(s.trim().to_string()),
        }
    }
}

impl From<String> for LifecycleState {
    fn from(s: String) -> Self {
        LifecycleState::parse_lossy(&s)
    }
}

impl From<LifecycleState> for String {
    fn from(s: LifecycleState) -> Self {
        s.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse a priority token. Accepts full names and single-letter forms.
    pub fn parse(token: &str) -> Option<Priority> {
        match token.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Some(Priority::Low),
            "medium" | "med" | "m" => Some(Priority::Medium),
            "high" | "h" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    #[default]
    Relative,
    Absolute,
}

/// A file or directory attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub path: String,
    #[serde(default)]
    pub path_mode: PathMode,
    /// Which configured root `path` is relative to (the project slug)
    #[serde(default)]
    pub base_alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocked_reason: String,
    #[serde(default)]
    pub resource_refs: Vec<ResourceRef>,
}

/// A node in the work hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: WorkKind,
    pub scope: KindAppliesTo,
    pub lifecycle_state: LifecycleState,
    pub column_id: String,
    /// Ordering within the column (ascending)
    pub position: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub metadata: TaskMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some() || self.lifecycle_state == LifecycleState::Archived
    }

    pub fn scope_consistent(&self) -> bool {
        self.scope == self.kind.scope()
    }
}

/// The editable portion of a task, as captured before and after an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub metadata: TaskMetadata,
}

impl TaskFields {
    pub fn from_task(task: &Task) -> Self {
        TaskFields {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_at: task.due_at,
            labels: task.labels.clone(),
            metadata: task.metadata.clone(),
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        task.title = self.title.clone();
        task.description = self.description.clone();
        task.priority = self.priority;
        task.due_at = self.due_at;
        task.labels = self.labels.clone();
        task.metadata = self.metadata.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parent_rules() {
        assert!(WorkKind::Branch.allows_parent(None));
        assert!(!WorkKind::Branch.allows_parent(Some(WorkKind::Branch)));
        assert!(WorkKind::Phase.allows_parent(Some(WorkKind::Phase)));
        assert!(!WorkKind::Phase.allows_parent(None));
        assert!(WorkKind::Task.allows_parent(None));
        assert!(WorkKind::Task.allows_parent(Some(WorkKind::Subphase)));
        assert!(!WorkKind::Subtask.allows_parent(None));
        assert!(WorkKind::Subtask.allows_parent(Some(WorkKind::Task)));
    }

    #[test]
    fn default_child_is_allowed() {
        for kind in WorkKind::ALL {
            assert!(
                kind.default_child().allows_parent(Some(kind)),
                "default child of {} must be allowed under it",
                kind.as_str()
            );
        }
    }

    #[test]
    fn lifecycle_round_trips_through_strings() {
        let json = serde_json::to_string(&LifecycleState::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: LifecycleState = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(parsed, LifecycleState::Custom("review".into()));
        assert_eq!(LifecycleState::parse_lossy("In-Progress"), LifecycleState::InProgress);
    }

    #[test]
    fn priority_tokens() {
        assert_eq!(Priority::parse("H"), Some(Priority::High));
        assert_eq!(Priority::parse(" medium "), Some(Priority::Medium));
        assert_eq!(Priority::parse("urgent"), None);
    }
}
