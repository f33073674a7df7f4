use chrono::{DateTime, TimeZone, Utc};

use crate::model::{
    KindAppliesTo, LifecycleState, Priority, Task, TaskArena, TaskMetadata, WorkKind,
};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// A top-level task in project `p1`, column `c1`.
pub fn task(id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        project_id: "p1".to_string(),
        parent_id: None,
        kind: WorkKind::Task,
        scope: KindAppliesTo::Task,
        lifecycle_state: LifecycleState::Todo,
        column_id: "c1".to_string(),
        position: 0,
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        due_at: None,
        labels: Vec::new(),
        metadata: TaskMetadata::default(),
        created_at: epoch(),
        updated_at: epoch(),
        archived_at: None,
    }
}

pub fn child(id: &str, title: &str, parent: &str, kind: WorkKind) -> Task {
    let mut t = task(id, title);
    t.parent_id = Some(parent.to_string());
    t.kind = kind;
    t.scope = kind.scope();
    t
}

pub fn arena(tasks: Vec<Task>) -> TaskArena {
    tasks.into_iter().map(|t| (t.id.clone(), t)).collect()
}
