use std::collections::{HashMap, HashSet};

use crate::model::{DependencyRollup, LifecycleState, Task, TaskMatch};

use super::search::{search_regex, task_matches};

/// Canonical state bucket used to rank and filter task rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Todo,
    Progress,
    Done,
    Archived,
}

impl StateId {
    pub const ACTIVE: [StateId; 3] = [StateId::Todo, StateId::Progress, StateId::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            StateId::Todo => "todo",
            StateId::Progress => "progress",
            StateId::Done => "done",
            StateId::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<StateId> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(StateId::Todo),
            "progress" | "in_progress" => Some(StateId::Progress),
            "done" => Some(StateId::Done),
            "archived" => Some(StateId::Archived),
            _ => None,
        }
    }
}

/// Archived wins over the lifecycle state; unknown or empty states count as todo.
pub fn derive_state_id(task: &Task) -> StateId {
    if task.is_archived() {
        return StateId::Archived;
    }
    match &task.lifecycle_state {
        LifecycleState::Todo => StateId::Todo,
        LifecycleState::InProgress => StateId::Progress,
        LifecycleState::Done => StateId::Done,
        LifecycleState::Archived => StateId::Archived,
        LifecycleState::Custom(s) => {
            match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
                "progress" | "in_progress" | "doing" => StateId::Progress,
                "done" | "complete" | "completed" => StateId::Done,
                _ => StateId::Todo,
            }
        }
    }
}

/// Which relationship list the inspector is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepField {
    DependsOn,
    BlockedBy,
}

impl DepField {
    pub fn label(self) -> &'static str {
        match self {
            DepField::DependsOn => "depends_on",
            DepField::BlockedBy => "blocked_by",
        }
    }

    pub fn other(self) -> DepField {
        match self {
            DepField::DependsOn => DepField::BlockedBy,
            DepField::BlockedBy => DepField::DependsOn,
        }
    }
}

/// One inspector row
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyCandidate {
    pub task_id: String,
    /// `None` for a stored id that no longer resolves
    pub found: Option<TaskMatch>,
    pub state: StateId,
    /// Set for rows the owner already links to
    pub pinned: Option<DepField>,
}

impl DependencyCandidate {
    pub fn is_missing(&self) -> bool {
        self.found.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter<'a> {
    pub query: &'a str,
    /// Enabled non-archived states; empty enables all
    pub states: &'a [StateId],
    pub include_archived: bool,
    pub cross_project: bool,
}

fn state_enabled(state: StateId, filter: &CandidateFilter<'_>) -> bool {
    if state == StateId::Archived {
        return filter.include_archived;
    }
    filter.states.is_empty() || filter.states.contains(&state)
}

/// Build inspector rows for `owner`.
///
/// Rows the owner already links to come first: `depends_on` in stored
/// order, then `blocked_by` in stored order, with unresolvable ids kept as
/// missing rows. The rest of `pool` follows, filtered and ranked, without
/// repeating pinned ids. The owner never appears.
pub fn build_candidates(
    owner: &Task,
    pool: &[TaskMatch],
    filter: &CandidateFilter<'_>,
) -> Vec<DependencyCandidate> {
    let by_id: HashMap<&str, &TaskMatch> =
        pool.iter().map(|m| (m.task.id.as_str(), m)).collect();

    let mut listed: HashSet<&str> = HashSet::new();
    listed.insert(owner.id.as_str());
    let mut rows = Vec::new();

    let linked = [
        (DepField::DependsOn, &owner.metadata.depends_on),
        (DepField::BlockedBy, &owner.metadata.blocked_by),
    ];
    for (field, ids) in linked {
        for id in ids.iter().map(|s| s.trim()) {
            if id.is_empty() || !listed.insert(id) {
                continue;
            }
            let found = by_id.get(id).map(|m| (*m).clone());
            let state = found
                .as_ref()
                .map(|m| derive_state_id(&m.task))
                .unwrap_or(StateId::Todo);
            rows.push(DependencyCandidate {
                task_id: id.to_string(),
                found,
                state,
                pinned: Some(field),
            });
        }
    }

    let re = search_regex(filter.query);
    let mut rest: Vec<(&TaskMatch, StateId)> = Vec::new();
    for m in pool {
        let id = m.task.id.as_str();
        if listed.contains(id) {
            continue;
        }
        if !filter.cross_project && m.task.project_id != owner.project_id {
            continue;
        }
        let state = derive_state_id(&m.task);
        if !state_enabled(state, filter) || !task_matches(&m.task, re.as_ref()) {
            continue;
        }
        listed.insert(id);
        rest.push((m, state));
    }
    rest.sort_by(|(a, sa), (b, sb)| {
        let a_home = a.task.project_id == owner.project_id;
        let b_home = b.task.project_id == owner.project_id;
        b_home
            .cmp(&a_home)
            .then_with(|| sa.cmp(sb))
            .then_with(|| {
                a.task
                    .title
                    .to_lowercase()
                    .cmp(&b.task.title.to_lowercase())
            })
            .then_with(|| a.task.id.cmp(&b.task.id))
    });

    rows.extend(rest.into_iter().map(|(m, state)| DependencyCandidate {
        task_id: m.task.id.clone(),
        found: Some(m.clone()),
        state,
        pinned: None,
    }));
    rows
}

/// Staged relationship edits. Nothing is written until the inspector applies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingLinks {
    pub depends_on: Vec<String>,
    pub blocked_by: Vec<String>,
}

impl PendingLinks {
    pub fn from_task(task: &Task) -> Self {
        PendingLinks {
            depends_on: task.metadata.depends_on.clone(),
            blocked_by: task.metadata.blocked_by.clone(),
        }
    }

    pub fn list(&self, field: DepField) -> &[String] {
        match field {
            DepField::DependsOn => &self.depends_on,
            DepField::BlockedBy => &self.blocked_by,
        }
    }

    fn list_mut(&mut self, field: DepField) -> &mut Vec<String> {
        match field {
            DepField::DependsOn => &mut self.depends_on,
            DepField::BlockedBy => &mut self.blocked_by,
        }
    }

    pub fn contains(&self, field: DepField, id: &str) -> bool {
        self.list(field).iter().any(|x| x == id)
    }

    /// Add or remove `id` in `field`. Returns whether it is now linked.
    pub fn toggle(&mut self, field: DepField, id: &str) -> bool {
        let list = self.list_mut(field);
        if let Some(pos) = list.iter().position(|x| x == id) {
            list.remove(pos);
            false
        } else {
            list.push(id.to_string());
            true
        }
    }

    /// Final lists with the owner's own id stripped and duplicates dropped.
    pub fn finalize(&self, owner_id: &str) -> (Vec<String>, Vec<String>) {
        (
            clean_links(&self.depends_on, owner_id),
            clean_links(&self.blocked_by, owner_id),
        )
    }
}

fn clean_links(ids: &[String], owner_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != owner_id)
        .filter(|s| seen.insert(s.to_string()))
        .map(|s| s.to_string())
        .collect()
}

/// Dependency totals over the non-archived tasks of one project.
pub fn dependency_rollup<'a>(
    project_tasks: impl IntoIterator<Item = &'a Task>,
    exists: impl Fn(&str) -> bool,
) -> DependencyRollup {
    let mut rollup = DependencyRollup::default();
    for task in project_tasks.into_iter().filter(|t| !t.is_archived()) {
        rollup.total_items += 1;
        let deps = &task.metadata.depends_on;
        let blockers = &task.metadata.blocked_by;
        if !deps.is_empty() {
            rollup.items_with_dependencies += 1;
        }
        rollup.dependency_edges += deps.len();
        if !blockers.is_empty() || !task.metadata.blocked_reason.trim().is_empty() {
            rollup.blocked_items += 1;
        }
        rollup.blocked_by_edges += blockers.len();
        rollup.unresolved_dependency_edges += deps
            .iter()
            .chain(blockers)
            .filter(|id| !exists(id))
            .count();
    }
    rollup
}
