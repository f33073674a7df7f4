use std::collections::HashSet;

use crate::model::{Task, TaskArena, WorkKind};

pub const BREADCRUMB_SEPARATOR: &str = " / ";

/// Iterator over `start` and then each ancestor, following parent ids
/// through the arena. Stops at a missing parent or a repeated id.
pub struct AncestorWalk<'a> {
    tasks: &'a TaskArena,
    next: Option<&'a str>,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for AncestorWalk<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<&'a Task> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return None;
        }
        let task = self.tasks.get(id)?;
        self.next = task.parent_id.as_deref();
        Some(task)
    }
}

pub fn ancestor_walk<'a>(tasks: &'a TaskArena, start: &'a str) -> AncestorWalk<'a> {
    AncestorWalk {
        tasks,
        next: Some(start),
        seen: HashSet::new(),
    }
}

/// Direct children of `parent_id`, in arena order.
pub fn direct_children<'a>(
    tasks: &'a TaskArena,
    parent_id: &'a str,
) -> impl Iterator<Item = &'a Task> + 'a {
    tasks
        .values()
        .filter(move |t| t.parent_id.as_deref() == Some(parent_id))
}

/// Ids visible at a focus level. Without a root: top-level, non-subtask
/// items. With a root: its direct children only, one level deep.
pub fn projected_task_set(tasks: &TaskArena, root: Option<&str>) -> Vec<String> {
    match root {
        None => tasks
            .values()
            .filter(|t| t.parent_id.is_none() && t.kind != WorkKind::Subtask)
            .map(|t| t.id.clone())
            .collect(),
        Some(root) => direct_children(tasks, root).map(|t| t.id.clone()).collect(),
    }
}

/// Whether focusing on `id` would show anything. Archived children count
/// only while archived rows are shown.
pub fn can_focus(tasks: &TaskArena, id: &str, show_archived: bool) -> bool {
    tasks.contains_key(id)
        && direct_children(tasks, id).any(|t| show_archived || !t.is_archived())
}

/// Titles from the outermost ancestor down to the focused task.
pub fn breadcrumb_titles(tasks: &TaskArena, root: Option<&str>) -> Vec<String> {
    let root = match root {
        Some(r) => r,
        None => return Vec::new(),
    };
    let mut titles: Vec<String> = ancestor_walk(tasks, root)
        .map(|t| t.title.clone())
        .collect();
    titles.reverse();
    titles
}

pub fn breadcrumb(tasks: &TaskArena, root: Option<&str>) -> String {
    breadcrumb_titles(tasks, root).join(BREADCRUMB_SEPARATOR)
}

/// Breadcrumb anchored at the project name, e.g. `Web / Launch / Copy`.
pub fn full_path(project_name: &str, tasks: &TaskArena, root: Option<&str>) -> String {
    let mut parts = vec![project_name.to_string()];
    parts.extend(breadcrumb_titles(tasks, root));
    parts.join(BREADCRUMB_SEPARATOR)
}

/// Tasks of one column within the projection, ordered by position.
pub fn column_tasks<'a>(
    tasks: &'a TaskArena,
    projected: &[String],
    column_id: &str,
    show_archived: bool,
) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = projected
        .iter()
        .filter_map(|id| tasks.get(id))
        .filter(|t| t.column_id == column_id)
        .filter(|t| show_archived || !t.is_archived())
        .collect();
    out.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{arena, child, task};

    fn sample() -> TaskArena {
        let mut branch = task("b", "Launch");
        branch.kind = WorkKind::Branch;
        arena(vec![
            branch,
            task("t", "Standalone"),
            child("p", "Copy", "b", WorkKind::Phase),
            child("q", "Design", "b", WorkKind::Phase),
            child("x", "Headline", "p", WorkKind::Task),
            child("s", "Sub", "t", WorkKind::Subtask),
        ])
    }

    #[test]
    fn no_root_shows_top_level() {
        let tasks = sample();
        assert_eq!(projected_task_set(&tasks, None), vec!["b", "t"]);
    }

    #[test]
    fn root_shows_direct_children_only() {
        let tasks = sample();
        let set = projected_task_set(&tasks, Some("b"));
        assert_eq!(set, vec!["p", "q"]);
        assert!(!set.contains(&"x".to_string()));
        for id in &set {
            assert!(tasks.contains_key(id));
        }
    }

    #[test]
    fn leaf_projection_is_empty_and_unfocusable() {
        let tasks = sample();
        assert!(projected_task_set(&tasks, Some("x")).is_empty());
        assert!(!can_focus(&tasks, "x", true));
        assert!(can_focus(&tasks, "p", false));
        assert!(!can_focus(&tasks, "missing", true));
    }

    #[test]
    fn archived_children_count_only_when_shown() {
        let mut tasks = sample();
        if let Some(x) = tasks.get_mut("x") {
            x.archived_at = Some(x.created_at);
        }
        assert!(!can_focus(&tasks, "p", false));
        assert!(can_focus(&tasks, "p", true));
        assert!(can_focus(&tasks, "b", false));
    }

    #[test]
    fn breadcrumb_walks_parents() {
        let tasks = sample();
        assert_eq!(breadcrumb(&tasks, Some("x")), "Launch / Copy / Headline");
        assert_eq!(breadcrumb(&tasks, None), "");
        assert_eq!(
            full_path("Web", &tasks, Some("p")),
            "Web / Launch / Copy"
        );
        assert_eq!(full_path("Web", &tasks, None), "Web");
    }

    #[test]
    fn ancestor_walk_stops_on_cycle() {
        let a = child("a", "A", "b", WorkKind::Task);
        let b = child("b", "B", "a", WorkKind::Task);
        let tasks = arena(vec![a, b]);
        assert_eq!(ancestor_walk(&tasks, "a").count(), 2);
    }

    #[test]
    fn column_filter_applies_after_projection() {
        let mut tasks = sample();
        tasks.get_mut("q").unwrap().column_id = "c2".into();
        tasks.get_mut("p").unwrap().position = 5;
        let projected = projected_task_set(&tasks, Some("b"));
        let c1: Vec<&str> = column_tasks(&tasks, &projected, "c1", false)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(c1, vec!["p"]);

        tasks.get_mut("p").unwrap().archived_at = Some(chrono::Utc::now());
        assert!(column_tasks(&tasks, &projected, "c1", false).is_empty());
        assert_eq!(column_tasks(&tasks, &projected, "c1", true).len(), 1);
    }
}
