//! Named actions shared by the key map, the command palette and the
//! quick-actions menu.

use crate::ops::projection::can_focus;
use crate::tui::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    AddTask,
    AddSubtask,
    EditTask,
    RenameTask,
    TaskInfo,
    Comments,
    ProjectComments,
    DueDate,
    Labels,
    Dependencies,
    AttachResource,
    MoveLeft,
    MoveRight,
    Archive,
    Restore,
    HardDelete,
    FocusInto,
    FocusOut,
    ClearSelection,
    Undo,
    Redo,
    Search,
    Projects,
    NewProject,
    EditProject,
    ArchiveProject,
    DeleteProject,
    Activity,
    ToggleArchived,
    ToggleMouse,
    HighlightColor,
    LabelsConfig,
    PathsRoots,
    Identity,
    Reload,
    Quit,
}

/// A single action that can appear in the command palette
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub shortcut: Option<&'static str>,
    /// Offered in the per-task quick-actions menu
    pub task_scoped: bool,
}

const fn cmd(
    id: CommandId,
    name: &'static str,
    aliases: &'static [&'static str],
    shortcut: Option<&'static str>,
    task_scoped: bool,
) -> CommandSpec {
    CommandSpec {
        id,
        name,
        aliases,
        shortcut,
        task_scoped,
    }
}

pub const REGISTRY: &[CommandSpec] = &[
    cmd(CommandId::AddTask, "new task", &["add", "create"], Some("n"), false),
    cmd(CommandId::AddSubtask, "new child task", &["sub", "child"], None, true),
    cmd(CommandId::EditTask, "edit task", &["edit"], Some("e"), true),
    cmd(CommandId::RenameTask, "rename task", &["rename", "title"], Some("R"), true),
    cmd(CommandId::TaskInfo, "task info", &["info", "details"], Some("i"), true),
    cmd(CommandId::Comments, "task comments", &["comment", "thread"], Some("c"), true),
    cmd(CommandId::ProjectComments, "project comments", &["discuss"], None, false),
    cmd(CommandId::DueDate, "set due date", &["due"], Some("d"), true),
    cmd(CommandId::Labels, "set labels", &["label", "tag"], Some("t"), true),
    cmd(CommandId::Dependencies, "edit dependencies", &["deps", "blockers"], Some("b"), true),
    cmd(CommandId::AttachResource, "attach resource", &["attach", "file"], None, true),
    cmd(CommandId::MoveLeft, "move left", &["left"], Some("["), true),
    cmd(CommandId::MoveRight, "move right", &["right"], Some("]"), true),
    cmd(CommandId::Archive, "archive task", &["archive"], Some("x"), true),
    cmd(CommandId::Restore, "restore task", &["restore", "unarchive"], Some("v"), true),
    cmd(CommandId::HardDelete, "delete task permanently", &["delete", "rm"], Some("X"), true),
    cmd(CommandId::FocusInto, "focus into task", &["focus", "zoom"], Some("f"), true),
    cmd(CommandId::FocusOut, "focus out", &["up", "out"], Some("F"), false),
    cmd(CommandId::ClearSelection, "clear selection", &["unselect"], Some("esc"), false),
    cmd(CommandId::Undo, "undo", &["u"], Some("u"), false),
    cmd(CommandId::Redo, "redo", &["again"], Some("U"), false),
    cmd(CommandId::Search, "search tasks", &["find", "grep"], Some("/"), false),
    cmd(CommandId::Projects, "switch project", &["projects", "open"], Some("p"), false),
    cmd(CommandId::NewProject, "new project", &["mkproject"], None, false),
    cmd(CommandId::EditProject, "edit project", &["project"], None, false),
    cmd(CommandId::ArchiveProject, "archive project", &[], None, false),
    cmd(CommandId::DeleteProject, "delete project", &["rmproject"], None, false),
    cmd(CommandId::Activity, "activity log", &["log", "history"], Some("g"), false),
    cmd(CommandId::ToggleArchived, "toggle archived", &["archived"], Some("A"), false),
    cmd(CommandId::ToggleMouse, "toggle mouse selection", &["mouse"], Some("m"), false),
    cmd(CommandId::HighlightColor, "highlight color", &["color", "theme"], None, false),
    cmd(CommandId::LabelsConfig, "configure labels", &["labels"], None, false),
    cmd(CommandId::PathsRoots, "attachment root", &["paths", "root"], None, false),
    cmd(CommandId::Identity, "display name", &["identity", "whoami"], None, false),
    cmd(CommandId::Reload, "reload board", &["refresh"], None, false),
    cmd(CommandId::Quit, "quit", &["exit", "q"], Some("q"), false),
];

pub fn spec(id: CommandId) -> Option<&'static CommandSpec> {
    REGISTRY.iter().find(|c| c.id == id)
}

/// Why `id` cannot run right now, or `None` when it can.
pub fn guard(app: &App, id: CommandId) -> Option<&'static str> {
    use CommandId::*;
    let has_project = app.project.is_some();
    let current = app.current_task();
    match id {
        AddTask | Search | Activity | ProjectComments | EditProject | ArchiveProject
        | DeleteProject | Reload | LabelsConfig | PathsRoots => {
            (!has_project).then_some("no project open")
        }
        AddSubtask | EditTask | RenameTask | TaskInfo | Comments | DueDate | Labels
        | Dependencies => current.is_none().then_some("no task under the cursor"),
        AttachResource => match current {
            None => Some("no task under the cursor"),
            Some(_) if app.config.project_root(app.project_slug()).is_none() => {
                Some("no attachment root configured for this project")
            }
            Some(_) => None,
        },
        MoveLeft => {
            if app.selected_or_current().is_empty() {
                Some("nothing selected")
            } else if app.focus_column == 0 && app.selection.is_empty() {
                Some("already in the first column")
            } else {
                None
            }
        }
        MoveRight => {
            if app.selected_or_current().is_empty() {
                Some("nothing selected")
            } else if app.focus_column + 1 >= app.columns.len() && app.selection.is_empty() {
                Some("already in the last column")
            } else {
                None
            }
        }
        Archive | HardDelete => app
            .selected_or_current()
            .is_empty()
            .then_some("nothing selected"),
        Restore => {
            let any_archived = app
                .selected_or_current()
                .iter()
                .any(|id| app.tasks.get(id).is_some_and(|t| t.is_archived()));
            (!any_archived).then_some("nothing archived selected")
        }
        FocusInto => match current {
            None => Some("no task under the cursor"),
            Some(t) if !can_focus(&app.tasks, &t.id, app.show_archived) => {
                Some("task has no children")
            }
            Some(_) => None,
        },
        FocusOut => app.projection_root.is_none().then_some("not focused"),
        ClearSelection => app.selection.is_empty().then_some("nothing selected"),
        Undo => {
            if app.history.is_busy() {
                Some("a change is still being saved")
            } else {
                (app.history.undo_len() == 0).then_some("nothing to undo")
            }
        }
        Redo => {
            if app.history.is_busy() {
                Some("a change is still being saved")
            } else {
                (app.history.redo_len() == 0).then_some("nothing to redo")
            }
        }
        Projects | NewProject | ToggleArchived | ToggleMouse | HighlightColor | Identity
        | Quit => None,
    }
}

// ---------------------------------------------------------------------------
// Fuzzy matching
// ---------------------------------------------------------------------------

/// Fuzzy score a query against a target string.
/// Returns None if no match, or Some((score, matched_indices)).
pub fn fuzzy_score(query: &str, target: &str) -> Option<(i32, Vec<usize>)> {
    if query.is_empty() {
        return Some((0, vec![]));
    }

    let query_lower: Vec<char> = query.chars().flat_map(|c| c.to_lowercase()).collect();
    let target_chars: Vec<char> = target.chars().collect();
    let target_lower: Vec<char> = target.chars().flat_map(|c| c.to_lowercase()).collect();

    let mut matched_indices = Vec::with_capacity(query_lower.len());
    let mut search_from = 0;

    for &qc in &query_lower {
        match target_lower[search_from..]
            .iter()
            .position(|&tc| tc == qc)
        {
            Some(pos) => {
                let idx = search_from + pos;
                matched_indices.push(idx);
                search_from = idx + 1;
            }
            None => return None,
        }
    }

    let mut score: i32 = 0;
    let half = target_chars.len() / 2;

    for (mi, &idx) in matched_indices.iter().enumerate() {
        // Word boundary bonus: start of string or after space/hyphen
        let is_word_start =
            idx == 0 || matches!(target_chars.get(idx.wrapping_sub(1)), Some(' ' | '-' | ':'));
        if is_word_start {
            score += 10;
        }
        if mi > 0 && idx == matched_indices[mi - 1] + 1 {
            score += 5;
        }
        if idx < half {
            score += 3;
        }
        if mi > 0 {
            let gap = idx.saturating_sub(matched_indices[mi - 1] + 1);
            score -= gap as i32;
        }
    }

    Some((score, matched_indices))
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

const ALIAS_EXACT: i32 = 4000;
const NAME_PREFIX: i32 = 3000;
const INITIALS: i32 = 2000;
const ALIAS_PREFIX: i32 = 1000;

/// Score `query` against one command. Abbreviation hits (exact alias, name
/// prefix, initials, alias prefix) always outrank general subsequence hits.
pub fn score_command(query: &str, spec: &CommandSpec) -> Option<i32> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return Some(0);
    }
    let name = spec.name.to_lowercase();
    let aliases: Vec<String> = spec.aliases.iter().map(|a| a.to_lowercase()).collect();
    if aliases.iter().any(|a| *a == q) {
        return Some(ALIAS_EXACT);
    }
    if name.starts_with(&q) {
        return Some(NAME_PREFIX - name.len() as i32);
    }
    if initials(&name).starts_with(&q) {
        return Some(INITIALS);
    }
    if aliases.iter().any(|a| a.starts_with(&q)) {
        return Some(ALIAS_PREFIX);
    }
    std::iter::once(spec.name)
        .chain(spec.aliases.iter().copied())
        .filter_map(|target| fuzzy_score(&q, target).map(|(s, _)| s))
        .max()
        .map(|s| s.min(ALIAS_PREFIX - 1))
}

/// A palette row
#[derive(Debug, Clone, Copy)]
pub struct RankedCommand {
    pub spec: &'static CommandSpec,
    pub score: i32,
    /// Guard failure, when the command is unavailable
    pub unavailable: Option<&'static str>,
}

impl RankedCommand {
    pub fn display(&self) -> String {
        let mut text = self.spec.name.to_string();
        if let Some(key) = self.spec.shortcut {
            text.push_str(&format!("  [{}]", key));
        }
        if self.unavailable.is_some() {
            text.push_str("  (unavailable)");
        }
        text
    }
}

/// Matching commands: enabled before disabled, then by score, then by
/// registry order.
pub fn rank_commands(app: &App, query: &str, task_scoped_only: bool) -> Vec<RankedCommand> {
    let mut ranked: Vec<(usize, RankedCommand)> = REGISTRY
        .iter()
        .enumerate()
        .filter(|(_, spec)| !task_scoped_only || spec.task_scoped)
        .filter_map(|(idx, spec)| {
            let score = score_command(query, spec)?;
            Some((
                idx,
                RankedCommand {
                    spec,
                    score,
                    unavailable: guard(app, spec.id),
                },
            ))
        })
        .collect();
    ranked.sort_by(|(ia, a), (ib, b)| {
        a.unavailable
            .is_some()
            .cmp(&b.unavailable.is_some())
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| ia.cmp(ib))
    });
    ranked.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Config, Project};
    use crate::ops::test_support::{epoch, task};
    use std::path::PathBuf;

    fn app() -> App {
        let mut config = Config::default();
        config.identity.display_name = "t".into();
        let mut app = App::new(config, PathBuf::new(), Some("p1".into()), false);
        app.project = Some(Project {
            id: "p1".into(),
            slug: "p".into(),
            name: "P".into(),
            description: String::new(),
            metadata: Default::default(),
            created_at: epoch(),
            archived_at: None,
        });
        app.columns = vec![Column {
            id: "c1".into(),
            project_id: "p1".into(),
            name: "To Do".into(),
            position: 0,
            wip_limit: None,
        }];
        app.tasks.insert("a".into(), task("a", "A"));
        app
    }

    #[test]
    fn fuzzy_score_exact_match() {
        let (score, indices) = fuzzy_score("undo", "undo").unwrap();
        assert!(score > 0);
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn fuzzy_score_no_match() {
        assert!(fuzzy_score("xyz", "archive task").is_none());
    }

    #[test]
    fn fuzzy_score_word_boundary() {
        let (boundary, _) = fuzzy_score("t", "archive task").unwrap();
        let (inner, _) = fuzzy_score("h", "archive task").unwrap();
        assert!(boundary > inner);
    }

    #[test]
    fn abbreviations_outrank_subsequences() {
        let rename = spec(CommandId::RenameTask).unwrap();
        let redo = spec(CommandId::Redo).unwrap();
        // "rt" is the initials of "rename task"; for "redo" it is not a hit at all
        assert_eq!(score_command("rt", rename), Some(INITIALS));
        assert_eq!(score_command("rt", redo), None);
        let edit = spec(CommandId::EditTask).unwrap();
        assert_eq!(score_command("edit", edit), Some(ALIAS_EXACT));
        let deps = spec(CommandId::Dependencies).unwrap();
        assert!(score_command("dps", deps).unwrap() < ALIAS_PREFIX);
    }

    #[test]
    fn disabled_commands_sort_last_and_say_why() {
        let app = app();
        let ranked = rank_commands(&app, "", false);
        let first_disabled = ranked
            .iter()
            .position(|r| r.unavailable.is_some())
            .unwrap();
        assert!(ranked[first_disabled..].iter().all(|r| r.unavailable.is_some()));
        let undo = ranked
            .iter()
            .find(|r| r.spec.id == CommandId::Undo)
            .unwrap();
        assert_eq!(undo.unavailable, Some("nothing to undo"));
        assert!(undo.display().ends_with("(unavailable)"));
    }

    #[test]
    fn ties_keep_registry_order() {
        let app = app();
        let ranked = rank_commands(&app, "", true);
        let ids: Vec<CommandId> = ranked
            .iter()
            .filter(|r| r.unavailable.is_none())
            .map(|r| r.spec.id)
            .collect();
        assert_eq!(ids[0], CommandId::AddSubtask);
        assert_eq!(ids[1], CommandId::EditTask);
        assert!(ranked.iter().all(|r| r.spec.task_scoped));
    }
}
