//! Interaction modes. Each variant owns only its own state; modals that
//! return somewhere other than the board keep the mode to return to.

use chrono::{DateTime, Utc};

use crate::io::fs_browse::DirEntry;
use crate::model::{
    Comment, CommentTarget, Project, ResourceRef, Task, TaskFields, TaskMatch, WorkKind,
};
use crate::ops::deps::{DepField, DependencyCandidate, PendingLinks, StateId};
use crate::ops::fields::{format_due, format_list};
use crate::util::text_input::TextInput;

#[derive(Debug, Clone, Default)]
pub enum Mode {
    #[default]
    Normal,
    AddTask(TaskForm),
    EditTask(TaskForm),
    Rename(RenameState),
    Search(SearchState),
    SearchResults(ResultsState),
    ProjectPicker(PickerState),
    ProjectForm(ProjectFormState),
    Confirm(ConfirmState),
    CommandPalette(PaletteState),
    QuickActions(QuickState),
    TaskInfo(TaskInfoState),
    Thread(ThreadState),
    DuePicker(DuePickerState),
    LabelPicker(LabelPickerState),
    DependencyInspector(InspectorState),
    ActivityLog(ActivityState),
    HighlightColor(ColorState),
    LabelsConfig(LabelsConfigState),
    PathsRoots(PathsState),
    ResourcePicker(ResourcePickerState),
    BootstrapSettings(BootstrapState),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::AddTask(_) => "add-task",
            Mode::EditTask(_) => "edit-task",
            Mode::Rename(_) => "rename",
            Mode::Search(_) => "search",
            Mode::SearchResults(_) => "search-results",
            Mode::ProjectPicker(_) => "project-picker",
            Mode::ProjectForm(f) if f.project_id.is_some() => "edit-project",
            Mode::ProjectForm(_) => "add-project",
            Mode::Confirm(_) => "confirm-action",
            Mode::CommandPalette(_) => "command-palette",
            Mode::QuickActions(_) => "quick-actions",
            Mode::TaskInfo(_) => "task-info",
            Mode::Thread(_) => "thread",
            Mode::DuePicker(_) => "due-picker",
            Mode::LabelPicker(_) => "label-picker",
            Mode::DependencyInspector(_) => "dependency-inspector",
            Mode::ActivityLog(_) => "activity-log",
            Mode::HighlightColor(_) => "highlight-color",
            Mode::LabelsConfig(_) => "labels-config",
            Mode::PathsRoots(_) => "paths-roots",
            Mode::ResourcePicker(_) => "resource-picker",
            Mode::BootstrapSettings(_) => "bootstrap-settings",
        }
    }

    /// Modes where printable keys are typed into a field. Mouse input is
    /// ignored while one of these is active.
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            Mode::AddTask(_)
                | Mode::EditTask(_)
                | Mode::Rename(_)
                | Mode::Search(_)
                | Mode::ProjectForm(_)
                | Mode::CommandPalette(_)
                | Mode::Thread(_)
                | Mode::DuePicker(_)
                | Mode::HighlightColor(_)
                | Mode::LabelsConfig(_)
                | Mode::PathsRoots(_)
                | Mode::BootstrapSettings(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Task forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Kind,
    Priority,
    Due,
    Labels,
    DependsOn,
    BlockedBy,
    BlockedReason,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::Description => "description",
            FormField::Kind => "kind",
            FormField::Priority => "priority",
            FormField::Due => "due",
            FormField::Labels => "labels",
            FormField::DependsOn => "depends on",
            FormField::BlockedBy => "blocked by",
            FormField::BlockedReason => "blocked reason",
        }
    }
}

const ADD_FIELDS: [FormField; 9] = [
    FormField::Title,
    FormField::Description,
    FormField::Kind,
    FormField::Priority,
    FormField::Due,
    FormField::Labels,
    FormField::DependsOn,
    FormField::BlockedBy,
    FormField::BlockedReason,
];

const EDIT_FIELDS: [FormField; 8] = [
    FormField::Title,
    FormField::Description,
    FormField::Priority,
    FormField::Due,
    FormField::Labels,
    FormField::DependsOn,
    FormField::BlockedBy,
    FormField::BlockedReason,
];

/// State shared by add-task and edit-task
#[derive(Debug, Clone)]
pub struct TaskForm {
    /// Set when editing
    pub task_id: Option<String>,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub column_id: String,
    pub kind: WorkKind,
    /// Kinds allowed under `parent_id`
    pub kind_options: Vec<WorkKind>,
    pub title: TextInput,
    pub description: TextInput,
    pub priority: TextInput,
    pub due: TextInput,
    pub labels: TextInput,
    pub depends_on: TextInput,
    pub blocked_by: TextInput,
    pub blocked_reason: TextInput,
    pub resource_refs: Vec<ResourceRef>,
    pub focus: FormField,
    pub error: Option<String>,
    /// Inherited label suggestions
    pub suggested_labels: Vec<String>,
    /// Field values when an edit began
    pub original: Option<TaskFields>,
    /// Where esc and a successful submit return to
    pub back: Box<Mode>,
}

impl TaskForm {
    pub fn for_add(
        project_id: &str,
        parent: Option<&Task>,
        column_id: &str,
        suggested_labels: Vec<String>,
    ) -> Self {
        let parent_kind = parent.map(|p| p.kind);
        let kind_options: Vec<WorkKind> = WorkKind::ALL
            .into_iter()
            .filter(|k| k.allows_parent(parent_kind))
            .collect();
        let kind = match parent {
            Some(p) => p.kind.default_child(),
            None => WorkKind::Task,
        };
        TaskForm {
            task_id: None,
            project_id: project_id.to_string(),
            parent_id: parent.map(|p| p.id.clone()),
            column_id: column_id.to_string(),
            kind,
            kind_options,
            title: TextInput::new(),
            description: TextInput::new(),
            priority: TextInput::with_text("medium"),
            due: TextInput::new(),
            labels: TextInput::new(),
            depends_on: TextInput::new(),
            blocked_by: TextInput::new(),
            blocked_reason: TextInput::new(),
            resource_refs: Vec::new(),
            focus: FormField::Title,
            error: None,
            suggested_labels,
            original: None,
            back: Box::new(Mode::Normal),
        }
    }

    pub fn for_edit(task: &Task, suggested_labels: Vec<String>) -> Self {
        let fields = TaskFields::from_task(task);
        TaskForm {
            task_id: Some(task.id.clone()),
            project_id: task.project_id.clone(),
            parent_id: task.parent_id.clone(),
            column_id: task.column_id.clone(),
            kind: task.kind,
            kind_options: vec![task.kind],
            title: TextInput::with_text(&task.title),
            description: TextInput::with_text(&task.description),
            priority: TextInput::with_text(task.priority.as_str()),
            due: TextInput::with_text(format_due(task.due_at)),
            labels: TextInput::with_text(format_list(&task.labels)),
            depends_on: TextInput::with_text(format_list(&task.metadata.depends_on)),
            blocked_by: TextInput::with_text(format_list(&task.metadata.blocked_by)),
            blocked_reason: TextInput::with_text(&task.metadata.blocked_reason),
            resource_refs: task.metadata.resource_refs.clone(),
            focus: FormField::Title,
            error: None,
            suggested_labels,
            original: Some(fields),
            back: Box::new(Mode::Normal),
        }
    }

    pub fn returning_to(mut self, back: Mode) -> Self {
        self.back = Box::new(back);
        self
    }

    pub fn is_edit(&self) -> bool {
        self.task_id.is_some()
    }

    pub fn fields(&self) -> &'static [FormField] {
        if self.is_edit() {
            &EDIT_FIELDS
        } else {
            &ADD_FIELDS
        }
    }

    pub fn input(&self, field: FormField) -> Option<&TextInput> {
        match field {
            FormField::Title => Some(&self.title),
            FormField::Description => Some(&self.description),
            FormField::Kind => None,
            FormField::Priority => Some(&self.priority),
            FormField::Due => Some(&self.due),
            FormField::Labels => Some(&self.labels),
            FormField::DependsOn => Some(&self.depends_on),
            FormField::BlockedBy => Some(&self.blocked_by),
            FormField::BlockedReason => Some(&self.blocked_reason),
        }
    }

    pub fn input_mut(&mut self, field: FormField) -> Option<&mut TextInput> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Kind => None,
            FormField::Priority => Some(&mut self.priority),
            FormField::Due => Some(&mut self.due),
            FormField::Labels => Some(&mut self.labels),
            FormField::DependsOn => Some(&mut self.depends_on),
            FormField::BlockedBy => Some(&mut self.blocked_by),
            FormField::BlockedReason => Some(&mut self.blocked_reason),
        }
    }

    /// Move focus by `delta` fields, wrapping.
    pub fn cycle_focus(&mut self, delta: isize) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let len = fields.len() as isize;
        self.focus = fields[(idx + delta).rem_euclid(len) as usize];
    }

    pub fn cycle_kind(&mut self, delta: isize) {
        if self.kind_options.is_empty() {
            return;
        }
        let idx = self
            .kind_options
            .iter()
            .position(|k| *k == self.kind)
            .unwrap_or(0) as isize;
        let len = self.kind_options.len() as isize;
        self.kind = self.kind_options[(idx + delta).rem_euclid(len) as usize];
    }
}

#[derive(Debug, Clone)]
pub struct RenameState {
    pub task_id: String,
    pub original: String,
    pub input: TextInput,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SearchState {
    pub input: TextInput,
    pub cross_project: bool,
    pub include_archived: bool,
}

#[derive(Debug, Clone)]
pub struct ResultsState {
    pub query: String,
    pub cross_project: bool,
    pub include_archived: bool,
    pub matches: Vec<TaskMatch>,
    pub selected: usize,
    pub scroll: usize,
    pub loading: bool,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PickerState {
    pub selected: usize,
    pub scroll: usize,
    pub show_archived: bool,
    pub loading: bool,
}

impl PickerState {
    pub fn visible<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects
            .iter()
            .filter(|p| self.show_archived || !p.is_archived())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    Name,
    Slug,
    Description,
    Owner,
    Tags,
}

impl ProjectField {
    pub const ALL: [ProjectField; 5] = [
        ProjectField::Name,
        ProjectField::Slug,
        ProjectField::Description,
        ProjectField::Owner,
        ProjectField::Tags,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProjectField::Name => "name",
            ProjectField::Slug => "slug",
            ProjectField::Description => "description",
            ProjectField::Owner => "owner",
            ProjectField::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectFormState {
    pub project_id: Option<String>,
    pub name: TextInput,
    pub slug: TextInput,
    pub description: TextInput,
    pub owner: TextInput,
    pub tags: TextInput,
    pub focus: ProjectField,
    pub error: Option<String>,
    pub back: Box<Mode>,
}

impl ProjectFormState {
    pub fn new(project: Option<&Project>, back: Mode) -> Self {
        let text = |f: fn(&Project) -> String| {
            TextInput::with_text(project.map(f).unwrap_or_default())
        };
        ProjectFormState {
            project_id: project.map(|p| p.id.clone()),
            name: text(|p| p.name.clone()),
            slug: text(|p| p.slug.clone()),
            description: text(|p| p.description.clone()),
            owner: text(|p| p.metadata.owner.clone()),
            tags: text(|p| format_list(&p.metadata.tags)),
            focus: ProjectField::Name,
            error: None,
            back: Box::new(back),
        }
    }

    pub fn input(&self, field: ProjectField) -> &TextInput {
        match field {
            ProjectField::Name => &self.name,
            ProjectField::Slug => &self.slug,
            ProjectField::Description => &self.description,
            ProjectField::Owner => &self.owner,
            ProjectField::Tags => &self.tags,
        }
    }

    pub fn input_mut(&mut self, field: ProjectField) -> &mut TextInput {
        match field {
            ProjectField::Name => &mut self.name,
            ProjectField::Slug => &mut self.slug,
            ProjectField::Description => &mut self.description,
            ProjectField::Owner => &mut self.owner,
            ProjectField::Tags => &mut self.tags,
        }
    }
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// An action waiting on confirmation, with everything needed to re-run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Archive(Vec<String>),
    Restore(Vec<String>),
    HardDelete(Vec<String>),
    DeleteProject { id: String, name: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        let count = |ids: &Vec<String>| match ids.len() {
            1 => "this task".to_string(),
            n => format!("{} tasks", n),
        };
        match self {
            PendingAction::Archive(ids) => format!("Archive {}?", count(ids)),
            PendingAction::Restore(ids) => format!("Restore {}?", count(ids)),
            PendingAction::HardDelete(ids) => {
                format!("Permanently delete {}? This cannot be undone.", count(ids))
            }
            PendingAction::DeleteProject { name, .. } => {
                format!("Delete project \"{}\" and all of its tasks?", name)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmState {
    pub action: PendingAction,
    pub back: Box<Mode>,
}

// ---------------------------------------------------------------------------
// Palette and quick actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PaletteState {
    pub input: TextInput,
    pub selected: usize,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct QuickState {
    pub task_id: String,
    pub selected: usize,
}

// ---------------------------------------------------------------------------
// Task info and comments
// ---------------------------------------------------------------------------

/// One level of task-info navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoFrame {
    pub task_id: String,
    pub child_cursor: usize,
}

#[derive(Debug, Clone)]
pub struct TaskInfoState {
    /// Innermost frame last; never empty while the mode is active
    pub stack: Vec<InfoFrame>,
}

impl TaskInfoState {
    pub fn new(task_id: &str) -> Self {
        TaskInfoState {
            stack: vec![InfoFrame {
                task_id: task_id.to_string(),
                child_cursor: 0,
            }],
        }
    }

    pub fn current(&self) -> Option<&InfoFrame> {
        self.stack.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut InfoFrame> {
        self.stack.last_mut()
    }
}

#[derive(Debug, Clone)]
pub struct ThreadState {
    pub target: CommentTarget,
    pub title: String,
    pub comments: Vec<Comment>,
    pub loading: bool,
    pub posting: bool,
    pub input: TextInput,
    pub scroll: usize,
    pub back: Box<Mode>,
}

// ---------------------------------------------------------------------------
// Pickers
// ---------------------------------------------------------------------------

/// Where a picker writes its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    /// Save straight to this task as an undoable update
    Task(String),
    /// Write into the task form held in `back`
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuePreset {
    Today,
    Tomorrow,
    NextWeek,
    Clear,
}

impl DuePreset {
    pub const ALL: [DuePreset; 4] = [
        DuePreset::Today,
        DuePreset::Tomorrow,
        DuePreset::NextWeek,
        DuePreset::Clear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DuePreset::Today => "today",
            DuePreset::Tomorrow => "tomorrow",
            DuePreset::NextWeek => "in a week",
            DuePreset::Clear => "clear",
        }
    }

    pub fn resolve(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
        match self {
            DuePreset::Today => Some(today),
            DuePreset::Tomorrow => Some(today + chrono::Duration::days(1)),
            DuePreset::NextWeek => Some(today + chrono::Duration::days(7)),
            DuePreset::Clear => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DuePickerState {
    pub target: PickTarget,
    /// Preset cursor; `DuePreset::ALL.len()` means the typed value
    pub selected: usize,
    pub input: TextInput,
    pub error: Option<String>,
    pub back: Box<Mode>,
}

#[derive(Debug, Clone)]
pub struct LabelPickerState {
    pub target: PickTarget,
    /// Suggestions first (inherited, then project and global), then extras
    pub options: Vec<String>,
    pub chosen: Vec<String>,
    pub selected: usize,
    pub scroll: usize,
    pub input: TextInput,
    pub back: Box<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorOrigin {
    Board,
    TaskInfo,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorFocus {
    Query,
    List,
}

#[derive(Debug, Clone)]
pub struct InspectorState {
    /// Owner as it was when the inspector opened; pinned rows come from here
    pub owner: Task,
    pub origin: InspectorOrigin,
    pub field: DepField,
    pub focus: InspectorFocus,
    pub query: TextInput,
    pub states: Vec<StateId>,
    pub include_archived: bool,
    pub cross_project: bool,
    pub pool: Vec<TaskMatch>,
    pub loading: bool,
    pub pending: PendingLinks,
    pub rows: Vec<DependencyCandidate>,
    pub selected: usize,
    pub scroll: usize,
    pub back: Box<Mode>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityState {
    pub selected: usize,
    pub scroll: usize,
    pub loading: bool,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub const HIGHLIGHT_COLORS: [&str; 8] = [
    "cyan", "magenta", "yellow", "green", "blue", "red", "white", "lightblue",
];

#[derive(Debug, Clone)]
pub struct ColorState {
    pub selected: usize,
    /// Custom value such as `#ff8800`
    pub input: TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelsField {
    Global,
    Project,
}

#[derive(Debug, Clone)]
pub struct LabelsConfigState {
    pub slug: Option<String>,
    pub global: TextInput,
    pub project: TextInput,
    pub focus: LabelsField,
}

#[derive(Debug, Clone)]
pub struct PathsState {
    pub slug: String,
    pub input: TextInput,
}

#[derive(Debug, Clone)]
pub struct ResourcePickerState {
    pub target: PickTarget,
    pub slug: String,
    pub root: String,
    /// Directory being listed, relative to `root`
    pub dir: String,
    pub entries: Vec<DirEntry>,
    pub selected: usize,
    pub scroll: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub back: Box<Mode>,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapState {
    pub name: TextInput,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::task;

    #[test]
    fn add_form_kinds_follow_parent() {
        let mut parent = task("p", "Parent");
        parent.kind = WorkKind::Phase;
        let form = TaskForm::for_add("p1", Some(&parent), "c1", vec![]);
        assert_eq!(form.kind, WorkKind::Task);
        assert_eq!(
            form.kind_options,
            vec![WorkKind::Phase, WorkKind::Subphase, WorkKind::Task]
        );
        let top = TaskForm::for_add("p1", None, "c1", vec![]);
        assert_eq!(top.kind_options, vec![WorkKind::Branch, WorkKind::Task]);
    }

    #[test]
    fn focus_wraps_and_skips_kind_on_edit() {
        let mut form = TaskForm::for_edit(&task("t", "T"), vec![]);
        form.cycle_focus(-1);
        assert_eq!(form.focus, FormField::BlockedReason);
        form.cycle_focus(1);
        form.cycle_focus(1);
        assert_eq!(form.focus, FormField::Description);
        form.cycle_focus(1);
        assert_eq!(form.focus, FormField::Priority);
    }

    #[test]
    fn due_presets_are_midnight() {
        let now = chrono::DateTime::parse_from_rfc3339("2025-03-04T15:20:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            format_due(DuePreset::Tomorrow.resolve(now)),
            "2025-03-05"
        );
        assert_eq!(DuePreset::Clear.resolve(now), None);
    }
}
