use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use indexmap::IndexSet;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::io::config_io;
use crate::io::store::{LocalStore, seed_welcome};
use crate::model::{ChangeEvent, Column, Config, DependencyRollup, Project, Task, TaskArena};
use crate::ops::labels::inherited_labels;
use crate::ops::projection::{column_tasks, projected_task_set};
use crate::service::Service;

use super::effects::{BoardData, Request, StepOutcome, execute as execute_request};
use super::input::update;
use super::modes::{Mode, PendingAction};
use super::msg::Msg;
use super::render::{self, MouseCapture};
use super::theme::Theme;
use super::undo::History;

pub const ACTIVITY_LIMIT: usize = 200;
/// Persisted change events fetched when the activity log opens
pub const ACTIVITY_FETCH_LIMIT: usize = 100;

/// Header rows above the first board row
pub const BOARD_TOP: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub target: String,
    pub summary: String,
}

impl ActivityEntry {
    pub fn from_event(event: &ChangeEvent, tasks: &TaskArena) -> Self {
        let target = match &event.task_id {
            Some(id) => tasks
                .get(id)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| id.clone()),
            None => "project".to_string(),
        };
        let summary = if event.actor.is_empty() {
            event.operation.replace('_', " ")
        } else {
            format!("{} by {}", event.operation.replace('_', " "), event.actor)
        };
        ActivityEntry {
            at: event.occurred_at,
            target,
            summary,
        }
    }
}

/// Local UI actions plus the last fetched page of persisted events. Both
/// halves are capped; the merged view is newest first.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    local: VecDeque<ActivityEntry>,
    persisted: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, target: impl Into<String>, summary: impl Into<String>) {
        self.local.push_back(ActivityEntry {
            at: Utc::now(),
            target: target.into(),
            summary: summary.into(),
        });
        while self.local.len() > ACTIVITY_LIMIT {
            self.local.pop_front();
        }
    }

    pub fn set_persisted(&mut self, entries: Vec<ActivityEntry>) {
        self.persisted = entries;
        self.persisted.truncate(ACTIVITY_LIMIT);
    }

    pub fn clear_persisted(&mut self) {
        self.persisted.clear();
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn merged(&self) -> Vec<&ActivityEntry> {
        let mut all: Vec<&ActivityEntry> = self.local.iter().chain(&self.persisted).collect();
        all.sort_by(|a, b| b.at.cmp(&a.at));
        all.truncate(ACTIVITY_LIMIT);
        all
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

/// Main application state
pub struct App {
    pub mode: Mode,
    pub config: Config,
    /// Last config known to be on disk; restored when a write fails
    pub saved_config: Config,
    pub config_path: PathBuf,
    pub projects: Vec<Project>,
    pub project: Option<Project>,
    pub columns: Vec<Column>,
    pub tasks: TaskArena,
    pub rollup: DependencyRollup,
    pub focus_column: usize,
    /// Row within the focused column
    pub cursor: usize,
    pub selection: IndexSet<String>,
    pub projection_root: Option<String>,
    pub history: History,
    pub activity: ActivityLog,
    pub status: Status,
    pub show_archived: bool,
    /// Leave the mouse to the terminal
    pub mouse_selection: bool,
    pub size: (u16, u16),
    pub board_loading: bool,
    /// Task to put the cursor on once the next board load lands
    pub pending_focus: Option<String>,
    /// Project slug or id requested on the command line
    pub startup_project: Option<String>,
}

impl App {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        startup_project: Option<String>,
        mouse_select: bool,
    ) -> Self {
        let mode = if config.needs_bootstrap() {
            Mode::BootstrapSettings(Default::default())
        } else if startup_project.is_none() {
            Mode::ProjectPicker(super::modes::PickerState {
                loading: true,
                ..Default::default()
            })
        } else {
            Mode::Normal
        };
        App {
            mode,
            show_archived: config.ui.show_archived,
            mouse_selection: mouse_select || config.ui.mouse_selection_mode,
            saved_config: config.clone(),
            config,
            config_path,
            projects: Vec::new(),
            project: None,
            columns: Vec::new(),
            tasks: TaskArena::new(),
            rollup: DependencyRollup::default(),
            focus_column: 0,
            cursor: 0,
            selection: IndexSet::new(),
            projection_root: None,
            history: History::new(),
            activity: ActivityLog::default(),
            status: Status::default(),
            size: (80, 24),
            board_loading: false,
            pending_focus: None,
            startup_project,
        }
    }

    /// Requests to issue before the first event.
    pub fn startup(&self) -> Vec<Request> {
        vec![Request::LoadProjects]
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Status {
            text: text.into(),
            is_error: false,
        };
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(status = %text, "error status");
        self.status = Status {
            text,
            is_error: true,
        };
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.id.as_str())
    }

    pub fn project_slug(&self) -> &str {
        self.project.as_ref().map(|p| p.slug.as_str()).unwrap_or("")
    }

    pub fn board_rows_visible(&self) -> usize {
        self.size.1.saturating_sub(BOARD_TOP + 1) as usize
    }

    pub fn projected(&self) -> Vec<String> {
        projected_task_set(&self.tasks, self.projection_root.as_deref())
    }

    /// Visible tasks of one column, in board order.
    pub fn column_rows(&self, column: usize) -> Vec<&Task> {
        let Some(col) = self.columns.get(column) else {
            return Vec::new();
        };
        let projected = self.projected();
        column_tasks(&self.tasks, &projected, &col.id, self.show_archived)
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.column_rows(self.focus_column)
            .get(self.cursor)
            .copied()
    }

    pub fn current_task_id(&self) -> Option<String> {
        self.current_task().map(|t| t.id.clone())
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn clamp_cursor(&mut self) {
        if self.columns.is_empty() {
            self.focus_column = 0;
            self.cursor = 0;
            return;
        }
        self.focus_column = self.focus_column.min(self.columns.len() - 1);
        let rows = self.column_rows(self.focus_column).len();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }

    /// Selected task ids in board order, or the task under the cursor.
    pub fn selected_or_current(&self) -> Vec<String> {
        if self.selection.is_empty() {
            return self.current_task_id().into_iter().collect();
        }
        self.tasks
            .keys()
            .filter(|id| self.selection.contains(*id))
            .cloned()
            .collect()
    }

    /// Put the cursor on `task_id`, adjusting focus or archive visibility
    /// as needed. Returns false when the task is not on this board.
    pub fn focus_task(&mut self, task_id: &str) -> bool {
        let Some(task) = self.tasks.get(task_id) else {
            return false;
        };
        let parent = task.parent_id.clone();
        let archived = task.is_archived();
        let column_id = task.column_id.clone();
        if !self.projected().iter().any(|id| id == task_id) {
            self.projection_root = parent;
        }
        if archived {
            self.show_archived = true;
        }
        if let Some(col) = self.column_index(&column_id) {
            self.focus_column = col;
            self.cursor = self
                .column_rows(col)
                .iter()
                .position(|t| t.id == task_id)
                .unwrap_or(0);
        }
        true
    }

    /// Focus a task that may live in another project, opening it first.
    pub fn jump_to_task(&mut self, project_id: &str, task_id: &str) -> Vec<Request> {
        self.mode = Mode::Normal;
        if self.project_id() != Some(project_id) {
            let requests = self.select_project(project_id);
            self.pending_focus = Some(task_id.to_string());
            return requests;
        }
        if !self.focus_task(task_id) {
            self.set_error(format!("task not on this board: {}", task_id));
        }
        Vec::new()
    }

    /// Open another project. History and selection belong to the old one.
    pub fn select_project(&mut self, project_id: &str) -> Vec<Request> {
        self.history.clear();
        self.selection.clear();
        self.projection_root = None;
        self.pending_focus = None;
        self.focus_column = 0;
        self.cursor = 0;
        self.activity.clear_persisted();
        self.project = self.projects.iter().find(|p| p.id == project_id).cloned();
        if self.project.is_none() {
            self.tasks.clear();
            self.columns.clear();
        }
        self.board_loading = true;
        self.mode = Mode::Normal;
        tracing::info!(project_id, "opening project");
        vec![Request::LoadBoard {
            project_id: project_id.to_string(),
        }]
    }

    pub fn reload_board(&mut self) -> Vec<Request> {
        match self.project_id() {
            Some(id) => {
                let project_id = id.to_string();
                self.board_loading = true;
                vec![Request::LoadBoard { project_id }]
            }
            None => Vec::new(),
        }
    }

    /// Replace the snapshot with a freshly loaded board.
    pub fn apply_board(&mut self, board: BoardData) {
        let focused = self.current_task_id();
        self.project = Some(board.project);
        self.columns = board.columns;
        self.columns.sort_by_key(|c| c.position);
        self.tasks = board.tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        self.rollup = board.rollup;
        self.board_loading = false;
        self.selection.retain(|id| self.tasks.contains_key(id));
        if let Some(root) = &self.projection_root
            && !self.tasks.contains_key(root)
        {
            self.projection_root = None;
        }
        if let Some(id) = self.pending_focus.take().or(focused) {
            self.focus_task(&id);
        }
        self.clamp_cursor();
    }

    pub fn apply_outcomes(&mut self, outcomes: Vec<StepOutcome>) {
        for outcome in outcomes {
            match outcome {
                StepOutcome::Saved(task) => {
                    if Some(task.project_id.as_str()) == self.project_id() {
                        self.tasks.insert(task.id.clone(), task);
                    }
                }
                StepOutcome::Deleted(id) => self.remove_subtree(&id),
            }
        }
        self.selection.retain(|id| self.tasks.contains_key(id));
        self.clamp_cursor();
    }

    fn remove_subtree(&mut self, id: &str) {
        let mut doomed = vec![id.to_string()];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i].clone();
            doomed.extend(
                self.tasks
                    .values()
                    .filter(|t| t.parent_id.as_deref() == Some(parent.as_str()))
                    .map(|t| t.id.clone()),
            );
            i += 1;
        }
        for id in doomed {
            self.tasks.shift_remove(&id);
        }
        if let Some(root) = &self.projection_root
            && !self.tasks.contains_key(root)
        {
            self.projection_root = None;
        }
    }

    /// Label suggestions for an item created under `parent_id`.
    pub fn label_suggestions(&self, parent_id: Option<&str>) -> Vec<String> {
        inherited_labels(&self.config, self.project_slug(), &self.tasks, parent_id)
    }

    pub fn needs_confirm(&self, action: &PendingAction) -> bool {
        let confirm = &self.config.confirm;
        match action {
            PendingAction::Archive(_) => confirm.archive,
            PendingAction::Restore(_) => confirm.restore,
            PendingAction::HardDelete(_) => confirm.hard_delete,
            PendingAction::DeleteProject { .. } => confirm.delete_project,
        }
    }

    pub fn task_title(&self, id: &str) -> String {
        self.tasks
            .get(id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Options for [`run`], filled in by the binary from its arguments
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub project: Option<String>,
    pub mouse_select: bool,
}

/// Run the TUI application
pub fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = options
        .config_path
        .unwrap_or_else(config_io::default_config_path);
    let (config, _) = config_io::read_config(&config_path)?;
    let data_path = options.data_path.unwrap_or_else(LocalStore::default_path);
    let actor = match config.identity.display_name.trim() {
        "" => "local",
        name => name,
    };
    let store = LocalStore::open(&data_path, actor)?;
    if store.list_projects(true)?.is_empty() {
        seed_welcome(&store)?;
    }
    tracing::info!(config = %config_path.display(), data = %data_path.display(), "starting");

    let service: Arc<dyn Service> = Arc::new(store);
    let mut app = App::new(config, config_path, options.project, options.mouse_select);

    // One worker runs requests in the order they were issued.
    let (request_tx, request_rx) = mpsc::channel::<Request>();
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let worker_service = Arc::clone(&service);
    let worker = thread::spawn(move || {
        for request in request_rx {
            if let Some(msg) = execute_request(worker_service.as_ref(), request)
                && msg_tx.send(msg).is_err()
            {
                break;
            }
        }
    });

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, &request_tx, &msg_rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    drop(request_tx);
    let _ = worker.join();
    tracing::info!("exiting");
    result
}

/// Feed one message through `update` and forward its requests. Returns
/// true once a quit was requested.
fn dispatch(app: &mut App, msg: Msg, requests: &Sender<Request>) -> Result<bool, &'static str> {
    let mut quit = false;
    for request in update(app, msg) {
        if request == Request::Quit {
            quit = true;
            continue;
        }
        tracing::debug!(request = request.name(), "issuing request");
        requests
            .send(request)
            .map_err(|_| "request worker stopped")?;
    }
    Ok(quit)
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    requests: &Sender<Request>,
    results: &Receiver<Msg>,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = terminal.size()?;
    update(
        app,
        Msg::Resize {
            width: size.width,
            height: size.height,
        },
    );
    for request in app.startup() {
        requests
            .send(request)
            .map_err(|_| "request worker stopped")?;
    }

    let mut mouse_captured = false;
    loop {
        let view = render::view(app);
        let want_capture = view.mouse_capture == MouseCapture::Capture;
        if want_capture != mouse_captured {
            if want_capture {
                execute!(terminal.backend_mut(), EnableMouseCapture)?;
            } else {
                execute!(terminal.backend_mut(), DisableMouseCapture)?;
            }
            mouse_captured = want_capture;
        }
        let theme = Theme::from_config(&app.config.ui);
        terminal.draw(|frame| render::draw(frame, &view, &theme))?;

        let mut pending: Vec<Msg> = results.try_iter().collect();
        if pending.is_empty() && event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => pending.push(Msg::Key(key)),
                Event::Mouse(mouse) => pending.push(Msg::Mouse(mouse)),
                Event::Resize(width, height) => pending.push(Msg::Resize { width, height }),
                _ => {}
            }
        }

        let mut quit = false;
        for msg in pending {
            quit |= dispatch(app, msg, requests)?;
        }
        if quit {
            break;
        }
    }
    Ok(())
}
