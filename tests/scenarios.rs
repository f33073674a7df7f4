use std::collections::VecDeque;
use std::path::PathBuf;

use arbor::io::store::LocalStore;
use arbor::model::{Config, Priority, TaskMetadata, WorkKind};
use arbor::ops::deps::DepField;
use arbor::service::{ProjectInput, Service, TaskInput};
use arbor::tui::modes::Mode;
use arbor::tui::{App, Msg, Request, execute, update};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;

/// An app wired to an in-memory store, with requests run inline.
struct Harness {
    app: App,
    store: LocalStore,
    project_id: String,
}

impl Harness {
    fn new(titles: &[&str]) -> Self {
        let store = LocalStore::in_memory("Tester");
        let project = store
            .create_project(ProjectInput {
                name: "Web".into(),
                ..Default::default()
            })
            .unwrap();
        for title in titles {
            store.create_task(input(&project.id, title)).unwrap();
        }
        Self::open(store, &project.slug, project.id.clone())
    }

    fn open(store: LocalStore, slug: &str, project_id: String) -> Self {
        let mut config = Config::default();
        config.identity.display_name = "Tester".into();
        config.confirm.hard_delete = false;
        let app = App::new(config, PathBuf::new(), Some(slug.to_string()), false);
        let mut h = Harness {
            app,
            store,
            project_id,
        };
        let startup = h.app.startup();
        h.run(startup);
        h
    }

    /// Execute requests until none are left.
    fn run(&mut self, requests: Vec<Request>) {
        let mut queue: VecDeque<Request> = requests.into();
        while let Some(request) = queue.pop_front() {
            if matches!(request, Request::Quit) {
                continue;
            }
            if let Some(msg) = execute(&self.store, request) {
                queue.extend(update(&mut self.app, msg));
            }
        }
    }

    fn press(&mut self, code: KeyCode) {
        let requests = update(
            &mut self.app,
            Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)),
        );
        self.run(requests);
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    fn column_of(&self, title: &str) -> String {
        let columns = self.store.list_columns(&self.project_id).unwrap();
        let task = self
            .store
            .list_tasks(&self.project_id, true)
            .unwrap()
            .into_iter()
            .find(|t| t.title == title)
            .unwrap();
        columns
            .into_iter()
            .find(|c| c.id == task.column_id)
            .unwrap()
            .name
    }

    /// Stored tasks minus timestamps, sorted by id
    fn snapshot(&self) -> Vec<(String, String, String, i64, bool)> {
        let mut rows: Vec<_> = self
            .store
            .list_tasks(&self.project_id, true)
            .unwrap()
            .into_iter()
            .map(|t| {
                (
                    t.id.clone(),
                    t.title.clone(),
                    t.column_id.clone(),
                    t.position,
                    t.is_archived(),
                )
            })
            .collect();
        rows.sort();
        rows
    }
}

fn input(project_id: &str, title: &str) -> TaskInput {
    TaskInput {
        project_id: project_id.to_string(),
        parent_id: None,
        kind: WorkKind::Task,
        column_id: String::new(),
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        due_at: None,
        labels: Vec::new(),
        metadata: TaskMetadata::default(),
    }
}

#[test]
fn startup_opens_the_requested_project() {
    let h = Harness::new(&["Write docs", "Ship"]);
    assert!(matches!(h.app.mode, Mode::Normal));
    assert_eq!(h.app.project_id(), Some(h.project_id.as_str()));
    assert_eq!(h.app.columns.len(), 3);
    assert_eq!(h.app.tasks.len(), 2);
    assert_eq!(h.app.rollup.total_items, 2);
}

#[test]
fn move_selection_then_undo_and_redo() {
    let mut h = Harness::new(&["Write docs", "Ship"]);
    h.press(KeyCode::Char(' '));
    h.press(KeyCode::Char('j'));
    h.press(KeyCode::Char(' '));
    assert_eq!(h.app.selection.len(), 2);

    h.press(KeyCode::Char(']'));
    assert_eq!(h.app.status.text, "move 2 tasks to In Progress");
    assert_eq!(h.column_of("Write docs"), "In Progress");
    assert_eq!(h.column_of("Ship"), "In Progress");
    assert_eq!(h.app.focus_column, 1);
    assert_eq!(h.app.history.undo_len(), 1);

    h.press(KeyCode::Char('u'));
    assert_eq!(h.app.status.text, "Undo: move 2 tasks to In Progress");
    assert_eq!(h.column_of("Write docs"), "To Do");
    assert_eq!(h.column_of("Ship"), "To Do");
    assert_eq!(h.app.history.undo_len(), 0);
    assert_eq!(h.app.history.redo_len(), 1);

    h.press(KeyCode::Char('U'));
    assert_eq!(h.app.status.text, "Redo: move 2 tasks to In Progress");
    assert_eq!(h.column_of("Ship"), "In Progress");
    assert!(!h.app.history.is_busy());
}

#[test]
fn redo_restores_the_state_after_the_gesture() {
    let mut h = Harness::new(&["Draft"]);
    h.press(KeyCode::Char('R'));
    assert!(matches!(h.app.mode, Mode::Rename(_)));
    h.type_text(" v2");
    h.press(KeyCode::Enter);
    assert_eq!(h.app.status.text, "rename Draft to Draft v2");
    let after = h.snapshot();

    h.press(KeyCode::Char('u'));
    assert_eq!(h.snapshot()[0].1, "Draft");

    h.press(KeyCode::Char('U'));
    assert_eq!(h.snapshot(), after);
}

#[test]
fn new_gesture_clears_redo() {
    let mut h = Harness::new(&["A", "B"]);
    h.press(KeyCode::Char(']'));
    h.press(KeyCode::Char('u'));
    assert_eq!(h.app.history.redo_len(), 1);
    h.press(KeyCode::Char('h'));
    h.press(KeyCode::Char(']'));
    assert_eq!(h.app.history.redo_len(), 0);
    h.press(KeyCode::Char('U'));
    assert!(h.app.status.is_error);
    assert_eq!(h.app.status.text, "nothing to redo");
}

#[test]
fn hard_delete_cannot_be_undone() {
    let mut h = Harness::new(&["Keep", "Doomed"]);
    h.press(KeyCode::Char('j'));
    h.press(KeyCode::Char('X'));
    assert_eq!(h.app.status.text, "delete 1 task");
    assert_eq!(h.store.list_tasks(&h.project_id, true).unwrap().len(), 1);
    assert_eq!(h.app.tasks.len(), 1);

    h.press(KeyCode::Char('u'));
    assert!(h.app.status.is_error);
    assert_eq!(
        h.app.status.text,
        "could not undo delete 1 task: tasks were permanently deleted"
    );
    assert_eq!(h.app.history.undo_len(), 0);
    assert_eq!(h.store.list_tasks(&h.project_id, true).unwrap().len(), 1);
}

#[test]
fn inspector_pins_existing_links_first() {
    let store = LocalStore::in_memory("Tester");
    let project = store
        .create_project(ProjectInput {
            name: "Web".into(),
            ..Default::default()
        })
        .unwrap();
    store.create_task(input(&project.id, "Alpha")).unwrap();
    let beta = store.create_task(input(&project.id, "Beta")).unwrap();
    let mut owner = input(&project.id, "Owner");
    owner.metadata.depends_on = vec![beta.id.clone()];
    store.create_task(owner).unwrap();

    let mut h = Harness::open(store, &project.slug, project.id.clone());
    h.press(KeyCode::Char('j'));
    h.press(KeyCode::Char('j'));
    h.press(KeyCode::Char('b'));

    let Mode::DependencyInspector(state) = &h.app.mode else {
        panic!("expected the inspector, got {}", h.app.mode.name());
    };
    assert!(!state.loading);
    assert_eq!(state.owner.title, "Owner");
    assert_eq!(state.rows[0].task_id, beta.id);
    assert_eq!(state.rows[0].pinned, Some(DepField::DependsOn));
    assert!(state.rows.iter().all(|r| r.task_id != state.owner.id));
    assert!(state.rows.iter().skip(1).all(|r| r.pinned.is_none()));
}

#[test]
fn changes_survive_reopening_the_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.json");
    let store = LocalStore::open(&path, "Tester").unwrap();
    let project = store
        .create_project(ProjectInput {
            name: "Web".into(),
            ..Default::default()
        })
        .unwrap();
    store.create_task(input(&project.id, "Persist me")).unwrap();

    let mut h = Harness::open(store, &project.slug, project.id.clone());
    h.press(KeyCode::Char(']'));
    drop(h);

    let reopened = LocalStore::open(&path, "Tester").unwrap();
    let h = Harness::open(reopened, &project.slug, project.id.clone());
    assert_eq!(h.column_of("Persist me"), "In Progress");
}
