//! Full-screen panels for every mode except the board. Each panel puts a
//! title, an input or summary line and a hint in the top three rows; lists
//! start at `BOARD_TOP` so mouse rows line up.

use crate::ops::deps::derive_state_id;
use crate::ops::fields::{format_due, format_list};
use crate::ops::projection::BREADCRUMB_SEPARATOR;
use crate::tui::app::{App, BOARD_TOP};
use crate::tui::command_actions::rank_commands;
use crate::tui::input::info_children;
use crate::tui::modes::{
    ActivityState, BootstrapState, ColorState, DuePickerState, DuePreset, HIGHLIGHT_COLORS,
    InspectorFocus, InspectorState, LabelPickerState, LabelsConfigState, LabelsField, Mode,
    PickerState, ProjectField, ProjectFormState, ResourcePickerState, ResultsState, TaskForm,
    TaskInfoState, ThreadState,
};
use crate::util::text_input::TextInput;

use super::Canvas;

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Title, summary and hint rows.
fn header(canvas: &mut Canvas, title: &str, summary: &str, hint: &str) {
    canvas.line(title);
    canvas.line(summary);
    canvas.line(hint);
}

/// Rows from `BOARD_TOP`, windowed by `scroll`, with the selected one marked.
fn list(canvas: &mut Canvas, rows: &[String], selected: usize, scroll: usize, visible: usize) {
    canvas.skip_to(BOARD_TOP as usize);
    if rows.is_empty() {
        canvas.line("  (nothing here)");
        return;
    }
    for (idx, row) in rows.iter().enumerate().skip(scroll).take(visible) {
        if idx == selected {
            canvas.highlighted(format!("> {}", row));
        } else {
            canvas.line(format!("  {}", row));
        }
    }
}

fn field_row(canvas: &mut Canvas, label: &str, input: &TextInput, focused: bool) {
    let text = format!("{:>14}: {}", label, input.display(focused));
    if focused {
        canvas.highlighted(text);
    } else {
        canvas.line(text);
    }
}

pub(super) fn panel(app: &App, mode: &Mode, canvas: &mut Canvas) {
    let visible = app.board_rows_visible();
    match mode {
        Mode::Normal | Mode::Confirm(_) => {}
        Mode::AddTask(form) | Mode::EditTask(form) => task_form(app, form, canvas),
        Mode::Rename(state) => {
            header(
                canvas,
                &format!("Rename \"{}\"", state.original),
                &state.input.display(true),
                "enter save  esc cancel",
            );
        }
        Mode::Search(state) => {
            header(
                canvas,
                "Search",
                &format!("/{}", state.input.display(true)),
                &format!(
                    "ctrl+p all projects: {}  ctrl+r archived: {}  enter search",
                    on_off(state.cross_project),
                    on_off(state.include_archived)
                ),
            );
        }
        Mode::SearchResults(state) => results(state, canvas, visible),
        Mode::ProjectPicker(state) => picker(app, state, canvas, visible),
        Mode::ProjectForm(state) => project_form(state, canvas),
        Mode::CommandPalette(state) => {
            let rows: Vec<String> = rank_commands(app, state.input.text(), false)
                .iter()
                .map(|r| r.display())
                .collect();
            header(
                canvas,
                "Commands",
                &format!(":{}", state.input.display(true)),
                "enter run  esc close",
            );
            list(canvas, &rows, state.selected, state.scroll, visible);
        }
        Mode::QuickActions(state) => {
            let rows: Vec<String> = rank_commands(app, "", true)
                .iter()
                .map(|r| r.display())
                .collect();
            header(
                canvas,
                &format!("Actions for {}", app.task_title(&state.task_id)),
                "",
                "enter run  esc close",
            );
            let scroll = state.selected.saturating_sub(visible.saturating_sub(1));
            list(canvas, &rows, state.selected, scroll, visible);
        }
        Mode::TaskInfo(state) => task_info(app, state, canvas),
        Mode::Thread(state) => thread(state, canvas),
        Mode::DuePicker(state) => due_picker(state, canvas),
        Mode::LabelPicker(state) => label_picker(state, canvas, visible),
        Mode::DependencyInspector(state) => inspector(app, state, canvas, visible),
        Mode::ActivityLog(state) => activity(app, state, canvas, visible),
        Mode::HighlightColor(state) => colors(app, state, canvas, visible),
        Mode::LabelsConfig(state) => labels_config(app, state, canvas),
        Mode::PathsRoots(state) => {
            header(
                canvas,
                &format!("Attachment root for {}", state.slug),
                &state.input.display(true),
                "enter save (empty clears)  esc cancel",
            );
        }
        Mode::ResourcePicker(state) => resources(state, canvas, visible),
        Mode::BootstrapSettings(state) => bootstrap(app, state, canvas),
    }
}

fn task_form(app: &App, form: &TaskForm, canvas: &mut Canvas) {
    let title = match (&form.task_id, &form.parent_id) {
        (Some(id), _) => format!("Edit {}", app.task_title(id)),
        (None, Some(parent)) => format!("Add under {}", app.task_title(parent)),
        (None, None) => "Add task".to_string(),
    };
    let summary = match &form.error {
        Some(error) => format!("error: {}", error),
        None if !form.suggested_labels.is_empty() => {
            format!("suggested labels: {}", format_list(&form.suggested_labels))
        }
        None => String::new(),
    };
    let mut hint = String::from("tab next  enter save  ctrl+d due  ctrl+l labels  ctrl+o deps");
    if form.is_edit() {
        hint.push_str("  ctrl+r attach");
    }
    header(canvas, &title, &summary, &hint);

    for field in form.fields() {
        let focused = form.focus == *field;
        match form.input(*field) {
            Some(input) => field_row(canvas, field.label(), input, focused),
            None => {
                let text = format!("{:>14}: < {} >", field.label(), form.kind.as_str());
                if focused {
                    canvas.highlighted(text);
                } else {
                    canvas.line(text);
                }
            }
        }
    }
    for reference in &form.resource_refs {
        canvas.line(format!("{:>14}: {}", "attached", reference.path));
    }
}

fn project_form(state: &ProjectFormState, canvas: &mut Canvas) {
    let title = if state.project_id.is_some() {
        "Edit project"
    } else {
        "New project"
    };
    let summary = state
        .error
        .as_ref()
        .map(|e| format!("error: {}", e))
        .unwrap_or_default();
    header(canvas, title, &summary, "tab next  enter save  esc cancel");
    for field in ProjectField::ALL {
        field_row(canvas, field.label(), state.input(field), state.focus == field);
    }
}

fn results(state: &ResultsState, canvas: &mut Canvas, visible: usize) {
    let count = if state.loading {
        "searching…".to_string()
    } else {
        format!("{} found", state.matches.len())
    };
    header(
        canvas,
        &format!("Results for \"{}\"  {}", state.query, count),
        &format!(
            "{}{}",
            if state.cross_project {
                "all projects"
            } else {
                "this project"
            },
            if state.include_archived {
                ", with archived"
            } else {
                ""
            }
        ),
        "enter open  / refine  esc close",
    );
    let rows: Vec<String> = state
        .matches
        .iter()
        .map(|m| {
            format!(
                "{} / {}  [{}]",
                m.project_name,
                m.task.title,
                derive_state_id(&m.task).as_str()
            )
        })
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn picker(app: &App, state: &PickerState, canvas: &mut Canvas, visible: usize) {
    let title = if state.loading {
        "Projects  loading…"
    } else {
        "Projects"
    };
    let summary = if state.show_archived {
        "showing archived projects"
    } else {
        ""
    };
    header(
        canvas,
        title,
        summary,
        "enter open  n new  e edit  x archive/restore  D delete  a archived  q quit",
    );
    let rows: Vec<String> = state
        .visible(&app.projects)
        .iter()
        .map(|p| {
            let mut row = format!("{} ({})", p.name, p.slug);
            if p.is_archived() {
                row.push_str(" [archived]");
            }
            if app.project_id() == Some(p.id.as_str()) {
                row.push_str(" *");
            }
            row
        })
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn task_info(app: &App, state: &TaskInfoState, canvas: &mut Canvas) {
    let Some(frame) = state.current() else {
        return;
    };
    let Some(task) = app.tasks.get(&frame.task_id) else {
        canvas.line("task no longer exists");
        return;
    };
    let path: Vec<String> = state
        .stack
        .iter()
        .map(|f| app.task_title(&f.task_id))
        .collect();
    let due = match task.due_at {
        Some(_) => format_due(task.due_at),
        None => "-".to_string(),
    };
    header(
        canvas,
        &path.join(BREADCRUMB_SEPARATOR),
        &format!(
            "{} · {} · {} priority · due {}",
            task.kind.as_str(),
            derive_state_id(task).as_str(),
            task.priority.as_str(),
            due
        ),
        "enter open  e edit  c comments  b deps  d due  t labels  f focus  esc back",
    );

    let titles = |ids: &[String]| {
        ids.iter()
            .map(|id| app.task_title(id))
            .collect::<Vec<_>>()
            .join(", ")
    };
    canvas.line(format!("labels: {}", format_list(&task.labels)));
    canvas.line(format!("depends on: {}", titles(&task.metadata.depends_on)));
    canvas.line(format!("blocked by: {}", titles(&task.metadata.blocked_by)));
    if !task.metadata.blocked_reason.is_empty() {
        canvas.line(format!("blocked reason: {}", task.metadata.blocked_reason));
    }
    for reference in &task.metadata.resource_refs {
        canvas.line(format!("resource: {}", reference.path));
    }
    if !task.description.is_empty() {
        canvas.line("");
        for line in task.description.lines() {
            canvas.line(format!("  {}", line));
        }
    }

    let children = info_children(app, &task.id);
    canvas.line("");
    canvas.line(format!("children ({})", children.len()));
    for (idx, child) in children.iter().enumerate() {
        let text = format!(
            "{} {}  [{}]",
            if idx == frame.child_cursor { ">" } else { " " },
            child.title,
            derive_state_id(child).as_str()
        );
        if idx == frame.child_cursor {
            canvas.highlighted(text);
        } else {
            canvas.line(text);
        }
    }
}

fn thread(state: &ThreadState, canvas: &mut Canvas) {
    let note = if state.loading {
        "loading…"
    } else if state.posting {
        "posting…"
    } else {
        "enter post  up/down scroll  esc back"
    };
    header(
        canvas,
        &format!("Comments on {}", state.title),
        &format!("> {}", state.input.display(true)),
        note,
    );
    canvas.skip_to(BOARD_TOP as usize);
    if state.comments.is_empty() && !state.loading {
        canvas.line("  no comments yet");
    }
    for comment in state.comments.iter().skip(state.scroll) {
        canvas.line(format!(
            "{}  {}",
            comment.author,
            comment.created_at.format("%Y-%m-%d %H:%M")
        ));
        for line in comment.body_markdown.lines() {
            canvas.line(format!("  {}", line));
        }
    }
}

fn due_picker(state: &DuePickerState, canvas: &mut Canvas) {
    let custom = DuePreset::ALL.len();
    let summary = state
        .error
        .as_ref()
        .map(|e| format!("error: {}", e))
        .unwrap_or_default();
    header(
        canvas,
        "Due date",
        &summary,
        "up/down choose  type YYYY-MM-DD  enter apply  esc cancel",
    );
    let mut rows: Vec<String> = DuePreset::ALL.iter().map(|p| p.label().to_string()).collect();
    rows.push(format!("custom: {}", state.input.display(state.selected == custom)));
    list(canvas, &rows, state.selected, 0, rows.len());
}

fn label_picker(state: &LabelPickerState, canvas: &mut Canvas, visible: usize) {
    header(
        canvas,
        &format!("Labels  {}", format_list(&state.chosen)),
        &format!("+ {}", state.input.display(true)),
        "space toggle  enter apply  type a new label and enter to add",
    );
    let rows: Vec<String> = state
        .options
        .iter()
        .map(|label| {
            let mark = if state.chosen.contains(label) { "x" } else { " " };
            format!("[{}] {}", mark, label)
        })
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn inspector(app: &App, state: &InspectorState, canvas: &mut Canvas, visible: usize) {
    let mut title = format!("Dependencies of {}", state.owner.title);
    if state.loading {
        title.push_str("  loading…");
    }
    let states: Vec<&str> = state.states.iter().map(|s| s.as_str()).collect();
    header(
        canvas,
        &title,
        &format!(
            "filter: {}",
            state.query.display(state.focus == InspectorFocus::Query)
        ),
        &format!(
            "editing {}  tab switch  states {}  archived {}  all projects {}  ctrl+s apply",
            state.field.label(),
            states.join(","),
            on_off(state.include_archived),
            on_off(state.cross_project)
        ),
    );
    let rows: Vec<String> = state
        .rows
        .iter()
        .map(|row| {
            let mark = if state.pending.contains(state.field, &row.task_id) {
                "x"
            } else {
                " "
            };
            let body = match &row.found {
                Some(found) if app.project_id() == Some(found.project_id.as_str()) => {
                    format!("{:<8} {}", row.state.as_str(), found.task.title)
                }
                Some(found) => format!(
                    "{:<8} {} ({})",
                    row.state.as_str(),
                    found.task.title,
                    found.project_name
                ),
                None => format!("{:<8} {}", "missing", row.task_id),
            };
            match row.pinned {
                Some(field) => format!("[{}] {}  · {}", mark, body, field.label()),
                None => format!("[{}] {}", mark, body),
            }
        })
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn activity(app: &App, state: &ActivityState, canvas: &mut Canvas, visible: usize) {
    let entries = app.activity.merged();
    header(
        canvas,
        if state.loading {
            "Activity  loading…"
        } else {
            "Activity"
        },
        &format!("{} entries", entries.len()),
        "r refresh  esc close",
    );
    let rows: Vec<String> = entries
        .iter()
        .map(|e| format!("{}  {}: {}", e.at.format("%m-%d %H:%M"), e.target, e.summary))
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn colors(app: &App, state: &ColorState, canvas: &mut Canvas, visible: usize) {
    header(
        canvas,
        &format!("Highlight color  (now {})", app.config.ui.highlight_color),
        &format!("custom: {}", state.input.display(true)),
        "up/down choose  or type a name or #rrggbb  enter apply",
    );
    let rows: Vec<String> = HIGHLIGHT_COLORS.iter().map(|c| c.to_string()).collect();
    list(canvas, &rows, state.selected, 0, visible);
}

fn labels_config(app: &App, state: &LabelsConfigState, canvas: &mut Canvas) {
    let enforced = if app.config.labels.enforce_allowed {
        "labels outside these lists are refused"
    } else {
        "labels outside these lists are allowed"
    };
    header(canvas, "Allowed labels", enforced, "tab switch  enter save  esc cancel");
    field_row(
        canvas,
        "global",
        &state.global,
        state.focus == LabelsField::Global,
    );
    match &state.slug {
        Some(slug) => field_row(
            canvas,
            slug,
            &state.project,
            state.focus == LabelsField::Project,
        ),
        None => canvas.line(format!("{:>14}: open a project to set its labels", "project")),
    }
}

fn resources(state: &ResourcePickerState, canvas: &mut Canvas, visible: usize) {
    let summary = match (&state.error, state.loading) {
        (Some(error), _) => format!("error: {}", error),
        (None, true) => "loading…".to_string(),
        (None, false) => String::new(),
    };
    let location = if state.dir.is_empty() {
        state.root.clone()
    } else {
        format!("{}/{}", state.root.trim_end_matches('/'), state.dir)
    };
    header(
        canvas,
        &format!("Attach from {}", location),
        &summary,
        "enter open/attach  a attach  h up  esc back",
    );
    let rows: Vec<String> = state
        .entries
        .iter()
        .map(|e| {
            if e.is_dir {
                format!("{}/", e.name)
            } else {
                e.name.clone()
            }
        })
        .collect();
    list(canvas, &rows, state.selected, state.scroll, visible);
}

fn bootstrap(app: &App, state: &BootstrapState, canvas: &mut Canvas) {
    let hint = if app.config.needs_bootstrap() {
        "enter save  esc quit"
    } else {
        "enter save  esc cancel"
    };
    header(
        canvas,
        "Welcome to arbor. What should we call you?",
        &format!("display name: {}", state.name.display(true)),
        state.error.as_deref().unwrap_or(hint),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::input::test_keys::{code, fixture, key};
    use crate::tui::input::update;
    use crate::tui::render::test_helpers::render_view;
    use crossterm::event::KeyCode;
    use insta::assert_snapshot;

    #[test]
    fn picker_marks_the_open_project() {
        let mut app = fixture();
        app.size = (60, 7);
        app.mode = Mode::ProjectPicker(PickerState::default());
        assert_snapshot!(render_view(&app), @r"
        Projects

        enter open  n new  e edit  x archive/restore  D delete  a a…
        > P (p) *


        -- project-picker --
        ");
    }

    #[test]
    fn palette_lists_commands_under_the_input() {
        let mut app = fixture();
        app.size = (60, 40);
        update(&mut app, key(':'));
        for c in "undo".chars() {
            update(&mut app, key(c));
        }
        let view = crate::tui::render::view(&app);
        let lines: Vec<&str> = view.content.split('\n').collect();
        assert_eq!(lines[0], "Commands");
        assert!(lines[1].starts_with(":undo"));
        assert!(lines[3].starts_with("> "));
        assert!(lines[3..].iter().any(|l| l.contains("undo  [u]  (unavailable)")));
        assert_eq!(view.highlights[0].line, 3);
    }

    #[test]
    fn task_info_shows_children_with_cursor() {
        let mut app = fixture();
        app.size = (60, 20);
        let kid = crate::ops::test_support::child("k", "Kid", "a", crate::model::WorkKind::Task);
        app.tasks.insert(kid.id.clone(), kid);
        update(&mut app, code(KeyCode::Enter));
        let content = crate::tui::render::view(&app).content;
        assert!(content.starts_with("A\ntask · todo · medium priority · due -\n"));
        assert!(content.contains("children (1)\n> Kid  [todo]"));
    }

    #[test]
    fn bootstrap_shows_the_error_in_place_of_the_hint() {
        let mut app = App::new(
            crate::model::Config::default(),
            std::path::PathBuf::from("c.toml"),
            None,
            false,
        );
        app.size = (50, 5);
        update(&mut app, code(KeyCode::Enter));
        let content = crate::tui::render::view(&app).content;
        let lines: Vec<&str> = content.split('\n').collect();
        assert_eq!(lines[2], "display name is required");
    }
}
