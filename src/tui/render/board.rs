use crate::model::{Task, WorkKind};
use crate::ops::fields::format_due;
use crate::ops::projection::{direct_children, full_path};
use crate::tui::app::{App, BOARD_TOP};
use crate::util::unicode::fit_to_width;

use super::{Canvas, Highlight};

/// Cells per column; the remainder on the right stays blank.
pub fn column_width(app: &App) -> u16 {
    match app.columns.len() {
        0 => app.size.0,
        n => app.size.0 / u16::try_from(n).unwrap_or(u16::MAX),
    }
}

/// First visible row of `column`. Only the focused column scrolls.
pub fn board_scroll(app: &App, column: usize) -> usize {
    let visible = app.board_rows_visible();
    if column != app.focus_column || visible == 0 || app.cursor < visible {
        0
    } else {
        app.cursor + 1 - visible
    }
}

pub(super) fn board(app: &App, canvas: &mut Canvas) {
    let Some(project) = &app.project else {
        canvas.line("arbor");
        canvas.line(if app.board_loading {
            "loading…"
        } else {
            "no project open, press p to pick one"
        });
        return;
    };

    let mut header = full_path(&project.name, &app.tasks, app.projection_root.as_deref());
    if app.board_loading {
        header.push_str("  loading…");
    }
    if !app.selection.is_empty() {
        header.push_str(&format!("  {} selected", app.selection.len()));
    }
    if app.show_archived {
        header.push_str("  [archived]");
    }
    if app.mouse_selection {
        header.push_str("  [mouse: terminal]");
    }
    canvas.line(header);

    let r = &app.rollup;
    canvas.line(format!(
        "deps {}/{}  edges {}  blocked {}  unresolved {}",
        r.items_with_dependencies,
        r.total_items,
        r.dependency_edges,
        r.blocked_items,
        r.unresolved_dependency_edges
    ));

    let width = column_width(app) as usize;
    let columns: Vec<Vec<&Task>> = (0..app.columns.len())
        .map(|c| app.column_rows(c))
        .collect();

    let headers: String = app
        .columns
        .iter()
        .zip(&columns)
        .map(|(col, rows)| {
            let count = match col.wip_limit {
                Some(limit) => format!("{}/{}", rows.len(), limit),
                None => rows.len().to_string(),
            };
            fit_to_width(&format!("{} ({})", col.name, count), width)
        })
        .collect();
    canvas.line(headers.trim_end());

    let visible = app.board_rows_visible();
    for row in 0..visible {
        let mut line = String::new();
        for (c, rows) in columns.iter().enumerate() {
            let cell = rows
                .get(board_scroll(app, c) + row)
                .map(|t| card(app, t))
                .unwrap_or_default();
            line.push_str(&fit_to_width(&cell, width));
        }
        if line.trim().is_empty() && row >= columns.iter().map(Vec::len).max().unwrap_or(0) {
            break;
        }
        canvas.line(line.trim_end());
    }

    if columns.get(app.focus_column).is_some_and(|rows| !rows.is_empty()) {
        let scroll = board_scroll(app, app.focus_column);
        canvas.highlight(Highlight {
            line: BOARD_TOP as usize + app.cursor - scroll,
            start: app.focus_column * width,
            width,
        });
    }
}

fn card(app: &App, task: &Task) -> String {
    let mut text = String::new();
    text.push(if app.selection.contains(&task.id) { '*' } else { ' ' });
    if task.kind != WorkKind::Task {
        text.push_str(&format!("[{}] ", task.kind.as_str()));
    }
    text.push_str(&task.title);
    let children = direct_children(&app.tasks, &task.id).count();
    if children > 0 {
        text.push_str(&format!(" +{}", children));
    }
    if !task.metadata.blocked_by.is_empty() || !task.metadata.blocked_reason.is_empty() {
        text.push_str(" !");
    }
    if task.due_at.is_some() {
        text.push_str(&format!(" @{}", format_due(task.due_at)));
    }
    if task.is_archived() {
        text.push_str(" (archived)");
    }
    text
}
