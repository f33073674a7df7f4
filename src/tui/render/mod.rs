//! Rendering is two steps: [`view`] turns the app into plain text plus a
//! few styling hints, and [`draw`] paints that onto a frame. The text is
//! recomputed in full on every event.

mod board;
mod panels;
#[cfg(test)]
pub(crate) mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::modes::Mode;
use crate::tui::theme::Theme;
use crate::util::unicode::{split_at_width, truncate_to_width};

pub use board::{board_scroll, column_width};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseCapture {
    Capture,
    None,
}

/// A run of cells drawn in the highlight color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub line: usize,
    pub start: usize,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// One line per terminal row; the last line is the status row
    pub content: String,
    pub mouse_capture: MouseCapture,
    pub highlights: Vec<Highlight>,
    pub status_is_error: bool,
}

/// Body lines under construction
#[derive(Debug)]
pub(super) struct Canvas {
    lines: Vec<String>,
    highlights: Vec<Highlight>,
    width: usize,
}

impl Canvas {
    fn new(width: usize) -> Self {
        Canvas {
            lines: Vec::new(),
            highlights: Vec::new(),
            width,
        }
    }

    pub(super) fn line(&mut self, text: impl AsRef<str>) {
        self.lines.push(truncate_to_width(text.as_ref(), self.width));
    }

    /// Push a line drawn fully highlighted.
    pub(super) fn highlighted(&mut self, text: impl AsRef<str>) {
        let line = self.lines.len();
        self.line(text);
        self.highlights.push(Highlight {
            line,
            start: 0,
            width: self.width,
        });
    }

    pub(super) fn highlight(&mut self, highlight: Highlight) {
        self.highlights.push(highlight);
    }

    /// Pad with blank lines until the next line is `line`.
    pub(super) fn skip_to(&mut self, line: usize) {
        while self.lines.len() < line {
            self.lines.push(String::new());
        }
    }
}

/// Build the full text for the current state.
pub fn view(app: &App) -> View {
    let (width, height) = (app.size.0 as usize, app.size.1 as usize);
    let mut canvas = Canvas::new(width);
    match &app.mode {
        Mode::Normal | Mode::Confirm(_) => board::board(app, &mut canvas),
        mode => panels::panel(app, mode, &mut canvas),
    }

    let body = height.saturating_sub(1);
    let Canvas {
        mut lines,
        mut highlights,
        ..
    } = canvas;
    lines.truncate(body);
    lines.resize(body, String::new());
    highlights.retain(|h| h.line < body);
    lines.push(truncate_to_width(&status_line(app), width));

    View {
        content: lines.join("\n"),
        mouse_capture: if app.mouse_selection {
            MouseCapture::None
        } else {
            MouseCapture::Capture
        },
        highlights,
        status_is_error: app.status.is_error && !matches!(app.mode, Mode::Confirm(_)),
    }
}

fn status_line(app: &App) -> String {
    if let Mode::Confirm(state) = &app.mode {
        return format!("{}  [y/n]", state.action.prompt());
    }
    if !app.status.text.is_empty() {
        return app.status.text.clone();
    }
    match &app.mode {
        Mode::Normal => ": commands  . actions  / search  p projects  u undo  q quit".into(),
        mode => format!("-- {} --", mode.name()),
    }
}

/// Paint a view onto the frame.
pub fn draw(frame: &mut Frame, view: &View, theme: &Theme) {
    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(frame.area());

    let mut rows: Vec<&str> = view.content.split('\n').collect();
    let status = rows.pop().unwrap_or("");
    let body: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(idx, text)| styled_line(idx, text, view, theme))
        .collect();
    frame.render_widget(Paragraph::new(body), chunks[0]);

    let status_style = if view.status_is_error {
        Style::default().fg(theme.error)
    } else {
        Style::default().fg(theme.dim)
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(status, status_style))),
        chunks[1],
    );
}

fn styled_line<'a>(idx: usize, text: &'a str, view: &View, theme: &Theme) -> Line<'a> {
    let base = if idx == 0 {
        Style::default().fg(theme.header).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    match view.highlights.iter().find(|h| h.line == idx) {
        Some(h) => {
            let (before, rest) = split_at_width(text, h.start);
            let (mid, after) = split_at_width(rest, h.width);
            let lit = Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::REVERSED);
            Line::from(vec![
                Span::styled(before, base),
                Span::styled(mid, lit),
                Span::styled(after, base),
            ])
        }
        None => Line::from(Span::styled(text, base)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::input::test_keys::fixture;
    use crate::tui::modes::{ConfirmState, PendingAction};

    #[test]
    fn view_fills_the_terminal_and_ends_with_status() {
        let mut app = fixture();
        app.size = (30, 6);
        app.set_error("boom");
        let view = view(&app);
        let lines: Vec<&str> = view.content.split('\n').collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "boom");
        assert!(view.status_is_error);
        assert_eq!(view.mouse_capture, MouseCapture::Capture);
    }

    #[test]
    fn mouse_selection_releases_capture() {
        let mut app = fixture();
        app.mouse_selection = true;
        assert_eq!(view(&app).mouse_capture, MouseCapture::None);
    }

    #[test]
    fn confirm_prompt_replaces_the_status() {
        let mut app = fixture();
        app.set_error("old");
        app.mode = Mode::Confirm(ConfirmState {
            action: PendingAction::Archive(vec!["a".into()]),
            back: Box::new(Mode::Normal),
        });
        let view = view(&app);
        assert!(view.content.ends_with("Archive this task?  [y/n]"));
        assert!(!view.status_is_error);
    }
}
