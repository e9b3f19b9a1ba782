//! Ratatui rendering for the dashboard.

use std::ops::Range;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus, LineKind, Pane};

/// Width of the "HH:MM:SS " prefix.
const TIMESTAMP_WIDTH: usize = 9;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(3),    // panes
        ])
        .split(frame.area());

    let status = Paragraph::new(app.status_line())
        .style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(status, chunks[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let focus = app.focus;
    draw_pane(frame, &mut app.coder, Color::Blue, focus == Focus::Coder, cols[0]);
    draw_pane(frame, &mut app.supervisor, Color::Green, focus == Focus::Supervisor, cols[1]);
}

fn draw_pane(frame: &mut Frame, pane: &mut Pane, color: Color, focused: bool, area: Rect) {
    let mut border = Style::default().fg(color);
    if focused {
        border = border.add_modifier(Modifier::BOLD);
    }
    let block = Block::default().borders(Borders::ALL).border_style(border);
    let inner = block.inner(area);

    let text_width = (inner.width as usize).saturating_sub(TIMESTAMP_WIDTH).max(1);
    let mut rows: Vec<Line> = Vec::new();
    for line in &pane.lines {
        let style = match line.kind {
            LineKind::Output => Style::default(),
            LineKind::System => Style::default().fg(Color::Cyan),
            LineKind::Error => Style::default().fg(Color::Red),
        };
        for (i, part) in wrap_text(&line.text, text_width).into_iter().enumerate() {
            let prefix = if i == 0 {
                format!("{} ", line.timestamp)
            } else {
                " ".repeat(TIMESTAMP_WIDTH)
            };
            rows.push(Line::from(vec![
                Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                Span::styled(part, style),
            ]));
        }
    }

    // scroll is counted in wrapped rows, so the limit depends on the width
    let above = rows.len().saturating_sub(inner.height as usize);
    pane.max_scroll = above.min(u16::MAX as usize) as u16;
    pane.scroll = pane.scroll.min(pane.max_scroll);

    let title = if pane.scroll > 0 {
        format!(" {} [+{}] ", pane.title, pane.scroll)
    } else {
        format!(" {} ", pane.title)
    };
    frame.render_widget(block.title(Span::styled(title, border)), area);

    let window = visible_rows(rows.len(), inner.height as usize, pane.scroll as usize);
    let visible: Vec<Line> = rows.drain(window).collect();
    frame.render_widget(Paragraph::new(visible), inner);
}

/// Rows shown in a pane of `height` rows, `scroll` rows up from the bottom.
fn visible_rows(total: usize, height: usize, scroll: usize) -> Range<usize> {
    let end = total.saturating_sub(scroll).max(height.min(total));
    let start = end.saturating_sub(height);
    start..end
}

/// Word-wrap `text` to `width` columns. Words longer than a row are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                result.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            result.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width {
            result.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() || result.is_empty() {
        result.push(current);
    }
    result
}
