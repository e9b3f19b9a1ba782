//! Application state for the dashboard.

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Maximum number of lines kept per pane.
const MAX_LINES: usize = 1000;

/// Messages from background tasks to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashEvent {
    /// One decoded line of coder output.
    CoderLine(String),
    /// The coder process exited with this code (None if killed by a signal).
    CoderExited(Option<i32>),
    /// Supervisor commentary on the latest chunk.
    Commentary { text: String, is_error: bool },
    /// The supervisor has drained everything and stopped.
    SupervisorDone,
}

/// A single line in a pane.
#[derive(Debug, Clone)]
pub struct PaneLine {
    pub timestamp: String,
    pub text: String,
    pub kind: LineKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Output,
    System,
    Error,
}

/// A scrollable panel of lines.
#[derive(Debug)]
pub struct Pane {
    pub title: &'static str,
    pub lines: VecDeque<PaneLine>,
    /// Scroll offset from the bottom (0 = following new output).
    pub scroll: u16,
    /// Wrapped rows above the last rendered window; set by the renderer.
    pub max_scroll: u16,
}

impl Pane {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            lines: VecDeque::new(),
            scroll: 0,
            max_scroll: 0,
        }
    }

    pub fn push(&mut self, text: &str, kind: LineKind) {
        self.lines.push_back(PaneLine {
            timestamp: now_str(),
            text: sanitize_text(text),
            kind,
        });
        if self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
    }

    fn scroll_up(&mut self, by: u16) {
        self.scroll = self.scroll.saturating_add(by).min(self.max_scroll);
    }

    fn scroll_down(&mut self, by: u16) {
        self.scroll = self.scroll.saturating_sub(by);
    }
}

/// Coder process lifecycle as shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderState {
    Running,
    Exited(Option<i32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Coder,
    Supervisor,
}

/// Top-level application state.
pub struct App {
    pub task: String,
    pub coder: Pane,
    pub supervisor: Pane,
    pub coder_state: CoderState,
    pub supervisor_done: bool,
    /// Lines the supervisor never saw because the buffer overflowed.
    pub dropped: u64,
    /// Lines waiting for the supervisor.
    pub backlog: usize,
    pub focus: Focus,
    pub should_quit: bool,
}

impl App {
    pub fn new(task: &str, command_line: &str) -> Self {
        let mut coder = Pane::new("Coder");
        coder.push(&format!("Initializing ... $ {command_line}"), LineKind::System);
        let mut supervisor = Pane::new("Supervisor");
        supervisor.push("Waiting for coder output ...", LineKind::System);

        Self {
            task: task.to_string(),
            coder,
            supervisor,
            coder_state: CoderState::Running,
            supervisor_done: false,
            dropped: 0,
            backlog: 0,
            focus: Focus::Coder,
            should_quit: false,
        }
    }

    /// Apply an event from a background task.
    pub fn handle(&mut self, event: DashEvent) {
        match event {
            DashEvent::CoderLine(line) => self.coder.push(&line, LineKind::Output),
            DashEvent::CoderExited(code) => {
                let text = match code {
                    Some(code) => format!("Process exited with code {code}"),
                    None => "Process terminated by signal".to_string(),
                };
                let kind = if code == Some(0) {
                    LineKind::System
                } else {
                    LineKind::Error
                };
                self.coder.push(&text, kind);
                self.coder_state = CoderState::Exited(code);
            }
            DashEvent::Commentary { text, is_error } => {
                let kind = if is_error {
                    LineKind::Error
                } else {
                    LineKind::Output
                };
                self.supervisor.push(&format!("── {}", now_str()), LineKind::System);
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    self.supervisor.push(line, kind);
                }
            }
            DashEvent::SupervisorDone => {
                self.supervisor_done = true;
                self.supervisor.push("Supervisor finished.", LineKind::System);
            }
        }
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Coder => Focus::Supervisor,
                    Focus::Supervisor => Focus::Coder,
                };
            }
            KeyCode::Up => self.focused_mut().scroll_up(1),
            KeyCode::Down => self.focused_mut().scroll_down(1),
            KeyCode::PageUp => self.focused_mut().scroll_up(10),
            KeyCode::PageDown => self.focused_mut().scroll_down(10),
            KeyCode::End => self.focused_mut().scroll = 0,
            _ => {}
        }
    }

    fn focused_mut(&mut self) -> &mut Pane {
        match self.focus {
            Focus::Coder => &mut self.coder,
            Focus::Supervisor => &mut self.supervisor,
        }
    }

    pub fn finished(&self) -> bool {
        matches!(self.coder_state, CoderState::Exited(_)) && self.supervisor_done
    }

    /// Text for the status bar.
    pub fn status_line(&self) -> String {
        let coder = match &self.coder_state {
            CoderState::Running => "coder: running".to_string(),
            CoderState::Exited(Some(code)) => format!("coder: exited ({code})"),
            CoderState::Exited(None) => "coder: killed".to_string(),
        };
        let supervisor = if self.supervisor_done {
            "supervisor: done"
        } else {
            "supervisor: watching"
        };
        let dropped = if self.dropped > 0 {
            format!(" | dropped: {}", self.dropped)
        } else {
            String::new()
        };
        let backlog = if self.backlog > 0 {
            format!(" | queued: {}", self.backlog)
        } else {
            String::new()
        };
        let hint = if self.finished() {
            " | finished, q to quit"
        } else {
            " | q to quit"
        };
        format!(" [{coder}] [{supervisor}]{backlog}{dropped} | task: {}{hint}", self.task)
    }
}

fn now_str() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Strip ANSI escape sequences and other control characters, keeping tabs.
pub fn sanitize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI: ESC [ params final-byte
            if chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&next) {
                        break;
                    }
                }
            } else {
                chars.next();
            }
            continue;
        }
        if c == '\t' || (c >= ' ' && c != '\x7f' && !('\u{80}'..='\u{9f}').contains(&c)) {
            out.push(c);
        }
    }
    out
}
