use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::Clear;
use std::time::Duration;
use wschat::app::{build_session, ChatMode};
use wschat::config::Config;
use wschat::logging;
use wschat::runtime::context::RuntimeContext;
use wschat::runtime::frontend::{FrontendAdapter, ScrollAction, UserInputEvent};
use wschat::runtime::r#loop::Runtime;
use wschat::state::ChatSession;
use wschat::terminal::TerminalGuard;
use wschat::ui::input_metrics::clamp_to_char_boundary_left;
use wschat::ui::layout::split_chat_layout;
use wschat::ui::render::{
    history_visual_line_count, input_visual_rows, render_header, render_history, render_input,
    render_status_line, transcript_lines,
};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(16);
const MAX_INPUT_ROWS: usize = 6;
const PAGE_STEP: usize = 10;

/// Line editor for the input box. Cursor positions are byte offsets kept on
/// char boundaries.
#[derive(Default)]
struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.text, idx);
        self.text[..i]
            .char_indices()
            .next_back()
            .map_or(0, |(start, _)| start)
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.text, idx);
        match self.text[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.text.len(),
        }
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = clamp_to_char_boundary_left(&self.text, self.cursor);
        self.text.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.text, self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.text.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete(&mut self) {
        let start = clamp_to_char_boundary_left(&self.text, self.cursor);
        if start >= self.text.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.text.replace_range(start..end, "");
        self.cursor = start;
    }

    fn take_submission(&mut self) -> Option<String> {
        if self.text.trim().is_empty() {
            return None;
        }
        self.cursor = 0;
        Some(std::mem::take(&mut self.text))
    }
}

struct ManagedTuiFrontend {
    terminal: TerminalGuard,
    input: InputBuffer,
    quit: bool,
    history_viewport: (usize, usize),
    viewport_changed: bool,
}

impl ManagedTuiFrontend {
    fn new() -> Result<Self> {
        Ok(Self {
            terminal: TerminalGuard::enter()?,
            input: InputBuffer::default(),
            quit: false,
            history_viewport: (0, 0),
            viewport_changed: false,
        })
    }

    fn map_key(&mut self, key: KeyEvent) -> Option<UserInputEvent> {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if control => Some(UserInputEvent::Interrupt),
            KeyCode::Char('d') if control => {
                if self.input.text.is_empty() {
                    self.quit = true;
                }
                None
            }
            KeyCode::Char('j') if control => {
                self.input.insert_str("\n");
                None
            }
            KeyCode::PageUp => Some(UserInputEvent::Scroll(ScrollAction::PageUp(PAGE_STEP))),
            KeyCode::PageDown => Some(UserInputEvent::Scroll(ScrollAction::PageDown(PAGE_STEP))),
            KeyCode::Up => Some(UserInputEvent::Scroll(ScrollAction::LineUp)),
            KeyCode::Down => Some(UserInputEvent::Scroll(ScrollAction::LineDown)),
            KeyCode::Home if control => Some(UserInputEvent::Scroll(ScrollAction::Home)),
            KeyCode::End if control => Some(UserInputEvent::Scroll(ScrollAction::End)),
            KeyCode::Home => {
                self.input.cursor = 0;
                None
            }
            KeyCode::End => {
                self.input.cursor = self.input.text.len();
                None
            }
            KeyCode::Left => {
                self.input.cursor = self.input.prev_char_boundary(self.input.cursor);
                None
            }
            KeyCode::Right => {
                self.input.cursor = self.input.next_char_boundary(self.input.cursor);
                None
            }
            KeyCode::Backspace => {
                self.input.backspace();
                None
            }
            KeyCode::Delete => {
                self.input.delete();
                None
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.input.insert_str("\n");
                None
            }
            KeyCode::Enter => self.input.take_submission().map(UserInputEvent::Text),
            KeyCode::Char(ch) if !control && !key.modifiers.contains(KeyModifiers::ALT) => {
                let mut encoded = [0u8; 4];
                self.input.insert_str(ch.encode_utf8(&mut encoded));
                None
            }
            _ => None,
        }
    }
}

impl FrontendAdapter<ChatMode> for ManagedTuiFrontend {
    fn poll_user_input(&mut self, _mode: &ChatMode) -> Option<UserInputEvent> {
        if std::mem::take(&mut self.viewport_changed) {
            let (width, rows) = self.history_viewport;
            return Some(UserInputEvent::Viewport { width, rows });
        }

        let Ok(has_event) = event::poll(INPUT_POLL_INTERVAL) else {
            self.quit = true;
            return None;
        };
        if !has_event {
            return None;
        }

        let Ok(ev) = event::read() else {
            self.quit = true;
            return None;
        };

        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.map_key(key),
            Event::Paste(text) => {
                self.input.insert_str(&text.replace("\r\n", "\n"));
                None
            }
            _ => None,
        }
    }

    fn render(&mut self, mode: &ChatMode, session: &ChatSession) {
        let status = mode.status_line(session);
        let notice = mode.current_notice();
        let history_lines = transcript_lines(session.transcript(), session.is_loading());
        let input = self.input.text.as_str();
        let cursor = self.input.cursor;
        let mut history_viewport = self.history_viewport;

        let drawn = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let input_width = area.width.saturating_sub(2).max(1) as usize;
            let input_rows = input_visual_rows(input, input_width).min(MAX_INPUT_ROWS) as u16;
            let panes = split_chat_layout(area, input_rows);

            let history_width = panes.history.width.max(1) as usize;
            let history_rows = panes.history.height as usize;
            history_viewport = (history_width, history_rows);
            let bottom = history_visual_line_count(&history_lines, history_width)
                .saturating_sub(history_rows);
            let scroll = mode.history_scroll().map_or(bottom, |offset| offset.min(bottom));

            render_header(frame, panes.header, session.endpoint(), session.connection_state());
            render_history(frame, panes.history, history_lines, scroll);
            render_status_line(frame, panes.status, &status, notice);
            render_input(frame, panes.input, input, cursor);
        });
        if let Err(err) = drawn {
            tracing::error!(error = %err, "terminal draw failed");
            self.quit = true;
        }
        if history_viewport != self.history_viewport {
            self.history_viewport = history_viewport;
            self.viewport_changed = true;
        }
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init()?;
    config.validate()?;

    let mut session = build_session(&config);
    session.connect().await;
    if let Some(path) = &config.seed_file {
        session.pump_events();
        if let Err(err) = session.seed_from_file(path) {
            tracing::warn!(error = %err, path = %path.display(), "seed file not sent");
        }
    }

    let mut frontend = ManagedTuiFrontend::new()?;
    let mut runtime = Runtime::new(ChatMode::new());
    let mut ctx = RuntimeContext::new(&mut session);
    runtime.run(&mut frontend, &mut ctx).await;
    Ok(())
}
