use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::connection::websocket::WsTransport;
use crate::runtime::context::RuntimeContext;
use crate::runtime::frontend::{ScrollAction, UserInputEvent};
use crate::runtime::mode::RuntimeMode;
use crate::state::{ChatSession, Notice};
use crate::ui::render::{history_visual_line_count, transcript_lines};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const UPLOAD_COMMAND: &str = "/upload";
const QUIT_COMMAND: &str = "/quit";

/// Scroll position in wrapped rows of the history pane.
struct HistoryState {
    scroll_offset: usize,
    auto_follow: bool,
    visual_rows: usize,
    viewport_width: usize,
    viewport_rows: usize,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            auto_follow: true,
            visual_rows: 0,
            viewport_width: usize::MAX,
            viewport_rows: 1,
        }
    }
}

struct ActiveNotice {
    notice: Notice,
    expires_at: Instant,
}

/// Interactive chat mode: routes typed lines to the session, owns the
/// history viewport and keeps the most recent notice on screen for a while.
#[derive(Default)]
pub struct ChatMode {
    history_state: HistoryState,
    active_notice: Option<ActiveNotice>,
    quit: bool,
}

impl ChatMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_line(&self, session: &ChatSession) -> String {
        let activity = if session.is_loading() {
            "waiting"
        } else {
            "idle"
        };
        let view = if self.history_state.auto_follow {
            "view:following"
        } else {
            "view:scrolled"
        };
        format!(
            "{} | {activity} | messages:{} | {view}",
            session.connection_state().label(),
            session.transcript().len()
        )
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.active_notice.as_ref().map(|active| &active.notice)
    }

    /// `None` while following the newest output; the frontend pins to the
    /// bottom in that case.
    pub fn history_scroll(&self) -> Option<usize> {
        if self.history_state.auto_follow {
            None
        } else {
            Some(self.history_state.scroll_offset)
        }
    }

    fn show_notice(&mut self, notice: Notice, now: Instant) {
        self.active_notice = Some(ActiveNotice {
            notice,
            expires_at: now + NOTICE_TTL,
        });
    }

    fn handle_command(&mut self, input: &str, ctx: &mut RuntimeContext) -> bool {
        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };
        match command {
            QUIT_COMMAND => {
                self.quit = true;
                true
            }
            UPLOAD_COMMAND => {
                if argument.is_empty() {
                    self.show_notice(Notice::error("Usage: /upload <path>"), Instant::now());
                } else if let Err(err) = ctx.session.seed_from_file(Path::new(argument)) {
                    tracing::debug!(error = %err, "upload rejected");
                }
                self.history_state.auto_follow = true;
                true
            }
            _ => false,
        }
    }

    fn max_scroll_offset(&self) -> usize {
        self.history_state
            .visual_rows
            .saturating_sub(self.history_state.viewport_rows.max(1))
    }

    fn set_viewport(&mut self, width: usize, rows: usize) {
        self.history_state.viewport_width = width.max(1);
        self.history_state.viewport_rows = rows.max(1);
    }

    fn sync_history_extent(&mut self, session: &ChatSession) {
        let lines = transcript_lines(session.transcript(), session.is_loading());
        self.history_state.visual_rows =
            history_visual_line_count(&lines, self.history_state.viewport_width);
        self.clamp_scroll_offset();
    }

    fn clamp_scroll_offset(&mut self) {
        let max = self.max_scroll_offset();
        self.history_state.scroll_offset = self.history_state.scroll_offset.min(max);
    }

    fn apply_scroll(&mut self, action: ScrollAction) {
        let max = self.max_scroll_offset();
        let current = if self.history_state.auto_follow {
            max
        } else {
            self.history_state.scroll_offset
        };
        let next = match action {
            ScrollAction::LineUp => current.saturating_sub(1),
            ScrollAction::LineDown => current.saturating_add(1).min(max),
            ScrollAction::PageUp(step) => current.saturating_sub(step.max(1)),
            ScrollAction::PageDown(step) => current.saturating_add(step.max(1)).min(max),
            ScrollAction::Home => 0,
            ScrollAction::End => max,
        };
        self.history_state.scroll_offset = next;
        self.history_state.auto_follow = next >= max;
    }
}

impl RuntimeMode for ChatMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext) {
        let trimmed = input.trim();
        if trimmed.starts_with('/') && self.handle_command(trimmed, ctx) {
            return;
        }
        match ctx.session.submit(&input) {
            Ok(id) => {
                tracing::debug!(request = %id, "message submitted");
                self.history_state.auto_follow = true;
            }
            Err(err) if err.is_silent() => {}
            Err(err) => tracing::debug!(error = %err, "submission rejected"),
        }
    }

    fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {
        self.quit = true;
    }

    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext) {
        match event {
            UserInputEvent::Text(text) => self.on_user_input(text, ctx),
            UserInputEvent::Interrupt => self.on_interrupt(ctx),
            UserInputEvent::Scroll(action) => {
                self.sync_history_extent(ctx.session);
                self.apply_scroll(action);
            }
            UserInputEvent::Viewport { width, rows } => {
                self.set_viewport(width, rows);
                self.sync_history_extent(ctx.session);
            }
        }
    }

    fn on_tick(&mut self, ctx: &mut RuntimeContext, now: Instant) {
        ctx.session.check_stall(now);
        if let Some(notice) = ctx.session.take_notices().pop() {
            self.show_notice(notice, now);
        }
        if self
            .active_notice
            .as_ref()
            .is_some_and(|active| now >= active.expires_at)
        {
            self.active_notice = None;
        }

        self.sync_history_extent(ctx.session);
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

pub fn build_session(config: &Config) -> ChatSession {
    ChatSession::new(
        config.endpoint.clone(),
        Arc::new(WsTransport),
        config.stall_timeout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::MockTransport;
    use crate::seed::ANALYSIS_INSTRUCTION;
    use crate::state::NoticeLevel;
    use std::io::Write;

    async fn connected_session() -> (ChatSession, crate::connection::mock::MockPeer) {
        let (transport, peer) = MockTransport::pair();
        let mut session = ChatSession::new("ws://mock", Arc::new(transport), None);
        session.connect().await;
        (session, peer)
    }

    #[tokio::test]
    async fn plain_text_is_submitted() {
        let (mut session, mut peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_frontend_event(UserInputEvent::Text("hello".to_string()), &mut ctx);

        assert!(session.is_loading());
        assert_eq!(peer.next_outbound().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn quit_command_sets_quit_without_sending() {
        let (mut session, mut peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_user_input("/quit".to_string(), &mut ctx);

        assert!(mode.quit_requested());
        assert!(session.transcript().is_empty());
        assert_eq!(peer.try_outbound(), None);
    }

    #[tokio::test]
    async fn interrupt_requests_quit() {
        let (mut session, _peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_frontend_event(UserInputEvent::Interrupt, &mut ctx);
        assert!(mode.quit_requested());
    }

    #[tokio::test]
    async fn upload_command_seeds_and_requests_analysis() {
        let (mut session, mut peer) = connected_session().await;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "alpha").expect("write seed");
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_user_input(format!("/upload {}", file.path().display()), &mut ctx);

        assert_eq!(session.transcript().len(), 2);
        assert!(session.transcript()[0].content.contains("alpha"));
        assert_eq!(
            peer.next_outbound().await.as_deref(),
            Some(ANALYSIS_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn upload_without_path_shows_usage_notice() {
        let (mut session, _peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_user_input("/upload".to_string(), &mut ctx);

        let notice = mode.current_notice().expect("usage notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.text.contains("/upload"));
    }

    #[tokio::test]
    async fn unknown_slash_text_is_sent_as_message() {
        let (mut session, mut peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);

        mode.on_user_input("/image a red fox".to_string(), &mut ctx);

        assert_eq!(
            peer.next_outbound().await.as_deref(),
            Some("/image a red fox")
        );
    }

    #[tokio::test]
    async fn tick_surfaces_session_notice_then_expires_it() {
        let (mut session, _peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);
        let now = Instant::now();

        ctx.session.pump_events();
        mode.on_tick(&mut ctx, now);
        let notice = mode.current_notice().expect("connected notice");
        assert_eq!(notice.level, NoticeLevel::Success);

        mode.on_tick(&mut ctx, now + NOTICE_TTL);
        assert!(mode.current_notice().is_none());
    }

    #[tokio::test]
    async fn scrolling_up_leaves_follow_and_end_restores_it() {
        let (mut session, mut peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);
        for text in ["one", "two", "three"] {
            ctx.session.submit(text).expect("submit");
            peer.push_frame("ok");
            peer.push_frame("[END]");
            while ctx.session.is_loading() {
                ctx.session.process_next_event().await;
            }
        }
        mode.on_tick(&mut ctx, Instant::now());
        assert_eq!(mode.history_scroll(), None);

        mode.on_frontend_event(UserInputEvent::Scroll(ScrollAction::PageUp(3)), &mut ctx);
        let scrolled = mode.history_scroll().expect("scrolled view");
        assert_eq!(scrolled, mode.max_scroll_offset() - 3);
        assert!(mode.status_line(ctx.session).contains("view:scrolled"));

        mode.on_frontend_event(UserInputEvent::Scroll(ScrollAction::Home), &mut ctx);
        assert_eq!(mode.history_scroll(), Some(0));

        mode.on_frontend_event(UserInputEvent::Scroll(ScrollAction::End), &mut ctx);
        assert_eq!(mode.history_scroll(), None);
        assert!(mode.status_line(ctx.session).contains("view:following"));
    }

    #[tokio::test]
    async fn scroll_bounds_follow_wrapped_rows_of_the_viewport() {
        let (mut session, mut peer) = connected_session().await;
        let mut mode = ChatMode::new();
        let mut ctx = RuntimeContext::new(&mut session);
        ctx.session.submit("long please").expect("submit");
        peer.push_frame("aaa bbbb cc dddd ee ffff gg hhhh ii zzzz");
        peer.push_frame("[END]");
        while ctx.session.is_loading() {
            ctx.session.process_next_event().await;
        }

        mode.on_frontend_event(UserInputEvent::Viewport { width: 10, rows: 4 }, &mut ctx);
        mode.on_tick(&mut ctx, Instant::now());

        let lines = transcript_lines(ctx.session.transcript(), false);
        let bottom = history_visual_line_count(&lines, 10) - 4;
        assert!(bottom > lines.len() - 4);
        assert_eq!(mode.max_scroll_offset(), bottom);

        mode.on_frontend_event(UserInputEvent::Scroll(ScrollAction::LineUp), &mut ctx);
        assert_eq!(mode.history_scroll(), Some(bottom - 1));

        mode.on_frontend_event(UserInputEvent::Scroll(ScrollAction::LineDown), &mut ctx);
        assert_eq!(mode.history_scroll(), None);
    }

    #[test]
    fn build_session_starts_disconnected() {
        let config = Config {
            endpoint: "ws://localhost:8090".to_string(),
            stall_timeout: None,
            seed_file: None,
        };
        let session = build_session(&config);
        assert_eq!(session.endpoint(), "ws://localhost:8090");
        assert!(!session.is_loading());
    }
}
