use super::assembler::{FrameOutcome, ResponseAssembler};
use super::transcript::Transcript;
use crate::connection::{Connection, ConnectionEvent, ConnectionState, Transport};
use crate::error::SubmitError;
use crate::seed;
use crate::types::{Message, RequestId};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const MAX_PENDING_NOTICES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Everything the chat screen owns for its lifetime: the socket, the
/// transcript, the response assembler and pending notices.
pub struct ChatSession {
    endpoint: String,
    connection: Connection,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    assembler: ResponseAssembler,
    transcript: Transcript,
    notices: VecDeque<Notice>,
}

impl ChatSession {
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn Transport>,
        stall_timeout: Option<Duration>,
    ) -> Self {
        let (connection, events_rx) = Connection::new(transport);
        Self {
            endpoint: endpoint.into(),
            connection,
            events_rx,
            assembler: ResponseAssembler::new(stall_timeout),
            transcript: Transcript::new(),
            notices: VecDeque::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transcript(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.assembler.is_open()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Opens the socket. The outcome arrives as an event and becomes a notice
    /// once processed, so a failure here needs no extra handling by callers.
    pub async fn connect(&mut self) {
        let endpoint = self.endpoint.clone();
        if let Err(err) = self.connection.connect(&endpoint).await {
            debug!(error = %err, "connect attempt finished with error");
        }
    }

    pub fn disconnect(&mut self) {
        self.abandon_request("disconnect");
        self.connection.disconnect();
    }

    /// Sends `text` as a new request and records it as a user entry.
    pub fn submit(&mut self, text: &str) -> Result<RequestId, SubmitError> {
        let result = self.try_submit(text);
        if let Err(err) = &result {
            self.notify_rejected(err);
        }
        result
    }

    fn try_submit(&mut self, text: &str) -> Result<RequestId, SubmitError> {
        self.connection.ensure_can_send()?;
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        let id = self.connection.send(text)?;
        self.transcript.push(Message::user(id, text));
        self.assembler.begin(id, Instant::now());
        Ok(id)
    }

    /// Uploads a local file: one user entry with the fenced content, then one
    /// analysis request. Read failures are logged and abort without a trace.
    pub fn seed_from_file(&mut self, path: &Path) -> Result<Option<RequestId>, SubmitError> {
        let content = match seed::read_seed_file(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = ?err, "file upload aborted");
                return Ok(None);
            }
        };
        if let Err(err) = self.connection.ensure_can_send() {
            self.notify_rejected(&err);
            return Err(err);
        }
        self.transcript
            .push(Message::user(RequestId::new(), seed::seed_message(&content)));
        self.submit(seed::ANALYSIS_INSTRUCTION).map(Some)
    }

    /// Waits for the next socket event and applies it. Without an open
    /// socket no further event can arrive, so only what is already queued is
    /// applied and false is returned once the queue is empty.
    pub async fn process_next_event(&mut self) -> bool {
        let next = if self.connection.is_open() {
            self.events_rx.recv().await
        } else {
            self.events_rx.try_recv().ok()
        };
        match next {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Applies every event that is already queued. Returns how many there were.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: ConnectionEvent) {
        self.connection.handle_event(&event);
        match event {
            ConnectionEvent::Connected => {
                self.push_notice(Notice::success("Connected to the chatbot!"));
            }
            ConnectionEvent::Failed { message } => {
                debug!(error = %message, "connection failure surfaced");
                self.abandon_request("connection failure");
                self.push_notice(Notice::error("Connection error to the chatbot!"));
            }
            ConnectionEvent::Closed => {
                self.abandon_request("remote close");
                self.push_notice(Notice::error("Connection to the chatbot lost!"));
            }
            ConnectionEvent::Frame(payload) => self.apply_frame(&payload),
        }
    }

    fn apply_frame(&mut self, payload: &str) {
        if self.connection.open_request().is_none() {
            debug!(bytes = payload.len(), "frame arrived with no listener attached");
            return;
        }
        if let FrameOutcome::Completed(id) =
            self.assembler
                .apply(payload, &mut self.transcript, Instant::now())
        {
            if self.connection.detach_listener() != Some(id) {
                warn!(request = %id, "completed request did not match the attached listener");
            }
        }
    }

    /// Gives up on a request whose response stopped arriving. A no-op unless a
    /// stall timeout is configured.
    pub fn check_stall(&mut self, now: Instant) -> bool {
        if !self.assembler.is_stalled(now) {
            return false;
        }
        let timeout = self.assembler.stall_timeout().unwrap_or_default();
        warn!(timeout_secs = timeout.as_secs(), "response stalled");
        self.abandon_request("stall timeout");
        self.push_notice(Notice::error(format!(
            "No response from the chatbot for {}s, request abandoned.",
            timeout.as_secs()
        )));
        true
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn abandon_request(&mut self, reason: &str) {
        if let Some(id) = self.assembler.abandon() {
            debug!(request = %id, reason, "request abandoned");
        }
        self.connection.detach_listener();
    }

    fn notify_rejected(&mut self, err: &SubmitError) {
        if err.is_silent() {
            return;
        }
        let text = match err {
            SubmitError::NotConnected => "Not connected to the chatbot!",
            SubmitError::RequestInFlight | SubmitError::EmptyInput => {
                "Connection to the chatbot not available!"
            }
        };
        self.push_notice(Notice::error(text));
    }

    fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() == MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }
}
