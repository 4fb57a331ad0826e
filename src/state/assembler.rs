use super::transcript::{DeltaPlacement, Transcript};
use crate::types::{InboundFrame, Message, RequestId, StructuredRecord};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const ERROR_PREFIX: &str = "Error: ";

/// Accumulator for the one request whose response is being received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub id: RequestId,
    pub opened_at: Instant,
    pub last_frame_at: Instant,
    pub frames: usize,
    /// Transcript entries this request has produced so far.
    pub entries: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The sentinel arrived; the request is closed.
    Completed(RequestId),
    /// A new assistant entry was appended at this index.
    Appended(usize),
    /// The trailing assistant entry at this index grew.
    Extended(usize),
    /// Nothing changed: no open request, or an unrecognised record.
    Ignored,
}

/// Folds inbound frames for the open request into the transcript.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    open: Option<OpenRequest>,
    stall_timeout: Option<Duration>,
}

impl ResponseAssembler {
    pub fn new(stall_timeout: Option<Duration>) -> Self {
        Self {
            open: None,
            stall_timeout,
        }
    }

    pub fn begin(&mut self, id: RequestId, now: Instant) {
        if let Some(previous) = self.open.replace(OpenRequest {
            id,
            opened_at: now,
            last_frame_at: now,
            frames: 0,
            entries: Vec::new(),
        }) {
            debug!(request = %previous.id, "replacing unfinished request");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_request(&self) -> Option<&OpenRequest> {
        self.open.as_ref()
    }

    /// Drops the open request without waiting for its sentinel.
    pub fn abandon(&mut self) -> Option<RequestId> {
        self.open.take().map(|request| request.id)
    }

    pub fn apply(&mut self, payload: &str, transcript: &mut Transcript, now: Instant) -> FrameOutcome {
        let Some(request) = self.open.as_mut() else {
            trace!(bytes = payload.len(), "frame with no open request dropped");
            return FrameOutcome::Ignored;
        };
        request.frames += 1;
        request.last_frame_at = now;
        let id = request.id;

        let outcome = match InboundFrame::decode(payload) {
            InboundFrame::Sentinel => {
                self.open = None;
                debug!(request = %id, "response complete");
                return FrameOutcome::Completed(id);
            }
            InboundFrame::Record(StructuredRecord::Image { query, url }) => FrameOutcome::Appended(
                transcript.push(Message::assistant(id, format!("![{query}]({url})"))),
            ),
            InboundFrame::Record(StructuredRecord::Error { message }) => FrameOutcome::Appended(
                transcript.push(Message::assistant(id, format!("{ERROR_PREFIX}{message}"))),
            ),
            InboundFrame::Record(StructuredRecord::Unknown) => {
                debug!(request = %id, "ignoring record with unrecognised type");
                FrameOutcome::Ignored
            }
            InboundFrame::Text(delta) => match transcript.append_delta(id, delta) {
                DeltaPlacement::Started(index) => FrameOutcome::Appended(index),
                DeltaPlacement::Extended(index) => FrameOutcome::Extended(index),
            },
        };

        if let FrameOutcome::Appended(index) = outcome {
            request.entries.push(index);
        }
        outcome
    }

    /// True once the open request has gone `stall_timeout` without a frame.
    /// Always false when no timeout is configured.
    pub fn is_stalled(&self, now: Instant) -> bool {
        match (&self.open, self.stall_timeout) {
            (Some(request), Some(timeout)) => {
                now.saturating_duration_since(request.last_frame_at) >= timeout
            }
            _ => false,
        }
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn open(assembler: &mut ResponseAssembler, transcript: &mut Transcript, text: &str) -> RequestId {
        let id = RequestId::new();
        transcript.push(Message::user(id, text));
        assembler.begin(id, Instant::now());
        id
    }

    #[test]
    fn test_text_deltas_concatenate_in_delivery_order() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        let id = open(&mut assembler, &mut transcript, "count");
        let deltas = ["one", " ", "two", "", " three\n", "{broken"];

        for delta in deltas {
            assembler.apply(delta, &mut transcript, Instant::now());
        }

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].content, deltas.concat());
        assert!(transcript.messages()[1].is_assistant_for(id));
        assert_eq!(assembler.open_request().unwrap().frames, deltas.len());
        assert_eq!(assembler.open_request().unwrap().entries, vec![1]);
    }

    #[test]
    fn test_sentinel_closes_request_and_later_frames_do_not_mutate() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        let id = open(&mut assembler, &mut transcript, "hi");

        assembler.apply("Hel", &mut transcript, Instant::now());
        assert_eq!(
            assembler.apply("lo[END]", &mut transcript, Instant::now()),
            FrameOutcome::Completed(id)
        );
        assert!(!assembler.is_open());

        let before = transcript.messages().to_vec();
        assert_eq!(
            assembler.apply("ignored", &mut transcript, Instant::now()),
            FrameOutcome::Ignored
        );
        assert_eq!(transcript.messages(), before.as_slice());
        // The sentinel frame carries no displayable content.
        assert_eq!(transcript.messages()[1].content, "Hel");
    }

    #[test]
    fn test_image_record_appends_new_entry_after_text() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        let id = open(&mut assembler, &mut transcript, "/image cat");

        assembler.apply("Here you go", &mut transcript, Instant::now());
        let outcome = assembler.apply(
            r#"{"type":"image","query":"cat","url":"http://x/y.png"}"#,
            &mut transcript,
            Instant::now(),
        );

        assert_eq!(outcome, FrameOutcome::Appended(2));
        assert_eq!(transcript.messages()[1].content, "Here you go");
        assert_eq!(transcript.messages()[2].content, "![cat](http://x/y.png)");
        assert_eq!(transcript.messages()[2].role, Role::Assistant);
        assert_eq!(transcript.entries_for(id), 3);
    }

    #[test]
    fn test_error_record_appends_prefixed_entry() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        open(&mut assembler, &mut transcript, "/image nothing");

        assembler.apply(r#"{"type":"error","message":"boom"}"#, &mut transcript, Instant::now());
        assembler.apply(r#"{"type":"error","message":"again"}"#, &mut transcript, Instant::now());

        assert_eq!(transcript.messages()[1].content, "Error: boom");
        assert_eq!(transcript.messages()[2].content, "Error: again");
    }

    #[test]
    fn test_unknown_record_is_a_no_op() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        open(&mut assembler, &mut transcript, "hi");

        let outcome = assembler.apply(r#"{"type":"audio","url":"x"}"#, &mut transcript, Instant::now());

        assert_eq!(outcome, FrameOutcome::Ignored);
        assert_eq!(transcript.len(), 1);
        assert!(assembler.is_open());
    }

    #[test]
    fn test_text_after_record_extends_record_entry() {
        let mut assembler = ResponseAssembler::default();
        let mut transcript = Transcript::new();
        open(&mut assembler, &mut transcript, "hi");

        assembler.apply(r#"{"type":"error","message":"boom"}"#, &mut transcript, Instant::now());
        assert_eq!(
            assembler.apply("!", &mut transcript, Instant::now()),
            FrameOutcome::Extended(1)
        );
        assert_eq!(transcript.messages()[1].content, "Error: boom!");
    }

    #[test]
    fn test_stall_detection_requires_configured_timeout() {
        let start = Instant::now();
        let mut transcript = Transcript::new();

        let mut unbounded = ResponseAssembler::default();
        open(&mut unbounded, &mut transcript, "a");
        assert!(!unbounded.is_stalled(start + Duration::from_secs(3600)));

        let mut bounded = ResponseAssembler::new(Some(Duration::from_secs(5)));
        let id = RequestId::new();
        bounded.begin(id, start);
        assert!(!bounded.is_stalled(start + Duration::from_secs(4)));
        bounded.apply("tick", &mut transcript, start + Duration::from_secs(4));
        assert!(!bounded.is_stalled(start + Duration::from_secs(8)));
        assert!(bounded.is_stalled(start + Duration::from_secs(9)));
        assert_eq!(bounded.abandon(), Some(id));
        assert!(!bounded.is_stalled(start + Duration::from_secs(60)));
    }
}
