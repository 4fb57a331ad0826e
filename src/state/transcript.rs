use crate::types::{Message, RequestId};

/// Where a text delta landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaPlacement {
    Started(usize),
    Extended(usize),
}

/// Ordered conversation shown to the user. Entries are only ever appended,
/// except that the trailing assistant entry may grow while it streams.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Appends `delta` to the trailing entry when it is an assistant entry of
    /// request `id`; starts a new assistant entry otherwise.
    pub fn append_delta(&mut self, id: RequestId, delta: &str) -> DeltaPlacement {
        let index = self.messages.len().saturating_sub(1);
        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|last| last.is_assistant_for(id))
        {
            last.content.push_str(delta);
            return DeltaPlacement::Extended(index);
        }
        DeltaPlacement::Started(self.push(Message::assistant(id, delta)))
    }

    /// Number of entries tagged with `id`, user and assistant alike.
    pub fn entries_for(&self, id: RequestId) -> usize {
        self.messages.iter().filter(|m| m.id == id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_deltas_concatenate_onto_trailing_assistant_entry() {
        let mut transcript = Transcript::new();
        let id = RequestId::new();
        transcript.push(Message::user(id, "hi"));

        assert_eq!(transcript.append_delta(id, "He"), DeltaPlacement::Started(1));
        assert_eq!(transcript.append_delta(id, "llo"), DeltaPlacement::Extended(1));
        assert_eq!(transcript.append_delta(id, ""), DeltaPlacement::Extended(1));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].content, "Hello");
        assert_eq!(transcript.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_delta_for_other_request_starts_new_entry() {
        let mut transcript = Transcript::new();
        let earlier = RequestId::new();
        let current = RequestId::new();
        transcript.push(Message::assistant(earlier, "old answer"));

        assert_eq!(
            transcript.append_delta(current, "new"),
            DeltaPlacement::Started(1)
        );
        assert_eq!(transcript.messages()[0].content, "old answer");
        assert_eq!(transcript.entries_for(current), 1);
    }

    #[test]
    fn test_delta_after_user_entry_of_same_request_starts_new_entry() {
        let mut transcript = Transcript::new();
        let id = RequestId::new();
        transcript.push(Message::user(id, "question"));
        transcript.append_delta(id, "answer");
        assert_eq!(transcript.messages()[0].content, "question");
        assert_eq!(transcript.messages()[1].content, "answer");
    }
}
