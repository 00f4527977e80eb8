//! The per-agent conversation ledger.

use std::slice;

use serde::Serialize;
use verdict_model::Message;

/// An append-only transcript of the messages an agent exchanged.
///
/// Agents append the non-system messages of every completed model call in
/// the order they occurred: the user message first, then the assistant
/// reply. The ledger is never reordered, deduplicated, or truncated; it
/// grows for the lifetime of its agent, and keeping it small (for example
/// by creating a fresh agent) is up to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    /// Returns all messages in chronological order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been recorded yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns an iterator over the messages.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Records one exchange: the user message, then the assistant reply.
    pub(crate) fn record(&mut self, user: Message, assistant: Message) {
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(assistant);
    }
}

impl<'a> IntoIterator for &'a ChatHistory {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use verdict_model::Role;

    use super::*;

    #[test]
    fn test_record_appends_in_order() {
        let mut history = ChatHistory::default();
        assert!(history.is_empty());

        history.record(Message::user("1"), Message::assistant("2"));
        history.record(Message::user("3"), Message::assistant("4"));

        let contents: Vec<_> = history.iter().map(Message::content).collect();
        assert_eq!(contents, ["1", "2", "3", "4"]);
        assert_eq!(history.messages()[2].role(), Role::User);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_serialize() {
        let mut history = ChatHistory::default();
        history.record(Message::user("Hi"), Message::assistant("Hello"));
        assert_eq!(
            serde_json::to_value(&history).unwrap(),
            json!([
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello" }
            ])
        );
    }
}
