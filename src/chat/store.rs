//! In-memory conversation state.
//!
//! [`Conversation`] is the value published through the session's watch
//! channel. Readers only get shared references to it, so the accessors here
//! are the whole public surface; mutation is crate-private and goes through
//! [`ChatSession`](super::ChatSession).

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::message::{Message, QueryMode};

/// Cancellation handle for the one request that may be in flight.
#[derive(Debug, Clone)]
pub(crate) struct ActiveTurn {
    /// Monotonic turn number, used to tell a stale turn from the current one.
    pub(crate) turn: u64,
    /// Id of the assistant placeholder this turn writes into.
    pub(crate) placeholder: Uuid,
    /// Mode captured when the turn started.
    pub(crate) mode: QueryMode,
    pub(crate) cancel: CancellationToken,
}

/// Ordered messages plus the loading flag and the current mode.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    is_loading: bool,
    mode: QueryMode,
    active: Option<ActiveTurn>,
    next_turn: u64,
    clears: u64,
}

/// Owned copy of a [`Conversation`] without the cancellation handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub mode: QueryMode,
}

impl Conversation {
    pub(crate) fn new(mode: QueryMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Number of times the conversation has been cleared.
    ///
    /// Lets a reader that skipped intermediate states notice a clear even when
    /// the message count came back to where it was.
    #[must_use]
    pub fn clear_count(&self) -> u64 {
        self.clears
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn to_snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            is_loading: self.is_loading,
            mode: self.mode,
        }
    }

    pub(crate) fn set_mode(&mut self, mode: QueryMode) {
        self.mode = mode;
    }

    /// Start a turn: append the user message and the empty placeholder,
    /// raise the loading flag, and register a fresh cancellation handle.
    ///
    /// Returns `None` (and changes nothing) while another turn is active.
    pub(crate) fn begin_turn(&mut self, text: &str) -> Option<ActiveTurn> {
        if self.is_loading {
            return None;
        }

        let user = Message::user(text, self.mode);
        let placeholder = Message::assistant_placeholder(self.mode);
        let turn = ActiveTurn {
            turn: self.next_turn,
            placeholder: placeholder.id(),
            mode: self.mode,
            cancel: CancellationToken::new(),
        };
        self.next_turn += 1;

        self.messages.push(user);
        self.messages.push(placeholder);
        self.is_loading = true;
        self.active = Some(turn.clone());
        Some(turn)
    }

    /// Whether `turn` is still the one holding the loading flag.
    pub(crate) fn is_active(&self, turn: u64) -> bool {
        self.active.as_ref().is_some_and(|a| a.turn == turn)
    }

    /// Append text to the message with `id`. Returns false if it no longer exists.
    pub(crate) fn append_content(&mut self, id: Uuid, text: &str) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.id() == id) {
            Some(msg) => {
                msg.append(text);
                true
            }
            None => false,
        }
    }

    /// Replace the content of the message with `id`. Returns false if it no longer exists.
    pub(crate) fn replace_content(&mut self, id: Uuid, text: &str) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.id() == id) {
            Some(msg) => {
                msg.replace_content(text);
                true
            }
            None => false,
        }
    }

    /// Terminal bookkeeping for `turn`. A turn that is no longer active
    /// leaves the state alone.
    pub(crate) fn finish_turn(&mut self, turn: u64) -> bool {
        if !self.is_active(turn) {
            return false;
        }
        self.active = None;
        self.is_loading = false;
        true
    }

    /// Cancel whatever is in flight and drop every message.
    pub(crate) fn reset(&mut self) -> Option<ActiveTurn> {
        let aborted = self.active.take();
        if let Some(turn) = &aborted {
            turn.cancel.cancel();
        }
        self.messages.clear();
        self.is_loading = false;
        self.clears += 1;
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;

    #[test]
    fn test_begin_turn_appends_user_then_placeholder() {
        let mut conv = Conversation::new(QueryMode::Unstructured);
        let turn = conv.begin_turn("top customers").unwrap();

        assert_eq!(conv.len(), 2);
        assert!(conv.is_loading());
        assert_eq!(conv.messages()[0].role(), Role::User);
        assert_eq!(conv.messages()[0].content(), "top customers");
        assert_eq!(conv.messages()[0].mode(), QueryMode::Unstructured);
        assert_eq!(conv.messages()[1].role(), Role::Assistant);
        assert_eq!(conv.messages()[1].id(), turn.placeholder);
        assert!(conv.messages()[1].content().is_empty());
    }

    #[test]
    fn test_begin_turn_refused_while_loading() {
        let mut conv = Conversation::default();
        conv.begin_turn("first").unwrap();
        assert!(conv.begin_turn("second").is_none());
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_append_and_replace_by_id() {
        let mut conv = Conversation::default();
        let turn = conv.begin_turn("q").unwrap();

        assert!(conv.append_content(turn.placeholder, "Hel"));
        assert!(conv.append_content(turn.placeholder, "lo"));
        assert_eq!(conv.get(turn.placeholder).unwrap().content(), "Hello");

        assert!(conv.replace_content(turn.placeholder, "oops"));
        assert_eq!(conv.last().unwrap().content(), "oops");
        assert!(!conv.append_content(Uuid::new_v4(), "x"));
    }

    #[test]
    fn test_reset_cancels_and_empties() {
        let mut conv = Conversation::default();
        let turn = conv.begin_turn("q").unwrap();

        let aborted = conv.reset().unwrap();
        assert_eq!(aborted.turn, turn.turn);
        assert!(turn.cancel.is_cancelled());
        assert!(conv.is_empty());
        assert!(!conv.is_loading());
        assert!(!conv.append_content(turn.placeholder, "late"));
        assert_eq!(conv.clear_count(), 1);
    }

    #[test]
    fn test_stale_turn_does_not_finish_new_one() {
        let mut conv = Conversation::default();
        let stale = conv.begin_turn("one").unwrap();
        conv.reset();
        let fresh = conv.begin_turn("two").unwrap();

        assert!(!conv.finish_turn(stale.turn));
        assert!(conv.is_loading());
        assert!(conv.finish_turn(fresh.turn));
        assert!(!conv.is_loading());
    }

    #[test]
    fn test_reset_without_active_turn_is_harmless() {
        let mut conv = Conversation::default();
        assert!(conv.reset().is_none());
        assert!(conv.is_empty());
    }
}
