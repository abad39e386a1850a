//! Transcript controller.
//!
//! `ChatSession` owns the ordered list of turns and the single in-flight
//! request. It never performs I/O itself: `submit()` hands back a
//! `ChatRequest` for the stream driver, and stream output comes back through
//! `apply()`. This keeps every transcript mutation in one place and lets the
//! UI and exec modes share the same rules.

use tokio_util::sync::CancellationToken;

use crate::core::events::{ChatEvent, ChatEventKind, RequestId};
use crate::providers::{ChatMessage, Role};

/// Stable identity of a turn within a session.
pub type TurnId = u64;

/// Lifecycle of a turn's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Tokens are still being appended.
    Streaming,
    /// Text is final.
    Complete,
    /// The user stopped generation; text holds what arrived before.
    Cancelled,
    /// The stream failed; text holds what arrived before.
    Failed { message: String },
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub speaker: Role,
    pub text: String,
    pub status: TurnStatus,
}

impl Turn {
    pub fn is_streaming(&self) -> bool {
        self.status == TurnStatus::Streaming
    }

    fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.speaker,
            content: self.text.clone(),
        }
    }
}

/// A request ready to be streamed.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub id: RequestId,
    /// Assistant turn that receives the tokens.
    pub turn: TurnId,
    /// Full payload: system directive, history, new user text.
    pub messages: Vec<ChatMessage>,
    /// Cancelled when the user aborts; the stream driver selects on it.
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    turn: TurnId,
    cancel: CancellationToken,
}

/// Owns the transcript and the in-flight request flag.
#[derive(Debug)]
pub struct ChatSession {
    system_prompt: String,
    turns: Vec<Turn>,
    active: Option<ActiveRequest>,
    next_turn_id: TurnId,
    next_request_id: RequestId,
}

impl ChatSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
            active: None,
            next_turn_id: 0,
            next_request_id: 0,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Assistant turn currently receiving tokens, if any.
    pub fn streaming_turn(&self) -> Option<TurnId> {
        self.active.as_ref().map(|a| a.turn)
    }

    /// Starts a new exchange.
    ///
    /// Returns `None` without touching the transcript when `user_text` is
    /// blank or a request is already in flight. Otherwise appends the user
    /// turn and an empty assistant turn and returns the request to stream.
    pub fn submit(&mut self, user_text: &str) -> Option<ChatRequest> {
        if user_text.trim().is_empty() || self.is_streaming() {
            return None;
        }

        // System directive goes first with role "user".
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(ChatMessage::user(self.system_prompt.clone()));
        messages.extend(self.turns.iter().map(Turn::to_message));
        messages.push(ChatMessage::user(user_text));

        self.push_turn(Role::User, user_text.to_string(), TurnStatus::Complete);
        let turn = self.push_turn(Role::Assistant, String::new(), TurnStatus::Streaming);

        let id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = CancellationToken::new();
        self.active = Some(ActiveRequest {
            id,
            turn,
            cancel: cancel.clone(),
        });

        tracing::debug!(request = id, turn, messages = messages.len(), "Submitted chat request");

        Some(ChatRequest {
            id,
            turn,
            messages,
            cancel,
        })
    }

    /// Applies a stream event. Returns true if the transcript changed.
    ///
    /// Events for anything but the active request are ignored.
    pub fn apply(&mut self, event: ChatEvent) -> bool {
        let Some(active) = self.active.as_ref() else {
            tracing::trace!(request = event.request, "Dropping event: no active request");
            return false;
        };
        if active.id != event.request {
            tracing::trace!(request = event.request, active = active.id, "Dropping stale event");
            return false;
        }
        let turn_id = active.turn;

        match event.kind {
            ChatEventKind::Token { text } => {
                if text.is_empty() {
                    return false;
                }
                let Some(turn) = self.turn_mut(turn_id) else {
                    return false;
                };
                turn.text.push_str(&text);
                true
            }
            ChatEventKind::Finished { reason } => {
                tracing::debug!(request = event.request, ?reason, "Stream finished");
                self.finish(TurnStatus::Complete);
                true
            }
            ChatEventKind::Failed { error } => {
                tracing::warn!(request = event.request, kind = %error.kind, error = %error, "Stream failed");
                self.finish(TurnStatus::Failed {
                    message: error.message,
                });
                true
            }
        }
    }

    /// Aborts the in-flight request, keeping any text already received.
    ///
    /// Returns false if nothing was in flight.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.as_ref() else {
            return false;
        };
        active.cancel.cancel();
        tracing::debug!(request = active.id, "Cancelled chat request");
        self.finish(TurnStatus::Cancelled);
        true
    }

    fn finish(&mut self, status: TurnStatus) {
        if let Some(active) = self.active.take()
            && let Some(turn) = self.turn_mut(active.turn)
        {
            turn.status = status;
        }
    }

    fn push_turn(&mut self, speaker: Role, text: String, status: TurnStatus) -> TurnId {
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.turns.push(Turn {
            id,
            speaker,
            text,
            status,
        });
        id
    }

    fn turn_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderErrorKind};

    fn texts(session: &ChatSession) -> Vec<(Role, &str)> {
        session
            .turns()
            .iter()
            .map(|t| (t.speaker, t.text.as_str()))
            .collect()
    }

    #[test]
    fn test_submit_appends_user_and_empty_assistant() {
        let mut session = ChatSession::new("sys");
        let request = session.submit("hello").unwrap();

        assert_eq!(
            texts(&session),
            vec![(Role::User, "hello"), (Role::Assistant, "")]
        );
        assert!(session.is_streaming());
        assert_eq!(session.streaming_turn(), Some(request.turn));
        assert_eq!(
            request.messages,
            vec![ChatMessage::user("sys"), ChatMessage::user("hello")]
        );
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut session = ChatSession::new("sys");
        assert!(session.submit("").is_none());
        assert!(session.submit("  \n\t ").is_none());
        assert!(session.turns().is_empty());
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_submit_while_streaming_is_noop() {
        let mut session = ChatSession::new("sys");
        session.submit("first").unwrap();
        assert!(session.submit("second").is_none());
        assert_eq!(session.turns().len(), 2);
    }

    #[test]
    fn test_tokens_accumulate_in_order() {
        let mut session = ChatSession::new("sys");
        let request = session.submit("hello").unwrap();

        assert!(session.apply(ChatEvent::token(request.id, "Hi")));
        assert_eq!(session.turn(request.turn).unwrap().text, "Hi");
        assert!(session.apply(ChatEvent::token(request.id, " there")));
        assert_eq!(session.turn(request.turn).unwrap().text, "Hi there");

        assert!(session.apply(ChatEvent::finished(request.id)));
        assert!(!session.is_streaming());
        assert_eq!(
            session.turn(request.turn).unwrap().status,
            TurnStatus::Complete
        );
    }

    #[test]
    fn test_history_is_replayed_in_next_payload() {
        let mut session = ChatSession::new("sys");
        let first = session.submit("2+2?").unwrap();
        session.apply(ChatEvent::token(first.id, "<think>easy</think>4"));
        session.apply(ChatEvent::finished(first.id));

        let second = session.submit("times 3?").unwrap();
        assert_eq!(
            second.messages,
            vec![
                ChatMessage::user("sys"),
                ChatMessage::user("2+2?"),
                ChatMessage::assistant("<think>easy</think>4"),
                ChatMessage::user("times 3?"),
            ]
        );
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_cancel_keeps_partial_text_and_ignores_late_tokens() {
        let mut session = ChatSession::new("sys");
        let request = session.submit("hello").unwrap();
        session.apply(ChatEvent::token(request.id, "Par"));

        assert!(session.cancel());
        assert!(request.cancel.is_cancelled());
        assert!(!session.is_streaming());

        assert!(!session.apply(ChatEvent::token(request.id, "tial")));
        let turn = session.turn(request.turn).unwrap();
        assert_eq!(turn.text, "Par");
        assert_eq!(turn.status, TurnStatus::Cancelled);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut session = ChatSession::new("sys");
        assert!(!session.cancel());
    }

    #[test]
    fn test_stale_request_events_are_dropped() {
        let mut session = ChatSession::new("sys");
        let old = session.submit("one").unwrap();
        session.cancel();
        let new = session.submit("two").unwrap();

        assert!(!session.apply(ChatEvent::token(old.id, "late")));
        assert!(session.apply(ChatEvent::token(new.id, "fresh")));
        assert_eq!(session.turn(old.turn).unwrap().text, "");
        assert_eq!(session.turn(new.turn).unwrap().text, "fresh");
    }

    #[test]
    fn test_failure_keeps_partial_text() {
        let mut session = ChatSession::new("sys");
        let request = session.submit("hello").unwrap();
        session.apply(ChatEvent::token(request.id, "partial"));
        session.apply(ChatEvent::failed(
            request.id,
            ProviderError::new(ProviderErrorKind::Network, "connection reset"),
        ));

        assert!(!session.is_streaming());
        let turn = session.turn(request.turn).unwrap();
        assert_eq!(turn.text, "partial");
        assert_eq!(
            turn.status,
            TurnStatus::Failed {
                message: "connection reset".to_string()
            }
        );
        assert!(session.submit("again").is_some());
    }
}
