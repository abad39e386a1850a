//! Stream event types passed from the stream driver to the session.

use tokio::sync::mpsc;

use crate::providers::ProviderError;

/// Identifies one submitted request. Events carry it so that output from a
/// cancelled request can be told apart from the current one.
pub type RequestId = u64;

/// Event emitted while a request streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub request: RequestId,
    pub kind: ChatEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventKind {
    /// Incremental text to append to the assistant turn.
    Token { text: String },
    /// Stream ended normally.
    Finished { reason: Option<String> },
    /// Stream ended with a transport or API error.
    Failed { error: ProviderError },
}

impl ChatEvent {
    pub fn token(request: RequestId, text: impl Into<String>) -> Self {
        Self {
            request,
            kind: ChatEventKind::Token { text: text.into() },
        }
    }

    pub fn finished(request: RequestId) -> Self {
        Self {
            request,
            kind: ChatEventKind::Finished { reason: None },
        }
    }

    pub fn failed(request: RequestId, error: ProviderError) -> Self {
        Self {
            request,
            kind: ChatEventKind::Failed { error },
        }
    }
}

/// Sender side of the event channel. Unbounded so tokens are never dropped.
pub type ChatEventTx = mpsc::UnboundedSender<ChatEvent>;

/// Receiver side of the event channel.
pub type ChatEventRx = mpsc::UnboundedReceiver<ChatEvent>;

/// Creates a new event channel.
pub fn create_event_channel() -> (ChatEventTx, ChatEventRx) {
    mpsc::unbounded_channel()
}
