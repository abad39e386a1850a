//! Stream driver: runs one `ChatRequest` against the backend and forwards
//! its output as `ChatEvent`s.
//!
//! The network read is the only suspension point. Each await races the
//! request's cancellation token, so an abort drops the pending read at once
//! and nothing more is sent for that request.

use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::core::events::{ChatEvent, ChatEventKind, ChatEventTx};
use crate::core::session::ChatRequest;
use crate::providers::{OllamaClient, ProviderError, StreamEvent};

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(ProviderError),
}

/// Streams `request` to completion, cancellation or failure.
pub async fn run_chat_stream(
    client: &OllamaClient,
    request: ChatRequest,
    tx: &ChatEventTx,
) -> StreamOutcome {
    let ChatRequest {
        id,
        messages,
        cancel,
        ..
    } = request;
    let send = |kind: ChatEventKind| {
        // Receiver gone means the UI is shutting down; nothing to do.
        let _ = tx.send(ChatEvent { request: id, kind });
    };

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return StreamOutcome::Cancelled,
        result = client.send_messages_stream(&messages) => result,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            send(ChatEventKind::Failed {
                error: error.clone(),
            });
            return StreamOutcome::Failed(error);
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(request = id, "Stream aborted");
                return StreamOutcome::Cancelled;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(StreamEvent::TextDelta { text })) => send(ChatEventKind::Token { text }),
            Some(Ok(StreamEvent::Done { reason })) => {
                send(ChatEventKind::Finished { reason });
                return StreamOutcome::Completed;
            }
            Some(Err(error)) => {
                send(ChatEventKind::Failed {
                    error: error.clone(),
                });
                return StreamOutcome::Failed(error);
            }
            None => {
                send(ChatEventKind::Finished { reason: None });
                return StreamOutcome::Completed;
            }
        }
    }
}

/// Spawns `run_chat_stream` on the tokio runtime.
pub fn spawn_chat_stream(
    client: OllamaClient,
    request: ChatRequest,
    tx: ChatEventTx,
) -> JoinHandle<StreamOutcome> {
    tokio::spawn(async move { run_chat_stream(&client, request, &tx).await })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::core::events::create_event_channel;
    use crate::core::session::{ChatSession, TurnStatus};
    use crate::providers::{OllamaConfig, ProviderErrorKind};

    fn ndjson(tokens: &[&str]) -> String {
        let mut body = String::new();
        for token in tokens {
            body.push_str(
                &serde_json::json!({"message": {"role": "assistant", "content": token}, "done": false})
                    .to_string(),
            );
            body.push('\n');
        }
        body.push_str(r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#);
        body.push('\n');
        body
    }

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(OllamaConfig {
            base_url: server.uri(),
            model: "test-model".to_string(),
            num_ctx: 2048,
            request_timeout: None,
            connect_timeout: None,
        })
    }

    #[tokio::test]
    async fn test_end_to_end_tokens_reach_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&["Hi", " there"])))
            .mount(&server)
            .await;

        let mut session = ChatSession::new("");
        let request = session.submit("hello").unwrap();
        let turn = request.turn;
        let (tx, mut rx) = create_event_channel();

        let outcome = run_chat_stream(&client_for(&server), request, &tx).await;
        assert_eq!(outcome, StreamOutcome::Completed);
        drop(tx);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            session.apply(event);
            seen.push(session.turn(turn).unwrap().text.clone());
        }

        assert_eq!(seen, vec!["Hi", "Hi there", "Hi there"]);
        assert!(!session.is_streaming());
        assert_eq!(session.turn(turn).unwrap().status, TurnStatus::Complete);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
            .mount(&server)
            .await;

        let mut session = ChatSession::new("");
        let request = session.submit("hello").unwrap();
        let (tx, mut rx) = create_event_channel();

        let outcome = run_chat_stream(&client_for(&server), request, &tx).await;
        let StreamOutcome::Failed(error) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(error.kind, ProviderErrorKind::HttpStatus);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event.kind, ChatEventKind::Failed { .. }));
        session.apply(event);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_read() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(ndjson(&["never"]))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let mut session = ChatSession::new("");
        let request = session.submit("hello").unwrap();
        let turn = request.turn;
        let (tx, mut rx) = create_event_channel();
        let handle = spawn_chat_stream(client_for(&server), request, tx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.cancel());

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stream should stop promptly after cancel")
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert!(rx.recv().await.is_none());
        assert_eq!(session.turn(turn).unwrap().text, "");
        assert_eq!(session.turn(turn).unwrap().status, TurnStatus::Cancelled);
    }
}
