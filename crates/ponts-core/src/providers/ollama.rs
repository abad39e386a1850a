//! Ollama `/api/chat` streaming client.
//!
//! The response body is newline-delimited JSON. Each line carries one
//! incremental token:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hi"},"done":false}
//! {"message":{"role":"assistant","content":" there"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}
//! ```
//!
//! Lines may be split across body chunks, so bytes are buffered until a
//! newline arrives. Lines that fail to parse are skipped with a warning.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::providers::{
    ChatMessage, ProviderError, ProviderErrorKind, ProviderResult, ProviderStream, StreamEvent,
    USER_AGENT, classify_reqwest_error,
};

const CHAT_PATH: &str = "/api/chat";

/// Longest malformed line echoed into the log.
const LOG_LINE_LIMIT: usize = 200;

/// Ollama client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub num_ctx: u32,
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl OllamaConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            num_ctx: config.num_ctx,
            request_timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Streaming chat client for an Ollama-compatible server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to default HTTP client");
            reqwest::Client::new()
        });
        Self { config, http }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url, CHAT_PATH)
    }

    /// Sends the conversation and returns a stream of incremental tokens.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent or the server answers
    /// with a non-success status.
    pub async fn send_messages_stream(
        &self,
        messages: &[ChatMessage],
    ) -> ProviderResult<ProviderStream> {
        let body = ChatRequestBody {
            model: &self.config.model,
            messages,
            stream: true,
            options: RequestOptions {
                num_ctx: self.config.num_ctx,
            },
        };

        let url = self.endpoint();
        tracing::debug!(%url, model = %self.config.model, messages = messages.len(), "Sending chat request");

        let response = self
            .http
            .post(&url)
            .headers(build_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body));
        }

        Ok(Box::pin(NdjsonChatParser::new(response.bytes_stream())))
    }
}

fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("application/x-ndjson"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Turns a byte stream of NDJSON chat chunks into `StreamEvent`s.
pub struct NdjsonChatParser<S> {
    inner: S,
    buf: BytesMut,
    pending: VecDeque<ProviderResult<StreamEvent>>,
    finished: bool,
}

impl<S> NdjsonChatParser<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn drain_lines(&mut self) {
        while !self.finished
            && let Some(pos) = self.buf.iter().position(|b| *b == b'\n')
        {
            let line = self.buf.split_to(pos + 1);
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            tracing::warn!(bytes = raw.len(), "Skipping stream line with invalid UTF-8");
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let chunk = match serde_json::from_str::<ChatChunk>(line) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    line = %truncate(line, LOG_LINE_LIMIT),
                    "Skipping malformed stream line"
                );
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.pending.push_back(Err(ProviderError::api_error(&error)));
            self.finished = true;
            return;
        }

        if let Some(message) = chunk.message
            && !message.content.is_empty()
        {
            self.pending.push_back(Ok(StreamEvent::TextDelta {
                text: message.content,
            }));
        }

        if chunk.done {
            self.pending.push_back(Ok(StreamEvent::Done {
                reason: chunk.done_reason,
            }));
            self.finished = true;
        }
    }
}

fn truncate(line: &str, limit: usize) -> &str {
    match line.char_indices().nth(limit) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

impl<S, E> Stream for NdjsonChatParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error,
{
    type Item = ProviderResult<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buf.extend_from_slice(&bytes);
                    self.drain_lines();
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::new(
                        ProviderErrorKind::Network,
                        format!("Stream error: {e}"),
                    ))));
                }
                Poll::Ready(None) => {
                    // Final line may lack a trailing newline.
                    let rest = self.buf.split();
                    self.handle_line(&rest);
                    self.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
