//! Chat backend implementations.

pub mod ollama;
pub mod shared;

pub use ollama::{OllamaClient, OllamaConfig};
pub use shared::{
    ChatMessage, ProviderError, ProviderErrorKind, ProviderResult, ProviderStream, Role,
    StreamEvent, USER_AGENT, classify_reqwest_error,
};
