//! Side effects requested by the reducer and executed by the runtime.

use ponts_core::core::session::ChatRequest;

#[derive(Debug)]
pub enum UiEffect {
    /// Spawn the stream driver for a freshly submitted request.
    StartStream { request: ChatRequest },
    Quit,
}
