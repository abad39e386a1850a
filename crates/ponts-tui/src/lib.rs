//! Full-screen chat UI for Ponts.

pub mod effects;
pub mod events;
pub mod input;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};

use anyhow::Result;
use ponts_core::config::Config;
use ponts_core::providers::{OllamaClient, OllamaConfig};
pub use runtime::TuiRuntime;

/// Runs the interactive chat until the user quits.
pub async fn run_interactive_chat(config: &Config, system_prompt: String) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "Chat mode requires a terminal.\n\
             Use `ponts exec --prompt '...'` for non-interactive use."
        );
    }

    let client = OllamaClient::new(OllamaConfig::from_config(config));
    tracing::info!(model = client.model(), endpoint = %client.endpoint(), "Starting interactive chat");

    // The event loop blocks on terminal polling; keep it off the async workers.
    tokio::task::block_in_place(|| {
        let mut runtime = TuiRuntime::new(client, system_prompt)?;
        runtime.run()
    })
}
