//! Runtime execution modes.
//!
//! - `exec`: single prompt streamed to stdout/stderr
//! - interactive: full-screen UI from `ponts-tui` (feature `tui`)

pub mod exec;

#[cfg(feature = "tui")]
pub use ponts_tui::run_interactive_chat;

#[cfg(not(feature = "tui"))]
pub async fn run_interactive_chat(
    _config: &ponts_core::config::Config,
    _system_prompt: String,
) -> anyhow::Result<()> {
    anyhow::bail!("TUI support is disabled in this build (feature \"tui\").");
}
