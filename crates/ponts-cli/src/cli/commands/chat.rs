//! Chat command handler.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result};
use ponts_core::config::{self, Config};
use ponts_core::logging;

use super::exec;
use crate::cli::resolve_system_prompt;
use crate::modes;

pub async fn run(config: &Config, system_prompt_flag: Option<&str>) -> Result<()> {
    // Piped stdin runs a single exec turn instead.
    if !std::io::stdin().is_terminal() {
        logging::init_stderr();
        let mut prompt = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut prompt)
            .context("read prompt from stdin")?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("No input provided via pipe");
        }
        let system_prompt = resolve_system_prompt(config, system_prompt_flag).await;
        return exec::run(prompt, config, system_prompt, false).await;
    }

    // The alternate screen owns the terminal, so logs go to a file.
    let _log_guard = logging::init_file(&config::paths::logs_dir());
    let system_prompt = resolve_system_prompt(config, system_prompt_flag).await;

    modes::run_interactive_chat(config, system_prompt)
        .await
        .context("interactive chat failed")
}
