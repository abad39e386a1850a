//! Exec command handler.

use anyhow::{Context, Result};
use ponts_core::config::Config;

use crate::modes;

pub async fn run(
    prompt: &str,
    config: &Config,
    system_prompt: String,
    show_reasoning: bool,
) -> Result<()> {
    let options = modes::exec::ExecOptions { show_reasoning };
    modes::exec::run_exec(prompt, config, system_prompt, &options)
        .await
        .context("execute prompt")?;
    Ok(())
}
