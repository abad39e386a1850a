//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use ponts_core::core::interrupt;
use ponts_core::{config, logging, prompts};

mod commands;

#[derive(Parser)]
#[command(name = "ponts")]
#[command(version)]
#[command(about = "Chat with a local Ollama reasoning model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the system prompt from config (empty string sends none)
    #[arg(long, global = true)]
    system_prompt: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Send one prompt and stream the answer to stdout
    Exec {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Stream the model's reasoning to stderr
        #[arg(long)]
        show_reasoning: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        system_prompt,
    } = cli;

    match command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Some(Commands::Exec {
            prompt,
            model,
            show_reasoning,
        }) => {
            logging::init_stderr();
            let config = load_config(model.as_deref())?;
            let system_prompt = resolve_system_prompt(&config, system_prompt.as_deref()).await;
            commands::exec::run(&prompt, &config, system_prompt, show_reasoning).await
        }
        None => {
            let config = load_config(None)?;
            commands::chat::run(&config, system_prompt.as_deref()).await
        }
    }
}

fn load_config(model_override: Option<&str>) -> Result<config::Config> {
    let mut config = config::Config::load()
        .context("load config")?
        .with_env_overrides()
        .context("apply environment overrides")?;
    if let Some(model) = model_override {
        config.model = model.to_string();
    }
    tracing::debug!(base_url = %config.base_url, model = %config.model, "Loaded config");
    Ok(config)
}

/// The `--system-prompt` flag wins over every configured source.
pub(crate) async fn resolve_system_prompt(
    config: &config::Config,
    flag: Option<&str>,
) -> String {
    match flag {
        Some(text) => text.to_string(),
        None => prompts::load_system_prompt(config).await,
    }
}
