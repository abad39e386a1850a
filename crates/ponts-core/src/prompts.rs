//! System prompt loading.
//!
//! The system prompt is resolved once at startup. Sources, first match wins:
//! inline `system_prompt`, `system_prompt_file`, `system_prompt_url`, then the
//! built-in prompt. A source that fails to load degrades to an empty prompt.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::providers::USER_AGENT;

/// Built-in system prompt used when nothing is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/system_prompt.txt"
));

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the system prompt comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Inline(String),
    File(PathBuf),
    Url(String),
    BuiltIn,
}

impl PromptSource {
    /// Picks the source from config.
    pub fn from_config(config: &Config) -> Self {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // Inline text is sent exactly as written; only blankness is checked.
        if let Some(text) = config
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            PromptSource::Inline(text.to_string())
        } else if let Some(path) = non_empty(&config.system_prompt_file) {
            PromptSource::File(PathBuf::from(path))
        } else if let Some(url) = non_empty(&config.system_prompt_url) {
            PromptSource::Url(url)
        } else {
            PromptSource::BuiltIn
        }
    }
}

/// Loads the system prompt text. Never fails: errors are logged and the
/// prompt becomes empty.
pub async fn load_system_prompt(config: &Config) -> String {
    let source = PromptSource::from_config(config);
    match load_from(&source).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), ?source, "Failed to load system prompt; using empty prompt");
            String::new()
        }
    }
}

async fn load_from(source: &PromptSource) -> Result<String> {
    Ok(match source {
        PromptSource::Inline(text) => text.clone(),
        PromptSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read system prompt file {}", path.display()))?,
        PromptSource::Url(url) => fetch_text(url).await?,
        PromptSource::BuiltIn => DEFAULT_SYSTEM_PROMPT.to_string(),
    })
}

async fn fetch_text(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("build HTTP client")?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch system prompt from {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch system prompt from {url}"))?;
    response.text().await.context("read system prompt body")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_source_precedence() {
        let mut config = Config {
            system_prompt: Some("inline".to_string()),
            system_prompt_file: Some("/tmp/p.txt".to_string()),
            system_prompt_url: Some("http://x/p.txt".to_string()),
            ..Config::default()
        };
        assert_eq!(
            PromptSource::from_config(&config),
            PromptSource::Inline("inline".to_string())
        );

        config.system_prompt = Some("   ".to_string());
        assert_eq!(
            PromptSource::from_config(&config),
            PromptSource::File(PathBuf::from("/tmp/p.txt"))
        );

        config.system_prompt_file = None;
        assert_eq!(
            PromptSource::from_config(&config),
            PromptSource::Url("http://x/p.txt".to_string())
        );

        config.system_prompt_url = None;
        assert_eq!(PromptSource::from_config(&config), PromptSource::BuiltIn);
    }

    #[tokio::test]
    async fn test_builtin_prompt_is_not_empty() {
        let text = load_system_prompt(&Config::default()).await;
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_file_prompt_is_sent_verbatim() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("prompt.txt");
        std::fs::write(&file, "\n  Be terse.  \n").unwrap();
        let config = Config {
            system_prompt_file: Some(file.to_string_lossy().to_string()),
            ..Config::default()
        };
        assert_eq!(load_system_prompt(&config).await, "\n  Be terse.  \n");
    }

    #[tokio::test]
    async fn test_inline_prompt_keeps_whitespace() {
        let config = Config {
            system_prompt: Some("  Be terse.\n".to_string()),
            ..Config::default()
        };
        assert_eq!(load_system_prompt(&config).await, "  Be terse.\n");
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_empty() {
        let config = Config {
            system_prompt_file: Some("/definitely/not/here.txt".to_string()),
            ..Config::default()
        };
        assert_eq!(load_system_prompt(&config).await, "");
    }

    #[tokio::test]
    async fn test_url_prompt_is_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/system_prompt.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Réponds en français."))
            .mount(&server)
            .await;

        let config = Config {
            system_prompt_url: Some(format!("{}/system_prompt.txt", server.uri())),
            ..Config::default()
        };
        assert_eq!(load_system_prompt(&config).await, "Réponds en français.");
    }

    #[tokio::test]
    async fn test_url_failure_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = Config {
            system_prompt_url: Some(format!("{}/system_prompt.txt", server.uri())),
            ..Config::default()
        };
        assert_eq!(load_system_prompt(&config).await, "");
    }
}
