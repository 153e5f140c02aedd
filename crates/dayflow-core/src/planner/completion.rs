//! Text-completion bridge: OpenAI-compatible chat completions over HTTPS.
//!
//! The bridge only ever receives the anonymized request payload; task titles and
//! reflection text stay in the local vault.
//!
//! API key: `dayflow.toml` > `DAYFLOW_LLM_API_KEY` > `DEEPSEEK_API_KEY` > `OPENAI_API_KEY`.
//! Default endpoint `https://api.deepseek.com/v1`, model `deepseek-chat`.

use crate::config::{DayflowConfig, UserConfig};
use crate::error::CompletionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;

/// External text-completion collaborator.
#[async_trait::async_trait]
pub trait TextCompletion: Send + Sync {
    /// True when a credential is configured and the client is not forced offline.
    fn is_available(&self) -> bool;

    /// Single completion for a system + user message pair.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// reqwest-based chat completion client.
pub struct ChatCompletionClient {
    api_key: Option<String>,
    api_base: String,
    model: String,
    offline: bool,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    /// Client with an explicit key (empty or whitespace counts as absent).
    /// No request timeout: a hung call only ends when the connection does.
    pub fn new(api_key: Option<String>) -> Self {
        Self::build(api_key, None)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        Self::build(api_key, Some(timeout))
    }

    fn build(api_key: Option<String>, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            offline: false,
            timeout,
            client,
        }
    }

    /// Client configured from env toggles and `dayflow.toml`.
    pub fn from_config(config: &DayflowConfig, user: &UserConfig) -> Self {
        let mut client = Self::build(user.get_api_key(), config.llm_timeout)
            .with_offline(config.offline);
        if let Some(base) = user.get_llm_api_url().or_else(|| config.llm_api_url.clone()) {
            client = client.with_api_base(&base);
        }
        if let Some(model) = user.get_llm_model().or_else(|| config.llm_model.clone()) {
            client = client.with_model(&model);
        }
        client
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.trim().to_string();
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim().trim_end_matches('/').to_string();
        self
    }

    /// Forces the offline path regardless of credentials.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait::async_trait]
impl TextCompletion for ChatCompletionClient {
    fn is_available(&self) -> bool {
        !self.offline && self.api_key.is_some()
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let api_key = match (&self.api_key, self.offline) {
            (Some(k), false) => k,
            _ => return Err(CompletionError::Unavailable),
        };

        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let parsed: ChatResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_means_unavailable() {
        assert!(!ChatCompletionClient::new(Some("   ".to_string())).is_available());
        assert!(!ChatCompletionClient::new(None).is_available());
        assert!(ChatCompletionClient::new(Some("sk-test".to_string())).is_available());
    }

    #[test]
    fn offline_overrides_key() {
        let client = ChatCompletionClient::new(Some("sk-test".to_string())).with_offline(true);
        assert!(!client.is_available());
    }

    #[tokio::test]
    async fn unavailable_client_does_not_send() {
        let client = ChatCompletionClient::new(None);
        assert!(matches!(
            client.complete("system", "user").await,
            Err(CompletionError::Unavailable)
        ));
    }

    #[test]
    fn timeout_only_when_configured() {
        let user = UserConfig::default();
        let mut config = DayflowConfig::default();
        assert_eq!(ChatCompletionClient::from_config(&config, &user).timeout(), None);
        assert_eq!(ChatCompletionClient::new(None).timeout(), None);

        config.llm_timeout = Some(Duration::from_secs(30));
        assert_eq!(
            ChatCompletionClient::from_config(&config, &user).timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let client = ChatCompletionClient::new(None)
            .with_api_base("https://example.invalid/v1/")
            .with_model("local-model");
        assert_eq!(client.api_base, "https://example.invalid/v1");
        assert_eq!(client.model(), "local-model");
    }
}
