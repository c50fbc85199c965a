use crate::client::{http_client, send_error, status_error, ModelClient, ProviderOptions};
use askql_core::AskqlError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client for any OpenAI-compatible `chat/completions` API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    options: ProviderOptions,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(options: ProviderOptions) -> reqwest::Result<Self> {
        let client = http_client(options.timeout)?;
        Ok(Self { options, client })
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AskqlError> {
        let url = format!(
            "{}/chat/completions",
            self.options.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.options.api_key)
            .json(&json!({
                "model": self.options.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": self.options.temperature
            }))
            .send()
            .await
            .map_err(|e| send_error("openai", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| send_error("openai", e))?;
        if !status.is_success() {
            return Err(status_error("openai", status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AskqlError::ProviderError(format!("malformed openai response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AskqlError::ProviderError("empty response from openai".into()));
        }
        debug!(raw = %text, "openai response");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
