use crate::client::{http_client, send_error, status_error, ModelClient, ProviderOptions};
use askql_core::AskqlError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    options: ProviderOptions,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(options: ProviderOptions) -> reqwest::Result<Self> {
        let client = http_client(options.timeout)?;
        Ok(Self { options, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.options.endpoint.trim_end_matches('/'),
            self.options.model
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AskqlError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.options.api_key)
            .json(&json!({
                "contents": [{"role": "user", "parts": [{"text": prompt}]}],
                "generationConfig": {"temperature": self.options.temperature}
            }))
            .send()
            .await
            .map_err(|e| send_error("gemini", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| send_error("gemini", e))?;
        if !status.is_success() {
            return Err(status_error("gemini", status, &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| AskqlError::ProviderError(format!("malformed gemini response: {e}")))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AskqlError::ProviderError("empty response from gemini".into()));
        }
        debug!(raw = %text, "gemini response");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
