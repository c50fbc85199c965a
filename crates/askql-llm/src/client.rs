use askql_core::AskqlError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// The model as an opaque function from prompt to text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AskqlError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub api_key: String,
    pub model: String,
    /// Base URL of the provider API.
    pub endpoint: String,
    pub timeout: Duration,
    pub temperature: f32,
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> AskqlError {
    if err.is_timeout() {
        AskqlError::ProviderUnavailable(format!("{provider} request timed out"))
    } else if err.is_connect() {
        AskqlError::ProviderUnavailable(format!("{provider} unreachable: {err}"))
    } else {
        AskqlError::ProviderUnavailable(format!("{provider} request failed: {err}"))
    }
}

pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> AskqlError {
    let detail = truncate(body.trim(), 300);
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        AskqlError::ProviderQuotaExceeded(format!("{provider} {status}: {detail}"))
    } else if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
        AskqlError::ProviderUnavailable(format!("{provider} {status}: {detail}"))
    } else {
        AskqlError::ProviderError(format!("{provider} {status}: {detail}"))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
