use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AskqlError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error("question is {len} characters long, the limit is {limit}")]
    InputTooLarge { len: usize, limit: usize },
    #[error("model provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("model provider error: {0}")]
    ProviderError(String),
    #[error("model provider quota exceeded: {0}")]
    ProviderQuotaExceeded(String),
    #[error("statement not permitted ({reason}): {statement}")]
    UnsafeOrUnparseableSql { statement: String, reason: String },
    #[error("query execution error: {0}")]
    QueryExecution(String),
    #[error("query timed out after {}ms", .0.as_millis())]
    QueryTimeout(Duration),
    #[error("schema context unavailable: {0}")]
    SchemaUnavailable(String),
}

/// Stable, serializable category of an [`AskqlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    EmptyQuestion,
    InputTooLarge,
    ProviderUnavailable,
    ProviderError,
    ProviderQuotaExceeded,
    UnsafeOrUnparseableSql,
    QueryExecutionError,
    QueryTimeout,
    SchemaUnavailable,
}

impl AskqlError {
    pub fn unsafe_sql(statement: impl Into<String>, reason: impl Into<String>) -> Self {
        AskqlError::UnsafeOrUnparseableSql {
            statement: statement.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AskqlError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AskqlError::EmptyQuestion => ErrorKind::EmptyQuestion,
            AskqlError::InputTooLarge { .. } => ErrorKind::InputTooLarge,
            AskqlError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            AskqlError::ProviderError(_) => ErrorKind::ProviderError,
            AskqlError::ProviderQuotaExceeded(_) => ErrorKind::ProviderQuotaExceeded,
            AskqlError::UnsafeOrUnparseableSql { .. } => ErrorKind::UnsafeOrUnparseableSql,
            AskqlError::QueryExecution(_) => ErrorKind::QueryExecutionError,
            AskqlError::QueryTimeout(_) => ErrorKind::QueryTimeout,
            AskqlError::SchemaUnavailable(_) => ErrorKind::SchemaUnavailable,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::EmptyQuestion => "empty_question",
            ErrorKind::InputTooLarge => "input_too_large",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::ProviderQuotaExceeded => "provider_quota_exceeded",
            ErrorKind::UnsafeOrUnparseableSql => "unsafe_or_unparseable_sql",
            ErrorKind::QueryExecutionError => "query_execution_error",
            ErrorKind::QueryTimeout => "query_timeout",
            ErrorKind::SchemaUnavailable => "schema_unavailable",
        }
    }

    /// Failures caused by the request itself rather than a downstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidRequest
                | ErrorKind::EmptyQuestion
                | ErrorKind::InputTooLarge
                | ErrorKind::UnsafeOrUnparseableSql
        )
    }
}
