use crate::error::{AskqlError, ErrorKind};
use serde::{Deserialize, Serialize};

/// One result row: column name to value, in the column order the driver returned.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub include_raw_data: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            include_raw_data: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub question: String,
    pub results: Vec<ResultRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables_used: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

/// Everything a successful pipeline run produces.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub sql: String,
    pub tables_used: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub raw_data: Option<String>,
}

impl QueryResponse {
    pub fn success(question: impl Into<String>, outcome: QueryOutcome) -> Self {
        Self {
            success: true,
            question: question.into(),
            results: outcome.rows,
            error: None,
            error_kind: None,
            sql_query: Some(outcome.sql),
            tables_used: Some(outcome.tables_used),
            raw_data: outcome.raw_data,
        }
    }

    /// Failed responses never carry rows.
    pub fn failure(question: impl Into<String>, err: &AskqlError) -> Self {
        Self {
            success: false,
            question: question.into(),
            results: Vec::new(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind().as_str().to_string()),
            sql_query: None,
            tables_used: None,
            raw_data: None,
        }
    }

    pub fn from_result(question: impl Into<String>, result: Result<QueryOutcome, AskqlError>) -> Self {
        match result {
            Ok(outcome) => Self::success(question, outcome),
            Err(err) => Self::failure(question, &err),
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.error_kind.as_deref()
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind.as_str())
    }
}
