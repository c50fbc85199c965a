use crate::validator::ValidatedSql;
use askql_core::{AskqlError, ResultRow};
use async_trait::async_trait;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Alias for the subquery that wraps every validated statement.
const RESULT_ALIAS: &str = "askql_result";

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &ValidatedSql) -> Result<Vec<ResultRow>, AskqlError>;
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub query_timeout: Duration,
    pub max_rows: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(15),
            max_rows: 1000,
        }
    }
}

/// Connections are opened on first use, so startup does not need the database.
pub fn connect_pool(
    options: PgConnectOptions,
    max_connections: u32,
    acquire_timeout: Duration,
) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy_with(options)
}

/// Runs validated statements against PostgreSQL inside read-only transactions.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
    options: ExecutorOptions,
}

impl PgExecutor {
    pub fn new(pool: PgPool, options: ExecutorOptions) -> Self {
        Self { pool, options }
    }

    async fn run(&self, sql: &ValidatedSql) -> Result<Vec<ResultRow>, AskqlError> {
        let mut tx = self.pool.begin().await.map_err(|e| self.map_error(e))?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;
        let set_timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.options.query_timeout.as_millis()
        );
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;

        let wrapped = wrap_query(sql.sql(), self.options.max_rows);
        let encoded: Vec<String> = sqlx::query_scalar(&wrapped)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;
        if let Err(err) = tx.rollback().await {
            warn!("rollback after read failed: {err}");
        }

        decode_rows(&encoded)
    }

    fn map_error(&self, err: sqlx::Error) -> AskqlError {
        let code = err
            .as_database_error()
            .and_then(|db| db.code().map(|c| c.into_owned()));
        if code.as_deref() == Some(QUERY_CANCELED) {
            return AskqlError::QueryTimeout(self.options.query_timeout);
        }
        match err {
            sqlx::Error::Database(db) => AskqlError::QueryExecution(db.message().to_string()),
            other => AskqlError::QueryExecution(other.to_string()),
        }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(&self, sql: &ValidatedSql) -> Result<Vec<ResultRow>, AskqlError> {
        debug!(sql = sql.sql(), "executing");
        // the server-side statement_timeout fires first; this bounds pool waits and network stalls
        let deadline = self.options.query_timeout + Duration::from_secs(1);
        match tokio::time::timeout(deadline, self.run(sql)).await {
            Ok(result) => result,
            Err(_) => Err(AskqlError::QueryTimeout(self.options.query_timeout)),
        }
    }
}

/// Wraps a validated query so each row comes back as one JSON object with
/// the driver's column order intact, capped at `max_rows`.
pub fn wrap_query(sql: &str, max_rows: usize) -> String {
    format!(
        "SELECT row_to_json({RESULT_ALIAS})::text FROM ({sql}) AS {RESULT_ALIAS} LIMIT {max_rows}"
    )
}

/// Decodes `row_to_json` output into rows.
///
/// `row_to_json` keeps every column, so `SELECT a.id, b.id` yields an object
/// with two `id` keys. A row is keyed by column name: the first position is
/// kept and the last value wins. This is logged once per result set.
pub fn decode_rows(encoded: &[String]) -> Result<Vec<ResultRow>, AskqlError> {
    let mut collapsed = false;
    let rows = encoded
        .iter()
        .map(|text| {
            let RowEntries(entries) = serde_json::from_str(text)
                .map_err(|e| AskqlError::QueryExecution(format!("malformed result row: {e}")))?;
            let columns = entries.len();
            let row: ResultRow = entries.into_iter().collect();
            collapsed |= row.len() < columns;
            Ok(row)
        })
        .collect::<Result<Vec<_>, AskqlError>>()?;
    if collapsed {
        warn!("result has duplicate column names; alias them to keep every value");
    }
    Ok(rows)
}

/// Object entries in document order, duplicates included.
struct RowEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RowEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RowEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RowEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(RowEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
