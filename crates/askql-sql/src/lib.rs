pub mod catalog;
pub mod executor;
pub mod extract;
pub mod parser;
pub mod validator;

pub use catalog::{CatalogOptions, PgCatalog, SchemaProvider, StaticSchema};
pub use executor::{ExecutorOptions, PgExecutor, QueryExecutor};
pub use extract::extract_sql;
pub use parser::parse_sql;
pub use validator::{validate_read_only, ValidatedSql};

use askql_core::AskqlError;

/// Extracts the statement from raw model output and validates it as read-only.
pub fn prepare_sql(raw_model_output: &str) -> Result<ValidatedSql, AskqlError> {
    let candidate = extract_sql(raw_model_output)?;
    validate_read_only(&candidate)
}
