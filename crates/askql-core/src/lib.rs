pub mod error;
pub mod schema;
pub mod shape;
pub mod types;

pub use error::{AskqlError, ErrorKind};
pub use schema::{Column, SchemaContext, TableSchema};
pub use shape::ResultShaper;
pub use types::{QueryOutcome, QueryRequest, QueryResponse, ResultRow};

#[cfg(test)]
mod tests;
