use crate::parser::quote_ident;
use askql_core::{AskqlError, Column, SchemaContext, TableSchema};
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Source of the schema context used to ground SQL generation.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn schema(&self) -> Result<SchemaContext, AskqlError>;

    /// Drops any cached schema so the next call rebuilds it.
    async fn reset(&self) {}
}

/// Schema defined entirely in configuration.
#[derive(Debug, Clone)]
pub struct StaticSchema {
    context: SchemaContext,
}

impl StaticSchema {
    pub fn new(context: SchemaContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn schema(&self) -> Result<SchemaContext, AskqlError> {
        Ok(self.context.clone())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub schema_name: String,
    /// Distinct non-null values sampled per column; zero disables sampling.
    pub sample_values: usize,
    /// Only the first this-many columns of a table are sampled.
    pub sample_columns: usize,
    pub exclude_columns: Vec<String>,
    /// Descriptions merged into discovered tables by name.
    pub annotations: Vec<TableSchema>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema_name: "public".into(),
            sample_values: 2,
            sample_columns: 10,
            exclude_columns: vec!["created_at".into(), "updated_at".into()],
            annotations: Vec::new(),
        }
    }
}

/// Discovers tables from `information_schema`, cached until [`SchemaProvider::reset`].
#[derive(Debug)]
pub struct PgCatalog {
    pool: PgPool,
    options: CatalogOptions,
    cache: RwLock<Option<SchemaContext>>,
}

impl PgCatalog {
    pub fn new(pool: PgPool, options: CatalogOptions) -> Self {
        Self {
            pool,
            options,
            cache: RwLock::new(None),
        }
    }

    async fn discover(&self) -> Result<SchemaContext, sqlx::Error> {
        info!(schema = %self.options.schema_name, "discovering database tables");
        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             AND table_name NOT LIKE 'pg_%' ORDER BY table_name",
        )
        .bind(&self.options.schema_name)
        .fetch_all(&self.pool)
        .await?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            tables.push(self.describe_table(&name).await?);
        }
        info!("discovered {} tables", tables.len());
        Ok(SchemaContext::new(tables))
    }

    async fn describe_table(&self, name: &str) -> Result<TableSchema, sqlx::Error> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text, is_nullable::text \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
        )
        .bind(&self.options.schema_name)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let qualified = format!(
            "{}.{}",
            quote_ident(&self.options.schema_name),
            quote_ident(name)
        );
        let record_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {qualified}"))
            .fetch_one(&self.pool)
            .await?;

        let annotation = self.options.annotations.iter().find(|t| t.name == name);
        let mut columns = Vec::with_capacity(rows.len());
        for (idx, (column_name, data_type, is_nullable)) in rows.into_iter().enumerate() {
            if self.options.exclude_columns.contains(&column_name) {
                continue;
            }
            let samples = if idx < self.options.sample_columns {
                self.sample_column(&qualified, &column_name).await
            } else {
                Vec::new()
            };
            let description = annotation
                .and_then(|t| t.column(&column_name))
                .and_then(|c| c.description.clone());
            columns.push(Column {
                name: column_name,
                data_type,
                nullable: is_nullable == "YES",
                description,
                samples,
            });
        }

        Ok(TableSchema {
            name: name.to_string(),
            description: annotation.and_then(|t| t.description.clone()),
            record_count: Some(record_count),
            columns,
        })
    }

    async fn sample_column(&self, qualified_table: &str, column: &str) -> Vec<String> {
        if self.options.sample_values == 0 {
            return Vec::new();
        }
        let col = quote_ident(column);
        let sql = format!(
            "SELECT DISTINCT {col}::text FROM {qualified_table} \
             WHERE {col} IS NOT NULL AND {col}::text <> '' LIMIT {}",
            self.options.sample_values
        );
        match sqlx::query_scalar::<_, String>(&sql).fetch_all(&self.pool).await {
            Ok(samples) => samples,
            Err(err) => {
                warn!("failed to sample {qualified_table}.{column}: {err}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SchemaProvider for PgCatalog {
    async fn schema(&self) -> Result<SchemaContext, AskqlError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            return Ok(cached.clone());
        }
        let context = self
            .discover()
            .await
            .map_err(|e| AskqlError::SchemaUnavailable(e.to_string()))?;
        if context.is_empty() {
            return Err(AskqlError::SchemaUnavailable(format!(
                "no tables found in schema {}",
                self.options.schema_name
            )));
        }
        *cache = Some(context.clone());
        Ok(context)
    }

    async fn reset(&self) {
        self.cache.write().await.take();
        info!("schema cache cleared");
    }
}
