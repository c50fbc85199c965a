use askql_core::shape::render_text_table;
use askql_core::{AskqlError, QueryOutcome, QueryRequest, ResultShaper};
use askql_llm::{ModelClient, PromptBuilder};
use askql_sql::{prepare_sql, QueryExecutor, SchemaProvider};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Upper bound on the model call, independent of the client's own timeout.
    pub model_timeout: Duration,
    pub raw_data_rows: usize,
}

/// question -> prompt -> model -> validated SQL -> rows.
pub struct QueryPipeline {
    prompt: PromptBuilder,
    schema: Arc<dyn SchemaProvider>,
    model: Arc<dyn ModelClient>,
    executor: Arc<dyn QueryExecutor>,
    shaper: ResultShaper,
    options: PipelineOptions,
}

impl QueryPipeline {
    pub fn new(
        prompt: PromptBuilder,
        schema: Arc<dyn SchemaProvider>,
        model: Arc<dyn ModelClient>,
        executor: Arc<dyn QueryExecutor>,
        shaper: ResultShaper,
        options: PipelineOptions,
    ) -> Self {
        Self {
            prompt,
            schema,
            model,
            executor,
            shaper,
            options,
        }
    }

    pub fn schema_provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.schema
    }

    fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.options.default_limit)
            .clamp(1, self.options.max_limit)
    }

    pub async fn run(&self, request: &QueryRequest) -> Result<QueryOutcome, AskqlError> {
        let question = self.prompt.check_question(&request.question)?;
        let limit = self.effective_limit(request.limit);
        let schema = self.schema.schema().await?;
        let prompt = self.prompt.build(question, &schema.render(), limit)?;

        let raw = tokio::time::timeout(self.options.model_timeout, self.model.complete(&prompt))
            .await
            .map_err(|_| {
                AskqlError::ProviderUnavailable(format!(
                    "{} did not answer within {}ms",
                    self.model.name(),
                    self.options.model_timeout.as_millis()
                ))
            })??;

        let validated = prepare_sql(&raw)?;
        debug!(sql = validated.sql(), "generated sql");

        let rows = self.executor.execute(&validated).await?;
        let raw_data = if request.include_raw_data && !rows.is_empty() {
            Some(render_text_table(&rows, self.options.raw_data_rows))
        } else {
            None
        };
        Ok(QueryOutcome {
            sql: validated.sql().to_string(),
            tables_used: validated.tables_used().to_vec(),
            rows: self.shaper.shape(rows),
            raw_data,
        })
    }

    /// [`QueryPipeline::run`] with metrics and logging around it.
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryOutcome, AskqlError> {
        counter!("askql_query_total").increment(1);
        let started = Instant::now();
        let result = self.run(request).await;
        histogram!("askql_query_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                counter!("askql_query_success_total").increment(1);
                info!(rows = outcome.rows.len(), "answered question");
            }
            Err(err) => {
                let kind = err.kind();
                counter!("askql_query_error_total", "kind" => kind.as_str()).increment(1);
                if kind.is_client_error() {
                    warn!(kind = kind.as_str(), "rejected question: {err}");
                } else {
                    error!(kind = kind.as_str(), "question failed: {err}");
                }
            }
        }
        result
    }
}
