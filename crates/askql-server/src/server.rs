use crate::config::{Config, LlmProvider};
use crate::pipeline::{PipelineOptions, QueryPipeline};
use crate::telemetry::spawn_metrics_server;
use askql_core::{AskqlError, ErrorKind, QueryRequest, QueryResponse, ResultShaper, SchemaContext};
use askql_llm::{GeminiClient, ModelClient, OpenAiClient, PromptBuilder};
use askql_sql::executor::connect_pool;
use askql_sql::{CatalogOptions, ExecutorOptions, PgCatalog, PgExecutor, QueryExecutor, SchemaProvider, StaticSchema};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    spawn_metrics_server(&config.metrics).await?;

    let state = build_state(&config)?;
    let app = router(state, cors_layer(&config.server.cors_origins)?);

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    info!("askql listening on {}", config.server.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("askql stopped");
    Ok(())
}

/// Wires the pool, schema source, model client and executor from configuration.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let pool = connect_pool(
        config.database.connect_options()?,
        config.database.max_connections,
        Duration::from_secs(config.database.acquire_timeout_secs),
    );

    let executor: Arc<dyn QueryExecutor> = Arc::new(PgExecutor::new(
        pool.clone(),
        ExecutorOptions {
            query_timeout: Duration::from_secs(config.database.query_timeout_secs),
            max_rows: config.database.max_rows,
        },
    ));

    let schema: Arc<dyn SchemaProvider> = if config.schema.discover {
        Arc::new(PgCatalog::new(
            pool,
            CatalogOptions {
                schema_name: config.schema.schema_name.clone(),
                sample_values: config.schema.sample_values,
                sample_columns: config.schema.sample_columns,
                exclude_columns: config.schema.exclude_columns.clone(),
                annotations: config.schema_tables(),
            },
        ))
    } else {
        Arc::new(StaticSchema::new(SchemaContext::new(config.schema_tables())))
    };

    let model = build_model_client(config)?;
    info!(provider = model.name(), "model client ready");

    let prompt = PromptBuilder::new(config.query.max_question_chars)
        .with_dialect(config.prompt.dialect.clone())
        .with_hints(config.prompt.hints.clone())
        .with_examples(config.prompt_examples());
    let shaper = ResultShaper::new(
        &config.query.hidden_columns,
        config.query.humanize_columns,
        config.query.drop_empty_values,
    );
    let options = PipelineOptions {
        default_limit: config.query.default_limit,
        max_limit: config.query.max_limit,
        model_timeout: Duration::from_secs(config.llm.timeout_secs + 1),
        raw_data_rows: config.query.raw_data_rows,
    };

    Ok(AppState {
        pipeline: Arc::new(QueryPipeline::new(prompt, schema, model, executor, shaper, options)),
    })
}

fn build_model_client(config: &Config) -> anyhow::Result<Arc<dyn ModelClient>> {
    let options = config.provider_options();
    let client: Arc<dyn ModelClient> = match config.llm.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(options)?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(options)?),
    };
    Ok(client)
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/tables", get(tables))
        .route("/query", post(query))
        .route("/reset-cache", post(reset_cache))
        .layer(cors)
        .with_state(state)
}

/// `"*"` allows any origin without credentials; otherwise an explicit list with credentials.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    if origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest | ErrorKind::EmptyQuestion => StatusCode::BAD_REQUEST,
        ErrorKind::InputTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::UnsafeOrUnparseableSql => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ProviderError | ErrorKind::QueryExecutionError => StatusCode::BAD_GATEWAY,
        ErrorKind::ProviderUnavailable
        | ErrorKind::ProviderQuotaExceeded
        | ErrorKind::SchemaUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::QueryTimeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> (StatusCode, Json<QueryResponse>) {
    let span = info_span!("query", request_id = %Uuid::new_v4());
    async move {
        let request = match payload {
            Ok(Json(request)) => request,
            Err(rejection) => {
                let err = AskqlError::InvalidRequest(rejection.body_text());
                warn!("{err}");
                return (StatusCode::BAD_REQUEST, Json(QueryResponse::failure("", &err)));
            }
        };
        info!(question = %request.question, "received question");
        let result = state.pipeline.answer(&request).await;
        let status = match &result {
            Ok(_) => StatusCode::OK,
            Err(err) => status_for(err.kind()),
        };
        (status, Json(QueryResponse::from_result(request.question, result)))
    }
    .instrument(span)
    .await
}

async fn root(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pipeline.schema_provider().schema().await {
        Ok(schema) => (
            StatusCode::OK,
            Json(json!({
                "message": "askql is running",
                "status": "healthy",
                "available_tables": schema.table_names(),
                "total_tables": schema.tables.len(),
                "total_records": schema.total_records(),
            })),
        ),
        Err(err) => (
            status_for(err.kind()),
            Json(json!({
                "status": "unhealthy",
                "error": err.to_string(),
                "error_kind": err.kind(),
            })),
        ),
    }
}

async fn tables(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pipeline.schema_provider().schema().await {
        Ok(schema) => {
            let mut tables = Map::new();
            for table in &schema.tables {
                tables.insert(
                    table.name.clone(),
                    json!({
                        "description": table.description,
                        "record_count": table.record_count,
                        "columns": table.columns,
                    }),
                );
            }
            (StatusCode::OK, Json(json!({ "tables": tables })))
        }
        Err(err) => (
            status_for(err.kind()),
            Json(json!({ "error": err.to_string(), "error_kind": err.kind() })),
        ),
    }
}

async fn reset_cache(State(state): State<AppState>) -> Json<Value> {
    state.pipeline.schema_provider().reset().await;
    Json(json!({ "message": "schema cache cleared" }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
