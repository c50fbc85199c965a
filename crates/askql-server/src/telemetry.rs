use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };
    let builder = FmtSubscriber::builder().with_env_filter(filter);
    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

pub async fn spawn_metrics_server(config: &MetricsConfig) -> anyhow::Result<()> {
    if !config.enabled {
        return Ok(());
    }
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("metrics listening on {}", config.listen_addr);
    tokio::spawn(async move {
        let app = axum::Router::new()
            .route(
                "/metrics",
                axum::routing::get(|| async move { metrics_handle.render() }),
            )
            .route("/health", axum::routing::get(|| async { "ok" }))
            .route("/ready", axum::routing::get(|| async { "ok" }));
        if let Err(err) = axum::serve(listener, app).await {
            error!("metrics server error: {err}");
        }
    });
    Ok(())
}
