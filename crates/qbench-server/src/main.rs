//! qbench server binary entry point.

use std::sync::Arc;

use anyhow::Context;
use qbench_sched::{InMemoryBroker, MemoryStore, QueueConnector, SqliteStore, StateStore};
use qbench_server::{AppState, Config, TracingConfig, create_router, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file = std::env::var("QBENCH_CONFIG").ok();
    let config = Config::load(config_file.as_deref()).context("Failed to load configuration")?;

    init_tracing(&TracingConfig::from(&config.logging))?;
    tracing::debug!(?config, "configuration loaded");

    let store = open_store(&config)?;
    let connector = build_connector(&config)?;

    let state = Arc::new(AppState::with_policy(
        store,
        connector,
        config.broker.queue_settings(),
        config.broker.unknown_status,
    ));

    // Result consumer runs for the lifetime of the process
    state.start_consumer();

    let bind_addr = config.bind_address()?;
    tracing::info!("Starting qbench server at http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let store = SqliteStore::new(&config.storage.path).with_context(|| {
                format!("Failed to open SQLite store at {}", config.storage.path)
            })?;
            tracing::info!(path = %config.storage.path, "Initialized SQLite run store");
            Ok(Arc::new(store))
        }
        _ => {
            tracing::info!("Initialized in-memory run store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_connector(config: &Config) -> anyhow::Result<Arc<dyn QueueConnector>> {
    match config.broker.backend.as_str() {
        "amqp" => amqp_connector(config),
        _ => {
            tracing::warn!("Using the in-process broker; tasks are not visible to external workers");
            Ok(Arc::new(InMemoryBroker::new()))
        }
    }
}

#[cfg(feature = "amqp")]
fn amqp_connector(config: &Config) -> anyhow::Result<Arc<dyn QueueConnector>> {
    let broker = &config.broker;
    tracing::info!(host = %broker.host, port = broker.port, "Using RabbitMQ broker");
    Ok(Arc::new(qbench_sched::AmqpConnector::from_parts(
        &broker.host,
        broker.port,
        &broker.user,
        &broker.password,
        &broker.vhost,
    )))
}

#[cfg(not(feature = "amqp"))]
fn amqp_connector(_config: &Config) -> anyhow::Result<Arc<dyn QueueConnector>> {
    anyhow::bail!("broker backend 'amqp' requires building qbench-server with --features amqp")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
