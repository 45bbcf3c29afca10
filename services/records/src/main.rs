//! Records HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage and the HTTP router, starts the metrics
//! endpoint and (when configured) the periodic expiry sweep, then serves the
//! API until shutdown.
use anyhow::Context;
use records::app::{AppState, build_router};
use records::config::{RecordsConfig, StorageBackend};
use records::observability;
use records::store::RecordStore;
use records::store::memory::InMemoryStore;
use records::store::postgres::PostgresStore;
use records::workflow::sweep::spawn_sweep_task;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RecordsConfig::from_env_or_yaml().context("records config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: RecordsConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("records")?;
    let state = build_state(&config).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        durable = state.store.is_durable(),
        "record store ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));
    let sweep_task = config.sweep_interval.map(|interval| {
        tracing::info!(?interval, "periodic expiry sweep enabled");
        spawn_sweep_task(state.sweep.clone(), interval)
    });

    let app = build_router(state);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "records service listening");
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    if let Some(task) = &sweep_task {
        task.abort();
    }
    let _ = metrics_task.await;
    if let Some(task) = sweep_task {
        let _ = task.await;
    }
    tracing::info!("records service stopped");
    Ok(())
}

async fn build_state(config: &RecordsConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn RecordStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(
                PostgresStore::connect(pg)
                    .await
                    .context("connect postgres record store")?,
            )
        }
    };
    Ok(AppState::new(store, config.event_capacity))
}
