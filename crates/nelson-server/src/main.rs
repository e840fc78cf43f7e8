mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use nelson_db::{NewsStore, PgNewsStore};
use nelson_ingest::IngestCycle;
use nelson_notify::Dispatcher;
use nelson_sources::HttpFetcher;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = nelson_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, "nelson-server starting");

    let pool_config = nelson_db::PoolConfig::from_app_config(&config);
    let pool = nelson_db::open_pool(&config.database_url, pool_config).await?;
    let applied = nelson_db::apply_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let store: Arc<dyn NewsStore> = Arc::new(PgNewsStore::new(
        pool.clone(),
        Duration::from_secs(config.store_query_timeout_secs),
    ));

    let sources = nelson_core::load_sources_config(&config.sources_path)?;
    let fetcher = HttpFetcher::new(config.fetch_timeout_secs, &config.fetch_user_agent)?;
    let providers = nelson_sources::build_enabled(&sources, &fetcher);
    if providers.is_empty() {
        tracing::warn!(path = %config.sources_path.display(), "no providers enabled");
    }

    let sinks = nelson_notify::build_sinks(&config)?;
    if sinks.is_empty() {
        tracing::warn!("no notification sinks configured, items will be stored only");
    }
    let (dispatcher, workers) = Dispatcher::start(sinks, &store, &config.delivery);

    let cycle = Arc::new(IngestCycle::new(
        providers,
        Arc::clone(&store),
        dispatcher,
        Duration::from_secs(config.fetch_timeout_secs),
    ));

    let mut scheduler = scheduler::build_scheduler(
        Arc::clone(&cycle),
        Duration::from_secs(config.ingest_interval_secs),
    )
    .await?;

    shutdown_signal().await;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
    for (sink, stats) in cycle.dispatcher().stats() {
        tracing::info!(
            sink,
            enqueued = stats.enqueued,
            delivered = stats.delivered,
            rate_limited = stats.rate_limited,
            failed = stats.failed,
            dropped_full = stats.dropped_full,
            dropped_rate_limited = stats.dropped_rate_limited,
            "delivery totals"
        );
    }
    // Queued tasks are in memory only; anything still buffered is abandoned.
    for worker in workers {
        worker.abort();
    }
    pool.close().await;
    tracing::info!("nelson-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
