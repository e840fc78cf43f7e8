//! Command handlers. Each one builds only the pieces it needs from the
//! loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use nelson_core::{normalize_batch, AppConfig, NewsItem, Provider, StoredItem};
use nelson_db::{MemoryNewsStore, NewsStore, PgNewsStore};
use nelson_ingest::{CycleReport, IngestCycle};
use nelson_notify::Dispatcher;
use nelson_sources::{build_enabled, build_provider, HttpFetcher};
use sqlx::PgPool;

async fn open_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    Ok(nelson_db::open_pool(
        &config.database_url,
        nelson_db::PoolConfig::from_app_config(config),
    )
    .await?)
}

async fn pg_store(config: &AppConfig) -> anyhow::Result<PgNewsStore> {
    let pool = open_pool(config).await?;
    Ok(PgNewsStore::new(
        pool,
        Duration::from_secs(config.store_query_timeout_secs),
    ))
}

fn fetcher(config: &AppConfig) -> anyhow::Result<HttpFetcher> {
    Ok(HttpFetcher::new(
        config.fetch_timeout_secs,
        &config.fetch_user_agent,
    )?)
}

/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = open_pool(config).await?;
    let applied = nelson_db::apply_migrations(&pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

/// Fetch one provider regardless of whether it is enabled, and print what the
/// normalizer makes of it. Nothing is stored.
///
/// # Errors
///
/// Returns the provider's fetch or parse error.
pub(crate) async fn run_fetch(config: &AppConfig, provider: Provider) -> anyhow::Result<()> {
    let source = build_provider(provider, fetcher(config)?);
    let records = tokio::time::timeout(
        Duration::from_secs(config.fetch_timeout_secs),
        source.fetch(),
    )
    .await
    .map_err(|_| anyhow::anyhow!("{provider}: fetch timed out"))??;

    let fetched = records.len();
    let items = normalize_batch(provider, records);
    for item in &items {
        print_item(item);
    }
    println!("{provider}: {fetched} fetched, {} normalized", items.len());
    Ok(())
}

/// Shown before a cycle that writes to the database without any sink attached.
pub(crate) const UNDELIVERED_WARNING: &str = "warning: items stored by this cycle are marked seen \
     and will never be announced by the daemon; use --dry-run to preview instead";

/// Warning to print before a manual cycle, if any.
pub(crate) fn persist_warning(dry_run: bool) -> Option<&'static str> {
    (!dry_run).then_some(UNDELIVERED_WARNING)
}

/// Run one cycle over the enabled providers with no sinks attached.
///
/// # Errors
///
/// Returns an error if the sources file cannot be loaded or, without
/// `dry_run`, the database is unreachable.
pub(crate) async fn run_once(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let sources = nelson_core::load_sources_config(&config.sources_path)?;
    let providers = build_enabled(&sources, &fetcher(config)?);

    if let Some(warning) = persist_warning(dry_run) {
        eprintln!("{warning}");
        tracing::warn!(providers = providers.len(), "cli: persisting cycle without delivery");
    }

    let store: Arc<dyn NewsStore> = if dry_run {
        Arc::new(MemoryNewsStore::new())
    } else {
        Arc::new(pg_store(config).await?)
    };

    let cycle = IngestCycle::new(
        providers,
        store,
        Dispatcher::default(),
        Duration::from_secs(config.fetch_timeout_secs),
    );
    match cycle.run_once().await {
        Some(report) => print_report(&report, dry_run),
        None => println!("cycle skipped"),
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
pub(crate) async fn run_recent(
    config: &AppConfig,
    page: u32,
    page_size: u32,
) -> anyhow::Result<()> {
    let store = pg_store(config).await?;
    let items = store.recent_items(page, page_size).await?;
    if items.is_empty() {
        println!("no items on page {page}");
    }
    for stored in &items {
        print_stored(stored);
    }
    Ok(())
}

fn print_item(item: &NewsItem) {
    println!("[{}] {}", item.provider, item.title);
    println!("  {}", item.url);
    if let Some(published) = item.published_at {
        println!("  published: {}", published.to_rfc3339());
    }
    if !item.tags.is_empty() {
        println!("  tags: {}", item.tags.join(", "));
    }
    if let Some(image) = item.images.first() {
        println!("  image: {image}");
    }
}

fn print_stored(stored: &StoredItem) {
    println!(
        "#{} {} [{}] {}",
        stored.id,
        stored.created_at.format("%Y-%m-%d %H:%M"),
        stored.item.provider,
        stored.item.title
    );
    println!("  {}", stored.item.url);
    for (sink, id) in &stored.external_refs {
        println!("  {sink}: {id}");
    }
}

fn print_report(report: &CycleReport, dry_run: bool) {
    let mode = if dry_run { " (dry run)" } else { " (stored, not delivered)" };
    println!("cycle complete{mode} in {:.1}s", report.elapsed.as_secs_f64());
    println!("  fetched:        {}", report.fetched);
    println!("  normalized:     {}", report.normalized);
    println!("  unseen:         {}", report.unseen);
    println!("  persisted:      {}", report.persisted);
    println!("  failed upserts: {}", report.failed_upserts);
    if !report.failed_providers.is_empty() {
        println!("  failed providers:  {}", join(&report.failed_providers));
    }
    if !report.skipped_providers.is_empty() {
        println!("  skipped providers: {}", join(&report.skipped_providers));
    }
}

fn join(providers: &[Provider]) -> String {
    providers
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
