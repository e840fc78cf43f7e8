//! Connection pool and embedded schema migrations.

use std::collections::HashSet;
use std::time::Duration;

use sqlx::migrate::{Migration, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::DbError;

// Relative to crates/nelson-db/Cargo.toml.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &nelson_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

/// Connect and make one round trip so a bad URL or unreachable server fails
/// at startup rather than in the first cycle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the pool cannot connect or the check query
/// fails.
pub async fn open_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;

    let server: String = sqlx::query_scalar("SHOW server_version")
        .fetch_one(&pool)
        .await?;
    tracing::info!(
        server_version = %server,
        max_connections = config.max_connections,
        "db: pool connected"
    );
    Ok(pool)
}

/// Embedded migrations whose version is not in `applied`, in order.
fn pending<'a>(migrator: &'a Migrator, applied: &HashSet<i64>) -> Vec<&'a Migration> {
    migrator
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect()
}

/// Apply every pending migration and return how many ran.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if any migration fails.
pub async fn apply_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // Absent on a fresh database.
    let applied: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .unwrap_or_default()
            .into_iter()
            .collect();

    let todo = pending(&MIGRATOR, &applied);
    for migration in &todo {
        tracing::info!(
            version = migration.version,
            description = %migration.description,
            "db: applying migration"
        );
    }
    MIGRATOR.run(pool).await?;
    Ok(todo.len())
}
