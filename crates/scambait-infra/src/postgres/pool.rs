//! Connection pool construction.
//!
//! The pool is built once at process start and injected into the store --
//! it is an explicitly owned resource, never a module-level singleton.
//! Each new connection is initialized with the configured HNSW search
//! width and statement timeout, so ANN recall and cancellation behavior
//! are configuration, not code.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use scambait_types::config::MemoryConfig;
use scambait_types::error::RepositoryError;

/// Create the Postgres connection pool for the memory store.
///
/// Pool sizing bounds total concurrent database work; callers beyond
/// capacity queue on acquire (up to `acquire_timeout_secs`) rather than
/// fail outright.
pub async fn create_pool(config: &MemoryConfig) -> Result<PgPool, RepositoryError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| RepositoryError::Connection("no database_url configured".into()))?;

    let ef_search = config.hnsw_ef_search;
    let statement_timeout_ms = config.command_timeout_secs * 1000;

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_connections)
        .max_connections(config.pool_max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(
                    format!(
                        "SET hnsw.ef_search = {ef_search}; \
                         SET statement_timeout = {statement_timeout_ms}; \
                         SET application_name = 'scambait';"
                    )
                    .as_str(),
                )
                .await?;
                Ok(())
            })
        })
        .connect(url)
        .await
        .map_err(|e| RepositoryError::Connection(e.to_string()))?;

    Ok(pool)
}
