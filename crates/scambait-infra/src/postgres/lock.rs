//! Per-session concurrency guard.
//!
//! Serializes concurrent turns for the same session (duplicate webhook
//! delivery, retries) with a transaction-scoped Postgres advisory lock
//! keyed by the hash of the session id. Hash keying matters: on a
//! session's first-ever turn there is no row to lock, and a row lock alone
//! cannot prevent two concurrent "create session X" races. Locks for
//! different session ids never contend.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use scambait_types::error::RepositoryError;

/// Scoped holder of the advisory lock for one session id.
///
/// The lock lives exactly as long as the wrapped transaction: commit or
/// drop (rollback) releases it on every exit path. At most one holder
/// exists per session id at any instant, across all processes sharing the
/// database.
pub struct SessionLock<'p> {
    tx: Transaction<'p, Postgres>,
}

impl<'p> SessionLock<'p> {
    /// Begin a transaction and block until the session's advisory lock is
    /// granted.
    pub async fn acquire(pool: &'p PgPool, session_id: Uuid) -> Result<Self, RepositoryError> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Lock(e.to_string()))?;

        // hashtext() gives a stable 32-bit key for the id string, present
        // or not in the sessions table.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Lock(e.to_string()))?;

        tracing::debug!(%session_id, "acquired session lock");
        Ok(Self { tx })
    }

    /// The connection holding the lock, for reuse inside the critical
    /// section.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Commit the transaction, releasing the lock.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }
}
