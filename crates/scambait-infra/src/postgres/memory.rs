//! Postgres-backed MemoryBackend.
//!
//! Thin total-contract facade over `PgSessionStore` and `LearningIndex`:
//! every repository or embedding error is logged at warn and converted to
//! the operation's neutral default, so a degraded database never fails a
//! conversation turn.

use sqlx::PgPool;
use uuid::Uuid;

use scambait_core::memory::{Embedder, MemoryBackend};
use scambait_types::config::MemoryConfig;
use scambait_types::error::RepositoryError;
use scambait_types::session::{SessionSnapshot, TurnState};
use scambait_types::signal::{ScamSignal, ScamStats, SimilarCase, TemporalStats};

use super::learning::LearningIndex;
use super::pool::create_pool;
use super::schema::ensure_schema;
use super::session::{embed_safe, PgSessionStore};

/// Cross-session memory on Postgres with pgvector.
pub struct PostgresMemory<E: Embedder> {
    store: PgSessionStore,
    index: LearningIndex,
    embedder: E,
}

impl<E: Embedder> PostgresMemory<E> {
    /// Wrap an existing pool. Assumes the schema is already in place.
    pub fn new(pool: PgPool, config: &MemoryConfig, embedder: E) -> Self {
        Self {
            store: PgSessionStore::new(pool.clone(), config),
            index: LearningIndex::new(pool),
            embedder,
        }
    }

    /// Create the pool from config and bring the schema up to date.
    pub async fn connect(config: &MemoryConfig, embedder: E) -> Result<Self, RepositoryError> {
        let pool = create_pool(config).await?;
        ensure_schema(&pool, config).await?;
        Ok(Self::new(pool, config, embedder))
    }

    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }
}

impl<E: Embedder> MemoryBackend for PostgresMemory<E> {
    async fn load_memory(&self, session_id: Uuid) -> SessionSnapshot {
        match self.store.load_session(session_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%session_id, "load_memory degraded to empty snapshot: {err}");
                SessionSnapshot::default()
            }
        }
    }

    async fn persist(
        &self,
        session_id: Uuid,
        state: &TurnState,
        is_final: bool,
        skip_event_embedding: bool,
    ) -> bool {
        match self
            .store
            .persist_session(session_id, state, is_final, skip_event_embedding, &self.embedder)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%session_id, "persist failed: {err}");
                false
            }
        }
    }

    async fn record_failure(&self, session_id: Uuid, state: &TurnState) {
        if let Err(err) = self
            .store
            .record_failure(session_id, state, &self.embedder)
            .await
        {
            tracing::warn!(%session_id, "record_failure dropped: {err}");
        }
    }

    async fn scam_signal(&self, text: &str) -> ScamSignal {
        let Some(embedding) = embed_safe(&self.embedder, text).await else {
            return ScamSignal::default();
        };
        match self.index.scam_signal(embedding).await {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!("scam_signal degraded to default: {err}");
                ScamSignal::default()
            }
        }
    }

    async fn search_similar(&self, text: &str, limit: usize) -> Vec<SimilarCase> {
        let Some(embedding) = embed_safe(&self.embedder, text).await else {
            return Vec::new();
        };
        match self.index.search_similar(embedding, limit as i64).await {
            Ok(cases) => cases,
            Err(err) => {
                tracing::warn!("search_similar degraded to empty: {err}");
                Vec::new()
            }
        }
    }

    async fn winning_strategies(&self, scam_type: &str, limit: usize) -> Vec<String> {
        match self.index.winning_strategies(scam_type, limit as i64).await {
            Ok(strategies) => strategies,
            Err(err) => {
                tracing::warn!(scam_type, "winning_strategies degraded to empty: {err}");
                Vec::new()
            }
        }
    }

    async fn past_failures(&self, scam_type: &str, limit: usize) -> Vec<String> {
        match self.index.past_failures(scam_type, limit as i64).await {
            Ok(failures) => failures,
            Err(err) => {
                tracing::warn!(scam_type, "past_failures degraded to empty: {err}");
                Vec::new()
            }
        }
    }

    async fn stats(&self, scam_type: &str) -> ScamStats {
        match self.index.stats(scam_type).await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(scam_type, "stats degraded to cold-start prior: {err}");
                ScamStats::default()
            }
        }
    }

    async fn optimal_traits(&self, scam_type: &str) -> serde_json::Map<String, serde_json::Value> {
        match self.index.optimal_traits(scam_type).await {
            Ok(traits) => traits,
            Err(err) => {
                tracing::warn!(scam_type, "optimal_traits degraded to empty: {err}");
                serde_json::Map::new()
            }
        }
    }

    async fn temporal_pacing(&self, scam_type: &str) -> TemporalStats {
        match self.index.temporal_pacing(scam_type).await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(scam_type, "temporal_pacing degraded to default: {err}");
                TemporalStats::default()
            }
        }
    }

    async fn purge(&self, session_id: Uuid) -> bool {
        match self.store.purge_session(session_id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%session_id, "purge failed: {err}");
                false
            }
        }
    }
}
