//! Schema bootstrap.
//!
//! Idempotent DDL run at startup. The vector dimension and HNSW build
//! parameters come from configuration, so they are interpolated into the
//! DDL here rather than baked into a migration file; `IF NOT EXISTS`
//! makes repeated startup safe.

use sqlx::PgPool;

use scambait_types::config::MemoryConfig;
use scambait_types::error::RepositoryError;

/// Create the sessions/messages/intelligence tables, supporting indexes,
/// and the cosine HNSW indexes over the embedding columns.
pub async fn ensure_schema(pool: &PgPool, config: &MemoryConfig) -> Result<(), RepositoryError> {
    let dim = config.embedding_dimension;
    let m = config.hnsw_m;
    let ef_construction = config.hnsw_ef_construction;

    let ddl = format!(
        r#"
CREATE EXTENSION IF NOT EXISTS vector;

CREATE TABLE IF NOT EXISTS sessions (
    session_id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    scam_type  TEXT,
    status     TEXT NOT NULL DEFAULT 'active',
    metadata   JSONB NOT NULL DEFAULT '{{}}'::jsonb
);

CREATE TABLE IF NOT EXISTS messages (
    id         BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    session_id UUID NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    role       TEXT NOT NULL,
    content    TEXT NOT NULL,
    embedding  vector({dim})
);

CREATE TABLE IF NOT EXISTS intelligence (
    id         BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    session_id UUID NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    event_type TEXT NOT NULL,
    scam_type  TEXT,
    summary    TEXT NOT NULL,
    payload    JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    embedding  vector({dim})
);

CREATE INDEX IF NOT EXISTS messages_session_idx
    ON messages (session_id, id);

CREATE INDEX IF NOT EXISTS intelligence_type_idx
    ON intelligence (event_type, scam_type, created_at DESC);

CREATE INDEX IF NOT EXISTS messages_embedding_idx
    ON messages USING hnsw (embedding vector_cosine_ops)
    WITH (m = {m}, ef_construction = {ef_construction});

CREATE INDEX IF NOT EXISTS intelligence_embedding_idx
    ON intelligence USING hnsw (embedding vector_cosine_ops)
    WITH (m = {m}, ef_construction = {ef_construction});
"#
    );

    sqlx::raw_sql(&ddl)
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(())
}
