//! Postgres session store.
//!
//! Durable CRUD for sessions, their message transcripts, and intelligence
//! events. Writes for one session happen under its advisory lock in a
//! single transaction: metadata is shallow-merged read-modify-write, and
//! the message list is replaced wholesale so the stored order always
//! matches the caller's authoritative transcript.

use pgvector::Vector;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use scambait_core::memory::Embedder;
use scambait_types::config::MemoryConfig;
use scambait_types::error::RepositoryError;
use scambait_types::session::{
    EventType, MessageRole, SessionSnapshot, SessionStatus, SnapshotMessage, TurnState,
};

use super::lock::SessionLock;

/// Postgres-backed session store.
///
/// Owns nothing global: the pool is injected at construction and the store
/// can be cloned cheaply alongside it.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    recent_message_limit: i64,
}

/// One message row staged for insertion.
struct MessageInsert {
    role: MessageRole,
    content: String,
    embedding: Option<Vector>,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, config: &MemoryConfig) -> Self {
        Self {
            pool,
            recent_message_limit: config.recent_message_limit,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch session metadata plus the most recent messages, one
    /// connection acquire, chronological order.
    ///
    /// A session that does not exist yields the default snapshot: "no
    /// memory yet" is a normal state, not an error.
    pub async fn load_session(&self, session_id: Uuid) -> Result<SessionSnapshot, RepositoryError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        let session_row = sqlx::query("SELECT metadata, scam_type FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(session_row) = session_row else {
            return Ok(SessionSnapshot::default());
        };

        let metadata: serde_json::Value = session_row
            .try_get("metadata")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let scam_type: Option<String> = session_row
            .try_get("scam_type")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let message_rows = sqlx::query(
            "SELECT role, content, created_at FROM messages \
             WHERE session_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(self.recent_message_limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Rows come newest-first; reverse to chronological.
        let mut prior_messages = Vec::with_capacity(message_rows.len());
        for row in message_rows.iter().rev() {
            let role: String = row
                .try_get("role")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let role: MessageRole = role.parse().map_err(RepositoryError::Query)?;
            prior_messages.push(SnapshotMessage {
                role,
                content: row
                    .try_get("content")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                timestamp: row
                    .try_get("created_at")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
            });
        }

        let meta = metadata.as_object().cloned().unwrap_or_default();
        Ok(SessionSnapshot::from_metadata(&meta, scam_type, prior_messages))
    }

    /// Persist one turn's authoritative state under the session lock.
    ///
    /// Metadata merge, message replace, and the optional detection event
    /// are one transaction: a timeout or failure anywhere leaves no
    /// partial write observable.
    pub async fn persist_session<E: Embedder>(
        &self,
        session_id: Uuid,
        state: &TurnState,
        is_final: bool,
        skip_event_embedding: bool,
        embedder: &E,
    ) -> Result<(), RepositoryError> {
        let mut lock = SessionLock::acquire(&self.pool, session_id).await?;

        self.upsert_session_metadata(lock.conn(), session_id, state, is_final)
            .await?;
        self.replace_messages(lock.conn(), session_id, state, embedder)
            .await?;

        if is_final && state.scam_detected && !skip_event_embedding {
            insert_detection_event(lock.conn(), session_id, state, embedder).await?;
        }

        lock.commit().await
    }

    /// Shallow-merge the turn's metadata over what is stored: new keys
    /// overwrite, keys absent from this write persist.
    async fn upsert_session_metadata(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        state: &TurnState,
        is_final: bool,
    ) -> Result<(), RepositoryError> {
        let existing: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT metadata FROM sessions WHERE session_id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut merged = existing
            .and_then(|(v,)| v.as_object().cloned())
            .unwrap_or_default();
        for (key, value) in state.metadata() {
            merged.insert(key, value);
        }

        let status = if is_final {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        };

        sqlx::query(
            "INSERT INTO sessions (session_id, scam_type, status, metadata) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (session_id) DO UPDATE SET \
                 metadata = EXCLUDED.metadata, \
                 scam_type = COALESCE(EXCLUDED.scam_type, sessions.scam_type), \
                 status = EXCLUDED.status, \
                 updated_at = now()",
        )
        .bind(session_id)
        .bind(&state.scam_type)
        .bind(status.to_string())
        .bind(serde_json::Value::Object(merged))
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    /// Delete the stored transcript and re-insert the full list, batched
    /// embedding first.
    async fn replace_messages<E: Embedder>(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        state: &TurnState,
        embedder: &E,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for message in build_message_inserts(state, embedder).await {
            sqlx::query(
                "INSERT INTO messages (session_id, role, content, embedding) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(session_id)
            .bind(message.role.to_string())
            .bind(&message.content)
            .bind(message.embedding)
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        Ok(())
    }

    /// Record an engagement-failure event for the session.
    pub async fn record_failure<E: Embedder>(
        &self,
        session_id: Uuid,
        state: &TurnState,
        embedder: &E,
    ) -> Result<(), RepositoryError> {
        // The event references the session row; create it on miss so a
        // failure on the very first turn still lands.
        sqlx::query(
            "INSERT INTO sessions (session_id, scam_type) VALUES ($1, $2) \
             ON CONFLICT (session_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(&state.scam_type)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let scam_type = state.scam_type.as_deref().unwrap_or("unknown");
        let persona = state.persona_name.as_deref().unwrap_or("unknown");
        let summary = format!("Failed to extract info. Scam: {scam_type}. Persona: {persona}.");
        let payload = serde_json::json!({
            "event_type": EventType::EngagementFailure,
            "scam_type": state.scam_type,
            "reason": "max_turns_reached",
            "persona": state.persona_name,
        });
        let embedding = embed_safe(embedder, &summary).await;

        sqlx::query(
            "INSERT INTO intelligence (session_id, event_type, scam_type, summary, payload, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(session_id)
        .bind(EventType::EngagementFailure.to_string())
        .bind(&state.scam_type)
        .bind(&summary)
        .bind(&payload)
        .bind(embedding)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    /// Explicit purge: the only way a session is ever deleted. Messages
    /// and events go with it via cascade.
    pub async fn purge_session(&self, session_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

/// Stage the full message list for insertion, embedding every
/// not-yet-embedded user-role text in one batch call.
///
/// Assistant turns are never embedded: they add no search value and would
/// double storage cost. An embedding failure downgrades to null embeddings
/// and the write proceeds.
async fn build_message_inserts<E: Embedder>(state: &TurnState, embedder: &E) -> Vec<MessageInsert> {
    let mut texts: Vec<String> = Vec::new();
    // row index -> index into `texts`
    let mut embed_map: Vec<(usize, usize)> = Vec::new();
    let mut inserts: Vec<MessageInsert> = Vec::new();

    if !state.original_message.is_empty() {
        embed_map.push((0, 0));
        texts.push(state.original_message.clone());
        inserts.push(MessageInsert {
            role: MessageRole::User,
            content: state.original_message.clone(),
            embedding: None,
        });
    }

    for turn in &state.conversation_history {
        let role = turn.role.message_role();
        let row_index = inserts.len();
        let embedding = turn.embedding.clone().map(Vector::from);
        if role == MessageRole::User && embedding.is_none() && !turn.message.is_empty() {
            embed_map.push((row_index, texts.len()));
            texts.push(turn.message.clone());
        }
        inserts.push(MessageInsert {
            role,
            content: turn.message.clone(),
            embedding,
        });
    }

    if !texts.is_empty() {
        match embedder.embed(&texts).await {
            Ok(vectors) => {
                for (row_index, text_index) in embed_map {
                    if let Some(vector) = vectors.get(text_index) {
                        inserts[row_index].embedding = Some(Vector::from(vector.clone()));
                    }
                }
            }
            Err(err) => {
                tracing::warn!("batch embedding failed, persisting without embeddings: {err}");
            }
        }
    }

    inserts
}

/// Insert the `scam_detected` event for a confirmed final turn.
async fn insert_detection_event<E: Embedder>(
    conn: &mut PgConnection,
    session_id: Uuid,
    state: &TurnState,
    embedder: &E,
) -> Result<(), RepositoryError> {
    let scam_type = state.scam_type.as_deref().unwrap_or("unknown");
    let persona = state.persona_name.as_deref().unwrap_or("unknown");
    let summary = format!("Detected {scam_type} using persona {persona}.");

    let entities = serde_json::to_value(&state.extracted_entities)
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
    let payload = serde_json::json!({
        "event_type": EventType::ScamDetected,
        "scam_type": state.scam_type,
        "confidence": state.confidence_score,
        "entities": entities,
        "persona_traits": state.persona_traits,
        "turns": state.engagement_count,
    });

    // Summary plus type and entities, so retrieval can match on any of them.
    let text_to_embed = format!("{scam_type} {summary} {entities}");
    let embedding = embed_safe(embedder, &text_to_embed).await;

    sqlx::query(
        "INSERT INTO intelligence (session_id, event_type, scam_type, summary, payload, embedding) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(session_id)
    .bind(EventType::ScamDetected.to_string())
    .bind(&state.scam_type)
    .bind(&summary)
    .bind(&payload)
    .bind(embedding)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::Query(e.to_string()))?;

    tracing::info!(%session_id, scam_type, "recorded intelligence event");
    Ok(())
}

/// Embed one text, degrading to `None` on provider failure.
pub(crate) async fn embed_safe<E: Embedder>(embedder: &E, text: &str) -> Option<Vector> {
    let texts = [text.to_string()];
    match embedder.embed(&texts).await {
        Ok(mut vectors) if !vectors.is_empty() => Some(Vector::from(vectors.remove(0))),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!("embedding failed: {err}");
            None
        }
    }
}
