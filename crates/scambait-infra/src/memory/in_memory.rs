//! In-process MemoryBackend.
//!
//! Same contract and semantics as the Postgres backend, held in a single
//! RwLock'd map: shallow-merged session metadata, wholesale message
//! replacement, append-only intelligence events, brute-force cosine search.
//! Serves database-less deployments and the test suite. Nothing survives a
//! restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use scambait_core::memory::{Embedder, MemoryBackend};
use scambait_types::config::MemoryConfig;
use scambait_types::session::{
    EventType, MessageRole, SessionSnapshot, SessionStatus, SnapshotMessage, TurnState,
};
use scambait_types::signal::{ScamSignal, ScamStats, SimilarCase, TemporalStats};

use crate::postgres::learning::{mode, render_strategy};

/// How many nearest events the pre-detection signal considers.
const SIGNAL_NEIGHBORS: usize = 10;

/// Recency window for the pacing average.
const PACING_WINDOW: usize = 20;

struct StoredMessage {
    role: MessageRole,
    content: String,
    timestamp: DateTime<Utc>,
}

struct StoredSession {
    metadata: serde_json::Map<String, serde_json::Value>,
    scam_type: Option<String>,
    status: SessionStatus,
    messages: Vec<StoredMessage>,
}

struct StoredEvent {
    session_id: Uuid,
    event_type: EventType,
    scam_type: Option<String>,
    summary: String,
    payload: serde_json::Value,
    embedding: Option<Vec<f32>>,
}

#[derive(Default)]
struct State {
    sessions: HashMap<Uuid, StoredSession>,
    // append order is chronological
    events: Vec<StoredEvent>,
}

/// Volatile memory backend.
///
/// Writes serialize on the lock, so concurrent persists for the same
/// session interleave whole-transaction, never mid-merge.
pub struct InMemoryMemory<E: Embedder> {
    state: RwLock<State>,
    embedder: E,
    recent_message_limit: usize,
}

impl<E: Embedder> InMemoryMemory<E> {
    pub fn new(config: &MemoryConfig, embedder: E) -> Self {
        Self {
            state: RwLock::new(State::default()),
            embedder,
            recent_message_limit: config.recent_message_limit as usize,
        }
    }

    async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
        let texts = [text.to_string()];
        match self.embedder.embed(&texts).await {
            Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("embedding failed: {err}");
                None
            }
        }
    }

    /// Successful detections for a scam type, most recent first.
    fn successes<'a>(state: &'a State, scam_type: &str) -> impl Iterator<Item = &'a StoredEvent> {
        state.events.iter().rev().filter(move |e| {
            e.event_type == EventType::ScamDetected && e.scam_type.as_deref() == Some(scam_type)
        })
    }
}

impl<E: Embedder> MemoryBackend for InMemoryMemory<E> {
    async fn load_memory(&self, session_id: Uuid) -> SessionSnapshot {
        let state = self.state.read().await;
        let Some(session) = state.sessions.get(&session_id) else {
            return SessionSnapshot::default();
        };

        let start = session.messages.len().saturating_sub(self.recent_message_limit);
        let prior_messages = session.messages[start..]
            .iter()
            .map(|m| SnapshotMessage {
                role: m.role,
                content: m.content.clone(),
                timestamp: Some(m.timestamp),
            })
            .collect();

        SessionSnapshot::from_metadata(&session.metadata, session.scam_type.clone(), prior_messages)
    }

    async fn persist(
        &self,
        session_id: Uuid,
        state: &TurnState,
        is_final: bool,
        skip_event_embedding: bool,
    ) -> bool {
        let mut messages = Vec::new();
        let now = Utc::now();
        if !state.original_message.is_empty() {
            messages.push(StoredMessage {
                role: MessageRole::User,
                content: state.original_message.clone(),
                timestamp: now,
            });
        }
        for turn in &state.conversation_history {
            messages.push(StoredMessage {
                role: turn.role.message_role(),
                content: turn.message.clone(),
                timestamp: now,
            });
        }

        let detection = if is_final && state.scam_detected && !skip_event_embedding {
            let scam_type = state.scam_type.as_deref().unwrap_or("unknown");
            let persona = state.persona_name.as_deref().unwrap_or("unknown");
            let summary = format!("Detected {scam_type} using persona {persona}.");
            let entities = serde_json::to_value(&state.extracted_entities)
                .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
            let text_to_embed = format!("{scam_type} {summary} {entities}");
            let embedding = self.embed_one(&text_to_embed).await;
            Some(StoredEvent {
                session_id,
                event_type: EventType::ScamDetected,
                scam_type: state.scam_type.clone(),
                summary,
                payload: serde_json::json!({
                    "event_type": EventType::ScamDetected,
                    "scam_type": state.scam_type,
                    "confidence": state.confidence_score,
                    "entities": entities,
                    "persona_traits": state.persona_traits,
                    "turns": state.engagement_count,
                }),
                embedding,
            })
        } else {
            None
        };

        let mut guard = self.state.write().await;
        let session = guard.sessions.entry(session_id).or_insert_with(|| StoredSession {
            metadata: serde_json::Map::new(),
            scam_type: None,
            status: SessionStatus::Active,
            messages: Vec::new(),
        });

        for (key, value) in state.metadata() {
            session.metadata.insert(key, value);
        }
        if state.scam_type.is_some() {
            session.scam_type = state.scam_type.clone();
        }
        session.status = if is_final {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        };
        session.messages = messages;

        if let Some(event) = detection {
            tracing::info!(%session_id, "recorded intelligence event");
            guard.events.push(event);
        }
        true
    }

    async fn record_failure(&self, session_id: Uuid, state: &TurnState) {
        let scam_type = state.scam_type.as_deref().unwrap_or("unknown");
        let persona = state.persona_name.as_deref().unwrap_or("unknown");
        let summary = format!("Failed to extract info. Scam: {scam_type}. Persona: {persona}.");
        let embedding = self.embed_one(&summary).await;

        let mut guard = self.state.write().await;
        guard.sessions.entry(session_id).or_insert_with(|| StoredSession {
            metadata: serde_json::Map::new(),
            scam_type: state.scam_type.clone(),
            status: SessionStatus::Active,
            messages: Vec::new(),
        });
        guard.events.push(StoredEvent {
            session_id,
            event_type: EventType::EngagementFailure,
            scam_type: state.scam_type.clone(),
            summary,
            payload: serde_json::json!({
                "event_type": EventType::EngagementFailure,
                "scam_type": state.scam_type,
                "reason": "max_turns_reached",
                "persona": state.persona_name,
            }),
            embedding,
        });
    }

    async fn scam_signal(&self, text: &str) -> ScamSignal {
        let Some(query) = self.embed_one(text).await else {
            return ScamSignal::default();
        };
        let state = self.state.read().await;
        let mut scored: Vec<(f64, Option<&String>)> = state
            .events
            .iter()
            .filter(|e| e.event_type == EventType::ScamDetected)
            .filter_map(|e| {
                let embedding = e.embedding.as_ref()?;
                Some((cosine_similarity(&query, embedding), e.scam_type.as_ref()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(SIGNAL_NEIGHBORS);

        ScamSignal {
            similar_count: scored.len(),
            common_type: mode(scored.iter().filter_map(|(_, t)| t.cloned())),
        }
    }

    async fn search_similar(&self, text: &str, limit: usize) -> Vec<SimilarCase> {
        let Some(query) = self.embed_one(text).await else {
            return Vec::new();
        };
        let state = self.state.read().await;
        let mut scored: Vec<SimilarCase> = state
            .events
            .iter()
            .filter(|e| e.event_type == EventType::ScamDetected)
            .filter_map(|e| {
                let embedding = e.embedding.as_ref()?;
                Some(SimilarCase {
                    content: e.summary.clone(),
                    score: cosine_similarity(&query, embedding),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }

    async fn winning_strategies(&self, scam_type: &str, limit: usize) -> Vec<String> {
        let state = self.state.read().await;
        Self::successes(&state, scam_type)
            .take(limit)
            .map(|e| render_strategy(&e.payload))
            .collect()
    }

    async fn past_failures(&self, scam_type: &str, limit: usize) -> Vec<String> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .rev()
            .filter(|e| {
                e.event_type == EventType::EngagementFailure
                    && e.scam_type.as_deref() == Some(scam_type)
            })
            .take(limit)
            .map(|e| e.summary.clone())
            .collect()
    }

    async fn stats(&self, scam_type: &str) -> ScamStats {
        let state = self.state.read().await;
        let mut total = 0i64;
        let mut successes = 0i64;
        for event in &state.events {
            if event.scam_type.as_deref() == Some(scam_type) {
                total += 1;
                if event.event_type == EventType::ScamDetected {
                    successes += 1;
                }
            }
        }
        if total == 0 {
            return ScamStats::default();
        }
        ScamStats {
            success_rate: successes as f64 / total as f64,
            total_attempts: total,
        }
    }

    async fn optimal_traits(&self, scam_type: &str) -> serde_json::Map<String, serde_json::Value> {
        let state = self.state.read().await;
        Self::successes(&state, scam_type)
            .next()
            .and_then(|e| e.payload.get("persona_traits")?.as_object().cloned())
            .unwrap_or_default()
    }

    async fn temporal_pacing(&self, scam_type: &str) -> TemporalStats {
        let state = self.state.read().await;
        let turns: Vec<u64> = Self::successes(&state, scam_type)
            .take(PACING_WINDOW)
            .filter_map(|e| e.payload.get("turns")?.as_u64())
            .collect();
        if turns.is_empty() {
            return TemporalStats::default();
        }
        TemporalStats {
            avg_turns: turns.iter().sum::<u64>() as f64 / turns.len() as f64,
            sample_size: turns.len(),
        }
    }

    async fn purge(&self, session_id: Uuid) -> bool {
        let mut guard = self.state.write().await;
        guard.sessions.remove(&session_id);
        guard.events.retain(|e| e.session_id != session_id);
        true
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scambait_types::error::EmbeddingError;
    use scambait_types::session::{ConversationTurn, TurnRole};

    /// Deterministic test embedder: hashes each word into a fixed slot so
    /// texts sharing vocabulary land near each other.
    struct HashEmbedder;

    impl Embedder for HashEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 32];
                    for word in text.split_whitespace() {
                        let mut h = 0usize;
                        for b in word.bytes() {
                            h = h.wrapping_mul(31).wrapping_add(b as usize);
                        }
                        v[h % 32] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            32
        }

        fn model_name(&self) -> &str {
            "hash-test"
        }
    }

    /// Embedder that always fails, for degradation tests.
    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Model("offline".into()))
        }

        fn dimension(&self) -> usize {
            32
        }

        fn model_name(&self) -> &str {
            "broken-test"
        }
    }

    fn backend() -> InMemoryMemory<HashEmbedder> {
        InMemoryMemory::new(&MemoryConfig::default(), HashEmbedder)
    }

    fn detected_state(scam_type: &str, turns: u32) -> TurnState {
        TurnState {
            original_message: "your electricity bill is overdue pay now".into(),
            scam_detected: true,
            scam_type: Some(scam_type.into()),
            persona_name: Some("Savitri".into()),
            persona_traits: serde_json::json!({"age": 67})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            confidence_score: 0.9,
            engagement_count: turns,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_session_yields_empty_snapshot() {
        let memory = backend();
        let snapshot = memory.load_memory(Uuid::now_v7()).await;
        assert!(snapshot.prior_messages.is_empty());
        assert!(snapshot.scam_type.is_none());
    }

    #[tokio::test]
    async fn test_persist_then_load_round_trip() {
        let memory = backend();
        let session_id = Uuid::now_v7();
        let mut state = detected_state("UPI_FRAUD", 2);
        state.conversation_history = vec![
            ConversationTurn {
                role: TurnRole::Scammer,
                message: "send the money".into(),
                turn_number: 1,
                embedding: None,
            },
            ConversationTurn {
                role: TurnRole::Honeypot,
                message: "which account, beta?".into(),
                turn_number: 1,
                embedding: None,
            },
        ];

        assert!(memory.persist(session_id, &state, false, false).await);

        let snapshot = memory.load_memory(session_id).await;
        assert_eq!(snapshot.scam_type.as_deref(), Some("UPI_FRAUD"));
        assert_eq!(snapshot.persona_name.as_deref(), Some("Savitri"));
        assert_eq!(snapshot.engagement_count, 2);
        // original message plus two history turns
        assert_eq!(snapshot.prior_messages.len(), 3);
        assert_eq!(snapshot.prior_messages[0].role, MessageRole::User);
        assert_eq!(snapshot.prior_messages[2].content, "which account, beta?");
    }

    #[tokio::test]
    async fn test_partial_turn_preserves_earlier_metadata() {
        let memory = backend();
        let session_id = Uuid::now_v7();

        memory
            .persist(session_id, &detected_state("UPI_FRAUD", 1), false, false)
            .await;

        // Second turn writes no persona fields at all.
        let sparse = TurnState {
            original_message: "ok".into(),
            engagement_count: 2,
            ..Default::default()
        };
        memory.persist(session_id, &sparse, false, false).await;

        let snapshot = memory.load_memory(session_id).await;
        assert_eq!(snapshot.persona_name.as_deref(), Some("Savitri"));
        assert_eq!(snapshot.scam_type.as_deref(), Some("UPI_FRAUD"));
        assert_eq!(snapshot.engagement_count, 2);
    }

    #[tokio::test]
    async fn test_final_turn_records_detection_event() {
        let memory = backend();
        memory
            .persist(Uuid::now_v7(), &detected_state("UPI_FRAUD", 5), true, false)
            .await;

        let stats = memory.stats("UPI_FRAUD").await;
        assert_eq!(stats.total_attempts, 1);
        assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);

        let strategies = memory.winning_strategies("UPI_FRAUD", 5).await;
        assert_eq!(strategies, vec!["Used persona (67) to extract in 5 turns."]);

        let traits = memory.optimal_traits("UPI_FRAUD").await;
        assert_eq!(traits.get("age"), Some(&serde_json::json!(67)));

        let pacing = memory.temporal_pacing("UPI_FRAUD").await;
        assert!((pacing.avg_turns - 5.0).abs() < f64::EPSILON);
        assert_eq!(pacing.sample_size, 1);
    }

    #[tokio::test]
    async fn test_final_persist_marks_session_completed() {
        let memory = backend();
        let session_id = Uuid::now_v7();

        memory
            .persist(session_id, &detected_state("UPI_FRAUD", 1), false, false)
            .await;
        assert_eq!(
            memory.state.read().await.sessions[&session_id].status,
            SessionStatus::Active
        );

        memory
            .persist(session_id, &detected_state("UPI_FRAUD", 2), true, false)
            .await;
        assert_eq!(
            memory.state.read().await.sessions[&session_id].status,
            SessionStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_skip_event_embedding_suppresses_event() {
        let memory = backend();
        memory
            .persist(Uuid::now_v7(), &detected_state("UPI_FRAUD", 5), true, true)
            .await;
        let stats = memory.stats("UPI_FRAUD").await;
        assert_eq!(stats.total_attempts, 0);
    }

    #[tokio::test]
    async fn test_cold_start_defaults() {
        let memory = backend();
        let stats = memory.stats("NEW_TYPE").await;
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.total_attempts, 0);

        let pacing = memory.temporal_pacing("NEW_TYPE").await;
        assert!((pacing.avg_turns - 4.0).abs() < f64::EPSILON);
        assert_eq!(pacing.sample_size, 0);

        assert!(memory.optimal_traits("NEW_TYPE").await.is_empty());
        assert!(memory.winning_strategies("NEW_TYPE", 5).await.is_empty());
        assert!(memory.past_failures("NEW_TYPE", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_similarity_search_prefers_shared_vocabulary() {
        let memory = backend();
        memory
            .persist(Uuid::now_v7(), &detected_state("ELECTRICITY_SCAM", 3), true, false)
            .await;

        let signal = memory
            .scam_signal("your electricity bill is overdue")
            .await;
        assert_eq!(signal.similar_count, 1);
        assert_eq!(signal.common_type.as_deref(), Some("ELECTRICITY_SCAM"));

        let similar = memory
            .search_similar("your electricity bill is overdue", 5)
            .await;
        assert_eq!(similar.len(), 1);
        assert!(similar[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_failure_events_feed_stats_and_listing() {
        let memory = backend();
        let state = detected_state("KYC_FRAUD", 8);
        memory.record_failure(Uuid::now_v7(), &state).await;

        let failures = memory.past_failures("KYC_FRAUD", 5).await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("Failed to extract info."));

        let stats = memory.stats("KYC_FRAUD").await;
        assert_eq!(stats.total_attempts, 1);
        assert!((stats.success_rate - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_purge_removes_session_and_events() {
        let memory = backend();
        let session_id = Uuid::now_v7();
        memory
            .persist(session_id, &detected_state("UPI_FRAUD", 4), true, false)
            .await;

        assert!(memory.purge(session_id).await);
        assert!(memory.load_memory(session_id).await.prior_messages.is_empty());
        assert_eq!(memory.stats("UPI_FRAUD").await.total_attempts, 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_not_errors() {
        let memory = InMemoryMemory::new(&MemoryConfig::default(), BrokenEmbedder);
        let session_id = Uuid::now_v7();

        // Persist still succeeds; the event just carries no embedding.
        assert!(
            memory
                .persist(session_id, &detected_state("UPI_FRAUD", 5), true, false)
                .await
        );
        assert_eq!(memory.stats("UPI_FRAUD").await.total_attempts, 1);

        // Embedding-dependent reads return their neutral defaults.
        let signal = memory.scam_signal("anything").await;
        assert_eq!(signal, ScamSignal::default());
        assert!(memory.search_similar("anything", 5).await.is_empty());
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = vec![1.0f32, 0.0, 0.0];
        let b = vec![0.0f32, 1.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&a, &b)).abs() < 1e-9);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
    }
}
