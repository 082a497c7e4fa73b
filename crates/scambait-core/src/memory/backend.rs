//! MemoryBackend trait definition.
//!
//! The orchestration-facing memory contract. Every operation is total:
//! storage failure degrades to a neutral default (empty snapshot, `false`,
//! cold-start stats) and is never allowed to fail the user-facing turn.
//! Failures are visible only in logs.

use scambait_types::session::{SessionSnapshot, TurnState};
use scambait_types::signal::{ScamSignal, ScamStats, SimilarCase, TemporalStats};
use uuid::Uuid;

/// Cross-session intelligence memory.
///
/// Implementations live in scambait-infra (`PostgresMemory`,
/// `InMemoryMemory`). Uses native async fn in traits (RPITIT, Rust 2024
/// edition).
pub trait MemoryBackend: Send + Sync {
    /// Load prior conversation context for a session.
    ///
    /// A session that has never been seen yields the default snapshot;
    /// "no memory yet" is a normal state, not an error.
    fn load_memory(
        &self,
        session_id: Uuid,
    ) -> impl std::future::Future<Output = SessionSnapshot> + Send;

    /// Persist a turn's authoritative state.
    ///
    /// Upserts session metadata by shallow merge, replaces the message
    /// list, and when `is_final` and the state marks a confirmed scam
    /// (unless `skip_event_embedding`) records a detection event. Returns
    /// `false` when the state could not be saved; the turn proceeds
    /// without memory either way.
    fn persist(
        &self,
        session_id: Uuid,
        state: &TurnState,
        is_final: bool,
        skip_event_embedding: bool,
    ) -> impl std::future::Future<Output = bool> + Send;

    /// Record an engagement-failure event for the session.
    fn record_failure(
        &self,
        session_id: Uuid,
        state: &TurnState,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Cheap pre-detection prior: nearest past detections by embedding
    /// distance, summarized as a count and the dominant scam type.
    fn scam_signal(&self, text: &str) -> impl std::future::Future<Output = ScamSignal> + Send;

    /// Most similar past detections with their similarity scores,
    /// descending.
    fn search_similar(
        &self,
        text: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Vec<SimilarCase>> + Send;

    /// Short descriptions of recently successful engagements for a scam
    /// type.
    fn winning_strategies(
        &self,
        scam_type: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Vec<String>> + Send;

    /// Summaries of recent engagement failures for a scam type.
    fn past_failures(
        &self,
        scam_type: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Vec<String>> + Send;

    /// Success-rate statistics for a scam type; neutral `{0.5, 0}` on cold
    /// start.
    fn stats(&self, scam_type: &str) -> impl std::future::Future<Output = ScamStats> + Send;

    /// Persona traits from the most recent successful engagement for a
    /// scam type; empty on cold start.
    fn optimal_traits(
        &self,
        scam_type: &str,
    ) -> impl std::future::Future<Output = serde_json::Map<String, serde_json::Value>> + Send;

    /// Mean engagement turns across recent successes; `{4.0, 0}` on cold
    /// start.
    fn temporal_pacing(
        &self,
        scam_type: &str,
    ) -> impl std::future::Future<Output = TemporalStats> + Send;

    /// Explicitly delete a session and everything attached to it.
    fn purge(&self, session_id: Uuid) -> impl std::future::Future<Output = bool> + Send;
}
