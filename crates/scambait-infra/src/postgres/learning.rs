//! Read-side learning queries over the intelligence table.
//!
//! Non-mutating, tolerant of "no data yet". Statistics here are sampled
//! over capped top-K searches and recent-event windows, not true global
//! aggregates -- that approximation is part of the system's learned
//! behavior and is kept deliberately.

use std::collections::HashMap;

use pgvector::Vector;
use sqlx::PgPool;

use scambait_types::error::RepositoryError;
use scambait_types::signal::{ScamSignal, ScamStats, SimilarCase, TemporalStats};

/// How many nearest events the pre-detection signal considers.
const SIGNAL_NEIGHBORS: i64 = 10;

/// Recency window for the pacing average.
const PACING_WINDOW: i64 = 20;

/// Read-only query layer over stored intelligence events.
#[derive(Clone)]
pub struct LearningIndex {
    pool: PgPool,
}

impl LearningIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count the nearest past detections and the scam type that dominates
    /// among them.
    pub async fn scam_signal(&self, embedding: Vector) -> Result<ScamSignal, RepositoryError> {
        let rows: Vec<(Option<String>,)> = sqlx::query_as(
            "SELECT scam_type FROM intelligence \
             WHERE event_type = 'scam_detected' AND embedding IS NOT NULL \
             ORDER BY embedding <=> $1 \
             LIMIT $2",
        )
        .bind(embedding)
        .bind(SIGNAL_NEIGHBORS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let similar_count = rows.len();
        let common_type = mode(rows.into_iter().flat_map(|(t,)| t));
        Ok(ScamSignal {
            similar_count,
            common_type,
        })
    }

    /// Nearest past detections with similarity scores, best first.
    pub async fn search_similar(
        &self,
        embedding: Vector,
        limit: i64,
    ) -> Result<Vec<SimilarCase>, RepositoryError> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT summary, (embedding <=> $1) AS dist FROM intelligence \
             WHERE event_type = 'scam_detected' AND embedding IS NOT NULL \
             ORDER BY dist ASC \
             LIMIT $2",
        )
        .bind(embedding)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(content, dist)| SimilarCase {
                content,
                score: 1.0 - dist,
            })
            .collect())
    }

    /// Most recent successful engagements for a scam type, rendered as
    /// short strategy descriptions.
    pub async fn winning_strategies(
        &self,
        scam_type: &str,
        limit: i64,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT payload FROM intelligence \
             WHERE event_type = 'scam_detected' AND scam_type = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(scam_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(payload,)| render_strategy(&payload))
            .collect())
    }

    /// Summaries of the most recent engagement failures for a scam type.
    pub async fn past_failures(
        &self,
        scam_type: &str,
        limit: i64,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT summary FROM intelligence \
             WHERE event_type = 'engagement_failure' AND scam_type = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(scam_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(|(summary,)| summary).collect())
    }

    /// Success rate for a scam type; the caller substitutes the neutral
    /// cold-start prior when `total == 0`.
    pub async fn stats(&self, scam_type: &str) -> Result<ScamStats, RepositoryError> {
        let (total, successes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE event_type = 'scam_detected') \
             FROM intelligence WHERE scam_type = $1",
        )
        .bind(scam_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if total == 0 {
            return Ok(ScamStats::default());
        }
        Ok(ScamStats {
            success_rate: successes as f64 / total as f64,
            total_attempts: total,
        })
    }

    /// Persona traits from the single most recent success for a scam
    /// type.
    pub async fn optimal_traits(
        &self,
        scam_type: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, RepositoryError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT payload FROM intelligence \
             WHERE event_type = 'scam_detected' AND scam_type = $1 \
             ORDER BY created_at DESC \
             LIMIT 1",
        )
        .bind(scam_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(row
            .and_then(|(payload,)| payload.get("persona_traits")?.as_object().cloned())
            .unwrap_or_default())
    }

    /// Mean engagement turns across the most recent successes.
    pub async fn temporal_pacing(&self, scam_type: &str) -> Result<TemporalStats, RepositoryError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT payload FROM intelligence \
             WHERE event_type = 'scam_detected' AND scam_type = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(scam_type)
        .bind(PACING_WINDOW)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let turns: Vec<u64> = rows
            .iter()
            .filter_map(|(payload,)| payload.get("turns")?.as_u64())
            .collect();

        if turns.is_empty() {
            return Ok(TemporalStats::default());
        }
        Ok(TemporalStats {
            avg_turns: turns.iter().sum::<u64>() as f64 / turns.len() as f64,
            sample_size: turns.len(),
        })
    }
}

/// Statistical mode; ties break toward the lexically smallest type so the
/// result is deterministic.
pub(crate) fn mode(types: impl Iterator<Item = String>) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in types {
        *counts.entry(t).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(t, _)| t)
}

/// "Used persona (AGE) to extract in N turns."
pub(crate) fn render_strategy(payload: &serde_json::Value) -> String {
    let age = payload
        .get("persona_traits")
        .and_then(|t| t.get("age"))
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "unknown".to_string());
    let turns = payload.get("turns").and_then(|v| v.as_u64()).unwrap_or(0);
    format!("Used persona ({age}) to extract in {turns} turns.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_picks_dominant_type() {
        let types = ["UPI_FRAUD", "PHISHING", "UPI_FRAUD"]
            .iter()
            .map(|s| s.to_string());
        assert_eq!(mode(types), Some("UPI_FRAUD".to_string()));
    }

    #[test]
    fn test_mode_empty_is_none() {
        assert_eq!(mode(std::iter::empty()), None);
    }

    #[test]
    fn test_mode_tie_is_deterministic() {
        let types = ["B", "A"].iter().map(|s| s.to_string());
        assert_eq!(mode(types), Some("A".to_string()));
    }

    #[test]
    fn test_render_strategy() {
        let payload = serde_json::json!({
            "persona_traits": {"age": 67},
            "turns": 5,
        });
        assert_eq!(
            render_strategy(&payload),
            "Used persona (67) to extract in 5 turns."
        );
    }

    #[test]
    fn test_render_strategy_missing_fields() {
        let payload = serde_json::json!({});
        assert_eq!(
            render_strategy(&payload),
            "Used persona (unknown) to extract in 0 turns."
        );
    }
}
