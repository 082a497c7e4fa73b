//! Learning-index signal types.
//!
//! These are the lightweight read-side results the orchestration layer
//! consumes before detection. Every one of them has a neutral cold-start
//! default so empty intelligence never biases a downstream decision.

use serde::{Deserialize, Serialize};

/// Cheap pre-detection prior: how many similar past scams exist and which
/// scam type dominates among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScamSignal {
    pub similar_count: usize,
    pub common_type: Option<String>,
}

/// One similar past case, scored by cosine similarity (`1 - distance`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCase {
    pub content: String,
    pub score: f64,
}

/// Success-rate statistics for a scam type.
///
/// Cold start returns a 0.5 rate with zero attempts: a neutral prior, not
/// zero, so decisions are not biased toward "never engage" on new types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamStats {
    pub success_rate: f64,
    pub total_attempts: i64,
}

impl Default for ScamStats {
    fn default() -> Self {
        Self {
            success_rate: 0.5,
            total_attempts: 0,
        }
    }
}

/// Temporal pacing: how many engagement turns extraction has typically
/// taken for a scam type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalStats {
    pub avg_turns: f64,
    pub sample_size: usize,
}

impl Default for TemporalStats {
    fn default() -> Self {
        Self {
            avg_turns: 4.0,
            sample_size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_defaults() {
        let stats = ScamStats::default();
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.total_attempts, 0);

        let pacing = TemporalStats::default();
        assert!((pacing.avg_turns - 4.0).abs() < f64::EPSILON);
        assert_eq!(pacing.sample_size, 0);

        let signal = ScamSignal::default();
        assert_eq!(signal.similar_count, 0);
        assert!(signal.common_type.is_none());
    }
}
