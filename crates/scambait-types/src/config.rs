//! Memory subsystem configuration.
//!
//! `MemoryConfig` is loaded from `config.toml` by scambait-infra. All fields
//! have defaults so a missing or partial file still yields a usable
//! configuration; the only field without a useful default is
//! `database_url`, which may also come from `SCAMBAIT_DATABASE_URL`.

use serde::{Deserialize, Serialize};

/// Configuration for the Postgres-backed memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Postgres connection string. `None` means the store is disabled and
    /// the service runs without persistent memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Minimum pool size (warm connections).
    #[serde(default = "default_pool_min")]
    pub pool_min_connections: u32,

    /// Maximum pool size; bounds total concurrent database work. Callers
    /// beyond this queue on acquire rather than fail.
    #[serde(default = "default_pool_max")]
    pub pool_max_connections: u32,

    /// Timeout for acquiring a pooled connection, in seconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Per-statement timeout, in seconds. A timed-out statement is treated
    /// like any other storage failure.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Dimensionality of message/event embeddings.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// HNSW construction fan-out (`m`) for the ANN indexes.
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: u32,

    /// HNSW construction-time candidate list size (`ef_construction`).
    #[serde(default = "default_hnsw_ef_construction")]
    pub hnsw_ef_construction: u32,

    /// HNSW search-time candidate count (`ef_search`), applied per
    /// connection. Higher improves recall at the cost of latency.
    #[serde(default = "default_hnsw_ef_search")]
    pub hnsw_ef_search: u32,

    /// How many recent messages `load_memory` returns.
    #[serde(default = "default_recent_message_limit")]
    pub recent_message_limit: i64,
}

fn default_pool_min() -> u32 {
    3
}

fn default_pool_max() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_command_timeout() -> u64 {
    60
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_hnsw_m() -> u32 {
    16
}

fn default_hnsw_ef_construction() -> u32 {
    64
}

fn default_hnsw_ef_search() -> u32 {
    100
}

fn default_recent_message_limit() -> i64 {
    20
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_min_connections: default_pool_min(),
            pool_max_connections: default_pool_max(),
            acquire_timeout_secs: default_acquire_timeout(),
            command_timeout_secs: default_command_timeout(),
            embedding_dimension: default_embedding_dimension(),
            hnsw_m: default_hnsw_m(),
            hnsw_ef_construction: default_hnsw_ef_construction(),
            hnsw_ef_search: default_hnsw_ef_search(),
            recent_message_limit: default_recent_message_limit(),
        }
    }
}
