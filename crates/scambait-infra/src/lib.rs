//! Infrastructure layer for Scambait.
//!
//! Contains implementations of the traits defined in `scambait-core`:
//! the Postgres/pgvector session store with its advisory-lock concurrency
//! guard and learning-index queries, the fastembed local embedder, and an
//! in-memory fallback backend for tests and database-less deployments.

pub mod config;
pub mod embed;
pub mod memory;
pub mod postgres;
