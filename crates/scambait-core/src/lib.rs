//! Business logic and backend traits for the Scambait memory subsystem.
//!
//! Contains the deterministic entity pipeline (normalization, merge,
//! disambiguation) and the trait seams the infrastructure layer implements:
//! `Embedder` for text-to-vector conversion and `MemoryBackend` for the
//! orchestration-facing memory contract.

pub mod entity;
pub mod memory;
