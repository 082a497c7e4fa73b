//! Shared domain types for Scambait.
//!
//! This crate contains the domain types used across the scam-engagement
//! memory subsystem: extracted entities, sessions, messages, intelligence
//! events, learning signals, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod entity;
pub mod error;
pub mod session;
pub mod signal;
