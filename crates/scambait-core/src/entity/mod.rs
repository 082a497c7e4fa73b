//! Deterministic entity pipeline.
//!
//! `normalize` turns one raw extracted value into its canonical string form
//! (or rejects it); `merge` combines two entity sets into a deduplicated,
//! disambiguated canonical set. Both are pure functions.

pub mod merge;
pub mod normalize;

pub use merge::merge;
pub use normalize::normalize;
