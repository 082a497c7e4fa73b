//! Embedding providers.

mod fastembed;

pub use fastembed::FastEmbedder;
