//! Inverted-index document search: tokenization, TF-IDF scoring and phrase matching.

pub mod index;
pub mod persist;
pub mod phrase;
pub mod query;
pub mod scoring;
pub mod tokenizer;

pub use index::*;
pub use query::{QueryEngine, ScoredDoc, SearchConfig};
