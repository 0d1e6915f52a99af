//! Character-level n-gram language model.
//!
//! - Per-order frequency tables (`FrequencyTables`)
//! - Parallel corpus indexing (`NGramIndexer`)
//! - Laplace and Kneser-Ney estimators (`Estimator`, `Smoothing`)
//! - A precomputed log-probability cache (`LanguageModel`)

/// Per-order n-gram counts, bigram presence and binary persistence.
pub mod frequency;

/// Fork-join corpus indexing.
///
/// Splits the corpus into byte ranges, counts each range on its own thread
/// and sums the partial tables.
pub mod indexer;

/// Precomputed log-probabilities with estimator fallback.
pub mod language_model;

/// Additive and Kneser-Ney smoothing.
pub mod smoothing;
