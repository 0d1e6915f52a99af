//! Many-time-pad plaintext recovery.
//!
//! Given the byte-wise XOR of K plaintexts encrypted under the same keystream,
//! this crate ranks the most probable plaintext tuples by combining the XOR
//! constraint with a character n-gram language model, explored by beam search:
//! - Concurrent n-gram indexing of a training corpus
//! - Laplace and Kneser-Ney smoothing
//! - A log-probability cache consulted by the search
//! - Beam search with deduplication of swapped plaintext tuples

/// The 96-symbol printable alphabet.
pub mod alphabet;

/// Cooperative cancellation.
pub mod cancel;

/// Error type shared by the whole crate.
pub mod error;

/// Corpus loading helpers.
pub mod io;

/// N-gram tables, indexing, smoothing and the language model cache.
pub mod model;

/// Candidate states and the beam-search engine.
pub mod search;

pub use cancel::CancelFlag;
pub use error::{Error, Result};
