use thiserror::Error;

/// Errors surfaced by the indexing and search pipeline.
///
/// Model-evaluation gaps (an n-gram missing from the cache) are never errors:
/// they are recovered through the smoothing estimator.
#[derive(Error, Debug)]
pub enum Error {
	/// A caller-supplied parameter is out of range (order, beam width, K...).
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// The corpus contains no bytes, nothing can be indexed.
	#[error("Corpus is empty")]
	EmptyCorpus,

	/// An indexing worker panicked or never delivered its partial tables.
	#[error("Indexing worker failed: {0}")]
	WorkerFailed(String),

	/// A cooperative cancellation request was observed.
	#[error("Operation cancelled")]
	Cancelled,

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Binary model (de)serialization failed.
	#[error("Persistence error: {0}")]
	Persistence(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
