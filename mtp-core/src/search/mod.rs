//! Beam-search plaintext recovery over an XOR of reused-keystream ciphertexts.
//!
//! - `Candidate`s hold K partial plaintexts and their log-likelihoods
//! - `BeamSearch` grows them one ciphertext byte at a time
//! - `SearchConfig` carries order, beam width, K and the smoothing policy

/// Beam-search engine (expand, sort, deduplicate, prune).
pub mod beam;

/// Candidate state, ranking, deduplication and pruning.
pub mod candidate;

/// Search parameters and their validation.
pub mod config;

/// XOR helpers for forced plaintext bytes.
pub mod xor;

use crate::error::Result;
use crate::model::frequency::FrequencyTables;
use crate::model::language_model::LanguageModel;
use beam::BeamSearch;
use candidate::Candidate;
use config::SearchConfig;

/// Builds the language model over `tables` and runs a full beam search.
///
/// Returns the final beam, best candidate first.
pub fn recover_plaintexts(tables: &FrequencyTables, ciphertext: &[u8], config: SearchConfig) -> Result<Vec<Candidate>> {
	config.validate()?;
	let model = LanguageModel::new(tables, config.smoothing);
	BeamSearch::new(&model, config, ciphertext)?.run()
}
