use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::smoothing::Smoothing;

/// Largest supported keystream reuse count.
///
/// Slots `1..K` are enumerated over the whole alphabet, so one position costs
/// `96^(K - 1)` expansions per beam candidate.
pub const MAX_KEYSTREAM_REUSE: usize = 4;

/// Beam-search parameters.
///
/// # Invariants (checked by [`SearchConfig::validate`])
/// - `max_order >= 1`
/// - `prune_number >= 1`
/// - `2 <= keystream_reuse <= MAX_KEYSTREAM_REUSE`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchConfig {
	/// Maximum n-gram order used to score a new character.
	pub max_order: usize,

	/// Beam width: number of candidates kept after each position.
	pub prune_number: usize,

	/// Number of plaintexts XOR-combined into the ciphertext (K).
	pub keystream_reuse: usize,

	/// Probability estimator used for the cache and its fallback.
	pub smoothing: Smoothing,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			max_order: 3,
			prune_number: 100,
			keystream_reuse: 2,
			smoothing: Smoothing::default(),
		}
	}
}

impl SearchConfig {
	/// Creates a validated configuration.
	pub fn new(max_order: usize, prune_number: usize, keystream_reuse: usize, smoothing: Smoothing) -> Result<Self> {
		let config = Self { max_order, prune_number, keystream_reuse, smoothing };
		config.validate()?;
		Ok(config)
	}

	/// Checks the invariants listed on the type.
	pub fn validate(&self) -> Result<()> {
		if self.max_order == 0 {
			return Err(Error::InvalidConfig("n-gram order must be >= 1".to_owned()));
		}
		if self.prune_number == 0 {
			return Err(Error::InvalidConfig("beam width must be >= 1".to_owned()));
		}
		if !(2..=MAX_KEYSTREAM_REUSE).contains(&self.keystream_reuse) {
			return Err(Error::InvalidConfig(format!(
				"keystream reuse must be between 2 and {}, got {}",
				MAX_KEYSTREAM_REUSE, self.keystream_reuse
			)));
		}
		Ok(())
	}
}
