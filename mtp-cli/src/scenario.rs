use std::error::Error;

use rand::Rng;

use mtp_core::alphabet;
use mtp_core::search::candidate::Candidate;
use mtp_core::search::xor::combine;

/// Attempts made to find corpus substrings made only of alphabet symbols.
const MAX_ATTEMPTS: usize = 100;

/// A synthetic keystream-reuse case: K plaintexts taken from the corpus and
/// their XOR, which is what an eavesdropper obtains by XORing ciphertexts
/// encrypted under the same keystream.
#[derive(Debug, Clone)]
pub struct Scenario {
	pub plaintexts: Vec<Vec<u8>>,
	pub ciphertext: Vec<u8>,
}

impl Scenario {
	/// Picks `count` random substrings of `length` bytes from `corpus`.
	///
	/// Substrings made only of alphabet symbols are preferred; after
	/// `MAX_ATTEMPTS` tries any substring is accepted.
	///
	/// # Errors
	/// Returns an error if the corpus is shorter than `length` or if `length`
	/// is 0.
	pub fn generate<R: Rng>(corpus: &[u8], count: usize, length: usize, rng: &mut R) -> Result<Self, Box<dyn Error>> {
		if length == 0 {
			return Err("Plaintext length must be >= 1".into());
		}
		if corpus.len() < length {
			return Err(format!("Corpus ({} bytes) is shorter than the plaintext length {}", corpus.len(), length).into());
		}

		let mut plaintexts = Vec::with_capacity(count);
		for _ in 0..count {
			let mut attempts = 0;
			let plaintext = loop {
				let start = rng.random_range(0..=corpus.len() - length);
				let candidate = &corpus[start..start + length];
				attempts += 1;
				if candidate.iter().all(|&b| alphabet::contains(b)) || attempts >= MAX_ATTEMPTS {
					break candidate.to_vec();
				}
			};
			plaintexts.push(plaintext);
		}

		let ciphertext = combine(&plaintexts)?;
		Ok(Self { plaintexts, ciphertext })
	}

	/// Returns `true` if `candidate` holds exactly the scenario plaintexts, in
	/// any slot order.
	pub fn is_recovered_by(&self, candidate: &Candidate) -> bool {
		let mut expected: Vec<&Vec<u8>> = self.plaintexts.iter().collect();
		let mut found: Vec<&Vec<u8>> = candidate.plaintexts().iter().collect();
		expected.sort();
		found.sort();
		expected == found
	}

	/// Rank (0-based) of the scenario plaintexts in `candidates`, if present.
	pub fn rank_in(&self, candidates: &[Candidate]) -> Option<usize> {
		candidates.iter().position(|candidate| self.is_recovered_by(candidate))
	}
}
