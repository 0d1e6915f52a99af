use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use rayon::slice::ParallelSliceMut;

use super::xor::forced_byte;
use crate::model::language_model::LanguageModel;

/// One beam-search state: K equal-length partial plaintexts and their running
/// log-likelihoods.
///
/// Two candidates are equal when their plaintexts match as an unordered tuple
/// (which slot holds which string is arbitrary); scores are ignored.
#[derive(Clone, Debug)]
pub struct Candidate {
	plaintexts: Vec<Vec<u8>>,
	scores: Vec<f64>,
}

impl Candidate {
	/// K empty plaintexts, each with log-likelihood 0.
	pub fn empty(slots: usize) -> Self {
		Self {
			plaintexts: vec![Vec::new(); slots],
			scores: vec![0.0; slots],
		}
	}

	pub fn plaintexts(&self) -> &[Vec<u8>] {
		&self.plaintexts
	}

	/// Per-slot cumulative log-likelihoods.
	pub fn scores(&self) -> &[f64] {
		&self.scores
	}

	/// Combined ranking key: the sum of the slot log-likelihoods.
	pub fn score(&self) -> f64 {
		self.scores.iter().sum()
	}

	/// Current plaintext length (identical for every slot).
	pub fn len(&self) -> usize {
		self.plaintexts.first().map_or(0, Vec::len)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Extends every slot by one byte.
	///
	/// `chosen` holds the next byte of the first K-1 slots; the last slot is
	/// forced so that the K new bytes XOR to `cipher_byte`. Each slot score is
	/// updated with the chain rule over an n-gram of order
	/// `min(max_order, new length)`:
	/// `score + (lp(ngram) - lp(context))`.
	pub fn extend(&self, chosen: &[u8], cipher_byte: u8, model: &LanguageModel, max_order: usize) -> Self {
		debug_assert_eq!(chosen.len() + 1, self.plaintexts.len());
		let forced = forced_byte(cipher_byte, chosen);

		let mut plaintexts = Vec::with_capacity(self.plaintexts.len());
		let mut scores = Vec::with_capacity(self.scores.len());
		let next_bytes = chosen.iter().copied().chain(std::iter::once(forced));
		for ((plaintext, score), next) in self.plaintexts.iter().zip(&self.scores).zip(next_bytes) {
			let mut extended = Vec::with_capacity(plaintext.len() + 1);
			extended.extend_from_slice(plaintext);
			extended.push(next);

			let order = max_order.min(extended.len());
			let ngram = &extended[extended.len() - order..];
			scores.push(score + model.conditional_log_prob(ngram));
			plaintexts.push(extended);
		}

		Self { plaintexts, scores }
	}

	/// Slots sorted, the representation equality and hashing work on.
	fn canonical(&self) -> Vec<&[u8]> {
		let mut slots: Vec<&[u8]> = self.plaintexts.iter().map(Vec::as_slice).collect();
		slots.sort_unstable();
		slots
	}

	/// Ranking order: descending combined score, ties broken by ascending
	/// plaintexts (slot 1 first).
	pub fn rank(&self, other: &Self) -> Ordering {
		other
			.score()
			.total_cmp(&self.score())
			.then_with(|| self.plaintexts.cmp(&other.plaintexts))
	}
}

impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.canonical() == other.canonical()
	}
}

impl Eq for Candidate {}

impl Hash for Candidate {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.canonical().hash(state);
	}
}

impl fmt::Display for Candidate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[ ")?;
		for (i, plaintext) in self.plaintexts.iter().enumerate() {
			if i > 0 {
				write!(f, " | ")?;
			}
			write!(f, "\"{}\"", plaintext.escape_ascii())?;
		}
		write!(f, " ] log prob: {:.4}", self.score())
	}
}

/// Sorts candidates with [`Candidate::rank`], in parallel for large pools.
pub fn sort_candidates(candidates: &mut [Candidate]) {
	candidates.par_sort_by(Candidate::rank);
}

/// Drops every candidate equal to one seen earlier in the list.
///
/// The first occurrence survives, so running this on a ranked list keeps the
/// best-ranked representative. Idempotent.
pub fn deduplicate(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
	let keep: Vec<bool> = {
		let mut seen = HashSet::with_capacity(candidates.len());
		candidates.iter().map(|candidate| seen.insert(candidate)).collect()
	};
	let mut keep = keep.into_iter();
	candidates.retain(|_| keep.next().unwrap_or(false));
	candidates
}

/// Keeps the first `prune_number` candidates. Never pads.
pub fn prune(mut candidates: Vec<Candidate>, prune_number: usize) -> Vec<Candidate> {
	candidates.truncate(prune_number);
	candidates
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(plaintexts: &[&str], scores: &[f64]) -> Candidate {
		Candidate {
			plaintexts: plaintexts.iter().map(|p| p.as_bytes().to_vec()).collect(),
			scores: scores.to_vec(),
		}
	}

	#[test]
	fn equality_ignores_slot_order_and_score() {
		let a = candidate(&["the", "cat"], &[-1.0, -2.0]);
		let b = candidate(&["cat", "the"], &[-5.0, -5.0]);
		let c = candidate(&["the", "car"], &[-1.0, -2.0]);
		assert_eq!(a, b);
		assert_ne!(a, c);

		let set: HashSet<&Candidate> = [&a, &b, &c].into_iter().collect();
		assert_eq!(set.len(), 2);
	}

	#[test]
	fn deduplicate_keeps_first_and_is_idempotent() {
		let list = vec![
			candidate(&["ab", "cd"], &[-1.0, -1.0]),
			candidate(&["xy", "zw"], &[-2.0, -1.0]),
			candidate(&["cd", "ab"], &[-1.0, -1.0]),
			candidate(&["ab", "cd"], &[-1.0, -1.0]),
		];
		let once = deduplicate(list);
		assert_eq!(once.len(), 2);
		assert_eq!(once[0].plaintexts()[0], b"ab");

		let twice = deduplicate(once.clone());
		assert_eq!(twice.len(), once.len());
		for (x, y) in once.iter().zip(&twice) {
			assert_eq!(x.plaintexts(), y.plaintexts());
		}
	}

	#[test]
	fn sort_is_descending_with_lexicographic_ties() {
		let mut list = vec![
			candidate(&["b", "a"], &[-1.0, -1.0]),
			candidate(&["z", "z"], &[-0.5, -0.5]),
			candidate(&["a", "b"], &[-1.0, -1.0]),
			candidate(&["q", "q"], &[-3.0, 0.0]),
		];
		sort_candidates(&mut list);
		let order: Vec<String> = list.iter().map(|c| String::from_utf8_lossy(&c.plaintexts()[0]).into_owned()).collect();
		assert_eq!(order, vec!["z", "a", "b", "q"]);
	}

	#[test]
	fn prune_never_grows_and_keeps_small_beams() {
		let list: Vec<Candidate> = (0..5)
			.map(|i| {
				let name = i.to_string();
				candidate(&[name.as_str(), "x"], &[0.0, 0.0])
			})
			.collect();
		assert_eq!(prune(list.clone(), 3).len(), 3);
		assert_eq!(prune(list.clone(), 5).len(), 5);
		assert_eq!(prune(list, 100).len(), 5);
	}

	#[test]
	fn display_renders_slots_and_score() {
		let c = candidate(&["the", "ca\r"], &[-1.0, -1.5]);
		assert_eq!(c.to_string(), "[ \"the\" | \"ca\\r\" ] log prob: -2.5000");
	}
}
