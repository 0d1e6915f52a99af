use std::collections::HashMap;
use std::hash::{DefaultHasher, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of 64-bit words needed to hold one bit per (previous, next) byte pair.
const BIGRAM_WORDS: usize = 256 * 256 / 64;

/// Set of adjacent byte pairs observed in the corpus.
///
/// Kept independently of the maximum n-gram order so that continuation
/// counts are available even for a unigram model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BigramPresence {
	bits: Vec<u64>,
}

impl Default for BigramPresence {
	fn default() -> Self {
		Self { bits: vec![0; BIGRAM_WORDS] }
	}
}

impl BigramPresence {
	fn index(previous: u8, next: u8) -> (usize, u64) {
		let bit = (previous as usize) << 8 | next as usize;
		(bit / 64, 1 << (bit % 64))
	}

	pub fn insert(&mut self, previous: u8, next: u8) {
		let (word, mask) = Self::index(previous, next);
		self.bits[word] |= mask;
	}

	pub fn contains(&self, previous: u8, next: u8) -> bool {
		let (word, mask) = Self::index(previous, next);
		self.bits[word] & mask != 0
	}

	/// Number of distinct bigrams observed.
	pub fn distinct(&self) -> u64 {
		self.bits.iter().map(|word| word.count_ones() as u64).sum()
	}

	/// Number of distinct bytes observed immediately before `next`.
	pub fn continuation_count(&self, next: u8) -> u32 {
		(0..=255u8).filter(|&previous| self.contains(previous, next)).count() as u32
	}

	fn merge(&mut self, other: &Self) {
		for (word, other_word) in self.bits.iter_mut().zip(&other.bits) {
			*word |= other_word;
		}
	}
}

/// Content fingerprint of a corpus, stored with its tables to detect a stale
/// binary cache.
pub fn corpus_fingerprint(corpus: &[u8]) -> u64 {
	let mut hasher = DefaultHasher::new();
	hasher.write(corpus);
	hasher.finish()
}

/// Per-order n-gram occurrence counts for a corpus.
///
/// # Invariants
/// - `tables[i]` only holds n-grams of length `i + 1`
/// - Every stored count is >= 1
/// - Once returned by the indexer the tables are never mutated again
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FrequencyTables {
	/// Length of the corpus the tables were built from, in bytes.
	corpus_len: usize,

	/// [`corpus_fingerprint`] of that corpus, 0 until the indexer seals the tables.
	fingerprint: u64,

	/// One table per order, indexed by `order - 1`.
	tables: Vec<HashMap<Vec<u8>, u64>>,

	bigrams: BigramPresence,
}

impl FrequencyTables {
	/// Creates empty tables for orders `1..=max_order`.
	pub(crate) fn new(max_order: usize, corpus_len: usize) -> Self {
		Self {
			corpus_len,
			fingerprint: 0,
			tables: vec![HashMap::new(); max_order],
			bigrams: BigramPresence::default(),
		}
	}

	/// Counts every window of every order starting at an offset in `start..end`.
	///
	/// Windows may run past `end` (into the next worker's range) but never past
	/// the end of `corpus`, so the union of disjoint ranges counts each window
	/// exactly once.
	pub(crate) fn add_range(&mut self, corpus: &[u8], start: usize, end: usize) {
		let end = end.min(corpus.len());

		for (i, table) in self.tables.iter_mut().enumerate() {
			let order = i + 1;
			for offset in start..end {
				let Some(ngram) = corpus.get(offset..offset + order) else {
					break;
				};
				if let Some(count) = table.get_mut(ngram) {
					*count += 1;
				} else {
					table.insert(ngram.to_vec(), 1);
				}
			}
		}

		for offset in start..end {
			if let Some(&[previous, next]) = corpus.get(offset..offset + 2) {
				self.bigrams.insert(previous, next);
			}
		}
	}

	/// Merges another set of partial tables into this one.
	///
	/// Occurrence counts for identical n-grams are summed.
	///
	/// # Errors
	/// Returns an error if the maximum orders do not match.
	pub(crate) fn merge(&mut self, other: Self) -> Result<()> {
		if self.max_order() != other.max_order() {
			return Err(Error::InvalidConfig(format!(
				"cannot merge tables of order {} into tables of order {}",
				other.max_order(),
				self.max_order()
			)));
		}

		for (table, other_table) in self.tables.iter_mut().zip(other.tables) {
			if table.is_empty() {
				*table = other_table;
				continue;
			}
			for (ngram, count) in other_table {
				*table.entry(ngram).or_insert(0) += count;
			}
		}
		self.bigrams.merge(&other.bigrams);

		Ok(())
	}

	/// Records which corpus the completed tables describe.
	pub(crate) fn seal(&mut self, corpus: &[u8]) {
		self.fingerprint = corpus_fingerprint(corpus);
	}

	/// Returns `true` if these tables were built from exactly `corpus`.
	pub fn is_built_from(&self, corpus: &[u8]) -> bool {
		self.corpus_len == corpus.len() && self.fingerprint == corpus_fingerprint(corpus)
	}

	pub fn max_order(&self) -> usize {
		self.tables.len()
	}

	pub fn corpus_len(&self) -> usize {
		self.corpus_len
	}

	/// Returns the table of the given order, if it exists.
	pub fn table(&self, order: usize) -> Option<&HashMap<Vec<u8>, u64>> {
		order.checked_sub(1).and_then(|i| self.tables.get(i))
	}

	/// Iterates over `(order, table)` pairs in increasing order.
	pub fn tables(&self) -> impl Iterator<Item = (usize, &HashMap<Vec<u8>, u64>)> {
		self.tables.iter().enumerate().map(|(i, table)| (i + 1, table))
	}

	/// Occurrence count of `ngram`, 0 if it was never observed or if its length
	/// is outside `1..=max_order`.
	pub fn count(&self, ngram: &[u8]) -> u64 {
		self.table(ngram.len())
			.and_then(|table| table.get(ngram))
			.copied()
			.unwrap_or(0)
	}

	/// Sum of the sizes of all per-order tables (not deduplicated across orders).
	pub fn vocabulary_size(&self) -> u64 {
		self.tables.iter().map(|table| table.len() as u64).sum()
	}

	pub fn bigrams(&self) -> &BigramPresence {
		&self.bigrams
	}

	/// Serializes the tables to `path` using `postcard`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads tables previously written by [`FrequencyTables::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}
}
