use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::frequency::FrequencyTables;

/// Discount used when the corpus statistics cannot define one
/// (no n-gram occurs exactly once).
pub const FALLBACK_DISCOUNT: f64 = 0.5;

/// Number of distinct byte values, the support of the Kneser-Ney base case.
const BYTE_VALUES: f64 = 256.0;

/// A smoothed probability estimate for arbitrary n-grams.
///
/// Implementations are pure functions of the frequency tables: they are total
/// over every byte string (including the empty string and unseen n-grams) and
/// always return a value in `(0, 1]`.
pub trait Estimator: Send + Sync {
	/// Probability of the last byte of `ngram` given the bytes before it.
	fn probability(&self, ngram: &[u8]) -> f64;
}

/// Smoothing policy selector.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Smoothing {
	/// Additive (add-one) smoothing.
	Laplace,
	/// Absolute discounting with Kneser-Ney continuation counts.
	#[default]
	KneserNey,
}

impl Smoothing {
	/// Builds the estimator for this policy over `tables`.
	pub fn estimator<'a>(&self, tables: &'a FrequencyTables) -> Box<dyn Estimator + 'a> {
		match self {
			Smoothing::Laplace => Box::new(Laplace::new(tables)),
			Smoothing::KneserNey => Box::new(KneserNey::new(tables)),
		}
	}
}

/// Additive smoothing.
///
/// - `P(g) = (count(g) + 1) / (corpus_len + V)` for single bytes
/// - `P(g) = (count(g) + 1) / (count(context) + V)` otherwise
///
/// where `V` is the vocabulary size (sum of all table sizes).
#[derive(Debug)]
pub struct Laplace<'a> {
	tables: &'a FrequencyTables,
	vocabulary: f64,
}

impl<'a> Laplace<'a> {
	pub fn new(tables: &'a FrequencyTables) -> Self {
		Self { tables, vocabulary: tables.vocabulary_size() as f64 }
	}
}

impl Estimator for Laplace<'_> {
	fn probability(&self, ngram: &[u8]) -> f64 {
		let numerator = self.tables.count(ngram) as f64 + 1.0;
		let denominator = match ngram.len() {
			0 => return 1.0,
			1 => self.tables.corpus_len() as f64,
			n => self.tables.count(&ngram[..n - 1]) as f64,
		} + self.vocabulary;
		numerator / denominator
	}
}

/// Computes the global discount `D = n1 / (n1 + 2 * n2)`.
///
/// `n1` and `n2` are the number of distinct n-grams, pooled over every order,
/// seen exactly once and exactly twice. Falls back to [`FALLBACK_DISCOUNT`]
/// when `n1` is 0.
pub fn discount(tables: &FrequencyTables) -> f64 {
	let (mut n1, mut n2) = (0u64, 0u64);
	for (_, table) in tables.tables() {
		for &count in table.values() {
			match count {
				1 => n1 += 1,
				2 => n2 += 1,
				_ => (),
			}
		}
	}

	if n1 == 0 {
		return FALLBACK_DISCOUNT;
	}
	n1 as f64 / (n1 + 2 * n2) as f64
}

/// Kneser-Ney back-off estimator with a single global discount.
///
/// - Base case (one byte): continuation probability, the share of distinct
///   bigrams ending in that byte, discounted and interpolated with a uniform
///   distribution over all byte values so unseen bytes keep some mass
/// - Recursive case: `max(count(g) - D, 0) / count(c) + λ(c) * P(g[1..])`
///   with `λ(c) = D / count(c) * followers(c)`
/// - A context never seen (or only seen at the very end of the corpus, with no
///   follower) falls through to the lower-order estimate
#[derive(Debug)]
pub struct KneserNey<'a> {
	tables: &'a FrequencyTables,
	discount: f64,

	/// `followers[i]`: context of length `i + 1` → number of distinct n-grams
	/// of length `i + 2` starting with it.
	followers: Vec<HashMap<&'a [u8], u32>>,

	/// Distinct bytes preceding each byte value.
	continuations: [u32; 256],

	/// Total number of distinct bigrams.
	distinct_bigrams: u64,

	/// Number of byte values with a non-zero continuation count.
	continued: u32,
}

impl<'a> KneserNey<'a> {
	pub fn new(tables: &'a FrequencyTables) -> Self {
		let followers = tables
			.tables()
			.skip(1)
			.map(|(order, table)| {
				let mut followers: HashMap<&'a [u8], u32> = HashMap::new();
				for ngram in table.keys() {
					*followers.entry(&ngram[..order - 1]).or_insert(0) += 1;
				}
				followers
			})
			.collect();

		let bigrams = tables.bigrams();
		let mut continuations = [0u32; 256];
		for (next, count) in continuations.iter_mut().enumerate() {
			*count = bigrams.continuation_count(next as u8);
		}

		Self {
			tables,
			discount: discount(tables),
			followers,
			continuations,
			distinct_bigrams: bigrams.distinct(),
			continued: continuations.iter().filter(|&&count| count > 0).count() as u32,
		}
	}

	pub fn discount(&self) -> f64 {
		self.discount
	}

	/// Number of distinct bigrams ending in `byte`.
	pub fn continuation_count(&self, byte: u8) -> u32 {
		self.continuations[byte as usize]
	}

	pub fn distinct_bigrams(&self) -> u64 {
		self.distinct_bigrams
	}

	/// Number of distinct n-grams of length `context.len() + 1` starting with `context`.
	pub fn distinct_followers(&self, context: &[u8]) -> u32 {
		context
			.len()
			.checked_sub(1)
			.and_then(|i| self.followers.get(i))
			.and_then(|followers| followers.get(context))
			.copied()
			.unwrap_or(0)
	}

	fn unigram(&self, byte: u8) -> f64 {
		if self.distinct_bigrams == 0 {
			return 1.0 / BYTE_VALUES;
		}
		let total = self.distinct_bigrams as f64;
		let discounted = (self.continuation_count(byte) as f64 - self.discount).max(0.0) / total;
		let uniform_weight = self.discount * self.continued as f64 / total;
		discounted + uniform_weight / BYTE_VALUES
	}
}

impl Estimator for KneserNey<'_> {
	fn probability(&self, ngram: &[u8]) -> f64 {
		match ngram {
			[] => 1.0,
			[byte] => self.unigram(*byte),
			[_, lower @ ..] => {
				let lower = self.probability(lower);
				let context = &ngram[..ngram.len() - 1];
				let context_count = self.tables.count(context);
				let followers = self.distinct_followers(context);
				if context_count == 0 || followers == 0 {
					return lower;
				}

				let context_count = context_count as f64;
				let discounted = (self.tables.count(ngram) as f64 - self.discount).max(0.0) / context_count;
				let lambda = self.discount / context_count * followers as f64;
				discounted + lambda * lower
			}
		}
	}
}
