use std::collections::HashMap;

use log::{error, info};
use rayon::prelude::*;

use super::frequency::FrequencyTables;
use super::smoothing::{Estimator, Smoothing};

/// Natural logarithm of an estimator output.
///
/// Estimators never return 0 or a negative value; reaching this with one is a
/// bug in the estimator, not a recoverable condition.
///
/// # Panics
/// Panics if `probability` is not strictly positive.
fn ln(probability: f64) -> f64 {
	if !(probability > 0.0) {
		error!("Non-positive probability {} reached a logarithm", probability);
		panic!("non-positive probability {}", probability);
	}
	probability.ln()
}

/// Precomputed log-probabilities for every n-gram observed in the corpus.
///
/// The value stored for an n-gram `g` is the log-probability of `g` as a
/// sequence, chaining the estimator over its prefixes:
/// `lp(g) = lp(g[..len - 1]) + ln P(g)` with `lp("") = 0`.
///
/// Consequently `lp(g) - lp(context)` is the conditional log-probability of
/// the last byte of `g`, which is how the beam search consumes it.
///
/// # Invariants
/// - The empty string is always present with log-probability 0
/// - Entries exist only for observed n-grams; a miss is resolved through the
///   estimator, never treated as probability zero
/// - Read-only after construction
pub struct LanguageModel<'a> {
	estimator: Box<dyn Estimator + 'a>,
	log_probs: HashMap<Vec<u8>, f64>,
}

impl<'a> LanguageModel<'a> {
	/// Builds the cache with the estimator of the given smoothing policy.
	pub fn new(tables: &'a FrequencyTables, smoothing: Smoothing) -> Self {
		info!("Building {:?} language model", smoothing);
		Self::with_estimator(tables, smoothing.estimator(tables))
	}

	/// Builds the cache over `tables` using an arbitrary estimator.
	///
	/// Orders are processed in increasing length so that every prefix of an
	/// n-gram is cached before the n-gram itself.
	pub fn with_estimator(tables: &FrequencyTables, estimator: Box<dyn Estimator + 'a>) -> Self {
		let mut log_probs: HashMap<Vec<u8>, f64> = HashMap::with_capacity(tables.vocabulary_size() as usize + 1);
		log_probs.insert(Vec::new(), 0.0);

		for (_, table) in tables.tables() {
			let entries: Vec<(Vec<u8>, f64)> = table
				.par_iter()
				.map(|(ngram, _)| {
					let prefix = log_probs.get(&ngram[..ngram.len() - 1]).copied().unwrap_or(0.0);
					(ngram.clone(), prefix + ln(estimator.probability(ngram)))
				})
				.collect();
			log_probs.extend(entries);
		}

		info!("Language model holds {} entries", log_probs.len());
		Self { estimator, log_probs }
	}

	/// Log-probability of `ngram` as a sequence.
	///
	/// Served from the cache when present, otherwise composed from the longest
	/// cached prefix through the estimator.
	pub fn log_prob(&self, ngram: &[u8]) -> f64 {
		if let Some(&log_prob) = self.log_probs.get(ngram) {
			return log_prob;
		}
		// "" is always cached, so ngram is non-empty here
		let prefix = &ngram[..ngram.len() - 1];
		self.log_prob(prefix) + ln(self.estimator.probability(ngram))
	}

	/// Conditional log-probability of the last byte of `ngram` given the rest.
	pub fn conditional_log_prob(&self, ngram: &[u8]) -> f64 {
		match ngram.len() {
			0 => 0.0,
			n => self.log_prob(ngram) - self.log_prob(&ngram[..n - 1]),
		}
	}

	pub fn is_cached(&self, ngram: &[u8]) -> bool {
		self.log_probs.contains_key(ngram)
	}

	/// Number of cached entries, the empty string included.
	pub fn len(&self) -> usize {
		self.log_probs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.log_probs.is_empty()
	}

	pub fn estimator(&self) -> &dyn Estimator {
		self.estimator.as_ref()
	}
}
