use std::sync::atomic::{AtomicUsize, Ordering};

use mtp_core::model::frequency::FrequencyTables;
use mtp_core::model::indexer::{IndexerConfig, NGramIndexer};
use mtp_core::model::language_model::LanguageModel;
use mtp_core::model::smoothing::{Estimator, KneserNey, Smoothing};
use mtp_core::search::beam::BeamSearch;
use mtp_core::search::candidate::Candidate;
use mtp_core::search::config::SearchConfig;
use mtp_core::search::recover_plaintexts;
use mtp_core::search::xor::{combine, forced_byte};

const CORPUS: &[u8] = b"the cat sat on the mat the cat ran";

fn tables(max_order: usize) -> FrequencyTables {
	NGramIndexer::new(IndexerConfig { max_order, workers: None })
		.unwrap()
		.index(CORPUS)
		.unwrap()
}

/// Scores a fixed slot-1 plaintext the way the search would.
fn score_of(slot_one: &[u8], ciphertext: &[u8], model: &LanguageModel, max_order: usize) -> Candidate {
	slot_one
		.iter()
		.zip(ciphertext)
		.fold(Candidate::empty(2), |candidate, (&byte, &cipher_byte)| {
			candidate.extend(&[byte], cipher_byte, model, max_order)
		})
}

fn holds(candidate: &Candidate, a: &[u8], b: &[u8]) -> bool {
	let plaintexts = candidate.plaintexts();
	(plaintexts[0] == a && plaintexts[1] == b) || (plaintexts[0] == b && plaintexts[1] == a)
}

#[test]
fn recovers_the_cat_without_pruning() {
	let tables = tables(3);
	let ciphertext = combine(&["the", "cat"]).unwrap();

	for smoothing in [Smoothing::KneserNey, Smoothing::Laplace] {
		let config = SearchConfig::new(3, 96usize.pow(3), 2, smoothing).unwrap();
		let beam = recover_plaintexts(&tables, &ciphertext, config).unwrap();

		let found = beam
			.iter()
			.find(|candidate| holds(candidate, b"the", b"cat"))
			.unwrap_or_else(|| panic!("{:?}: the/cat missing from {} candidates", smoothing, beam.len()));

		let model = LanguageModel::new(&tables, smoothing);
		let noise = score_of(b"zzz", &ciphertext, &model, 3);
		assert_eq!(noise.plaintexts()[1], b"msk");
		assert!(found.score() > noise.score(), "{:?}: {} <= {}", smoothing, found, noise);

		// Ranked output, one representative per unordered pair
		assert!(beam.windows(2).all(|w| w[0].score() >= w[1].score()));
		let swapped = beam.iter().filter(|candidate| holds(candidate, b"the", b"cat")).count();
		assert_eq!(swapped, 1);
	}
}

#[test]
fn shared_prefix_survives_a_pruned_beam() {
	let tables = tables(3);
	let ciphertext = combine(&["the cat", "the mat"]).unwrap();
	let config = SearchConfig::new(3, 1000, 2, Smoothing::KneserNey).unwrap();

	let beam = recover_plaintexts(&tables, &ciphertext, config).unwrap();
	assert_eq!(beam.len(), 1000);
	assert!(beam.iter().any(|candidate| holds(candidate, b"the cat", b"the mat")));
}

/// Kneser-Ney wrapper recording the longest n-gram it was asked about.
struct LengthRecorder<'a> {
	inner: KneserNey<'a>,
	longest: &'a AtomicUsize,
}

impl Estimator for LengthRecorder<'_> {
	fn probability(&self, ngram: &[u8]) -> f64 {
		self.longest.fetch_max(ngram.len(), Ordering::Relaxed);
		self.inner.probability(ngram)
	}
}

#[test]
fn unigram_model_never_backs_off() {
	let tables = tables(1);
	let longest = AtomicUsize::new(0);
	let recorder = LengthRecorder { inner: KneserNey::new(&tables), longest: &longest };
	let continuation_total: u64 = (0..=255u8).map(|b| recorder.inner.continuation_count(b) as u64).sum();
	assert_eq!(continuation_total, recorder.inner.distinct_bigrams());

	let model = LanguageModel::with_estimator(&tables, Box::new(recorder));

	let ciphertext = combine(&["cat sat", "the mat"]).unwrap();
	let config = SearchConfig::new(1, 20, 2, Smoothing::KneserNey).unwrap();
	let beam = BeamSearch::new(&model, config, &ciphertext).unwrap().run().unwrap();
	assert_eq!(beam.len(), 20);

	let longest = longest.load(Ordering::Relaxed);
	assert!(longest <= 1, "estimator queried an n-gram of length {}", longest);
}

#[test]
fn forced_slot_matches_the_ciphertext() {
	let ciphertext = combine(&["the", "cat"]).unwrap();
	let recovered: Vec<u8> = b"the".iter().zip(&ciphertext).map(|(&b, &c)| forced_byte(c, &[b])).collect();
	assert_eq!(recovered, b"cat");
}
