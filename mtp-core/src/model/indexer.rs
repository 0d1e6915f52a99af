use std::ops::Range;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};

use super::frequency::FrequencyTables;
use crate::cancel::CancelFlag;
use crate::error::{Error, Result};
use crate::io::build_output_path;

/// Extension appended to a corpus path to name its binary cache.
pub const CACHE_EXTENSION: &str = "mtp.bin";

/// Indexing parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexerConfig {
	/// Largest n-gram order to count (`>= 1`).
	pub max_order: usize,

	/// Worker count override. `None` sizes the pool from the hardware.
	pub workers: Option<usize>,
}

impl Default for IndexerConfig {
	fn default() -> Self {
		Self { max_order: 3, workers: None }
	}
}

/// Number of indexing workers to use on this machine.
///
/// Two hardware threads are left for other work when more than two exist.
pub fn default_workers() -> usize {
	let cpus = num_cpus::get();
	if cpus <= 2 { cpus.max(1) } else { cpus - 2 }
}

/// Splits `0..len` into at most `workers` contiguous, non-empty ranges.
fn split_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
	let workers = workers.clamp(1, len.max(1));
	let chunk_size = len.div_ceil(workers).max(1);
	(0..len)
		.step_by(chunk_size)
		.map(|start| start..(start + chunk_size).min(len))
		.collect()
}

/// Counts every n-gram of orders `1..=max_order` in a corpus.
///
/// The corpus is partitioned into ranges of window start offsets; each worker
/// scans its range (reading up to `max_order - 1` bytes past its end) into a
/// private set of tables, and the coordinator sums all partial tables.
#[derive(Debug)]
pub struct NGramIndexer {
	config: IndexerConfig,
	cancel: CancelFlag,
}

impl NGramIndexer {
	/// Creates a new indexer.
	///
	/// # Errors
	/// Returns an error if `max_order` or the worker override is 0.
	pub fn new(config: IndexerConfig) -> Result<Self> {
		if config.max_order == 0 {
			return Err(Error::InvalidConfig("n-gram order must be >= 1".to_owned()));
		}
		if config.workers == Some(0) {
			return Err(Error::InvalidConfig("worker count must be >= 1".to_owned()));
		}
		Ok(Self { config, cancel: CancelFlag::new() })
	}

	/// Attaches a cancellation flag checked by every worker.
	pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn config(&self) -> &IndexerConfig {
		&self.config
	}

	fn workers(&self) -> usize {
		self.config.workers.unwrap_or_else(default_workers)
	}

	/// Indexes `corpus` in parallel.
	///
	/// # Errors
	/// - `EmptyCorpus` if there is nothing to index
	/// - `WorkerFailed` if any worker panicked; no partial result is returned
	/// - `Cancelled` if cancellation was requested before the merge completed
	pub fn index(&self, corpus: &[u8]) -> Result<FrequencyTables> {
		self.index_with(corpus, scan_range)
	}

	/// Fork-join indexing with `scan` as the worker body.
	fn index_with<F>(&self, corpus: &[u8], scan: F) -> Result<FrequencyTables>
	where
		F: Fn(&[u8], Range<usize>, usize, &CancelFlag) -> Result<FrequencyTables> + Sync,
	{
		if corpus.is_empty() {
			return Err(Error::EmptyCorpus);
		}

		let max_order = self.config.max_order;
		let ranges = split_ranges(corpus.len(), self.workers());
		let expected = ranges.len();
		info!("Indexing {} bytes up to order {} with {} workers", corpus.len(), max_order, expected);

		let scan = &scan;
		let mut tables = thread::scope(|scope| {
			let (tx, rx) = mpsc::channel();
			let handles: Vec<_> = ranges
				.into_iter()
				.map(|range| {
					let tx = tx.clone();
					let cancel = &self.cancel;
					scope.spawn(move || {
						let partial = scan(corpus, range, max_order, cancel);
						// The coordinator drains the channel until every sender is gone
						let _ = tx.send(partial);
					})
				})
				.collect();
			drop(tx);

			let mut merged = FrequencyTables::new(max_order, corpus.len());
			let mut received = 0;
			let mut failure = None;
			for partial in rx.iter() {
				received += 1;
				let outcome = partial.and_then(|partial| merged.merge(partial));
				if let Err(e) = outcome {
					failure.get_or_insert(e);
				}
			}

			for handle in handles {
				if handle.join().is_err() {
					failure.get_or_insert(Error::WorkerFailed("worker panicked".to_owned()));
				}
			}

			if let Some(e) = failure {
				return Err(e);
			}
			if received != expected {
				return Err(Error::WorkerFailed(format!("{} of {} partial tables received", received, expected)));
			}
			Ok(merged)
		})?;

		tables.seal(corpus);
		info!("Indexed {} distinct n-grams", tables.vocabulary_size());
		Ok(tables)
	}

	/// Single-threaded indexing over the whole corpus.
	pub fn index_sequential(&self, corpus: &[u8]) -> Result<FrequencyTables> {
		if corpus.is_empty() {
			return Err(Error::EmptyCorpus);
		}
		let mut tables = scan_range(corpus, 0..corpus.len(), self.config.max_order, &self.cancel)?;
		tables.seal(corpus);
		Ok(tables)
	}

	/// Returns the tables of `corpus`, read from its binary cache when the
	/// cache describes exactly these bytes, otherwise indexed and cached.
	///
	/// - The cache lives next to the corpus: `data/books.txt` →
	///   `data/books.txt.mtp.bin`, never the corpus path itself
	/// - A cache built for another maximum order or another corpus content is
	///   rebuilt
	/// - A cache that cannot be decoded is left untouched and not replaced
	/// - Failing to write the cache only logs a warning
	///
	/// # Errors
	/// Same as [`NGramIndexer::index`], plus an error if `corpus_path` has no
	/// file name.
	pub fn load_or_index<P: AsRef<Path>>(&self, corpus_path: P, corpus: &[u8]) -> Result<FrequencyTables> {
		let binary_data_path = build_output_path(&corpus_path, CACHE_EXTENSION)?;
		let mut overwrite = true;

		if binary_data_path.exists() {
			match FrequencyTables::load(&binary_data_path) {
				Ok(tables) if tables.max_order() != self.config.max_order => debug!(
					"Ignoring cached tables of order {} (wanted {})",
					tables.max_order(),
					self.config.max_order
				),
				Ok(tables) if !tables.is_built_from(corpus) => {
					info!("Cached tables in {} are stale, re-indexing", binary_data_path.display())
				}
				Ok(tables) => {
					info!("Loaded frequency tables from {}", binary_data_path.display());
					return Ok(tables);
				}
				Err(e) => {
					warn!("Ignoring unreadable cache {}: {}", binary_data_path.display(), e);
					overwrite = false;
				}
			}
		}

		let tables = self.index(corpus)?;
		if overwrite {
			if let Err(e) = tables.save(&binary_data_path) {
				warn!("Could not write {}: {}", binary_data_path.display(), e);
			}
		}
		Ok(tables)
	}
}

/// Worker body: counts the windows starting in `range` into private tables.
fn scan_range(corpus: &[u8], range: Range<usize>, max_order: usize, cancel: &CancelFlag) -> Result<FrequencyTables> {
	cancel.check()?;
	debug!("Scanning bytes {}..{}", range.start, range.end);

	let mut partial = FrequencyTables::new(max_order, corpus.len());
	partial.add_range(corpus, range.start, range.end);

	cancel.check()?;
	Ok(partial)
}

#[cfg(test)]
mod tests {
	use super::*;

	const CORPUS: &[u8] = b"the cat sat on the mat the cat ran";

	fn indexer(max_order: usize, workers: usize) -> NGramIndexer {
		NGramIndexer::new(IndexerConfig { max_order, workers: Some(workers) }).unwrap()
	}

	#[test]
	fn ranges_cover_the_corpus() {
		assert_eq!(split_ranges(10, 3), vec![0..4, 4..8, 8..10]);
		assert_eq!(split_ranges(2, 8), vec![0..1, 1..2]);
		assert_eq!(split_ranges(5, 1), vec![0..5]);
	}

	#[test]
	fn every_window_is_counted_once() {
		for workers in [1, 2, 3, 7, CORPUS.len()] {
			let tables = indexer(4, workers).index(CORPUS).unwrap();
			for (order, table) in tables.tables() {
				let total: u64 = table.values().sum();
				assert_eq!(total as usize, CORPUS.len() - order + 1, "order {} with {} workers", order, workers);
			}
		}
	}

	#[test]
	fn parallel_matches_sequential() {
		let sequential = indexer(3, 1).index_sequential(CORPUS).unwrap();
		for workers in [2, 5, 11] {
			assert_eq!(indexer(3, workers).index(CORPUS).unwrap(), sequential);
		}
		assert_eq!(sequential.count(b"the"), 3);
		assert_eq!(sequential.count(b"at "), 4);
	}

	#[test]
	fn order_longer_than_corpus_yields_empty_table() {
		let tables = indexer(5, 2).index(b"abc").unwrap();
		assert_eq!(tables.table(3).unwrap().len(), 1);
		assert!(tables.table(4).unwrap().is_empty());
		assert!(tables.table(5).unwrap().is_empty());
	}

	#[test]
	fn rejects_bad_configuration() {
		assert!(NGramIndexer::new(IndexerConfig { max_order: 0, workers: None }).is_err());
		assert!(NGramIndexer::new(IndexerConfig { max_order: 2, workers: Some(0) }).is_err());
		assert!(matches!(indexer(2, 2).index(b""), Err(Error::EmptyCorpus)));
	}

	#[test]
	fn cancellation_fails_the_whole_run() {
		let cancel = CancelFlag::new();
		cancel.cancel();
		let indexer = indexer(3, 4).with_cancel(cancel);
		assert!(matches!(indexer.index(CORPUS), Err(Error::Cancelled)));
	}

	#[test]
	fn worker_panic_fails_the_whole_run() {
		let result = indexer(3, 4).index_with(CORPUS, |corpus, range, max_order, cancel| {
			if range.start > 0 {
				panic!("scan of {:?} failed", range);
			}
			scan_range(corpus, range, max_order, cancel)
		});
		assert!(matches!(result, Err(Error::WorkerFailed(_))));
	}

	#[test]
	fn binary_cache_is_written_and_reused() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("corpus.txt");
		std::fs::write(&corpus_path, CORPUS).unwrap();

		let first = indexer(3, 2).load_or_index(&corpus_path, CORPUS).unwrap();
		let cache_path = dir.path().join("corpus.txt.mtp.bin");
		assert!(cache_path.exists());
		assert_eq!(FrequencyTables::load(&cache_path).unwrap(), first);

		let second = indexer(3, 2).load_or_index(&corpus_path, CORPUS).unwrap();
		assert_eq!(first, second);
		assert!(second.is_built_from(CORPUS));

		// Another order rebuilds and replaces the cache
		let bigram = indexer(2, 2).load_or_index(&corpus_path, CORPUS).unwrap();
		assert_eq!(bigram.max_order(), 2);
		assert_eq!(FrequencyTables::load(&cache_path).unwrap().max_order(), 2);
	}

	#[test]
	fn corpus_with_cache_extension_is_never_overwritten() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("novel.bin");
		std::fs::write(&corpus_path, CORPUS).unwrap();

		let tables = indexer(3, 2).load_or_index(&corpus_path, CORPUS).unwrap();
		assert_eq!(tables.count(b"the"), 3);
		assert_eq!(std::fs::read(&corpus_path).unwrap(), CORPUS);
		assert!(dir.path().join("novel.bin.mtp.bin").exists());
	}

	#[test]
	fn stale_cache_is_rebuilt_for_an_edited_corpus() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("corpus.txt");

		let old = indexer(3, 2).load_or_index(&corpus_path, b"aaaa").unwrap();
		assert_eq!(old.count(b"a"), 4);

		let edited: &[u8] = b"the cat sat on the mat";
		let new = indexer(3, 2).load_or_index(&corpus_path, edited).unwrap();
		assert_eq!(new.corpus_len(), edited.len());
		assert_eq!(new.count(b"t"), 5);
		assert_eq!(new.count(b"a"), 3);
		assert!(FrequencyTables::load(dir.path().join("corpus.txt.mtp.bin")).unwrap().is_built_from(edited));
	}

	#[test]
	fn unreadable_cache_is_left_untouched() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("corpus.txt");
		let cache_path = dir.path().join("corpus.txt.mtp.bin");
		std::fs::write(&cache_path, [0xff, 0xff, 0xff]).unwrap();

		let tables = indexer(3, 2).load_or_index(&corpus_path, CORPUS).unwrap();
		assert!(tables.is_built_from(CORPUS));
		assert_eq!(std::fs::read(&cache_path).unwrap(), [0xff, 0xff, 0xff]);
	}
}
