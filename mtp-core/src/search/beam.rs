use log::{debug, info, trace};
use rayon::prelude::*;

use super::candidate::{Candidate, deduplicate, prune, sort_candidates};
use super::config::{MAX_KEYSTREAM_REUSE, SearchConfig};
use crate::alphabet::{ALPHABET, ALPHABET_SIZE};
use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::model::language_model::LanguageModel;

/// Writes the `index`-th tuple of free-slot symbols into `buffer`
/// (base-96 digits, slot 1 least significant).
fn free_symbols(mut index: usize, buffer: &mut [u8]) {
	for symbol in buffer.iter_mut() {
		*symbol = ALPHABET[index % ALPHABET_SIZE];
		index /= ALPHABET_SIZE;
	}
}

/// Expands every candidate of a beam by one position.
///
/// For each candidate, slots `1..K` range over every alphabet symbol and the
/// last slot is forced by XOR, so the pool holds `beam.len() * 96^(K - 1)`
/// candidates. Candidates are expanded in parallel; the pool order is not
/// meaningful until it is sorted.
pub fn expand(beam: &[Candidate], cipher_byte: u8, model: &LanguageModel, config: &SearchConfig) -> Vec<Candidate> {
	let free_slots = config.keystream_reuse - 1;
	let combinations = ALPHABET_SIZE.pow(free_slots as u32);
	let max_order = config.max_order;

	beam.par_iter()
		.flat_map_iter(|candidate| {
			(0..combinations).map(move |index| {
				let mut buffer = [0u8; MAX_KEYSTREAM_REUSE - 1];
				let chosen = &mut buffer[..free_slots];
				free_symbols(index, chosen);
				candidate.extend(chosen, cipher_byte, model, max_order)
			})
		})
		.collect()
}

/// Beam search over the positions of a ciphertext.
///
/// The engine starts from a single candidate of K empty plaintexts and, at
/// every position, expands, sorts, deduplicates and prunes the beam. It never
/// backtracks: what is pruned at a position is gone for the rest of the run.
///
/// # Invariants
/// - After `p` calls to [`BeamSearch::advance`] every candidate holds
///   plaintexts of length `p`
/// - The beam never holds more than `prune_number` candidates
pub struct BeamSearch<'m, 'a> {
	model: &'m LanguageModel<'a>,
	config: SearchConfig,
	ciphertext: Vec<u8>,
	position: usize,
	beam: Vec<Candidate>,
	cancel: CancelFlag,
}

impl<'m, 'a> BeamSearch<'m, 'a> {
	/// Creates a search positioned before the first ciphertext byte.
	///
	/// # Errors
	/// Returns an error if the configuration is invalid (beam width 0,
	/// order 0, keystream reuse out of range).
	pub fn new(model: &'m LanguageModel<'a>, config: SearchConfig, ciphertext: &[u8]) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			model,
			config,
			ciphertext: ciphertext.to_vec(),
			position: 0,
			beam: vec![Candidate::empty(config.keystream_reuse)],
			cancel: CancelFlag::new(),
		})
	}

	/// Attaches a cancellation flag checked at every position boundary.
	pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
		self.cancel = cancel;
		self
	}

	/// Number of positions already decided.
	pub fn position(&self) -> usize {
		self.position
	}

	pub fn is_finished(&self) -> bool {
		self.position >= self.ciphertext.len()
	}

	/// Current beam, best candidate first.
	pub fn beam(&self) -> &[Candidate] {
		&self.beam
	}

	/// Decides one more position.
	///
	/// Returns `Ok(false)` once the whole ciphertext has been consumed.
	///
	/// # Errors
	/// Returns `Error::Cancelled` if cancellation was requested; the beam is
	/// left as it was at the previous position.
	pub fn advance(&mut self) -> Result<bool> {
		let Some(&cipher_byte) = self.ciphertext.get(self.position) else {
			return Ok(false);
		};
		self.cancel.check()?;

		let mut pool = expand(&self.beam, cipher_byte, self.model, &self.config);
		let expanded = pool.len();
		sort_candidates(&mut pool);
		self.beam = prune(deduplicate(pool), self.config.prune_number);
		self.position += 1;

		debug!(
			"Position {}/{}: {} expanded, {} kept",
			self.position,
			self.ciphertext.len(),
			expanded,
			self.beam.len()
		);
		if let Some(best) = self.beam.first() {
			trace!("Best so far: {}", best);
		}
		Ok(true)
	}

	/// Runs the search to the end and returns the ranked candidates.
	pub fn run(mut self) -> Result<Vec<Candidate>> {
		info!(
			"Beam search over {} bytes (K = {}, order {}, beam width {})",
			self.ciphertext.len(),
			self.config.keystream_reuse,
			self.config.max_order,
			self.config.prune_number
		);
		while self.advance()? {}
		info!("Beam search finished with {} candidates", self.beam.len());
		Ok(self.beam)
	}
}
