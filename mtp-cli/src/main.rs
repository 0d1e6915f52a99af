mod scenario;

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::info;

use mtp_core::io::read_corpus;
use mtp_core::model::indexer::{IndexerConfig, NGramIndexer};
use mtp_core::model::language_model::LanguageModel;
use mtp_core::model::smoothing::Smoothing;
use mtp_core::search::beam::BeamSearch;
use mtp_core::search::candidate::Candidate;
use mtp_core::search::config::SearchConfig;

use scenario::Scenario;

/// Probability estimator exposed on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum SmoothingArg {
	Laplace,
	KneserNey,
}

impl From<SmoothingArg> for Smoothing {
	fn from(value: SmoothingArg) -> Self {
		match value {
			SmoothingArg::Laplace => Smoothing::Laplace,
			SmoothingArg::KneserNey => Smoothing::KneserNey,
		}
	}
}

/// Recover plaintexts encrypted under a reused keystream.
///
/// Picks random plaintexts from the corpus, XORs them, then tries to recover
/// them with an n-gram language model trained on the same corpus.
#[derive(Parser, Debug)]
#[command(name = "mtp")]
struct Args {
	/// Corpus file or directory used to train the language model
	#[arg(short = 'c', long)]
	corpus: PathBuf,

	/// Maximum n-gram order
	#[arg(short = 'n', long = "order", default_value_t = 3)]
	order: usize,

	/// Length of the generated plaintexts
	#[arg(short = 'l', long = "plaintext-length", visible_alias = "pl", default_value_t = 10)]
	plaintext_length: usize,

	/// Beam width: candidates kept after each position
	#[arg(short = 'P', long = "prune", default_value_t = 100)]
	prune: usize,

	/// Number of plaintexts XOR-combined (keystream reuse count)
	#[arg(short = 'k', long = "reuse", default_value_t = 2)]
	reuse: usize,

	/// Percentage of the ranked list inspected when judging success
	#[arg(short = 't', long = "top", default_value_t = 10)]
	top: usize,

	/// Smoothing policy of the language model
	#[arg(short = 's', long, value_enum, default_value_t = SmoothingArg::KneserNey)]
	smoothing: SmoothingArg,

	/// Do not read or write the binary frequency-table cache
	#[arg(long)]
	no_cache: bool,
}

fn main() {
	env_logger::init();

	// Help goes to stdout with status 0, usage errors to stderr with status 1
	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			let code = if e.use_stderr() { 1 } else { 0 };
			let _ = e.print();
			process::exit(code);
		}
	};

	if let Err(e) = run(&args) {
		eprintln!("Error: {}", e);
		process::exit(1);
	}
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
	let config = SearchConfig::new(args.order, args.prune, args.reuse, args.smoothing.into())?;
	let indexer = NGramIndexer::new(IndexerConfig { max_order: args.order, workers: None })?;

	let corpus = read_corpus(&args.corpus)
		.map_err(|e| format!("Cannot read corpus {}: {}", args.corpus.display(), e))?;
	let tables = if args.no_cache {
		indexer.index(&corpus)?
	} else {
		indexer.load_or_index(&args.corpus, &corpus)?
	};

	let scenario = Scenario::generate(&corpus, args.reuse, args.plaintext_length, &mut rand::rng())?;
	for (i, plaintext) in scenario.plaintexts.iter().enumerate() {
		println!("Plaintext {}: \"{}\"", i + 1, plaintext.escape_ascii());
	}

	let model = LanguageModel::new(&tables, config.smoothing);
	let candidates = BeamSearch::new(&model, config, &scenario.ciphertext)?.run()?;
	info!("Recovered {} candidates", candidates.len());

	report(&candidates, &scenario, args.top);
	Ok(())
}

/// Prints the ranked candidates and whether the true plaintexts made the top
/// `top_percent` of the list.
fn report(candidates: &[Candidate], scenario: &Scenario, top_percent: usize) {
	for (rank, candidate) in candidates.iter().enumerate() {
		println!("{:>4}. {}", rank + 1, candidate);
	}

	let inspected = (candidates.len() * top_percent).div_ceil(100).max(1);
	match scenario.rank_in(candidates) {
		Some(rank) if rank < inspected => {
			println!("Success: plaintexts ranked {} (top {}%)", rank + 1, top_percent)
		}
		Some(rank) => println!("Partial: plaintexts ranked {}, outside the top {}%", rank + 1, top_percent),
		None => println!("Failure: plaintexts not among the {} candidates", candidates.len()),
	}
}
