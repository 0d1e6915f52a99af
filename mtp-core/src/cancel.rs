use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Cooperative cancellation flag shared between a caller and long-running work.
///
/// Cloning is cheap: all clones observe the same flag. Workers poll it at
/// well-defined boundaries (indexing worker start/end, beam-search positions)
/// so an early stop never leaves shared state half-written.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
	cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}

	/// Returns `Err(Error::Cancelled)` once cancellation was requested.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			return Err(Error::Cancelled);
		}
		Ok(())
	}
}
