use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for analysis submissions.
///
/// Every submission draws a fresh generation; completion handlers compare a
/// result's generation against the latest one to discard superseded work.
#[derive(Debug, Default, Clone)]
pub struct AnalysisGenerations {
	next: Arc<AtomicU64>,
}

impl AnalysisGenerations {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the most recently issued generation (0 before the first).
	pub fn latest(&self) -> u64 {
		self.next.load(Ordering::Acquire)
	}
}

/// Generation-scoped cooperative cancellation token for one analysis request.
///
/// Single-use: one submission issues one token, and the token sees exactly
/// one terminal outcome (complete, cancelled, or failed). Resubmission
/// cancels the old token and issues a fresh one; backends observe the token
/// at stage boundaries and abort promptly, never pre-emptively.
#[derive(Debug, Clone)]
pub struct AnalysisToken {
	generation: u64,
	cancel: CancellationToken,
}

impl AnalysisToken {
	/// Creates a token for the given generation.
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns the generation this token belongs to.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation has been requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Creates a child token in the same generation.
	pub fn child(&self) -> Self {
		Self {
			generation: self.generation,
			cancel: self.cancel.child_token(),
		}
	}
}
