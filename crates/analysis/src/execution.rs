//! Single-flight analysis execution.
//!
//! # Design
//!
//! [`AnalysisExecutor`] guarantees at most one analysis in flight: a new
//! submission cancels the previous request's token and replaces the inflight
//! handle in one lock hold, so there is never a window where two requests
//! are both considered current. The backend runs on a blocking task and
//! observes its token cooperatively; the executor never aborts threads.
//!
//! Every started request produces exactly one terminal event (completed,
//! cancelled, or failed), tagged with its generation and delivered over an
//! unbounded channel drained by the foreground. A request whose token trips
//! before the backend is even entered produces no event at all; it was
//! simply superseded. Appliers compare event generations against
//! [`AnalysisExecutor::current_generation`], so a stale result can never
//! overwrite a newer one.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::backend::{AnalysisBackend, AnalysisError, AnalysisOptions, SubtreeHandle};
use crate::token::{AnalysisGenerations, AnalysisToken};

/// Terminal outcome of one started analysis request.
#[derive(Clone)]
pub enum AnalysisOutcome {
	/// The backend produced a new tree root.
	Completed(Arc<dyn SubtreeHandle>),
	/// The request was superseded mid-run. Not an error.
	Cancelled,
	/// The backend could not process the text; the diagnostic is opaque to
	/// the pipeline and surfaced to the embedder.
	Failed(String),
}

impl fmt::Debug for AnalysisOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Completed(_) => f.write_str("Completed"),
			Self::Cancelled => f.write_str("Cancelled"),
			Self::Failed(diagnostic) => f.debug_tuple("Failed").field(diagnostic).finish(),
		}
	}
}

/// Completion event tagged with the generation that produced it.
#[derive(Debug)]
pub struct AnalysisEvent {
	/// Generation of the submission this outcome belongs to.
	pub generation: u64,
	/// What happened.
	pub outcome: AnalysisOutcome,
}

struct Inflight {
	token: AnalysisToken,
	task: JoinHandle<()>,
}

/// Runs one analysis request at a time, cancelling the previous one on
/// every new submission.
pub struct AnalysisExecutor {
	backend: Arc<dyn AnalysisBackend>,
	generations: AnalysisGenerations,
	inflight: Mutex<Option<Inflight>>,
	events: mpsc::UnboundedSender<AnalysisEvent>,
}

impl AnalysisExecutor {
	/// Creates an executor over `backend` and returns the completion
	/// channel the foreground drains.
	pub fn new(
		backend: Arc<dyn AnalysisBackend>,
	) -> (Self, mpsc::UnboundedReceiver<AnalysisEvent>) {
		let (events, events_rx) = mpsc::unbounded_channel();
		let executor = Self {
			backend,
			generations: AnalysisGenerations::new(),
			inflight: Mutex::new(None),
			events,
		};
		(executor, events_rx)
	}

	/// Submits a source snapshot for analysis.
	///
	/// Cancels any request currently in flight before starting the new one,
	/// then runs the backend on a blocking task. Returns the generation of
	/// the new request.
	pub fn submit(&self, source: Arc<str>, options: AnalysisOptions) -> u64 {
		let generation = self.generations.next();
		let token = AnalysisToken::new(generation);

		let backend = Arc::clone(&self.backend);
		let events = self.events.clone();
		let task_token = token.clone();

		// Replace-and-cancel under one lock hold: no window where two
		// requests are both current.
		let mut inflight = self.inflight.lock();
		if let Some(previous) = inflight.take() {
			trace!(
				superseded = previous.token.generation(),
				generation,
				"analysis.supersede"
			);
			previous.token.cancel();
		}

		let task = tokio::task::spawn_blocking(move || {
			run_analysis(&*backend, &source, &options, &task_token, &events);
		});

		*inflight = Some(Inflight { token, task });
		trace!(generation, "analysis.submit");
		generation
	}

	/// Cancels the in-flight request, if any, without submitting a new one.
	pub fn cancel_current(&self) {
		if let Some(inflight) = self.inflight.lock().as_ref() {
			trace!(generation = inflight.token.generation(), "analysis.cancel");
			inflight.token.cancel();
		}
	}

	/// Generation of the most recent submission (0 before the first).
	///
	/// Appliers discard any event whose generation is older than this.
	pub fn current_generation(&self) -> u64 {
		self.generations.latest()
	}

	/// Returns true while a request is still running.
	pub fn has_inflight(&self) -> bool {
		self.inflight
			.lock()
			.as_ref()
			.is_some_and(|inflight| !inflight.task.is_finished())
	}
}

impl Drop for AnalysisExecutor {
	fn drop(&mut self) {
		self.cancel_current();
	}
}

fn run_analysis(
	backend: &dyn AnalysisBackend,
	source: &str,
	options: &AnalysisOptions,
	token: &AnalysisToken,
	events: &mpsc::UnboundedSender<AnalysisEvent>,
) {
	let generation = token.generation();

	// Superseded before it began: no result at all.
	if token.is_cancelled() {
		trace!(generation, "analysis.superseded_before_start");
		return;
	}

	let outcome = match backend.analyze(source, options, token) {
		Ok(root) => AnalysisOutcome::Completed(root),
		Err(AnalysisError::Cancelled) => {
			trace!(generation, "analysis.cancelled");
			AnalysisOutcome::Cancelled
		}
		Err(AnalysisError::Backend(diagnostic)) => {
			warn!(generation, %diagnostic, "analysis.failed");
			AnalysisOutcome::Failed(diagnostic)
		}
	};

	// The receiver dropping just means the pipeline shut down first.
	let _ = events.send(AnalysisEvent {
		generation,
		outcome,
	});
}
