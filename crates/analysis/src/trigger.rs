//! Debounce / trigger coordination.
//!
//! # Design
//!
//! Text-change notifications restart a quiet-period timer; a burst of edits
//! keeps aborting the previous timer, so only the most recent text is ever
//! submitted once the burst settles. [`TriggerCoordinator::ignore_delay_once`]
//! arms a one-shot bypass for programmatic resets and paste-over, where
//! waiting out the quiet period would just feel broken.
//!
//! Aborting the timer task after its sleep but before submission can drop
//! that submission, but only a newer change aborts, and the newer change
//! always schedules its own newer submission, so the last text still wins.
//! Identical text may be resubmitted; the backend side is idempotent and no
//! content-hash short-circuit is applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::backend::AnalysisOptions;
use crate::execution::AnalysisExecutor;

/// Observes text changes and submits to the executor after a quiet period.
pub struct TriggerCoordinator {
	executor: Arc<AnalysisExecutor>,
	quiet_period: Mutex<Duration>,
	options: Mutex<AnalysisOptions>,
	skip_next_delay: AtomicBool,
	pending: Mutex<Option<JoinHandle<()>>>,
	last_text: Mutex<Option<Arc<str>>>,
}

impl TriggerCoordinator {
	/// Creates a coordinator submitting to `executor`.
	pub fn new(executor: Arc<AnalysisExecutor>, quiet_period: Duration) -> Self {
		Self {
			executor,
			quiet_period: Mutex::new(quiet_period),
			options: Mutex::new(AnalysisOptions::default()),
			skip_next_delay: AtomicBool::new(false),
			pending: Mutex::new(None),
			last_text: Mutex::new(None),
		}
	}

	/// Notifies the coordinator of the full text after an edit.
	///
	/// Restarts the quiet-period timer, coalescing with any timer already
	/// pending. If the skip flag is armed, submits immediately instead and
	/// clears the flag.
	pub fn on_text_changed(&self, text: Arc<str>) {
		*self.last_text.lock() = Some(Arc::clone(&text));
		self.abort_pending();

		if self.skip_next_delay.swap(false, Ordering::AcqRel) {
			trace!("trigger.immediate");
			self.submit_now(text);
			return;
		}

		let quiet = *self.quiet_period.lock();
		let executor = Arc::clone(&self.executor);
		let options = self.options.lock().clone();
		let handle = tokio::spawn(async move {
			tokio::time::sleep(quiet).await;
			trace!(quiet_ms = quiet.as_millis() as u64, "trigger.quiet_elapsed");
			executor.submit(text, options);
		});
		*self.pending.lock() = Some(handle);
	}

	/// Arms a one-shot bypass: the next change submits without debouncing.
	pub fn ignore_delay_once(&self) {
		self.skip_next_delay.store(true, Ordering::Release);
	}

	/// Immediately resubmits the most recent text, bypassing the delay.
	///
	/// Used when options change and the displayed tree must be rebuilt.
	/// Returns false when no text has been seen yet.
	pub fn force_reanalysis(&self) -> bool {
		let Some(text) = self.last_text.lock().clone() else {
			return false;
		};
		self.abort_pending();
		trace!("trigger.force_reanalysis");
		self.submit_now(text);
		true
	}

	/// Updates the quiet period for subsequent changes.
	pub fn set_quiet_period(&self, quiet_period: Duration) {
		*self.quiet_period.lock() = quiet_period;
	}

	/// Returns the configured quiet period.
	pub fn quiet_period(&self) -> Duration {
		*self.quiet_period.lock()
	}

	/// Updates the options captured into subsequent submissions.
	pub fn set_options(&self, options: AnalysisOptions) {
		*self.options.lock() = options;
	}

	/// Returns the options in effect for the next submission.
	pub fn options(&self) -> AnalysisOptions {
		self.options.lock().clone()
	}

	/// Returns true while a quiet-period timer is pending.
	pub fn has_pending_trigger(&self) -> bool {
		self.pending
			.lock()
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}

	fn submit_now(&self, text: Arc<str>) {
		let options = self.options.lock().clone();
		self.executor.submit(text, options);
	}

	fn abort_pending(&self) {
		if let Some(handle) = self.pending.lock().take() {
			handle.abort();
		}
	}
}

impl Drop for TriggerCoordinator {
	fn drop(&mut self) {
		self.abort_pending();
	}
}
