//! End-to-end wiring: trigger → executor → lazy tree → embedder events.
//!
//! # Design
//!
//! The pipeline drains executor completions on the foreground and applies
//! them monotonically by generation: once a result has been applied, any
//! event from an older generation is discarded, so a stale completion can
//! never overwrite a newer tree. Backend failure surfaces a diagnostic and
//! keeps the last good tree; cancellation surfaces nothing at all.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use loupe_analysis::{
	AnalysisBackend, AnalysisEvent, AnalysisExecutor, AnalysisOutcome, TriggerCoordinator,
};
use loupe_outline::{InteractionCoordinator, TreeNode};

use crate::config::PipelineConfig;

/// Event surfaced to the embedder by [`AnalysisPipeline::drain_events`].
#[derive(Debug)]
pub enum PipelineEvent {
	/// A new tree root replaced the displayed one. Interaction state has
	/// been reset.
	NewRoot(Arc<TreeNode>),
	/// The backend rejected the text; the previous tree stays displayed.
	AnalysisFailed {
		/// Opaque diagnostic from the backend.
		diagnostic: String,
	},
}

/// Owns the full edit → analysis → outline flow for one document.
pub struct AnalysisPipeline {
	executor: Arc<AnalysisExecutor>,
	trigger: TriggerCoordinator,
	events: mpsc::UnboundedReceiver<AnalysisEvent>,
	interaction: InteractionCoordinator,
	root: Option<Arc<TreeNode>>,
	last_applied: u64,
}

impl AnalysisPipeline {
	/// Creates a pipeline over `backend` with the given configuration.
	pub fn new(backend: Arc<dyn AnalysisBackend>, config: PipelineConfig) -> Self {
		let (executor, events) = AnalysisExecutor::new(backend);
		let executor = Arc::new(executor);
		let trigger = TriggerCoordinator::new(Arc::clone(&executor), config.quiet_period);
		trigger.set_options(config.options);
		let interaction = InteractionCoordinator::new(config.transition_duration);
		Self {
			executor,
			trigger,
			events,
			interaction,
			root: None,
			last_applied: 0,
		}
	}

	/// Notifies the pipeline of the full text after an edit.
	pub fn on_text_changed(&self, text: Arc<str>) {
		self.trigger.on_text_changed(text);
	}

	/// The next change bypasses the quiet period (programmatic reset, paste).
	pub fn ignore_delay_once(&self) {
		self.trigger.ignore_delay_once();
	}

	/// Immediately resubmits the most recent text.
	pub fn force_reanalysis(&self) -> bool {
		self.trigger.force_reanalysis()
	}

	/// Currently displayed tree root, if any analysis has succeeded yet.
	pub fn root(&self) -> Option<&Arc<TreeNode>> {
		self.root.as_ref()
	}

	/// Hover/expansion arbitration for the displayed tree.
	pub fn interaction(&self) -> &InteractionCoordinator {
		&self.interaction
	}

	/// Returns true while an analysis request is running.
	pub fn is_analyzing(&self) -> bool {
		self.executor.has_inflight()
	}

	/// Applies a changed configuration and rebuilds the displayed tree.
	///
	/// The tree on screen was built under the old options, so this forces an
	/// immediate reanalysis of the most recent text.
	pub fn apply_config(&self, config: PipelineConfig) {
		self.trigger.set_quiet_period(config.quiet_period);
		self.trigger.set_options(config.options);
		self.interaction.set_transition_duration(config.transition_duration);
		self.trigger.force_reanalysis();
	}

	/// Drains completed analyses without blocking and applies them.
	pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
		let mut surfaced = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			if let Some(out) = self.apply(event) {
				surfaced.push(out);
			}
		}
		surfaced
	}

	/// Awaits and applies completions until one surfaces to the embedder.
	///
	/// Returns `None` once the executor side has shut down.
	pub async fn next_event(&mut self) -> Option<PipelineEvent> {
		loop {
			let event = self.events.recv().await?;
			if let Some(out) = self.apply(event) {
				return Some(out);
			}
		}
	}

	fn apply(&mut self, event: AnalysisEvent) -> Option<PipelineEvent> {
		if event.generation <= self.last_applied {
			trace!(
				generation = event.generation,
				last_applied = self.last_applied,
				"pipeline.discard_stale"
			);
			return None;
		}

		match event.outcome {
			AnalysisOutcome::Completed(handle) => {
				self.last_applied = event.generation;
				let root = TreeNode::root(handle);
				self.interaction.reset();
				self.root = Some(Arc::clone(&root));
				debug!(generation = event.generation, "pipeline.new_root");
				Some(PipelineEvent::NewRoot(root))
			}
			// Superseded by a newer request; the displayed tree stays.
			AnalysisOutcome::Cancelled => None,
			AnalysisOutcome::Failed(diagnostic) => {
				self.last_applied = event.generation;
				warn!(
					generation = event.generation,
					%diagnostic,
					"pipeline.analysis_failed"
				);
				Some(PipelineEvent::AnalysisFailed { diagnostic })
			}
		}
	}
}
