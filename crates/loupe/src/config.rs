use std::time::Duration;

use serde::{Deserialize, Serialize};

use loupe_analysis::AnalysisOptions;

/// Pipeline configuration, consumed as plain input.
///
/// Persistence belongs to the embedder; applying a changed configuration at
/// runtime goes through [`crate::AnalysisPipeline::apply_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
	/// Quiet period between the last edit and analysis submission.
	pub quiet_period: Duration,
	/// Settle duration for expand/collapse transitions; zero settles
	/// synchronously for embedders without animations.
	pub transition_duration: Duration,
	/// Display options captured into each submission.
	pub options: AnalysisOptions,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			quiet_period: Duration::from_millis(500),
			transition_duration: Duration::from_millis(120),
			options: AnalysisOptions::default(),
		}
	}
}
