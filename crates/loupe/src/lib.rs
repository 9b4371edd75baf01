//! Loupe: the analysis core of an interactive source-structure viewer.
//!
//! As the embedding editor mutates text, [`AnalysisPipeline`] debounces the
//! changes, runs a cancellable analysis pass on a background task, and turns
//! the result into a lazily-expanded outline tree. The renderer reads line
//! content through the bounded [`LineBuffer`] window and navigates the tree
//! through the [`InteractionCoordinator`].
//!
//! The concrete grammar lives behind [`AnalysisBackend`]; rendering, input
//! devices, and settings persistence stay with the embedder.

mod config;
mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{AnalysisPipeline, PipelineEvent};

pub use loupe_analysis::{
	AnalysisBackend, AnalysisError, AnalysisOptions, AnalysisToken, Span, StyleHint,
	SubtreeHandle,
};
pub use loupe_buffer_display::{LineBuffer, LineSlot};
pub use loupe_outline::{ExpansionPhase, InteractionCoordinator, NodeId, NodeLine, TreeNode};
