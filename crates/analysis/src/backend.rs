//! The seam between the pipeline and the concrete analysis engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::AnalysisToken;

/// Byte span of source text associated with a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
	/// Start offset into the source text, in bytes.
	pub start: usize,
	/// Length in bytes.
	pub len: usize,
}

impl Span {
	/// Creates a span from a start offset and length.
	pub const fn new(start: usize, len: usize) -> Self {
		Self { start, len }
	}

	/// End offset (exclusive).
	pub const fn end(&self) -> usize {
		self.start + self.len
	}

	/// Returns true when `offset` falls inside this span.
	pub const fn contains(&self, offset: usize) -> bool {
		offset >= self.start && offset < self.end()
	}

	/// Returns true for a zero-length span.
	pub const fn is_empty(&self) -> bool {
		self.len == 0
	}
}

/// Packed `0xAARRGGBB` color hint for a node category.
///
/// Purely advisory; the renderer owns the actual palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleHint(pub u32);

impl StyleHint {
	/// Creates a hint from a packed ARGB value.
	pub const fn new(argb: u32) -> Self {
		Self(argb)
	}
}

/// Display options in effect at submission time.
///
/// Captured into the request when it is submitted; a later options change
/// only affects later submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
	/// Whether the backend should emit a node for the tree root itself.
	pub show_root: bool,
	/// Truncation limit for display labels, in characters.
	pub label_limit: usize,
}

impl Default for AnalysisOptions {
	fn default() -> Self {
		Self {
			show_root: true,
			label_limit: 120,
		}
	}
}

/// Failure taxonomy at the backend boundary.
///
/// Nothing here may terminate the process; both variants degrade to "keep
/// showing the last good tree".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
	/// The request was superseded by a newer one. Expected, frequent, and
	/// never surfaced to the interface as an error.
	#[error("analysis cancelled")]
	Cancelled,
	/// The backend rejected or could not process the text. Reported as a
	/// diagnostic, non-fatal.
	#[error("analysis backend failed: {0}")]
	Backend(String),
}

/// Handle to one element of an analyzed structure.
///
/// Child materialization is the expensive part and is deferred; everything
/// else is cheap enough to read eagerly when a node line is built.
pub trait SubtreeHandle: Send + Sync {
	/// Display label for the node line.
	fn label(&self) -> String;

	/// Category tag identifying the node's type family.
	fn category(&self) -> &str;

	/// Color hint for the category.
	fn style(&self) -> StyleHint;

	/// Source span this node covers.
	fn span(&self) -> Span;

	/// Number of children, without materializing them.
	fn child_count(&self) -> usize;

	/// True when the node has no children.
	fn is_empty(&self) -> bool {
		self.child_count() == 0
	}

	/// Builds the child handles in order. Potentially expensive; the
	/// outline layer calls this at most once per handle and memoizes.
	fn materialize_children(&self) -> Vec<Arc<dyn SubtreeHandle>>;
}

/// Opaque engine turning source text into a tree of typed nodes.
///
/// Implementations observe `token` at safe checkpoints (e.g. between tree
/// construction and semantic binding) and return
/// [`AnalysisError::Cancelled`] promptly once it trips.
pub trait AnalysisBackend: Send + Sync + 'static {
	/// Analyzes one immutable source snapshot.
	fn analyze(
		&self,
		source: &str,
		options: &AnalysisOptions,
		token: &AnalysisToken,
	) -> Result<Arc<dyn SubtreeHandle>, AnalysisError>;
}
