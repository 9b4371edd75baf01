//! One node of one tree version.
//!
//! A new analysis produces an entirely new node graph; nodes are never
//! mutated across analysis runs. Parents own children via `Arc`; the child
//! holds only a `Weak` back-reference for interaction bookkeeping. Child
//! construction is deferred behind a [`Deferred`] cell whose thunk walks the
//! backend handle, so only the subset of the tree the user actually opens is
//! ever built.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use loupe_analysis::{Span, StyleHint, SubtreeHandle};

use crate::lazy::Deferred;

/// Identity of a node within one tree version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Monotonic id allocator shared by all nodes of one tree.
#[derive(Debug, Default)]
struct NodeIds {
	next: AtomicU64,
}

impl NodeIds {
	fn next(&self) -> NodeId {
		NodeId(self.next.fetch_add(1, Ordering::Relaxed))
	}
}

/// Expansion phase of a node.
///
/// `Expanding` and `Collapsing` are the transient states a visual transition
/// passes through; a toggle during a transition cancels it and heads the
/// other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionPhase {
	/// Children hidden.
	#[default]
	Collapsed,
	/// Opening; children already materialized.
	Expanding,
	/// Children shown.
	Expanded,
	/// Closing.
	Collapsing,
}

impl ExpansionPhase {
	/// Returns true during Expanding/Collapsing.
	pub fn is_transitioning(self) -> bool {
		matches!(self, Self::Expanding | Self::Collapsing)
	}

	/// The open/closed state this phase is at or heading toward.
	pub fn target_expanded(self) -> bool {
		matches!(self, Self::Expanding | Self::Expanded)
	}
}

/// Display data for one node line, captured from the backend handle at
/// construction.
#[derive(Debug, Clone)]
pub struct NodeLine {
	/// Display label.
	pub label: String,
	/// Category tag identifying the node's type family.
	pub category: String,
	/// Color hint for the category.
	pub style: StyleHint,
	/// Source span the node covers.
	pub span: Span,
}

impl NodeLine {
	fn from_handle(handle: &dyn SubtreeHandle) -> Self {
		Self {
			label: handle.label(),
			category: handle.category().to_string(),
			style: handle.style(),
			span: handle.span(),
		}
	}
}

/// A lazily-expanded node of the analyzed outline.
pub struct TreeNode {
	id: NodeId,
	line: NodeLine,
	has_children: bool,
	children: Deferred<Vec<Arc<TreeNode>>>,
	parent: Weak<TreeNode>,
	phase: Mutex<ExpansionPhase>,
	transition: Mutex<Option<CancellationToken>>,
}

impl TreeNode {
	/// Wraps a backend tree root into a fresh node graph.
	pub fn root(handle: Arc<dyn SubtreeHandle>) -> Arc<Self> {
		Self::build(handle, Weak::new(), Arc::new(NodeIds::default()))
	}

	fn build(
		handle: Arc<dyn SubtreeHandle>,
		parent: Weak<TreeNode>,
		ids: Arc<NodeIds>,
	) -> Arc<Self> {
		let id = ids.next();
		let line = NodeLine::from_handle(handle.as_ref());
		let has_children = !handle.is_empty();

		Arc::new_cyclic(|weak: &Weak<TreeNode>| {
			let weak = weak.clone();
			TreeNode {
				id,
				line,
				has_children,
				children: Deferred::new(move || {
					handle
						.materialize_children()
						.into_iter()
						.map(|child| TreeNode::build(child, weak.clone(), Arc::clone(&ids)))
						.collect()
				}),
				parent,
				phase: Mutex::new(ExpansionPhase::default()),
				transition: Mutex::new(None),
			}
		})
	}

	/// Identity within this tree version.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Display line data.
	pub fn line(&self) -> &NodeLine {
		&self.line
	}

	/// Source span the node covers.
	pub fn span(&self) -> Span {
		self.line.span
	}

	/// Parent node, if any.
	pub fn parent(&self) -> Option<Arc<TreeNode>> {
		self.parent.upgrade()
	}

	/// Whether the node has children, known without materializing them.
	pub fn has_children(&self) -> bool {
		self.has_children
	}

	/// Children, materializing them on first access and memoizing.
	pub fn demanded_children(&self) -> &[Arc<TreeNode>] {
		self.children.force().as_slice()
	}

	/// Children if already materialized, an empty slice otherwise.
	///
	/// Never forces; used when the caller must not pay materialization cost
	/// (e.g. propagating visual state over the visible subset).
	pub fn lazy_children(&self) -> &[Arc<TreeNode>] {
		self.children.get().map(Vec::as_slice).unwrap_or(&[])
	}

	/// Returns true once children have been materialized.
	pub fn is_materialized(&self) -> bool {
		self.children.is_resolved()
	}

	/// Current expansion phase.
	pub fn phase(&self) -> ExpansionPhase {
		*self.phase.lock()
	}

	/// Open/closed state the node is at or heading toward.
	pub fn is_expanded(&self) -> bool {
		self.phase().target_expanded()
	}

	pub(crate) fn set_phase(&self, phase: ExpansionPhase) {
		*self.phase.lock() = phase;
	}

	/// Cancels any running transition and issues the token for a new one.
	pub(crate) fn begin_transition(&self) -> CancellationToken {
		let mut slot = self.transition.lock();
		if let Some(previous) = slot.take() {
			previous.cancel();
		}
		let token = CancellationToken::new();
		*slot = Some(token.clone());
		token
	}

	/// Cancels any running transition without starting a new one.
	pub(crate) fn cancel_transition(&self) {
		if let Some(token) = self.transition.lock().take() {
			token.cancel();
		}
	}

	/// Finishes a transition, unless `token` was superseded meanwhile.
	pub(crate) fn settle_transition(&self, token: &CancellationToken, expanded: bool) {
		if token.is_cancelled() {
			return;
		}
		*self.transition.lock() = None;
		self.set_phase(if expanded {
			ExpansionPhase::Expanded
		} else {
			ExpansionPhase::Collapsed
		});
	}
}

impl fmt::Debug for TreeNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TreeNode")
			.field("id", &self.id)
			.field("label", &self.line.label)
			.field("phase", &self.phase())
			.field("materialized", &self.is_materialized())
			.finish()
	}
}
