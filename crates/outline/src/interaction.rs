//! Interaction state coordination across the outline.
//!
//! # Design
//!
//! Hover and expansion used to be the classic global-mutable-state trap in
//! tree views; here every node keeps only its own phase, and cross-node
//! exclusivity is arbitrated by one coordinator:
//!
//! - at most one node owns hover at a time, and ownership transfers
//!   transactionally (granting to a new node revokes the previous owner in
//!   the same step);
//! - expand/collapse transitions are serialized per node via a fresh
//!   cancellation token per transition, so the last toggle always wins;
//! - cursor-driven highlighting materializes only the ancestor chain down
//!   to the deepest node containing the offset, never sibling subtrees;
//! - whole-tree sweeps are iterative, and collapse walks only the
//!   already-materialized subset.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::node::{ExpansionPhase, NodeId, TreeNode};

/// Arbitrates hover ownership and expansion transitions for one tree.
///
/// State is per tree version: the pipeline calls [`Self::reset`] whenever a
/// new analysis result replaces the tree.
pub struct InteractionCoordinator {
	transition_duration: Mutex<Duration>,
	hovered: Mutex<Option<(NodeId, Weak<TreeNode>)>>,
}

impl InteractionCoordinator {
	/// Creates a coordinator whose transitions settle after `transition_duration`.
	///
	/// A zero duration settles transitions synchronously, for embedders
	/// without animations (and for deterministic tests).
	pub fn new(transition_duration: Duration) -> Self {
		Self {
			transition_duration: Mutex::new(transition_duration),
			hovered: Mutex::new(None),
		}
	}

	/// Updates the transition settle duration.
	pub fn set_transition_duration(&self, duration: Duration) {
		*self.transition_duration.lock() = duration;
	}

	/// Returns the transition settle duration.
	pub fn transition_duration(&self) -> Duration {
		*self.transition_duration.lock()
	}

	/// Clears interaction state; called when a new tree replaces this one.
	pub fn reset(&self) {
		*self.hovered.lock() = None;
	}

	/// Requests hover ownership for `node`.
	///
	/// Denied while an ancestor is mid-transition (the transition owns the
	/// interaction); the node must then render as not-hovered. A grant
	/// transfers ownership from the previous owner in the same step.
	pub fn request_hover(&self, node: &Arc<TreeNode>) -> bool {
		if ancestor_transitioning(node) {
			self.remove_hover(node);
			return false;
		}
		self.override_hover(node);
		true
	}

	/// Unconditionally makes `node` the hover owner, revoking the previous
	/// owner in the same step.
	pub fn override_hover(&self, node: &Arc<TreeNode>) {
		*self.hovered.lock() = Some((node.id(), Arc::downgrade(node)));
	}

	/// Releases hover if `node` currently owns it.
	pub fn remove_hover(&self, node: &Arc<TreeNode>) {
		let mut hovered = self.hovered.lock();
		if hovered.as_ref().is_some_and(|(id, _)| *id == node.id()) {
			*hovered = None;
		}
	}

	/// Returns true when `node` owns hover.
	pub fn is_hovered(&self, node: &TreeNode) -> bool {
		self.hovered
			.lock()
			.as_ref()
			.is_some_and(|(id, _)| *id == node.id())
	}

	/// Returns the current hover owner, if it is still alive.
	pub fn hovered_node(&self) -> Option<Arc<TreeNode>> {
		self.hovered
			.lock()
			.as_ref()
			.and_then(|(_, node)| node.upgrade())
	}

	/// Flips the node toward the opposite of its current target state.
	pub fn toggle_expansion(&self, node: &Arc<TreeNode>) {
		self.transition(node, !node.is_expanded());
	}

	/// Forces Collapsed → Expanding → Expanded, materializing children so a
	/// forced-open node is never observed empty.
	pub fn expand(&self, node: &Arc<TreeNode>) {
		self.transition(node, true);
	}

	/// Forces Expanded → Collapsing → Collapsed.
	pub fn collapse(&self, node: &Arc<TreeNode>) {
		self.transition(node, false);
	}

	fn transition(&self, node: &Arc<TreeNode>, expand: bool) {
		if !node.has_children() {
			return;
		}
		if node.is_expanded() == expand {
			return;
		}

		if expand {
			node.demanded_children();
		}

		// Cancels any transition already running on this node; the newest
		// toggle owns the outcome.
		let token = node.begin_transition();
		node.set_phase(if expand {
			ExpansionPhase::Expanding
		} else {
			ExpansionPhase::Collapsing
		});
		trace!(node = node.id().0, expand, "outline.transition");

		let duration = self.transition_duration();
		if duration.is_zero() {
			node.settle_transition(&token, expand);
			return;
		}

		let weak = Arc::downgrade(node);
		tokio::spawn(async move {
			tokio::select! {
				_ = token.cancelled() => {}
				_ = tokio::time::sleep(duration) => {
					if let Some(node) = weak.upgrade() {
						node.settle_transition(&token, expand);
					}
				}
			}
		});
	}

	/// Maps a text offset to the deepest node whose span contains it,
	/// materializing only the ancestor chain on the way down. Sibling
	/// subtrees stay untouched. The found node becomes the hover owner.
	pub fn highlight_position(
		&self,
		root: &Arc<TreeNode>,
		offset: usize,
	) -> Option<Arc<TreeNode>> {
		if !root.span().contains(offset) {
			return None;
		}

		let mut current = Arc::clone(root);
		loop {
			if !current.has_children() {
				break;
			}
			let next = current
				.demanded_children()
				.iter()
				.find(|child| child.span().contains(offset))
				.cloned();
			match next {
				Some(child) => current = child,
				None => break,
			}
		}

		self.override_hover(&current);
		Some(current)
	}

	/// Expands every node reachable from `root`, materializing the whole
	/// tree. Callers gate this behind an explicit user action.
	pub fn expand_all(&self, root: &Arc<TreeNode>) {
		self.sweep_expansion(root, true);
	}

	/// Collapses the tree, walking only the materialized subset.
	pub fn collapse_all(&self, root: &Arc<TreeNode>) {
		self.sweep_expansion(root, false);
	}

	fn sweep_expansion(&self, root: &Arc<TreeNode>, expanded: bool) {
		let mut stack = vec![Arc::clone(root)];
		while let Some(node) = stack.pop() {
			if !node.has_children() {
				continue;
			}
			node.cancel_transition();
			node.set_phase(if expanded {
				ExpansionPhase::Expanded
			} else {
				ExpansionPhase::Collapsed
			});
			let children = if expanded {
				node.demanded_children()
			} else {
				node.lazy_children()
			};
			stack.extend(children.iter().cloned());
		}
	}
}

/// Returns true when any strict ancestor of `node` is mid-transition.
///
/// The node's own transition does not deny hover: the toggled node stays
/// hovered while it animates.
fn ancestor_transitioning(node: &Arc<TreeNode>) -> bool {
	let mut current = node.parent();
	while let Some(ancestor) = current {
		if ancestor.phase().is_transitioning() {
			return true;
		}
		current = ancestor.parent();
	}
	false
}
