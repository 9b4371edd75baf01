//! Lazily-materialized outline over an analyzed tree.
//!
//! Analyzed trees can be large and deep; eagerly building a node for every
//! element on every keystroke is the anti-pattern this crate exists to
//! avoid. [`TreeNode`] wraps a backend subtree and defers building its
//! children until something actually demands them; the
//! [`InteractionCoordinator`] arbitrates hover ownership and expand/collapse
//! transitions across the tree so that only one node is ever highlighted and
//! the last toggle always wins.

mod interaction;
mod lazy;
mod node;

pub use interaction::InteractionCoordinator;
pub use lazy::Deferred;
pub use node::{ExpansionPhase, NodeId, NodeLine, TreeNode};
