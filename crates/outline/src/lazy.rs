use std::fmt;
use std::sync::OnceLock;

use parking_lot::Mutex;

/// A tagged unresolved/resolved cell: holds either a compute thunk or the
/// value it produced.
///
/// The thunk runs at most once, under a single-writer rule; every read after
/// the first force observes the same value. [`Deferred::get`] never forces,
/// for callers that must not pay the materialization cost.
pub struct Deferred<T> {
	thunk: Mutex<Option<Box<dyn FnOnce() -> T + Send>>>,
	value: OnceLock<T>,
}

impl<T> Deferred<T> {
	/// Creates an unresolved cell around `thunk`.
	pub fn new(thunk: impl FnOnce() -> T + Send + 'static) -> Self {
		Self {
			thunk: Mutex::new(Some(Box::new(thunk))),
			value: OnceLock::new(),
		}
	}

	/// Creates a cell that is already resolved to `value`.
	pub fn resolved(value: T) -> Self {
		let cell = OnceLock::new();
		let _ = cell.set(value);
		Self {
			thunk: Mutex::new(None),
			value: cell,
		}
	}

	/// Resolves the cell on first access and returns the value.
	pub fn force(&self) -> &T {
		self.value.get_or_init(|| {
			let thunk = self
				.thunk
				.lock()
				.take()
				.expect("deferred cell resolved re-entrantly");
			thunk()
		})
	}

	/// Returns the value if already resolved, without forcing.
	pub fn get(&self) -> Option<&T> {
		self.value.get()
	}

	/// Returns true once the thunk has run.
	pub fn is_resolved(&self) -> bool {
		self.value.get().is_some()
	}
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.value.get() {
			Some(value) => f.debug_tuple("Deferred::Resolved").field(value).finish(),
			None => f.write_str("Deferred::Unresolved"),
		}
	}
}
