//! Viewport-windowed line buffer.
//!
//! A renderer showing a large document never needs more than a screenful of
//! line content at a time. [`LineBuffer`] keeps a fixed pool of reusable
//! [`LineSlot`]s mapped onto a window of the document's lines; scrolling
//! rebases the window by rewriting slot text in place instead of allocating
//! per visible line.
//!
//! # Design
//!
//! - Capacity is monotonic: [`LineBuffer::set_capacity`] grows the pool and
//!   never shrinks it. Slots live as long as the buffer.
//! - Rebasing with [`LineBuffer::load_from`] clears every slot past the end
//!   of the source, so stale content from a previous window can never leak
//!   into view.
//! - All indices are clamped. Out-of-window writes are silently ignored:
//!   they occur naturally when async updates race a scroll, and must not
//!   error.
//!
//! The buffer is mutated only by the foreground sequence, so it carries no
//! internal locking.

use ropey::Rope;

/// A reusable cell holding the rendered text of one buffer line.
///
/// Slots are created once when the viewport is sized and rewritten in place
/// whenever the window rebases; they are never individually destroyed.
#[derive(Debug, Default, Clone)]
pub struct LineSlot {
	text: String,
}

impl LineSlot {
	/// Returns the slot's current text.
	pub fn text(&self) -> &str {
		&self.text
	}

	fn set_text(&mut self, text: &str) {
		self.text.clear();
		self.text.push_str(text);
	}

	fn clear(&mut self) {
		self.text.clear();
	}
}

/// Bounded pool of line slots mapped onto an offset range of the document.
#[derive(Debug, Default)]
pub struct LineBuffer {
	slots: Vec<LineSlot>,
	window_start: usize,
}

impl LineBuffer {
	/// Creates an empty buffer; call [`Self::set_capacity`] before use.
	pub fn new() -> Self {
		Self::default()
	}

	/// Ensures at least `capacity` slots exist. Never shrinks.
	pub fn set_capacity(&mut self, capacity: usize) {
		while self.slots.len() < capacity {
			self.slots.push(LineSlot::default());
		}
	}

	/// Returns the number of live slots.
	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	/// Returns the buffer line the first slot is mapped to.
	pub fn window_start(&self) -> usize {
		self.window_start
	}

	/// Rebases the window so slot `i` reflects source line `start + i`.
	///
	/// Slots past the last source line are cleared to empty text rather than
	/// left with whatever the previous window held.
	pub fn load_from(&mut self, start: usize, source: &Rope) {
		self.window_start = start;
		let line_count = source.len_lines();
		for i in 0..self.slots.len() {
			let source_line = start + i;
			if source_line >= line_count {
				self.clear_slots_from(i);
				break;
			}
			let text = line_without_break(source, source_line);
			self.slots[i].set_text(&text);
		}
	}

	/// Writes one line's text if `line` falls inside the current window.
	///
	/// Out-of-window writes are expected during async updates and are
	/// silently ignored.
	pub fn set_line(&mut self, line: usize, text: &str) {
		let Some(index) = line.checked_sub(self.window_start) else {
			return;
		};
		if let Some(slot) = self.slots.get_mut(index) {
			slot.set_text(text);
		}
	}

	/// Clears every slot from buffer line `line` to the end of the window.
	pub fn clear_lines_from(&mut self, line: usize) {
		let index = line.saturating_sub(self.window_start);
		self.clear_slots_from(index);
	}

	/// Returns the text of a buffer line, or `None` when outside the window.
	pub fn line_text(&self, line: usize) -> Option<&str> {
		let index = line.checked_sub(self.window_start)?;
		self.slots.get(index).map(LineSlot::text)
	}

	/// Returns the slots covering `[start, start + count)` intersected with
	/// the current window.
	///
	/// A negative `start` clamps to line zero with `count` preserved; the
	/// result is always in range, possibly empty.
	pub fn line_span_for_range(&self, start: isize, count: usize) -> &[LineSlot] {
		let start = start.max(0) as usize;
		let end = start.saturating_add(count);

		let offset_start = start
			.saturating_sub(self.window_start)
			.min(self.slots.len());
		let offset_end = end
			.saturating_sub(self.window_start)
			.clamp(offset_start, self.slots.len());

		&self.slots[offset_start..offset_end]
	}

	fn clear_slots_from(&mut self, index: usize) {
		for slot in self.slots.iter_mut().skip(index) {
			slot.clear();
		}
	}
}

/// Returns one source line without its trailing line break.
fn line_without_break(source: &Rope, line: usize) -> String {
	let mut text = source.line(line).to_string();
	while text.ends_with('\n') || text.ends_with('\r') {
		text.pop();
	}
	text
}
