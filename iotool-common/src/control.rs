//! The only state shared between the foreground flow and the background
//! serial-servicing path: a cancellation flag and a flag telling the
//! background path to watch incoming bytes for the quit sentinel.
//!
//! Single-word atomics are enough here; no multi-word invariant crosses
//! the boundary.

use core::sync::atomic::{AtomicBool, Ordering};

pub struct RunControl {
	cancelled: AtomicBool,
	watch_input: AtomicBool,
}

impl RunControl {
	pub const fn new() -> Self {
		RunControl {
			cancelled: AtomicBool::new(false),
			watch_input: AtomicBool::new(false),
		}
	}

	/// Arm for a run: clear any stale cancellation and start watching
	/// incoming bytes for the quit sentinel.
	pub fn begin_run(&self) {
		self.cancelled.store(false, Ordering::SeqCst);
		self.watch_input.store(true, Ordering::SeqCst);
	}

	pub fn end_run(&self) {
		self.watch_input.store(false, Ordering::SeqCst);
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	pub fn set_watch_input(&self, watch: bool) {
		self.watch_input.store(watch, Ordering::SeqCst);
	}

	pub fn watching_input(&self) -> bool {
		self.watch_input.load(Ordering::SeqCst)
	}
}

impl Default for RunControl {
	fn default() -> Self {
		Self::new()
	}
}
