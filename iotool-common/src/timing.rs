//! Delays, the steady-wait (debounce) primitive and elapsed-time
//! measurement, all sharing the one counter behind [`Clock`].
//!
//! Every blocking loop here polls cancellation each iteration and gives
//! the transport its service slice, with one deliberate exception: the
//! sub-millisecond delay runs undisturbed and cannot be cancelled, trading
//! responsiveness for accuracy over such short spans.

use crate::hal::{Board, Clock, Transport};
use crate::machine::Machine;
use crate::pins::PinId;
use crate::TICKS_PER_MS;

impl<B: Board, C: Clock, T: Transport> Machine<B, C, T> {
	pub(crate) fn raw_wait_level(&mut self, pin: PinId, target: bool) {
		self.board.input_pullup(pin);
		self.raw_wait(pin, target);
	}

	pub(crate) fn raw_wait_change(&mut self, pin: PinId) {
		self.board.input_pullup(pin);
		let current = self.board.read(pin);
		self.raw_wait(pin, !current);
	}

	fn raw_wait(&mut self, pin: PinId, target: bool) {
		while self.board.read(pin) != target {
			if self.ctl.is_cancelled() {
				return;
			}
			self.link.service(&self.ctl);
		}
	}

	pub(crate) fn wait_level(&mut self, pin: PinId, target: bool) {
		self.board.input_pullup(pin);
		self.steady_wait(pin, target);
	}

	pub(crate) fn wait_change(&mut self, pin: PinId) {
		self.board.input_pullup(pin);
		let current = self.board.read(pin);
		self.steady_wait(pin, !current);
	}

	/// Wait for the pin to reach `target`, then hold it there for one full
	/// settling window. Any excursion restarts the window, so a noisy
	/// transition collapses into a single deterministic edge. A zero
	/// window reduces this to the raw wait.
	fn steady_wait(&mut self, pin: PinId, target: bool) {
		self.raw_wait(pin, target);
		let window = self.wait_half_us;
		if window == 0 || self.ctl.is_cancelled() {
			return;
		}
		let mut start = self.clock.ticks();
		while self.clock.ticks().wrapping_sub(start) < window {
			if self.ctl.is_cancelled() {
				return;
			}
			self.link.service(&self.ctl);
			if self.board.read(pin) != target {
				start = self.clock.ticks();
			}
		}
	}

	/// Report the pin level, requiring it to hold for a settling window
	/// first when debouncing is enabled. Unlike the waits, whichever level
	/// first proves steady is the answer.
	pub(crate) fn read_debounced(&mut self, pin: PinId) -> bool {
		self.board.input_pullup(pin);
		let mut level = self.board.read(pin);
		let window = self.wait_half_us;
		if window == 0 {
			return level;
		}
		let mut start = self.clock.ticks();
		while self.clock.ticks().wrapping_sub(start) < window {
			if self.ctl.is_cancelled() {
				break;
			}
			self.link.service(&self.ctl);
			let now = self.board.read(pin);
			if now != level {
				level = now;
				start = self.clock.ticks();
			}
		}
		level
	}

	pub(crate) fn delay_ms(&mut self, ms: u16) {
		let start = self.clock.millis();
		while self.clock.millis().wrapping_sub(start) < ms as u32 {
			if self.ctl.is_cancelled() {
				return;
			}
			self.link.service(&self.ctl);
		}
	}

	/// Short busy delay. Runs with servicing suspended, so neither the
	/// quit sentinel nor transport traffic can disturb it.
	pub(crate) fn delay_half_us(&mut self, half_us: u16) {
		let start = self.clock.ticks();
		while self.clock.ticks().wrapping_sub(start) < half_us {}
	}

	/// Block for one host byte, consuming it in the foreground. The
	/// background quit watch is paused meanwhile so it cannot steal the
	/// byte; a cancellation raised earlier still ends the wait.
	pub(crate) fn wait_byte(&mut self) -> Option<u8> {
		self.ctl.set_watch_input(false);
		let byte = loop {
			if self.ctl.is_cancelled() {
				break None;
			}
			match self.link.poll_byte() {
				Ok(b) => break Some(b),
				Err(_) => self.link.service(&self.ctl),
			}
		};
		self.ctl.set_watch_input(true);
		byte
	}

	pub(crate) fn timer_begin(&mut self) {
		self.stamp.ms = self.clock.millis();
		self.stamp.ticks = self.clock.ticks();
	}

	pub(crate) fn timer_end(&mut self) {
		let end_ms = self.clock.millis();
		let end_ticks = self.clock.ticks();
		let us = elapsed_half_us(self.stamp.ms, self.stamp.ticks, end_ms, end_ticks) / 2;
		let _ = ufmt::uwrite!(&mut self.link, "{}\n", us);
		self.link.flush();
	}
}

/// Reconstruct elapsed half-microseconds from a millisecond count and the
/// tick counter difference taken in the counter's native modulus.
///
/// The tick difference alone is exact but only modulo 65536; the
/// millisecond count alone is only good to +-1 ms. The true elapsed value
/// is the unique one congruent to the tick difference inside the
/// millisecond estimate's +-1 ms window.
pub fn elapsed_half_us(begin_ms: u32, begin_ticks: u16, end_ms: u32, end_ticks: u16) -> u64 {
	let ms = end_ms.wrapping_sub(begin_ms) as u64;
	let diff = end_ticks.wrapping_sub(begin_ticks) as u64;
	let base = ms * TICKS_PER_MS as u64;
	let wraps = (base + TICKS_PER_MS as u64).saturating_sub(diff) >> 16;
	diff + (wraps << 16)
}
