//! The execution engine: owns the hardware seams and walks the stored
//! program, one dispatch per step.

use crate::control::RunControl;
use crate::hal::{Board, Clock, Transport};
use crate::pins::PinId;
use crate::program::{LoopSlot, Op, ProgramStore};
use crate::QUIT_BYTE;

/// Snapshot taken by `tb`, consumed by `te`.
#[derive(Clone, Copy, Default)]
pub(crate) struct Stamp {
	pub ms: u32,
	pub ticks: u16,
}

pub struct Machine<B: Board, C: Clock, T: Transport> {
	pub board: B,
	pub clock: C,
	pub link: T,
	pub ctl: RunControl,
	/// Debounce settling window in half-microseconds; `wt` rewrites it.
	pub(crate) wait_half_us: u16,
	pub(crate) stamp: Stamp,
}

impl<B: Board, C: Clock, T: Transport> Machine<B, C, T> {
	pub fn new(board: B, clock: C, link: T) -> Self {
		Machine {
			board,
			clock,
			link,
			ctl: RunControl::new(),
			wait_half_us: 20,
			stamp: Stamp::default(),
		}
	}

	/// Replay the stored program `iterations` times. Each pass restarts at
	/// step 0 with every loop slot deactivated; cancellation ends the
	/// current pass and all remaining ones.
	pub fn run(&mut self, program: &mut ProgramStore, iterations: u16) {
		self.ctl.begin_run();
		let ProgramStore { steps, loops } = program;
		for _ in 0..iterations {
			if self.ctl.is_cancelled() {
				break;
			}
			for slot in loops.iter_mut() {
				slot.active = false;
			}
			let mut pc: usize = 0;
			while pc < steps.len() && !self.ctl.is_cancelled() {
				let current = pc;
				// Advance before dispatch so branches can overwrite it.
				pc += 1;
				self.dispatch(steps[current], current, &mut pc, loops, steps.len());
			}
		}
		self.ctl.end_run();
	}

	/// Run one freshly parsed step on the spot. Branch opcodes have no
	/// meaning outside a stored program and are skipped. Cancellation is
	/// armed so a blocking wait can still be aborted from the host.
	pub fn execute_immediate(&mut self, op: Op) {
		if op.is_control_flow() {
			return;
		}
		self.ctl.begin_run();
		let mut pc = 0usize;
		self.dispatch(op, 0, &mut pc, &mut [], 0);
		self.ctl.end_run();
	}

	fn dispatch(
		&mut self,
		op: Op,
		current: usize,
		pc: &mut usize,
		loops: &mut [LoopSlot],
		step_count: usize,
	) {
		match op {
			Op::WaitHigh(pin) => self.wait_level(pin, true),
			Op::WaitLow(pin) => self.wait_level(pin, false),
			Op::WaitChange(pin) => self.wait_change(pin),
			Op::RawWaitHigh(pin) => self.raw_wait_level(pin, true),
			Op::RawWaitLow(pin) => self.raw_wait_level(pin, false),
			Op::RawWaitChange(pin) => self.raw_wait_change(pin),
			Op::SetWaitTime(half_us) => self.wait_half_us = half_us,
			Op::DelayMs(ms) => self.delay_ms(ms),
			Op::DelayHalfUs(half_us) => self.delay_half_us(half_us),
			Op::TimerBegin => self.timer_begin(),
			Op::TimerEnd => self.timer_end(),
			Op::SetPwm { pin, duty } => self.board.set_pwm(pin, duty),
			Op::SetHigh(pin) => self.set_level(pin, true),
			Op::SetLow(pin) => self.set_level(pin, false),
			Op::SetTristate(pin) => {
				if pin.desc().pwm.is_some() {
					self.board.pwm_off(pin);
				}
				self.board.tristate(pin);
			}
			Op::ReadDigital(pin) => {
				let level = self.read_debounced(pin);
				self.link.write_byte(b'0' + level as u8);
				self.link.write_byte(b'\n');
				self.link.flush();
			}
			Op::ReadAnalog(pin) => {
				let value = self.board.read_analog(pin);
				let _ = ufmt::uwrite!(&mut self.link, "{}\n", value);
				self.link.flush();
			}
			Op::CharTransmit(byte) => {
				self.link.write_byte(byte);
				self.link.flush();
			}
			Op::CharReceive => {
				if let Some(byte) = self.wait_byte() {
					if byte == QUIT_BYTE {
						self.ctl.cancel();
					}
					// Anything else is discarded.
				}
			}
			Op::CharGoto => {
				if let Some(byte) = self.wait_byte() {
					if byte == QUIT_BYTE {
						self.ctl.cancel();
					} else {
						// A target past the end would run off the stored
						// program; clamp it, which ends the pass.
						*pc = (byte as usize).min(step_count);
					}
				}
			}
			Op::Loop { target, .. } => {
				if let Some(slot) = loops.iter_mut().find(|s| s.step as usize == current) {
					if !slot.active {
						// First entry this pass: load the recorded count.
						// An outer loop's back-edge re-enters us fresh.
						slot.current = slot.initial;
						slot.active = true;
					}
					if slot.current > 0 {
						slot.current -= 1;
						*pc = target as usize;
					} else {
						slot.active = false;
					}
				}
			}
			Op::Goto(target) => *pc = target as usize,
			Op::Noop => {}
		}
	}

	fn set_level(&mut self, pin: PinId, high: bool) {
		if pin.desc().pwm.is_some() {
			self.board.pwm_off(pin);
		}
		self.board.drive(pin, high);
	}
}
