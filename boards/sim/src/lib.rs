//! Host-side simulated board.
//!
//! Implements the three hardware seams over an in-memory state cell so the
//! whole interpreter runs on the development machine. Time is virtual: the
//! shared half-microsecond counter advances on every observation (clock
//! read, pin read, byte poll), which keeps every polling loop terminating
//! and every timing result reproducible.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use iotool_common::console::Console;
use iotool_common::hal::{AnalogRef, Board, Clock, Transport};
use iotool_common::machine::Machine;
use iotool_common::pins::{PinId, PIN_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
	Output(bool),
	InputPullup,
	Tristate,
}

/// One logged output-side action, stamped with the virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
	pub at: u64,
	pub pin: PinId,
	pub action: PinAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAction {
	High,
	Low,
	Pullup,
	Tristate,
	Pwm(u16),
	PwmOff,
}

pub struct SimState {
	/// Virtual time in half-microseconds.
	pub now: u64,
	/// Advance per observation.
	pub step: u64,
	pub modes: [PinMode; PIN_COUNT],
	/// Externally applied input levels.
	levels: [bool; PIN_COUNT],
	/// Time-keyed level transitions, sorted by time, applied on read.
	script: Vec<(u64, PinId, bool)>,
	/// A pin that flips level every `half_period`, for settling tests.
	chatter: Option<(PinId, u64)>,
	pwm: [Option<u16>; PIN_COUNT],
	pub analog: [u16; 8],
	pub aref: AnalogRef,
	pub reset_requested: bool,
	/// Host-to-device bytes, sorted by arrival time.
	rx: Vec<(u64, u8)>,
	/// Everything the device wrote back.
	pub tx: Vec<u8>,
	pub events: Vec<PinEvent>,
}

impl SimState {
	fn new() -> Self {
		SimState {
			now: 0,
			step: 1,
			modes: [PinMode::Tristate; PIN_COUNT],
			levels: [false; PIN_COUNT],
			script: Vec::new(),
			chatter: None,
			pwm: [None; PIN_COUNT],
			analog: [0; 8],
			aref: AnalogRef::AVcc,
			reset_requested: false,
			rx: Vec::new(),
			tx: Vec::new(),
			events: Vec::new(),
		}
	}

	fn advance(&mut self) {
		self.now += self.step;
	}

	pub fn schedule_level(&mut self, at: u64, pin: PinId, level: bool) {
		self.script.push((at, pin, level));
		self.script.sort_by_key(|entry| entry.0);
	}

	pub fn schedule_byte(&mut self, at: u64, byte: u8) {
		self.rx.push((at, byte));
		self.rx.sort_by_key(|entry| entry.0);
	}

	pub fn chatter(&mut self, pin: PinId, half_period: u64) {
		self.chatter = Some((pin, half_period));
	}

	pub fn set_analog(&mut self, channel: u8, value: u16) {
		self.analog[channel as usize] = value;
	}

	pub fn output_level(&self, pin: PinId) -> bool {
		self.modes[pin.index()] == PinMode::Output(true)
	}

	pub fn pwm_duty(&self, pin: PinId) -> Option<u16> {
		self.pwm[pin.index()]
	}

	/// Drain the transcript written so far.
	pub fn take_output(&mut self) -> String {
		let text = String::from_utf8_lossy(&self.tx).into_owned();
		self.tx.clear();
		text
	}

	fn input_level(&mut self, pin: PinId) -> bool {
		while let Some(&(at, target, level)) = self.script.first() {
			if at > self.now {
				break;
			}
			self.levels[target.index()] = level;
			self.script.remove(0);
		}
		if let Some((noisy, half_period)) = self.chatter {
			if noisy == pin {
				return (self.now / half_period) % 2 == 1;
			}
		}
		self.levels[pin.index()]
	}

	fn log(&mut self, pin: PinId, action: PinAction) {
		self.events.push(PinEvent { at: self.now, pin, action });
	}
}

pub type Handle = Rc<RefCell<SimState>>;

pub struct SimBoard(Handle);
pub struct VirtualClock(Handle);
pub struct SimLink(Handle);

impl Board for SimBoard {
	fn drive(&mut self, pin: PinId, high: bool) {
		let mut s = self.0.borrow_mut();
		s.modes[pin.index()] = PinMode::Output(high);
		s.log(pin, if high { PinAction::High } else { PinAction::Low });
	}

	fn input_pullup(&mut self, pin: PinId) {
		let mut s = self.0.borrow_mut();
		s.modes[pin.index()] = PinMode::InputPullup;
		s.log(pin, PinAction::Pullup);
	}

	fn tristate(&mut self, pin: PinId) {
		let mut s = self.0.borrow_mut();
		s.modes[pin.index()] = PinMode::Tristate;
		s.log(pin, PinAction::Tristate);
	}

	fn read(&mut self, pin: PinId) -> bool {
		let mut s = self.0.borrow_mut();
		s.advance();
		match s.modes[pin.index()] {
			PinMode::Output(level) => level,
			_ => s.input_level(pin),
		}
	}

	fn set_pwm(&mut self, pin: PinId, duty: u16) {
		let mut s = self.0.borrow_mut();
		s.pwm[pin.index()] = Some(duty);
		s.log(pin, PinAction::Pwm(duty));
	}

	fn pwm_off(&mut self, pin: PinId) {
		let mut s = self.0.borrow_mut();
		s.pwm[pin.index()] = None;
		s.log(pin, PinAction::PwmOff);
	}

	fn read_analog(&mut self, pin: PinId) -> u16 {
		let mut s = self.0.borrow_mut();
		s.advance();
		match pin.desc().adc {
			Some(channel) => s.analog[channel as usize],
			None => 0,
		}
	}

	fn set_analog_ref(&mut self, aref: AnalogRef) {
		self.0.borrow_mut().aref = aref;
	}

	fn watchdog_reset(&mut self) {
		self.0.borrow_mut().reset_requested = true;
	}
}

impl Clock for VirtualClock {
	fn ticks(&self) -> u16 {
		let mut s = self.0.borrow_mut();
		let ticks = (s.now & 0xFFFF) as u16;
		s.advance();
		ticks
	}

	fn millis(&self) -> u32 {
		let mut s = self.0.borrow_mut();
		let ms = (s.now / 2000) as u32;
		s.advance();
		ms
	}
}

impl ufmt::uWrite for SimLink {
	type Error = Infallible;

	fn write_str(&mut self, text: &str) -> Result<(), Infallible> {
		self.0.borrow_mut().tx.extend_from_slice(text.as_bytes());
		Ok(())
	}
}

impl Transport for SimLink {
	fn poll_byte(&mut self) -> nb::Result<u8, Infallible> {
		let mut s = self.0.borrow_mut();
		s.advance();
		if let Some(&(at, byte)) = s.rx.first() {
			if at <= s.now {
				s.rx.remove(0);
				return Ok(byte);
			}
		}
		Err(nb::Error::WouldBlock)
	}

	fn write_byte(&mut self, byte: u8) {
		self.0.borrow_mut().tx.push(byte);
	}

	fn flush(&mut self) {}
}

/// A console wired to a fresh simulated board, plus the state handle the
/// caller uses to script inputs and inspect what happened.
pub fn bench() -> (Console<SimBoard, VirtualClock, SimLink>, Handle) {
	let state = Rc::new(RefCell::new(SimState::new()));
	let machine = Machine::new(
		SimBoard(state.clone()),
		VirtualClock(state.clone()),
		SimLink(state.clone()),
	);
	(Console::new(machine), state)
}
