//! Deterministic in-memory board for unit tests. Virtual time advances by
//! one half-microsecond tick on every observation (clock read, pin read,
//! byte poll), so every polling loop terminates and timings are exact.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use crate::hal::{AnalogRef, Board, Clock, Transport};
use crate::machine::Machine;
use crate::pins::PinId;

#[derive(Clone, Copy)]
enum PinMode {
	Output(bool),
	InputPullup,
	Tristate,
}

#[derive(Clone, Copy)]
struct PinState {
	mode: PinMode,
	input: bool,
	pwm: Option<u16>,
}

pub struct MockState {
	pub now: u64,
	pub tx: Vec<u8>,
	rx: Vec<(u64, u8)>,
	pins: [PinState; 25],
	script: Vec<(u64, PinId, bool)>,
	chatter: Option<(PinId, u64)>,
	pub analog: [u16; 8],
	pub aref: AnalogRef,
	pub reset_requested: bool,
}

impl MockState {
	fn new() -> Self {
		MockState {
			now: 0,
			tx: Vec::new(),
			rx: Vec::new(),
			pins: [PinState { mode: PinMode::Tristate, input: false, pwm: None }; 25],
			script: Vec::new(),
			chatter: None,
			analog: [0; 8],
			aref: AnalogRef::AVcc,
			reset_requested: false,
		}
	}

	fn advance(&mut self) {
		self.now += 1;
	}

	/// Byte from the host arriving at absolute time `at`.
	pub fn schedule_byte(&mut self, at: u64, byte: u8) {
		self.rx.push((at, byte));
		self.rx.sort_by_key(|&(t, _)| t);
	}

	/// Input level transition at absolute time `at`.
	pub fn schedule_level(&mut self, at: u64, pin: PinId, level: bool) {
		self.script.push((at, pin, level));
		self.script.sort_by_key(|&(t, _, _)| t);
	}

	/// Toggle the pin's input every `period` half-microseconds, forever.
	pub fn chatter(&mut self, pin: PinId, period: u64) {
		self.chatter = Some((pin, period));
	}

	pub fn output_level(&self, pin: PinId) -> bool {
		matches!(self.pins[pin.index()].mode, PinMode::Output(true))
	}

	pub fn is_output(&self, pin: PinId) -> bool {
		matches!(self.pins[pin.index()].mode, PinMode::Output(_))
	}

	pub fn pwm_duty(&self, pin: PinId) -> Option<u16> {
		self.pins[pin.index()].pwm
	}

	fn input_level(&mut self, pin: PinId) -> bool {
		while let Some(&(at, p, level)) = self.script.first() {
			if at > self.now {
				break;
			}
			self.script.remove(0);
			self.pins[p.index()].input = level;
		}
		if let Some((p, period)) = self.chatter {
			if p == pin {
				return (self.now / period) % 2 == 1;
			}
		}
		self.pins[pin.index()].input
	}
}

type Shared = Rc<RefCell<MockState>>;

pub struct MockBoard(Shared);
pub struct MockClock(Shared);
pub struct MockLink(Shared);

impl Board for MockBoard {
	fn drive(&mut self, pin: PinId, high: bool) {
		self.0.borrow_mut().pins[pin.index()].mode = PinMode::Output(high);
	}

	fn input_pullup(&mut self, pin: PinId) {
		self.0.borrow_mut().pins[pin.index()].mode = PinMode::InputPullup;
	}

	fn tristate(&mut self, pin: PinId) {
		self.0.borrow_mut().pins[pin.index()].mode = PinMode::Tristate;
	}

	fn read(&mut self, pin: PinId) -> bool {
		let mut s = self.0.borrow_mut();
		s.advance();
		match s.pins[pin.index()].mode {
			PinMode::Output(level) => level,
			_ => s.input_level(pin),
		}
	}

	fn set_pwm(&mut self, pin: PinId, duty: u16) {
		let mut s = self.0.borrow_mut();
		s.pins[pin.index()].mode = PinMode::Output(false);
		s.pins[pin.index()].pwm = Some(duty);
	}

	fn pwm_off(&mut self, pin: PinId) {
		self.0.borrow_mut().pins[pin.index()].pwm = None;
	}

	fn read_analog(&mut self, pin: PinId) -> u16 {
		let mut s = self.0.borrow_mut();
		s.advance();
		let channel = pin.desc().adc.expect("analog read on non-analog pin");
		s.analog[channel as usize]
	}

	fn set_analog_ref(&mut self, aref: AnalogRef) {
		self.0.borrow_mut().aref = aref;
	}

	fn watchdog_reset(&mut self) {
		self.0.borrow_mut().reset_requested = true;
	}
}

impl Clock for MockClock {
	fn ticks(&self) -> u16 {
		let mut s = self.0.borrow_mut();
		s.advance();
		(s.now % 65536) as u16
	}

	fn millis(&self) -> u32 {
		let mut s = self.0.borrow_mut();
		s.advance();
		(s.now / crate::TICKS_PER_MS as u64) as u32
	}
}

impl ufmt::uWrite for MockLink {
	type Error = Infallible;

	fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
		self.0.borrow_mut().tx.extend_from_slice(s.as_bytes());
		Ok(())
	}
}

impl Transport for MockLink {
	fn poll_byte(&mut self) -> nb::Result<u8, Infallible> {
		let mut s = self.0.borrow_mut();
		s.advance();
		match s.rx.first() {
			Some(&(at, byte)) if at <= s.now => {
				s.rx.remove(0);
				Ok(byte)
			}
			_ => Err(nb::Error::WouldBlock),
		}
	}

	fn write_byte(&mut self, byte: u8) {
		self.0.borrow_mut().tx.push(byte);
	}

	fn flush(&mut self) {}
}

/// A machine wired to a fresh mock, plus the handle tests poke at.
pub fn rig() -> (Machine<MockBoard, MockClock, MockLink>, Shared) {
	let state = Rc::new(RefCell::new(MockState::new()));
	let machine = Machine::new(
		MockBoard(state.clone()),
		MockClock(state.clone()),
		MockLink(state.clone()),
	);
	(machine, state)
}
