//! Interactive front-end: line discipline, control words, and the
//! immediate-vs-recording decision for parsed steps.

use heapless::Vec;

use crate::hal::{AnalogRef, Board, Clock, Transport};
use crate::machine::Machine;
use crate::parser::{self, Error};
use crate::program::ProgramStore;
use crate::{ECHO_OFF, LINE_BUF, PROMPT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteMode {
	/// A parsed step runs once on the spot.
	Immediate,
	/// A parsed step is appended to the stored program.
	Recording,
}

pub struct Console<B: Board, C: Clock, T: Transport> {
	pub machine: Machine<B, C, T>,
	pub program: ProgramStore,
	mode: ExecuteMode,
	echo: bool,
}

fn trim(mut bytes: &[u8]) -> &[u8] {
	while let [first, rest @ ..] = bytes {
		if !first.is_ascii_whitespace() {
			break;
		}
		bytes = rest;
	}
	while let [rest @ .., last] = bytes {
		if !last.is_ascii_whitespace() {
			break;
		}
		bytes = rest;
	}
	bytes
}

impl<B: Board, C: Clock, T: Transport> Console<B, C, T> {
	pub fn new(machine: Machine<B, C, T>) -> Self {
		Console {
			machine,
			program: ProgramStore::new(),
			mode: ExecuteMode::Immediate,
			echo: true,
		}
	}

	pub fn mode(&self) -> ExecuteMode {
		self.mode
	}

	/// Serve the host until reset: prompt, read a line, interpret, repeat.
	pub fn run_forever(&mut self) -> ! {
		self.machine.link.write_byte(PROMPT);
		self.machine.link.flush();
		let mut buf: Vec<u8, LINE_BUF> = Vec::new();
		loop {
			self.read_line(&mut buf);
			self.handle_line(&buf);
			buf.clear();
		}
	}

	/// Assemble one line with echo and backspace handling. CR and LF both
	/// terminate; one buffer byte stays reserved, extra input is dropped.
	pub fn read_line(&mut self, buf: &mut Vec<u8, LINE_BUF>) {
		loop {
			let byte = loop {
				match self.machine.link.poll_byte() {
					Ok(b) => break b,
					Err(_) => self.machine.link.service(&self.machine.ctl),
				}
			};
			match byte {
				b'\r' | b'\n' => {
					if self.echo {
						self.emit(b"\r\n");
					}
					return;
				}
				0x08 | 0x7F => {
					if buf.pop().is_some() && self.echo {
						self.emit(b"\x08 \x08");
					}
				}
				_ => {
					if buf.len() < LINE_BUF - 1 {
						// Can't fail; length was just checked.
						let _ = buf.push(byte);
						if self.echo {
							self.machine.link.write_byte(byte);
							self.machine.link.flush();
						}
					}
				}
			}
		}
	}

	/// Process one complete line and finish with the prompt byte. The
	/// prompt after `run` is what tells the host the program completed.
	pub fn handle_line(&mut self, raw: &[u8]) {
		self.interpret(raw);
		self.machine.link.write_byte(PROMPT);
		self.machine.link.flush();
	}

	fn interpret(&mut self, raw: &[u8]) {
		let line = trim(raw);
		if line.is_empty() {
			return;
		}
		if line == ECHO_OFF {
			// Acknowledge even when echo is already off, so the host can
			// always read the handshake back.
			if self.echo {
				self.echo = false;
			} else {
				self.emit(&ECHO_OFF);
				self.emit(b"\n");
			}
			return;
		}
		let Ok(line) = core::str::from_utf8(line) else {
			self.invalid_input();
			return;
		};
		if let Some(rest) = line.strip_prefix("program") {
			if rest.trim().is_empty() {
				self.program.clear();
				self.mode = ExecuteMode::Recording;
			} else {
				self.invalid_input();
			}
		} else if let Some(rest) = line.strip_prefix("end") {
			if rest.trim().is_empty() {
				self.mode = ExecuteMode::Immediate;
			} else {
				self.invalid_input();
			}
		} else if let Some(rest) = line.strip_prefix("run") {
			match parse_iterations(rest) {
				Some(iterations) => self.machine.run(&mut self.program, iterations),
				None => self.invalid_input(),
			}
		} else if let Some(rest) = line.strip_prefix("reset") {
			if rest.trim().is_empty() {
				self.machine.board.watchdog_reset();
			} else {
				self.invalid_input();
			}
		} else if let Some(rest) = line.strip_prefix("aref") {
			if rest.trim().is_empty() {
				self.machine.board.set_analog_ref(AnalogRef::ARef);
			} else {
				self.invalid_input();
			}
		} else if let Some(rest) = line.strip_prefix("avcc") {
			if rest.trim().is_empty() {
				self.machine.board.set_analog_ref(AnalogRef::AVcc);
			} else {
				self.invalid_input();
			}
		} else {
			self.step(line);
		}
	}

	fn step(&mut self, line: &str) {
		match parser::parse_step(line) {
			Err(err) => self.report(err),
			Ok(op) => match self.mode {
				ExecuteMode::Immediate => self.machine.execute_immediate(op),
				ExecuteMode::Recording => {
					if let Err(err) = self.program.append(op) {
						self.report(err);
					}
				}
			},
		}
	}

	fn report(&mut self, err: Error) {
		let _ = ufmt::uwrite!(&mut self.machine.link, "ERROR: {}\n", err.message());
		self.machine.link.flush();
	}

	fn invalid_input(&mut self) {
		self.emit(b"ERROR: Invalid input\n");
	}

	fn emit(&mut self, bytes: &[u8]) {
		for &b in bytes {
			self.machine.link.write_byte(b);
		}
		self.machine.link.flush();
	}
}

/// `run` takes an optional iteration count, defaulting to one.
fn parse_iterations(rest: &str) -> Option<u16> {
	let rest = rest.trim();
	if rest.is_empty() {
		return Some(1);
	}
	rest.parse::<u16>().ok()
}
