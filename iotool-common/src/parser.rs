//! Line parser: two-letter mnemonic plus fixed operands, producing one
//! fully-validated [`Op`]. Pin-capability and range checks all happen
//! here so a bad step is never recorded.

use crate::pins::{self, PinId, PINS};
use crate::program::Op;
use crate::MAX_PROGRAM_STEPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	UnknownMnemonic,
	BadParameter,
	NotPwmCapable,
	NotAnalogCapable,
	NoRoom,
}

impl Error {
	/// Host-visible diagnostic text, one line per failure kind.
	pub fn message(&self) -> &'static str {
		match self {
			Error::UnknownMnemonic => "Unknown function",
			Error::BadParameter => "Could not parse function parameters",
			Error::NotPwmCapable => "Specified pin is not PWM-enabled",
			Error::NotAnalogCapable => "Specified pin cannot be used for analog input",
			Error::NoRoom => "Too many function steps",
		}
	}
}

fn skip_ws(s: &mut &str) {
	*s = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
}

/// Unsigned decimal, rejecting absent digits and anything above `max`.
fn parse_unsigned(s: &mut &str, max: u32) -> Result<u32, Error> {
	skip_ws(s);
	let bytes = s.as_bytes();
	let mut value: u32 = 0;
	let mut used = 0;
	while used < bytes.len() && bytes[used].is_ascii_digit() {
		value = value
			.checked_mul(10)
			.and_then(|v| v.checked_add((bytes[used] - b'0') as u32))
			.ok_or(Error::BadParameter)?;
		if value > max {
			return Err(Error::BadParameter);
		}
		used += 1;
	}
	if used == 0 {
		return Err(Error::BadParameter);
	}
	*s = &s[used..];
	Ok(value)
}

fn parse_u16(s: &mut &str, max: u16) -> Result<u16, Error> {
	parse_unsigned(s, max as u32).map(|v| v as u16)
}

fn parse_u8(s: &mut &str, max: u8) -> Result<u8, Error> {
	parse_unsigned(s, max as u32).map(|v| v as u8)
}

/// Pin operand: a symbolic name from the pin table (table order wins) or,
/// failing that, a decimal table index.
fn parse_pin(s: &mut &str) -> Result<PinId, Error> {
	skip_ws(s);
	if let Some((pin, used)) = pins::match_name(s) {
		*s = &s[used..];
		return Ok(pin);
	}
	let index = parse_unsigned(s, PINS.len() as u32 - 1)?;
	Ok(PinId(index as u8))
}

/// After all operands, only whitespace may remain.
fn finish(s: &str) -> Result<(), Error> {
	if s.bytes().all(|b| b.is_ascii_whitespace()) {
		Ok(())
	} else {
		Err(Error::BadParameter)
	}
}

/// Parse one trimmed, non-empty command line into a program step.
pub fn parse_step(line: &str) -> Result<Op, Error> {
	let bytes = line.as_bytes();
	if bytes.len() < 2 || !line.is_ascii() {
		return Err(Error::UnknownMnemonic);
	}
	let mut rest = &line[2..];
	let op = match [bytes[0], bytes[1]] {
		[b'w', b'h'] => Op::WaitHigh(parse_pin(&mut rest)?),
		[b'w', b'l'] => Op::WaitLow(parse_pin(&mut rest)?),
		[b'w', b'c'] => Op::WaitChange(parse_pin(&mut rest)?),
		// Raw waits answer to both the `u*` and `r*` spellings.
		[b'u' | b'r', b'h'] => Op::RawWaitHigh(parse_pin(&mut rest)?),
		[b'u' | b'r', b'l'] => Op::RawWaitLow(parse_pin(&mut rest)?),
		[b'u' | b'r', b'c'] => Op::RawWaitChange(parse_pin(&mut rest)?),
		// The settling window and the short delay are kept internally in
		// half-microseconds, so both operands double here.
		[b'w', b't'] => Op::SetWaitTime(parse_u16(&mut rest, 0x7FFF)? * 2),
		[b'd', b'u'] => Op::DelayHalfUs(parse_u16(&mut rest, 0x7FFF)? * 2),
		[b'd', b'm'] => Op::DelayMs(parse_u16(&mut rest, u16::MAX)?),
		[b't', b'b'] => Op::TimerBegin,
		[b't', b'e'] => Op::TimerEnd,
		[b'p', b'm'] => {
			let pin = parse_pin(&mut rest)?;
			let width = pin.desc().pwm.ok_or(Error::NotPwmCapable)?;
			let duty = parse_u16(&mut rest, width.max_duty())?;
			Op::SetPwm { pin, duty }
		}
		[b's', b'h'] => Op::SetHigh(parse_pin(&mut rest)?),
		[b's', b'l'] => Op::SetLow(parse_pin(&mut rest)?),
		[b's', b't'] => Op::SetTristate(parse_pin(&mut rest)?),
		[b'r', b'd'] => Op::ReadDigital(parse_pin(&mut rest)?),
		[b'r', b'a'] => {
			let pin = parse_pin(&mut rest)?;
			if pin.desc().adc.is_none() {
				return Err(Error::NotAnalogCapable);
			}
			Op::ReadAnalog(pin)
		}
		[b'c', b't'] => Op::CharTransmit(parse_u8(&mut rest, 255)?),
		[b'c', b'r'] => Op::CharReceive,
		[b'c', b'g'] => Op::CharGoto,
		[b'l', b'o'] => {
			let target = parse_u8(&mut rest, (MAX_PROGRAM_STEPS - 1) as u8)?;
			let count = parse_u16(&mut rest, u16::MAX)?;
			Op::Loop { target, count }
		}
		[b'g', b'o'] => Op::Goto(parse_u8(&mut rest, (MAX_PROGRAM_STEPS - 1) as u8)?),
		[b'n', b'o'] => Op::Noop,
		_ => return Err(Error::UnknownMnemonic),
	};
	finish(rest)?;
	Ok(op)
}
