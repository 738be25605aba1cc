//! Hardware seams. A board crate implements these three traits and the
//! core never touches a register directly.

use core::convert::Infallible;

use crate::control::RunControl;
use crate::pins::PinId;
use crate::QUIT_BYTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogRef {
	/// Supply voltage as ADC reference (power-on default).
	AVcc,
	/// External reference pin.
	ARef,
}

/// Pin backend, indexed by the descriptor table in [`crate::pins`].
///
/// PWM and analog methods are only ever called for pins the parser has
/// already checked for the capability, so implementations may treat a
/// mismatch as a bug rather than an error.
pub trait Board {
	/// Configure as push-pull output and drive the level.
	fn drive(&mut self, pin: PinId, high: bool);
	/// Configure as input with the pullup enabled.
	fn input_pullup(&mut self, pin: PinId);
	/// Configure as input with no pullup (high impedance).
	fn tristate(&mut self, pin: PinId);
	fn read(&mut self, pin: PinId) -> bool;
	/// Configure as output and connect the PWM carrier at the given duty.
	fn set_pwm(&mut self, pin: PinId, duty: u16);
	/// Disconnect the PWM carrier, leaving plain digital control.
	fn pwm_off(&mut self, pin: PinId);
	/// Start a conversion on the pin's ADC channel and return the result.
	fn read_analog(&mut self, pin: PinId) -> u16;
	fn set_analog_ref(&mut self, aref: AnalogRef);
	/// Let the watchdog restart the device. The reset fires asynchronously;
	/// this returns normally in the meantime.
	fn watchdog_reset(&mut self);
}

/// The one shared hardware counter.
pub trait Clock {
	/// Free-running half-microsecond counter. Wraps; callers subtract in
	/// the counter's native modulus.
	fn ticks(&self) -> u16;
	/// Millisecond tick count maintained alongside `ticks`.
	fn millis(&self) -> u32;
}

/// Byte transport to the host. `uWrite` supplies the formatted-output
/// side so results and diagnostics go out through `ufmt`.
pub trait Transport: ufmt::uWrite<Error = Infallible> {
	/// Non-blocking receive.
	fn poll_byte(&mut self) -> nb::Result<u8, Infallible>;
	fn write_byte(&mut self, byte: u8);
	/// Push any buffered output to the host.
	fn flush(&mut self);

	/// Periodic service hook, called from every polling wait. While a run
	/// is in progress this is the background path that spots the quit
	/// sentinel; all other bytes arriving mid-run are discarded here.
	fn service(&mut self, ctl: &RunControl) {
		if ctl.watching_input() {
			if let Ok(byte) = self.poll_byte() {
				if byte == QUIT_BYTE {
					ctl.cancel();
				}
			}
		}
	}
}
