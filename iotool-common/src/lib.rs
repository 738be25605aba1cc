#![cfg_attr(not(test), no_std)]

/*!
 * Platform-independent core of the IOTool pin-driver firmware.
 *
 * A host sends two-letter commands over a serial link; each one either runs
 * immediately or is recorded into a small stored program that `run` replays
 * at hardware speed. Everything hardware-specific sits behind the traits in
 * [`hal`], so the same core drives a real board or the simulator in
 * `boards/sim`.
 */

pub mod console;
pub mod control;
pub mod hal;
pub mod machine;
pub mod parser;
pub mod pins;
pub mod program;
pub mod timing;

#[cfg(test)]
pub(crate) mod mock;

/// Receiving this byte while a program runs cancels it ('!').
pub const QUIT_BYTE: u8 = 33;
/// Written after every processed line; doubles as the run-completion marker.
pub const PROMPT: u8 = b'>';
/// Two reserved bytes a host sends to turn off line echo.
pub const ECHO_OFF: [u8; 2] = [0x80, 0xFF];

pub const MAX_PROGRAM_STEPS: usize = 256;
pub const MAX_LOOP_COMMANDS: usize = 10;
pub const LINE_BUF: usize = 80;

/// The countdown timer runs at 2 MHz, so one tick is half a microsecond.
pub const TICKS_PER_MS: u16 = 2000;
