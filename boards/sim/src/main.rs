//! Drive the interpreter from stdin against the simulated board.
//!
//! Each stdin line goes through the console exactly as it would arrive
//! over serial; the device's replies stream to stdout. On EOF the pin
//! event trace is printed with virtual-time stamps in half-microseconds.

use std::io::{self, BufRead, Write};

fn main() -> io::Result<()> {
	let (mut console, state) = iotool_sim::bench();
	let stdin = io::stdin();
	let mut stdout = io::stdout();

	// Startup prompt, as the firmware writes before its first read.
	stdout.write_all(b">")?;
	stdout.flush()?;

	for line in stdin.lock().lines() {
		let line = line?;
		console.handle_line(line.as_bytes());
		let reply = state.borrow_mut().take_output();
		stdout.write_all(reply.as_bytes())?;
		stdout.flush()?;
	}

	writeln!(stdout)?;
	for event in &state.borrow().events {
		writeln!(
			stdout,
			"{:>12} {:<3} {:?}",
			event.at,
			event.pin.desc().name,
			event.action
		)?;
	}
	Ok(())
}
