//! End-to-end scenarios: full host sessions against the simulated board,
//! asserted on the transcript and the timestamped pin trace.

use iotool_sim::{bench, PinAction, PinEvent};

use iotool_common::pins::match_name;
use iotool_common::QUIT_BYTE;

fn session(lines: &[&str]) -> (String, Vec<PinEvent>) {
	let (mut console, state) = bench();
	for line in lines {
		console.handle_line(line.as_bytes());
	}
	let mut s = state.borrow_mut();
	let text = s.take_output();
	(text, s.events.clone())
}

#[test]
fn recorded_blink_runs_three_times_with_full_delays() {
	let (out, events) = session(&["program", "sh 8", "dm 10", "sl 8", "end", "run 3"]);
	// A clean session is prompts only; the last prompt marks completion.
	assert_eq!(out, ">>>>>>");

	let pin = match_name("8").unwrap().0;
	let edges: Vec<&PinEvent> = events.iter().filter(|e| e.pin == pin).collect();
	assert_eq!(edges.len(), 6);
	for pair in edges.chunks(2) {
		assert_eq!(pair[0].action, PinAction::High);
		assert_eq!(pair[1].action, PinAction::Low);
		// dm 10 holds the level for 10 ms of virtual time, minus up to
		// one millisecond of counter granularity.
		assert!(
			pair[1].at - pair[0].at >= 18_000,
			"high phase only {} half-us",
			pair[1].at - pair[0].at
		);
	}
}

#[test]
fn loop_repeats_its_body() {
	let (out, _) = session(&["program", "ct 65", "lo 0 2", "end", "run"]);
	assert_eq!(out, ">>>>AAA>");
}

#[test]
fn run_iterations_multiply_loop_passes() {
	let (out, _) = session(&["program", "ct 66", "lo 0 1", "end", "run 2"]);
	assert_eq!(out, ">>>>BBBB>");
}

#[test]
fn pwm_rejected_then_accepted() {
	let (mut console, state) = bench();
	console.handle_line(b"pm 2 100");
	assert_eq!(
		state.borrow_mut().take_output(),
		"ERROR: Specified pin is not PWM-enabled\n>"
	);
	console.handle_line(b"pm 9 512");
	let pin = match_name("9").unwrap().0;
	let s = state.borrow();
	assert_eq!(s.pwm_duty(pin), Some(512));
	assert!(s
		.events
		.iter()
		.any(|e| e.pin == pin && e.action == PinAction::Pwm(512)));
}

#[test]
fn quit_sentinel_aborts_an_immediate_wait() {
	let (mut console, state) = bench();
	// Pin 8 stays low; only the sentinel can end the wait.
	state.borrow_mut().schedule_byte(1_000, QUIT_BYTE);
	console.handle_line(b"wh 8");
	assert_eq!(state.borrow_mut().take_output(), ">");
}

#[test]
fn quit_sentinel_aborts_a_running_program() {
	let (mut console, state) = bench();
	state.borrow_mut().schedule_byte(5_000, QUIT_BYTE);
	console.handle_line(b"program");
	console.handle_line(b"wh 8");
	console.handle_line(b"ct 65");
	console.handle_line(b"end");
	console.handle_line(b"run 10");
	// The wait never completed, so no pass reached the transmit step and
	// no further iterations started.
	assert_eq!(state.borrow_mut().take_output(), ">>>>>");
}

#[test]
fn char_goto_jumps_and_clamps() {
	// Byte 2 lands on the second transmit.
	let (mut console, state) = bench();
	state.borrow_mut().schedule_byte(0, 2);
	for line in ["program", "cg", "ct 65", "ct 66", "end", "run"] {
		console.handle_line(line.as_bytes());
	}
	assert_eq!(state.borrow_mut().take_output(), ">>>>>B>");

	// A target past the end of the program ends the pass.
	let (mut console, state) = bench();
	state.borrow_mut().schedule_byte(0, 200);
	for line in ["program", "cg", "ct 65", "ct 66", "end", "run"] {
		console.handle_line(line.as_bytes());
	}
	assert_eq!(state.borrow_mut().take_output(), ">>>>>>");
}

#[test]
fn analog_read_prints_the_channel_value() {
	let (mut console, state) = bench();
	state.borrow_mut().set_analog(7, 683); // channel 7 backs pin A0
	console.handle_line(b"ra A0");
	assert_eq!(state.borrow_mut().take_output(), "683\n>");
}

#[test]
fn digital_read_reports_the_level() {
	let (mut console, state) = bench();
	let pin = match_name("8").unwrap().0;
	state.borrow_mut().schedule_level(0, pin, true);
	console.handle_line(b"rd 8");
	assert_eq!(state.borrow_mut().take_output(), "1\n>");
}

#[test]
fn timer_measures_a_recorded_delay() {
	let (out, _) = session(&["program", "tb", "dm 5", "te", "end", "run"]);
	let body = out.trim_start_matches('>');
	let us: u64 = body.trim_end_matches('>').trim().parse().unwrap();
	assert!((4_990..5_100).contains(&us), "reported {}us", us);
}

#[test]
fn bad_lines_produce_single_error_lines() {
	let (out, _) = session(&["zz", "sh", "run now", "ra 8"]);
	assert_eq!(
		out,
		concat!(
			"ERROR: Unknown function\n>",
			"ERROR: Could not parse function parameters\n>",
			"ERROR: Invalid input\n>",
			"ERROR: Specified pin cannot be used for analog input\n>"
		)
	);
}
