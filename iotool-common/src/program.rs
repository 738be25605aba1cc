//! The stored program: a bounded, append-only sequence of opcodes plus the
//! loop-counter side table.

use heapless::Vec;

use crate::parser::Error;
use crate::pins::PinId;
use crate::{MAX_LOOP_COMMANDS, MAX_PROGRAM_STEPS};

/// One recorded instruction. Operands are typed and sized per opcode;
/// branch targets are absolute step indices fixed at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
	/// Debounced waits; with a zero settling window they degrade to raw.
	WaitHigh(PinId),
	WaitLow(PinId),
	WaitChange(PinId),
	RawWaitHigh(PinId),
	RawWaitLow(PinId),
	RawWaitChange(PinId),
	/// New debounce settling window, in half-microseconds.
	SetWaitTime(u16),
	DelayMs(u16),
	/// Busy delay in half-microseconds; not cancellable.
	DelayHalfUs(u16),
	TimerBegin,
	TimerEnd,
	SetPwm { pin: PinId, duty: u16 },
	SetHigh(PinId),
	SetLow(PinId),
	SetTristate(PinId),
	ReadDigital(PinId),
	ReadAnalog(PinId),
	CharTransmit(u8),
	CharReceive,
	CharGoto,
	Loop { target: u8, count: u16 },
	Goto(u8),
	Noop,
}

impl Op {
	/// Control-flow opcodes have no meaning outside a stored program and
	/// are skipped in immediate mode.
	pub fn is_control_flow(&self) -> bool {
		matches!(self, Op::Loop { .. } | Op::Goto(_) | Op::CharGoto)
	}
}

/// Counter state for one `lo` instruction, keyed by its step index.
#[derive(Debug, Clone, Copy)]
pub struct LoopSlot {
	pub step: u8,
	pub initial: u16,
	pub current: u16,
	/// Set while the program counter is inside this loop's back-edge range
	/// during the current pass.
	pub active: bool,
}

#[derive(Default)]
pub struct ProgramStore {
	pub(crate) steps: Vec<Op, MAX_PROGRAM_STEPS>,
	pub(crate) loops: Vec<LoopSlot, MAX_LOOP_COMMANDS>,
}

impl ProgramStore {
	pub fn new() -> Self {
		ProgramStore { steps: Vec::new(), loops: Vec::new() }
	}

	/// Append a step, allocating a loop slot when the opcode is `lo`.
	/// Fails with `NoRoom` when either table is full; nothing is committed
	/// on failure.
	pub fn append(&mut self, op: Op) -> Result<(), Error> {
		if self.steps.is_full() {
			return Err(Error::NoRoom);
		}
		if let Op::Loop { count, .. } = op {
			let slot = LoopSlot {
				step: self.steps.len() as u8,
				initial: count,
				current: 0,
				active: false,
			};
			self.loops.push(slot).map_err(|_| Error::NoRoom)?;
		}
		// Can't fail; capacity was checked above.
		self.steps.push(op).map_err(|_| Error::NoRoom)
	}

	pub fn clear(&mut self) {
		self.steps.clear();
		self.loops.clear();
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}
}
