//! Static pin descriptor table.
//!
//! Pure data: maps a 1-2 character pin name to its electrical capabilities.
//! Everything above consults this table; nothing ever writes it.

/// Index into [`PINS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinId(pub u8);

impl PinId {
	pub fn index(self) -> usize {
		self.0 as usize
	}

	pub fn desc(self) -> &'static PinDesc {
		&PINS[self.index()]
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmWidth {
	/// 8-bit duty register, max 255.
	Pwm8,
	/// 16-bit duty register driven with 10-bit resolution, max 1023.
	Pwm16,
}

impl PwmWidth {
	pub fn max_duty(self) -> u16 {
		match self {
			PwmWidth::Pwm8 => 255,
			PwmWidth::Pwm16 => (1 << 10) - 1,
		}
	}
}

pub struct PinDesc {
	pub name: &'static str,
	pub pwm: Option<PwmWidth>,
	/// ADC channel for analog-capable pins.
	pub adc: Option<u8>,
}

impl PinDesc {
	const fn plain(name: &'static str) -> Self {
		PinDesc { name, pwm: None, adc: None }
	}

	const fn pwm(name: &'static str, width: PwmWidth) -> Self {
		PinDesc { name, pwm: Some(width), adc: None }
	}

	const fn analog(name: &'static str, channel: u8) -> Self {
		PinDesc { name, pwm: None, adc: Some(channel) }
	}
}

pub const PIN_COUNT: usize = 25;

/// The ATmega32U4 header pins, in the board's silkscreen naming.
pub static PINS: [PinDesc; PIN_COUNT] = [
	PinDesc::plain("SS"),
	PinDesc::plain("SC"),
	PinDesc::plain("MO"),
	PinDesc::plain("MI"),
	PinDesc::plain("8"),
	PinDesc::pwm("9", PwmWidth::Pwm16),
	PinDesc::pwm("10", PwmWidth::Pwm16),
	PinDesc::pwm("11", PwmWidth::Pwm8),
	PinDesc::plain("5"),
	PinDesc::pwm("13", PwmWidth::Pwm8),
	PinDesc::pwm("3", PwmWidth::Pwm8),
	PinDesc::plain("2"),
	PinDesc::plain("RX"),
	PinDesc::plain("TX"),
	PinDesc::plain("4"),
	PinDesc::plain("TL"),
	PinDesc::plain("12"),
	PinDesc::pwm("6", PwmWidth::Pwm8),
	PinDesc::plain("7"),
	PinDesc::analog("A5", 0),
	PinDesc::analog("A4", 1),
	PinDesc::analog("A3", 4),
	PinDesc::analog("A2", 5),
	PinDesc::analog("A1", 6),
	PinDesc::analog("A0", 7),
];

/// Match a pin name at the start of `input`, table order deciding ties.
/// Returns the pin and how many bytes of `input` it consumed.
pub fn match_name(input: &str) -> Option<(PinId, usize)> {
	for (i, desc) in PINS.iter().enumerate() {
		if input.as_bytes().starts_with(desc.name.as_bytes()) {
			return Some((PinId(i as u8), desc.name.len()));
		}
	}
	None
}
