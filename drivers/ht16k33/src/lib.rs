//! HT16K33 Seven-Segment Backpack Encoder
//!
//! This crate builds the I2C byte sequences for a HT16K33 LED controller
//! driving a four-digit seven-segment display with a centre colon (the common
//! 0.56" "backpack" layout). It does not touch the bus; the caller writes the
//! returned bytes with whatever I2C driver the platform provides.
//!
//! # Features
//!
//! - Command builders for oscillator, display and dimming setup
//! - Display RAM frame layout (digits at 0, 2, 6, 8 and colon at 4)
//! - `no_std` compatible
//! - No external dependencies (optional `log` with the `logging` feature)
//!
//! # Example
//!
//! ```ignore
//! use ht16k33::{Blink, Ht16k33};
//!
//! let display = Ht16k33::new(ht16k33::DEFAULT_ADDRESS);
//!
//! for cmd in display.init_sequence(15, Blink::Off)? {
//!     i2c.write(display.address(), &[cmd], TIMEOUT)?;
//! }
//!
//! // "12:34"
//! let frame = display.frame(&[0x06, 0x5B, 0x4F, 0x66], true);
//! i2c.write(display.address(), &frame, TIMEOUT)?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "logging")]
use log::warn;

/// Default I2C address (A0-A2 jumpers open)
pub const DEFAULT_ADDRESS: u8 = 0x70;

/// Highest dimming level
pub const MAX_BRIGHTNESS: u8 = 15;

/// Digit positions on the backpack
pub const DIGIT_COUNT: usize = 4;

/// Frame length: RAM start address + 5 positions × 2 bytes
pub const FRAME_LEN: usize = 11;

/// Command bytes
const CMD_SYSTEM_SETUP: u8 = 0x20;
const CMD_DISPLAY_SETUP: u8 = 0x80;
const CMD_DIMMING: u8 = 0xE0;

/// System setup flag: internal oscillator on
const OSCILLATOR_ON: u8 = 0x01;
/// Display setup flag: display on
const DISPLAY_ON: u8 = 0x01;

/// RAM offsets (within the frame, after the address byte) of each digit
const DIGIT_OFFSETS: [usize; DIGIT_COUNT] = [1, 3, 7, 9];
/// RAM offset of the colon position
const COLON_OFFSET: usize = 5;
/// Colon segment bit at the colon position
const COLON_BITS: u8 = 0x02;

/// Hardware blink rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blink {
    #[default]
    Off,
    TwoHz,
    OneHz,
    HalfHz,
}

impl Blink {
    fn bits(self) -> u8 {
        match self {
            Blink::Off => 0b00,
            Blink::TwoHz => 0b01,
            Blink::OneHz => 0b10,
            Blink::HalfHz => 0b11,
        }
    }
}

/// Encoder errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Brightness above [`MAX_BRIGHTNESS`]
    BrightnessOutOfRange(u8),
}

/// One HT16K33 on the bus
#[derive(Debug, Clone, Copy)]
pub struct Ht16k33 {
    address: u8,
}

impl Ht16k33 {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    /// 7-bit I2C address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Start the internal oscillator (leaves standby)
    pub fn oscillator_on(&self) -> u8 {
        CMD_SYSTEM_SETUP | OSCILLATOR_ON
    }

    /// Display on/off and blink rate
    pub fn display_setup(&self, on: bool, blink: Blink) -> u8 {
        let on_bit = if on { DISPLAY_ON } else { 0 };
        CMD_DISPLAY_SETUP | (blink.bits() << 1) | on_bit
    }

    /// Dimming level 0-15
    pub fn brightness(&self, level: u8) -> Result<u8, Error> {
        if level > MAX_BRIGHTNESS {
            #[cfg(feature = "logging")]
            warn!("HT16K33 brightness {} out of range", level);
            return Err(Error::BrightnessOutOfRange(level));
        }
        Ok(CMD_DIMMING | level)
    }

    /// Single-byte commands to send after power-up, in order
    pub fn init_sequence(&self, brightness: u8, blink: Blink) -> Result<[u8; 3], Error> {
        Ok([
            self.oscillator_on(),
            self.brightness(brightness)?,
            self.display_setup(true, blink),
        ])
    }

    /// Display RAM write for four glyphs and the colon
    ///
    /// Glyph bits follow the usual a-g + dp order (bit0 top ... bit6 middle,
    /// bit7 decimal point), which is also the backpack's wiring.
    pub fn frame(&self, digits: &[u8; DIGIT_COUNT], colon: bool) -> [u8; FRAME_LEN] {
        // Byte 0 is the RAM start address (0x00)
        let mut buf = [0u8; FRAME_LEN];
        for (offset, &glyph) in DIGIT_OFFSETS.iter().zip(digits.iter()) {
            buf[*offset] = glyph;
        }
        if colon {
            buf[COLON_OFFSET] = COLON_BITS;
        }
        buf
    }

    /// Frame that clears every position
    pub fn clear_frame(&self) -> [u8; FRAME_LEN] {
        [0u8; FRAME_LEN]
    }
}

impl Default for Ht16k33 {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}
