//! Seven-segment formatting
//!
//! Pure functions that turn race time, lap counts and status into the four
//! glyphs (plus colon) of the timer display.
//!
//! ## Glyph bit layout
//!
//! ```text
//!   _        bit0 top
//!  |_|       bit1 top right,  bit2 bottom right
//!  |_|.      bit3 bottom,     bit4 bottom left
//!            bit5 top left,   bit6 middle,  bit7 decimal point
//! ```

use crate::race::RacePhase;

pub const LETTER_L: u8 = 0b0011_1000;
pub const LETTER_A: u8 = 0b0111_0111;
pub const LETTER_P: u8 = 0b0111_0011;
pub const DASH: u8 = 0b0100_0000;
pub const BLANK: u8 = 0b0000_0000;
pub const DECIMAL_POINT: u8 = 0b1000_0000;

/// Glyphs for 0-9
pub const DIGITS: [u8; 10] = [
    0b0011_1111, // 0
    0b0000_0110, // 1
    0b0101_1011, // 2
    0b0100_1111, // 3
    0b0110_0110, // 4
    0b0110_1101, // 5
    0b0111_1101, // 6
    0b0000_0111, // 7
    0b0111_1111, // 8
    0b0110_1111, // 9
];

/// Number of digit positions on the display
pub const DISPLAY_WIDTH: usize = 4;

const MS_PER_MINUTE: u32 = 60_000;

/// Blink timings for the status indicator (ms)
pub const BLINK_INTERVAL_MS: u32 = 250;
pub const QUICK_BLINK_DURATION_MS: u32 = 150;
pub const LONG_BLINK_DURATION_MS: u32 = 750;

/// One frame for the display driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplaySegments {
    /// Segment masks, leftmost digit first
    pub digits: [u8; DISPLAY_WIDTH],
    /// Centre colon
    pub colon: bool,
}

impl DisplaySegments {
    pub const BLANK: Self = Self {
        digits: [BLANK; DISPLAY_WIDTH],
        colon: false,
    };

    pub const DASHES: Self = Self {
        digits: [DASH; DISPLAY_WIDTH],
        colon: false,
    };

    pub fn new(digits: [u8; DISPLAY_WIDTH], colon: bool) -> Self {
        Self { digits, colon }
    }

    /// Right-aligned decimal number without leading zeros, saturating at 9999
    pub fn number(value: u32) -> Self {
        let mut value = value.min(9_999);
        let mut digits = [BLANK; DISPLAY_WIDTH];
        for slot in digits.iter_mut().rev() {
            *slot = digit(value % 10);
            value /= 10;
            if value == 0 {
                break;
            }
        }
        Self::new(digits, false)
    }
}

/// Glyph for a single decimal digit (values above 9 use their last digit)
pub fn digit(value: u32) -> u8 {
    DIGITS[(value % 10) as usize]
}

/// Leading digit, blanked when zero
fn leading_digit(value: u32) -> u8 {
    if value == 0 {
        BLANK
    } else {
        digit(value)
    }
}

/// Elapsed time split for display, chosen by magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElapsedReadout {
    /// Under a minute: `SS.hh`
    SecondsMillis { seconds: u32, millis: u32 },
    /// A minute or more: `MM:SS`
    MinutesSeconds { minutes: u32, seconds: u32 },
}

impl ElapsedReadout {
    /// Render into display glyphs. Minutes saturate at 99:59.
    pub fn to_segments(&self) -> DisplaySegments {
        match *self {
            ElapsedReadout::SecondsMillis { seconds, millis } => {
                let hundredths = millis / 10;
                DisplaySegments::new(
                    [
                        leading_digit(seconds / 10),
                        digit(seconds) | DECIMAL_POINT,
                        digit(hundredths / 10),
                        digit(hundredths),
                    ],
                    false,
                )
            }
            ElapsedReadout::MinutesSeconds { minutes, seconds } => {
                let (minutes, seconds) = if minutes > 99 {
                    (99, 59)
                } else {
                    (minutes, seconds)
                };
                DisplaySegments::new(
                    [
                        leading_digit(minutes / 10),
                        digit(minutes),
                        digit(seconds / 10),
                        digit(seconds),
                    ],
                    true,
                )
            }
        }
    }
}

/// Split an elapsed duration into the readout for its magnitude
pub fn format_elapsed(elapsed_ms: u32) -> ElapsedReadout {
    if elapsed_ms < MS_PER_MINUTE {
        ElapsedReadout::SecondsMillis {
            seconds: elapsed_ms / 1_000,
            millis: elapsed_ms % 1_000,
        }
    } else {
        ElapsedReadout::MinutesSeconds {
            minutes: elapsed_ms / MS_PER_MINUTE,
            seconds: (elapsed_ms % MS_PER_MINUTE) / 1_000,
        }
    }
}

/// Whole seconds left on a countdown, rounded up so "1" shows until the start
pub fn format_countdown(remaining_ms: u32) -> DisplaySegments {
    DisplaySegments::number(remaining_ms.div_ceil(1_000))
}

/// "LAP" label followed by the lap number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapBanner {
    pub label: DisplaySegments,
    pub count: DisplaySegments,
}

impl LapBanner {
    /// Frame to show `shown_for_ms` after the banner started
    ///
    /// The label stays up for `delay_ms`, then the number for `delay_ms`, then
    /// `None` tells the caller to go back to the time display.
    pub fn frame(&self, shown_for_ms: u32, delay_ms: u32) -> Option<DisplaySegments> {
        if shown_for_ms < delay_ms {
            Some(self.label)
        } else if shown_for_ms < delay_ms.saturating_mul(2) {
            Some(self.count)
        } else {
            None
        }
    }
}

/// Build the lap banner for lap `lap`
pub fn format_lap_count(lap: u32) -> LapBanner {
    LapBanner {
        label: DisplaySegments::new([LETTER_L, LETTER_A, LETTER_P, BLANK], false),
        count: DisplaySegments::number(lap),
    }
}

/// Periodic blink: on for `on_ms`, then off for `interval_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub interval_ms: u32,
    pub on_ms: u32,
}

pub const QUICK_BLINK: BlinkPattern = BlinkPattern {
    interval_ms: BLINK_INTERVAL_MS,
    on_ms: QUICK_BLINK_DURATION_MS,
};

pub const LONG_BLINK: BlinkPattern = BlinkPattern {
    interval_ms: BLINK_INTERVAL_MS,
    on_ms: LONG_BLINK_DURATION_MS,
};

impl BlinkPattern {
    /// On/off state `elapsed_ms` after the blink sequence started
    pub fn is_on(&self, elapsed_ms: u32) -> bool {
        let period = self.on_ms.saturating_add(self.interval_ms);
        if period == 0 {
            return false;
        }
        elapsed_ms % period < self.on_ms
    }
}

/// Status indicator behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Solid,
    Blink(BlinkPattern),
}

impl LedPattern {
    pub fn is_on(&self, elapsed_ms: u32) -> bool {
        match self {
            LedPattern::Off => false,
            LedPattern::Solid => true,
            LedPattern::Blink(pattern) => pattern.is_on(elapsed_ms),
        }
    }
}

/// Status indicator pattern for each race phase
pub fn status_pattern(phase: RacePhase) -> LedPattern {
    match phase {
        RacePhase::NotRegistered => LedPattern::Blink(QUICK_BLINK),
        RacePhase::Registered => LedPattern::Blink(LONG_BLINK),
        RacePhase::CountdownToStart => LedPattern::Solid,
        RacePhase::InProgress => LedPattern::Off,
        RacePhase::Finished => LedPattern::Blink(LONG_BLINK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_switch_at_one_minute() {
        assert_eq!(
            format_elapsed(59_999),
            ElapsedReadout::SecondsMillis {
                seconds: 59,
                millis: 999
            }
        );
        assert_eq!(
            format_elapsed(60_000),
            ElapsedReadout::MinutesSeconds {
                minutes: 1,
                seconds: 0
            }
        );
    }

    #[test]
    fn test_seconds_millis_segments() {
        let segments = format_elapsed(12_345).to_segments();
        assert_eq!(
            segments.digits,
            [DIGITS[1], DIGITS[2] | DECIMAL_POINT, DIGITS[3], DIGITS[4]]
        );
        assert!(!segments.colon);
    }

    #[test]
    fn test_seconds_leading_zero_blanked() {
        let segments = format_elapsed(5_070).to_segments();
        assert_eq!(
            segments.digits,
            [BLANK, DIGITS[5] | DECIMAL_POINT, DIGITS[0], DIGITS[7]]
        );

        let zero = format_elapsed(0).to_segments();
        assert_eq!(
            zero.digits,
            [BLANK, DIGITS[0] | DECIMAL_POINT, DIGITS[0], DIGITS[0]]
        );
    }

    #[test]
    fn test_minutes_seconds_segments() {
        // 12:34
        let segments = format_elapsed(12 * 60_000 + 34_999).to_segments();
        assert_eq!(segments.digits, [DIGITS[1], DIGITS[2], DIGITS[3], DIGITS[4]]);
        assert!(segments.colon);

        // 1:05
        let segments = format_elapsed(65_000).to_segments();
        assert_eq!(segments.digits, [BLANK, DIGITS[1], DIGITS[0], DIGITS[5]]);
        assert!(segments.colon);
    }

    #[test]
    fn test_minutes_saturate() {
        let segments = format_elapsed(100 * 60_000 + 5_000).to_segments();
        assert_eq!(segments.digits, [DIGITS[9], DIGITS[9], DIGITS[5], DIGITS[9]]);
    }

    #[test]
    fn test_number_right_aligned() {
        assert_eq!(
            DisplaySegments::number(7).digits,
            [BLANK, BLANK, BLANK, DIGITS[7]]
        );
        assert_eq!(
            DisplaySegments::number(0).digits,
            [BLANK, BLANK, BLANK, DIGITS[0]]
        );
        assert_eq!(
            DisplaySegments::number(305).digits,
            [BLANK, DIGITS[3], DIGITS[0], DIGITS[5]]
        );
        assert_eq!(
            DisplaySegments::number(123_456).digits,
            [DIGITS[9]; DISPLAY_WIDTH]
        );
    }

    #[test]
    fn test_countdown_rounds_up() {
        assert_eq!(format_countdown(3_000), DisplaySegments::number(3));
        assert_eq!(format_countdown(2_001), DisplaySegments::number(3));
        assert_eq!(format_countdown(1), DisplaySegments::number(1));
        assert_eq!(format_countdown(0), DisplaySegments::number(0));
    }

    #[test]
    fn test_lap_banner_sequence() {
        let banner = format_lap_count(12);
        assert_eq!(
            banner.label.digits,
            [LETTER_L, LETTER_A, LETTER_P, BLANK]
        );

        assert_eq!(banner.frame(0, 1_000), Some(banner.label));
        assert_eq!(banner.frame(999, 1_000), Some(banner.label));
        assert_eq!(banner.frame(1_000, 1_000), Some(banner.count));
        assert_eq!(
            banner.frame(1_999, 1_000).map(|s| s.digits),
            Some([BLANK, BLANK, DIGITS[1], DIGITS[2]])
        );
        assert_eq!(banner.frame(2_000, 1_000), None);
    }

    #[test]
    fn test_quick_blink() {
        // 150ms on, 250ms off, period 400ms
        assert!(QUICK_BLINK.is_on(0));
        assert!(QUICK_BLINK.is_on(149));
        assert!(!QUICK_BLINK.is_on(150));
        assert!(!QUICK_BLINK.is_on(399));
        assert!(QUICK_BLINK.is_on(400));
    }

    #[test]
    fn test_long_blink() {
        // 750ms on, 250ms off, period 1000ms
        assert!(LONG_BLINK.is_on(0));
        assert!(LONG_BLINK.is_on(749));
        assert!(!LONG_BLINK.is_on(750));
        assert!(!LONG_BLINK.is_on(999));
        assert!(LONG_BLINK.is_on(1_000));
    }

    #[test]
    fn test_degenerate_blink_is_off() {
        let pattern = BlinkPattern {
            interval_ms: 0,
            on_ms: 0,
        };
        assert!(!pattern.is_on(0));
        assert!(!pattern.is_on(1234));
    }

    #[test]
    fn test_status_patterns() {
        assert_eq!(
            status_pattern(RacePhase::NotRegistered),
            LedPattern::Blink(QUICK_BLINK)
        );
        assert_eq!(
            status_pattern(RacePhase::Registered),
            LedPattern::Blink(LONG_BLINK)
        );
        assert!(status_pattern(RacePhase::CountdownToStart).is_on(12_345));
        assert!(!status_pattern(RacePhase::InProgress).is_on(0));
    }
}
