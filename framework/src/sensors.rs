/// Hardware abstraction for the timer unit
/// Keeps the timing engine independent of pins, buses and timers so it can
/// run against fakes on the host
use crate::display::DisplaySegments;

/// Echo timeout reported as "no echo"
pub const NO_ECHO: i64 = 0;

/// Ultrasonic ranging sensor
/// Implementations: HC-SR04, JSN-SR04T, etc.
pub trait EchoSensor {
    /// Trigger one measurement and return the echo round-trip time (µs)
    /// Returns [`NO_ECHO`] (or any value <= 0) when nothing answered
    fn measure_echo_us(&mut self) -> i64;
}

/// Four-digit seven-segment display
/// Implementations: HT16K33 backpack, TM1637, etc.
pub trait SegmentDisplay {
    /// Show a frame. Fire-and-forget: drivers log their own bus errors
    fn render(&mut self, segments: &DisplaySegments);
}

impl<T: EchoSensor + ?Sized> EchoSensor for &mut T {
    fn measure_echo_us(&mut self) -> i64 {
        (**self).measure_echo_us()
    }
}

impl<T: SegmentDisplay + ?Sized> SegmentDisplay for &mut T {
    fn render(&mut self, segments: &DisplaySegments) {
        (**self).render(segments)
    }
}
