//! Ultrasonic distance sampling
//!
//! Converts a raw HC-SR04 style echo duration into centimeters and classifies
//! the result against the detection window. Everything here is a pure function
//! of its input; the sampler only carries thresholds.

use crate::config::DetectionConfig;

/// Distance reported when the sensor saw no echo this tick
pub const NO_ECHO_CM: i32 = -1;

/// Speed of sound at ~20°C in cm/µs
const SOUND_CM_PER_US: f32 = 0.0343;

/// One distance reading, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceSample {
    /// Raw echo round-trip time (µs). Zero or negative means no echo.
    pub echo_us: i64,
    /// Derived distance (cm), or [`NO_ECHO_CM`]
    pub distance_cm: i32,
}

impl DistanceSample {
    /// Build a sample from a raw echo duration
    pub fn from_echo(echo_us: i64) -> Self {
        Self {
            echo_us,
            distance_cm: echo_to_distance_cm(echo_us),
        }
    }

    /// True if an echo was received
    pub fn has_echo(&self) -> bool {
        self.distance_cm != NO_ECHO_CM
    }
}

/// Convert a round-trip echo time to a one-way distance
///
/// Returns [`NO_ECHO_CM`] for `echo_us <= 0`.
pub fn echo_to_distance_cm(echo_us: i64) -> i32 {
    if echo_us <= 0 {
        return NO_ECHO_CM;
    }
    let cm = (echo_us as f32 * SOUND_CM_PER_US / 2.0) as i64;
    cm.min(i32::MAX as i64) as i32
}

/// Classifies distances against the configured detection window
#[derive(Debug, Clone, Copy)]
pub struct DistanceSampler {
    min_distance_cm: i32,
    max_distance_cm: i32,
    max_plausible_cm: i32,
}

impl DistanceSampler {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            min_distance_cm: config.min_distance_cm,
            max_distance_cm: config.max_distance_cm,
            max_plausible_cm: config.max_plausible_distance_cm,
        }
    }

    /// Sample a raw echo duration
    pub fn sample(&self, echo_us: i64) -> DistanceSample {
        DistanceSample::from_echo(echo_us)
    }

    /// Vehicle present: `min <= distance <= max`, both ends inclusive
    pub fn is_within_detection_threshold(&self, distance_cm: i32) -> bool {
        distance_cm != NO_ECHO_CM
            && distance_cm >= self.min_distance_cm
            && distance_cm <= self.max_distance_cm
    }

    /// Coarse glitch filter, only used to qualify the first car detection
    pub fn passes_noise_filter(&self, distance_cm: i32) -> bool {
        (0..=self.max_plausible_cm).contains(&distance_cm)
    }
}

impl Default for DistanceSampler {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}
