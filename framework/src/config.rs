//! Timer configuration
//!
//! Defaults reproduce the compiled-in behaviour of the track timer units.
//! Firmware overrides a few fields at build time (see the lap-timer crate).

use thiserror::Error;

/// Default lower bound of the detection window (cm)
pub const DEFAULT_MIN_DISTANCE_CM: i32 = 1;
/// Default upper bound of the detection window (cm)
pub const DEFAULT_MAX_DISTANCE_CM: i32 = 5;
/// Readings above this are treated as glitches when qualifying the first car
pub const DEFAULT_MAX_PLAUSIBLE_DISTANCE_CM: i32 = 45;
/// Minimum time between two accepted detections (ms)
pub const DEFAULT_LAP_LOCKOUT_MS: u32 = 2_000;
/// Main loop cadence (ms)
pub const DEFAULT_TICK_MS: u32 = 10;
/// How long each frame of the "LAP n" banner stays up (ms)
pub const DEFAULT_LAP_COUNT_DISPLAY_DELAY_MS: u32 = 1_000;
/// Server poll cadence before and after the race (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 1_000;
/// Server poll cadence while the race is running (ms)
pub const DEFAULT_RACE_POLL_INTERVAL_MS: u32 = 5_000;
/// Upper bound on a single blocking server call (ms)
pub const DEFAULT_POLL_TIMEOUT_MS: u32 = 750;

/// Sensor thresholds and debounce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionConfig {
    pub min_distance_cm: i32,
    pub max_distance_cm: i32,
    pub max_plausible_distance_cm: i32,
    pub lockout_ms: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_distance_cm: DEFAULT_MIN_DISTANCE_CM,
            max_distance_cm: DEFAULT_MAX_DISTANCE_CM,
            max_plausible_distance_cm: DEFAULT_MAX_PLAUSIBLE_DISTANCE_CM,
            lockout_ms: DEFAULT_LAP_LOCKOUT_MS,
        }
    }
}

/// Race rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RaceConfig {
    /// Finish locally after this many completed laps (None = wait for server)
    pub max_laps: Option<u32>,
}

/// Display timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub lap_count_display_delay_ms: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lap_count_display_delay_ms: DEFAULT_LAP_COUNT_DISPLAY_DELAY_MS,
        }
    }
}

/// Server polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval_ms: u32,
    pub race_interval_ms: u32,
    pub timeout_ms: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            race_interval_ms: DEFAULT_RACE_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

/// Master timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub tick_ms: u32,
    pub detection: DetectionConfig,
    pub race: RaceConfig,
    pub display: DisplayConfig,
    pub polling: PollConfig,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            detection: DetectionConfig::default(),
            race: RaceConfig::default(),
            display: DisplayConfig::default(),
            polling: PollConfig::default(),
        }
    }
}

impl TimerConfig {
    /// Reject configurations the main loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        if d.min_distance_cm < 0 || d.min_distance_cm > d.max_distance_cm {
            return Err(ConfigError::InvalidThreshold {
                min: d.min_distance_cm,
                max: d.max_distance_cm,
            });
        }
        // A filter below the window can never qualify a first car
        if d.max_plausible_distance_cm < d.min_distance_cm {
            return Err(ConfigError::NoiseFilterTooLow {
                filter: d.max_plausible_distance_cm,
                min: d.min_distance_cm,
            });
        }
        if d.lockout_ms == 0 {
            return Err(ConfigError::ZeroDuration("lockout_ms"));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroDuration("tick_ms"));
        }
        if self.race.max_laps == Some(0) {
            return Err(ConfigError::ZeroDuration("max_laps"));
        }
        let p = &self.polling;
        if p.timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("poll timeout_ms"));
        }
        if p.timeout_ms >= p.interval_ms.min(p.race_interval_ms) {
            return Err(ConfigError::PollTimeoutTooLong {
                timeout_ms: p.timeout_ms,
                interval_ms: p.interval_ms.min(p.race_interval_ms),
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("detection window is inverted or negative: {min}..={max} cm")]
    InvalidThreshold { min: i32, max: i32 },

    #[error("noise filter ({filter} cm) rejects the whole detection window (min {min} cm)")]
    NoiseFilterTooLow { filter: i32, min: i32 },

    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),

    #[error("poll timeout {timeout_ms}ms must be shorter than the poll interval {interval_ms}ms")]
    PollTimeoutTooLong { timeout_ms: u32, interval_ms: u32 },
}
