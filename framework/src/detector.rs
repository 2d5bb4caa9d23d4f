//! Lap detection with lockout debounce
//!
//! A car passing the sensor stays in range for several ticks. The detector
//! turns that cluster of in-window samples into a single event and then
//! refuses further detections until the lockout window has elapsed.
//!
//! ## Usage
//!
//! ```rust
//! use race_timing::{DetectionEvent, LapDetector};
//!
//! let mut detector = LapDetector::default();
//!
//! assert_eq!(detector.on_sample(3, 0), Some(DetectionEvent::FirstCarDetected { at_ms: 0 }));
//! assert_eq!(detector.on_sample(3, 1_000), None); // same car, still in range
//! assert_eq!(detector.on_sample(3, 2_500), Some(DetectionEvent::LapCompleted { at_ms: 2_500 }));
//! ```

use log::debug;

use crate::clock::elapsed_ms;
use crate::config::DetectionConfig;
use crate::distance::DistanceSampler;

/// Discrete detection emitted when a sample is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEvent {
    /// First accepted detection of the race (car leaves the start line)
    FirstCarDetected { at_ms: u32 },
    /// Car crossed the sensor again after the lockout window
    LapCompleted { at_ms: u32 },
}

impl DetectionEvent {
    /// Timestamp of the sample that triggered the event
    pub fn at_ms(&self) -> u32 {
        match *self {
            DetectionEvent::FirstCarDetected { at_ms } | DetectionEvent::LapCompleted { at_ms } => {
                at_ms
            }
        }
    }
}

/// Lockout-debounced detector
#[derive(Debug, Clone)]
pub struct LapDetector {
    sampler: DistanceSampler,
    lockout_ms: u32,
    /// Time of the most recent accepted detection (None until the first car)
    last_detection_ms: Option<u32>,
}

impl LapDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            sampler: DistanceSampler::new(config),
            lockout_ms: config.lockout_ms,
            last_detection_ms: None,
        }
    }

    /// Feed one distance reading taken at `now_ms`
    pub fn on_sample(&mut self, distance_cm: i32, now_ms: u32) -> Option<DetectionEvent> {
        if !self.sampler.is_within_detection_threshold(distance_cm) {
            return None;
        }

        let Some(last_ms) = self.last_detection_ms else {
            if !self.sampler.passes_noise_filter(distance_cm) {
                debug!("First detection rejected by noise filter: {}cm", distance_cm);
                return None;
            }
            self.last_detection_ms = Some(now_ms);
            return Some(DetectionEvent::FirstCarDetected { at_ms: now_ms });
        };

        if elapsed_ms(now_ms, last_ms) < self.lockout_ms {
            return None;
        }

        self.last_detection_ms = Some(now_ms);
        Some(DetectionEvent::LapCompleted { at_ms: now_ms })
    }

    /// Time of the last accepted detection
    pub fn last_detection_ms(&self) -> Option<u32> {
        self.last_detection_ms
    }

    /// Forget the previous detection; the next one is a first-car event again
    pub fn reset(&mut self) {
        self.last_detection_ms = None;
    }
}

impl Default for LapDetector {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use crate::distance::NO_ECHO_CM;

    #[test]
    fn test_out_of_window_samples_ignored() {
        let mut detector = LapDetector::default();
        assert_eq!(detector.on_sample(NO_ECHO_CM, 0), None);
        assert_eq!(detector.on_sample(0, 10), None);
        assert_eq!(detector.on_sample(30, 20), None);
        assert_eq!(detector.last_detection_ms(), None);
    }

    #[test]
    fn test_first_detection() {
        let mut detector = LapDetector::default();
        let event = detector.on_sample(2, 500);
        assert_eq!(event, Some(DetectionEvent::FirstCarDetected { at_ms: 500 }));
        assert_eq!(detector.last_detection_ms(), Some(500));
    }

    #[test]
    fn test_cluster_within_lockout_emits_one_event() {
        let mut detector = LapDetector::default();
        let events: Vec<_> = (0..199)
            .filter_map(|i| detector.on_sample(3, 1_000 + i * 10))
            .collect();
        assert_eq!(events.len(), 1, "Cluster should collapse to a single event");
        assert_eq!(events[0], DetectionEvent::FirstCarDetected { at_ms: 1_000 });
    }

    #[test]
    fn test_lap_cluster_within_lockout_emits_one_event() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, 0);

        let events: Vec<_> = (0..150)
            .filter_map(|i| detector.on_sample(4, 5_000 + i * 10))
            .collect();
        assert_eq!(events, vec![DetectionEvent::LapCompleted { at_ms: 5_000 }]);
    }

    #[test]
    fn test_exact_lockout_boundary_accepted() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, 1_000);
        assert_eq!(detector.on_sample(3, 2_999), None);
        assert_eq!(
            detector.on_sample(3, 3_000),
            Some(DetectionEvent::LapCompleted { at_ms: 3_000 })
        );
    }

    #[test]
    fn test_rejected_sample_does_not_extend_lockout() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, 0);
        // Lingering car at 1.9s must not push the window out
        assert_eq!(detector.on_sample(3, 1_900), None);
        assert!(detector.on_sample(3, 2_000).is_some());
    }

    #[test]
    fn test_noise_filter_gates_first_detection() {
        // Detection window that reaches beyond the plausibility filter
        let config = DetectionConfig {
            min_distance_cm: 1,
            max_distance_cm: 60,
            max_plausible_distance_cm: 45,
            lockout_ms: 2_000,
        };
        let timer_config = TimerConfig {
            detection: config,
            ..TimerConfig::default()
        };
        assert_eq!(timer_config.validate(), Ok(()));

        let mut detector = LapDetector::new(&config);
        assert_eq!(detector.on_sample(50, 0), None);
        assert_eq!(
            detector.on_sample(20, 10),
            Some(DetectionEvent::FirstCarDetected { at_ms: 10 })
        );
        // Filter no longer applies once the race clock is anchored
        assert_eq!(
            detector.on_sample(50, 3_000),
            Some(DetectionEvent::LapCompleted { at_ms: 3_000 })
        );
    }

    #[test]
    fn test_clock_going_backwards_stays_locked_out() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, 10_000);
        assert_eq!(detector.on_sample(3, 5_000), None);
    }

    #[test]
    fn test_lockout_across_clock_wrap() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, u32::MAX - 999);
        // 1.5s after the counter wrapped: still locked out
        assert_eq!(detector.on_sample(3, 499), None);
        assert_eq!(
            detector.on_sample(3, 1_000),
            Some(DetectionEvent::LapCompleted { at_ms: 1_000 })
        );
    }

    #[test]
    fn test_reset() {
        let mut detector = LapDetector::default();
        detector.on_sample(3, 0);
        detector.reset();
        assert_eq!(
            detector.on_sample(3, 100),
            Some(DetectionEvent::FirstCarDetected { at_ms: 100 })
        );
    }
}
