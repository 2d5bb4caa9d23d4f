//! Timer unit main loop
//!
//! [`RaceTimer`] runs one cooperative tick: sample the sensor and feed the
//! detector, poll the server when due, advance the countdown and push a frame
//! to the display. It owns every piece of state; there are no globals.
//!
//! Server polls block, so they run on a coarser cadence than the tick
//! (`PollConfig`), and less often while a race is being timed. The sensor is
//! read before the poll so a detection carries the tick's timestamp. A failed
//! poll leaves the race untouched.
//!
//! | Phase | Polls (alternating) |
//! |---|---|
//! | NotRegistered | registration |
//! | Registered, CountdownToStart | countdown, session |
//! | InProgress | session |
//! | Finished | session, registration |
//!
//! Detections are only accepted while the race is in progress. A car sitting
//! on the sensor before the start cannot anchor the lap clock early.

use core::time::Duration;

use log::{debug, info, warn};

use crate::clock::elapsed_ms;
use crate::config::TimerConfig;
use crate::detector::{DetectionEvent, LapDetector};
use crate::display::{
    format_countdown, format_elapsed, format_lap_count, status_pattern, DisplaySegments,
    LapBanner,
};
use crate::distance::DistanceSample;
use crate::race::{RacePhase, RaceStateMachine};
use crate::sensors::{EchoSensor, SegmentDisplay};
use crate::server::{RaceServer, ServerError, TimerId};

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub phase: RacePhase,
    /// Sensor reading, only taken while the race is in progress
    pub sample: Option<DistanceSample>,
    pub event: Option<DetectionEvent>,
    pub polled: bool,
}

/// One timer unit: race engine plus its collaborators
pub struct RaceTimer<S, D, C> {
    config: TimerConfig,
    sensor: S,
    display: D,
    server: C,
    race: RaceStateMachine,
    detector: LapDetector,
    /// Active lap banner and when it started
    banner: Option<(LapBanner, u32)>,
    last_poll_ms: Option<u32>,
    /// Take the secondary poll of the current phase next
    secondary_poll_due: bool,
    consecutive_poll_failures: u32,
    last_frame: Option<DisplaySegments>,
    phase: RacePhase,
    phase_since_ms: u32,
}

impl<S, D, C> RaceTimer<S, D, C>
where
    S: EchoSensor,
    D: SegmentDisplay,
    C: RaceServer,
{
    pub fn new(config: TimerConfig, sensor: S, display: D, server: C) -> Self {
        Self {
            race: RaceStateMachine::new(&config.race),
            detector: LapDetector::new(&config.detection),
            config,
            sensor,
            display,
            server,
            banner: None,
            last_poll_ms: None,
            secondary_poll_due: false,
            consecutive_poll_failures: 0,
            last_frame: None,
            phase: RacePhase::NotRegistered,
            phase_since_ms: 0,
        }
    }

    /// Run one scheduler tick at `now_ms` (monotonic)
    pub fn tick(&mut self, now_ms: u32) -> TickOutcome {
        let mut sample = None;
        let mut event = None;
        if self.race.phase() == RacePhase::InProgress {
            let reading = DistanceSample::from_echo(self.sensor.measure_echo_us());
            event = self.detector.on_sample(reading.distance_cm, now_ms);
            if let Some(detection) = event {
                self.apply_detection(detection, now_ms);
            }
            sample = Some(reading);
            self.track_phase(now_ms);
        }

        let polled = self.poll_server_if_due(now_ms);
        self.race.tick(now_ms);
        self.track_phase(now_ms);

        self.render(now_ms);

        TickOutcome {
            phase: self.race.phase(),
            sample,
            event,
            polled,
        }
    }

    /// Frame the display should show at `now_ms`
    pub fn current_frame(&self, now_ms: u32) -> DisplaySegments {
        let state = self.race.state();
        match state.phase {
            RacePhase::NotRegistered => DisplaySegments::DASHES,
            RacePhase::Registered => state
                .timer_id
                .map_or(DisplaySegments::DASHES, DisplaySegments::number),
            RacePhase::CountdownToStart => {
                format_countdown(state.countdown_remaining_ms.unwrap_or(0))
            }
            RacePhase::InProgress => self
                .banner_frame(now_ms)
                .unwrap_or_else(|| elapsed_frame(self.race.elapsed_since_lap_anchor(now_ms))),
            RacePhase::Finished => elapsed_frame(self.race.elapsed_since_lap_anchor(now_ms)),
        }
    }

    /// Status indicator state for the current phase
    pub fn status_led_on(&self, now_ms: u32) -> bool {
        status_pattern(self.phase).is_on(elapsed_ms(now_ms, self.phase_since_ms))
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn race(&self) -> &RaceStateMachine {
        &self.race
    }

    pub fn detector(&self) -> &LapDetector {
        &self.detector
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn server_mut(&mut self) -> &mut C {
        &mut self.server
    }

    fn poll_server_if_due(&mut self, now_ms: u32) -> bool {
        let interval = if self.race.phase() == RacePhase::InProgress {
            self.config.polling.race_interval_ms
        } else {
            self.config.polling.interval_ms
        };
        if self
            .last_poll_ms
            .is_some_and(|last| elapsed_ms(now_ms, last) < interval)
        {
            return false;
        }
        self.last_poll_ms = Some(now_ms);

        let timeout = Duration::from_millis(self.config.polling.timeout_ms as u64);
        let secondary = self.secondary_poll_due;
        self.secondary_poll_due = !secondary;

        let state = self.race.state();
        let result = match (state.phase, state.timer_id) {
            (RacePhase::NotRegistered, _) => self.poll_registration(timeout),
            (RacePhase::Registered | RacePhase::CountdownToStart, Some(id)) if secondary => {
                self.poll_session(id, timeout, now_ms)
            }
            (RacePhase::Registered | RacePhase::CountdownToStart, Some(id)) => self
                .server
                .poll_countdown(id, timeout)
                .map(|remaining| self.race.on_countdown(remaining, now_ms)),
            (RacePhase::Finished, Some(_)) if secondary => self.poll_registration(timeout),
            (RacePhase::InProgress | RacePhase::Finished, Some(id)) => {
                self.poll_session(id, timeout, now_ms)
            }
            (phase, None) => {
                debug!("No timer id in {}, skipping poll", phase.as_str());
                Ok(())
            }
        };
        self.record_poll(result);
        true
    }

    fn poll_registration(&mut self, timeout: Duration) -> Result<(), ServerError> {
        self.server
            .poll_registration(timeout)
            .map(|status| self.race.on_registration(status))
    }

    fn poll_session(
        &mut self,
        id: TimerId,
        timeout: Duration,
        now_ms: u32,
    ) -> Result<(), ServerError> {
        self.server
            .poll_session(id, timeout)
            .map(|status| self.race.on_session(status, now_ms))
    }

    fn record_poll(&mut self, result: Result<(), ServerError>) {
        match result {
            Ok(()) => {
                if self.consecutive_poll_failures > 0 {
                    info!(
                        "Race server reachable again after {} failed polls",
                        self.consecutive_poll_failures
                    );
                }
                self.consecutive_poll_failures = 0;
            }
            Err(e) => {
                if self.consecutive_poll_failures == 0 {
                    warn!("Race server poll failed: {}", e);
                } else {
                    debug!(
                        "Race server poll failed ({} in a row): {}",
                        self.consecutive_poll_failures + 1,
                        e
                    );
                }
                self.consecutive_poll_failures = self.consecutive_poll_failures.saturating_add(1);
            }
        }
    }

    fn apply_detection(&mut self, event: DetectionEvent, now_ms: u32) {
        if !self.race.on_detection(event) {
            return;
        }
        if matches!(event, DetectionEvent::LapCompleted { .. })
            && self.race.phase() == RacePhase::InProgress
        {
            self.banner = Some((format_lap_count(self.race.lap_count()), now_ms));
        }
    }

    fn track_phase(&mut self, now_ms: u32) {
        let phase = self.race.phase();
        if phase == self.phase {
            return;
        }
        if matches!(phase, RacePhase::InProgress | RacePhase::NotRegistered) {
            self.detector.reset();
        }
        self.banner = None;
        self.secondary_poll_due = false;
        self.phase = phase;
        self.phase_since_ms = now_ms;
    }

    fn banner_frame(&self, now_ms: u32) -> Option<DisplaySegments> {
        let (banner, started_ms) = self.banner.as_ref()?;
        banner.frame(
            elapsed_ms(now_ms, *started_ms),
            self.config.display.lap_count_display_delay_ms,
        )
    }

    fn render(&mut self, now_ms: u32) {
        if self.banner.is_some() && self.banner_frame(now_ms).is_none() {
            self.banner = None;
        }
        let frame = self.current_frame(now_ms);
        if self.last_frame == Some(frame) {
            return;
        }
        self.display.render(&frame);
        self.last_frame = Some(frame);
    }
}

fn elapsed_frame(elapsed_ms: u32) -> DisplaySegments {
    format_elapsed(elapsed_ms).to_segments()
}
