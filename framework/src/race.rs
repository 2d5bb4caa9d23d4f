//! Race phase state machine
//!
//! Owns the single [`RaceState`] of a timer unit. Inputs arrive from three
//! places, all on the main loop:
//!
//! - the race server (registration, countdown, session status),
//! - the tick itself (countdown expiry),
//! - the [`LapDetector`](crate::detector::LapDetector) (first car / lap).
//!
//! ## Two anchors
//!
//! The server countdown anchors the *race* (`race_anchor_ms`) so that every
//! unit on the track starts together. The first physical detection then
//! re-anchors the *lap* clock (`lap_anchor_ms`) to the moment the car actually
//! leaves. They are separate fields and must stay that way.
//!
//! ## Phases
//!
//! ```text
//! NotRegistered → Registered → CountdownToStart → InProgress → Finished
//!        ↑                 └──── countdown 0 ─────────↑            │
//!        └──────────────────── session closed ─────────────────────┘
//! ```
//!
//! Phases never move backwards except through [`RaceStateMachine::reset`].

use log::{debug, info};

use crate::clock::elapsed_ms;
use crate::config::RaceConfig;
use crate::detector::DetectionEvent;
use crate::server::{RegistrationStatus, SessionStatus, TimerId};

/// Race phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RacePhase {
    /// Waiting for the server to accept this timer
    NotRegistered,
    /// Registered, waiting for the server to announce the start
    Registered,
    /// Server countdown running
    CountdownToStart,
    /// Race running, laps being counted
    InProgress,
    /// Race over, elapsed time frozen
    Finished,
}

impl RacePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RacePhase::NotRegistered => "NOT_REGISTERED",
            RacePhase::Registered => "REGISTERED",
            RacePhase::CountdownToStart => "COUNTDOWN",
            RacePhase::InProgress => "IN_PROGRESS",
            RacePhase::Finished => "FINISHED",
        }
    }
}

/// Mutable race state (owned by the state machine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceState {
    pub phase: RacePhase,
    /// Id assigned by the server on registration
    pub timer_id: Option<TimerId>,
    /// Lap currently being driven, 1 for the first lap
    pub lap_count: u32,
    /// Countdown left as of the last tick
    pub countdown_remaining_ms: Option<u32>,
    /// When the server countdown expires (local clock)
    pub countdown_deadline_ms: Option<u32>,
    /// Server-synchronised race start
    pub race_anchor_ms: Option<u32>,
    /// Start of the lap currently being timed
    pub lap_anchor_ms: Option<u32>,
    pub last_lap_ms: Option<u32>,
    pub best_lap_ms: Option<u32>,
    /// Lap clock value at the moment the race finished
    pub frozen_lap_ms: Option<u32>,
    /// Race clock value at the moment the race finished
    pub frozen_race_ms: Option<u32>,
}

impl RaceState {
    fn new() -> Self {
        Self {
            phase: RacePhase::NotRegistered,
            timer_id: None,
            lap_count: 0,
            countdown_remaining_ms: None,
            countdown_deadline_ms: None,
            race_anchor_ms: None,
            lap_anchor_ms: None,
            last_lap_ms: None,
            best_lap_ms: None,
            frozen_lap_ms: None,
            frozen_race_ms: None,
        }
    }
}

impl Default for RaceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Race phase state machine
#[derive(Debug, Clone)]
pub struct RaceStateMachine {
    state: RaceState,
    max_laps: Option<u32>,
}

impl RaceStateMachine {
    pub fn new(config: &RaceConfig) -> Self {
        Self {
            state: RaceState::new(),
            max_laps: config.max_laps,
        }
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn phase(&self) -> RacePhase {
        self.state.phase
    }

    pub fn lap_count(&self) -> u32 {
        self.state.lap_count
    }

    /// Laps actually finished (the lap being driven does not count)
    pub fn completed_laps(&self) -> u32 {
        self.state.lap_count.saturating_sub(1)
    }

    /// Registration poll result
    pub fn on_registration(&mut self, status: RegistrationStatus) {
        match (self.state.phase, status) {
            (RacePhase::NotRegistered, RegistrationStatus::Accepted(id)) => {
                self.state.timer_id = Some(id);
                self.set_phase(RacePhase::Registered);
            }
            (RacePhase::Finished, RegistrationStatus::Accepted(id)) => {
                info!("New session accepted timer {}, clearing previous race", id);
                self.reset();
                self.state.timer_id = Some(id);
                self.set_phase(RacePhase::Registered);
            }
            (phase, status) => {
                debug!("Registration {:?} ignored in {}", status, phase.as_str());
            }
        }
    }

    /// Countdown poll result. `None` means the server has not scheduled a start yet.
    pub fn on_countdown(&mut self, remaining_ms: Option<u32>, now_ms: u32) {
        let Some(remaining_ms) = remaining_ms else {
            return;
        };

        match self.state.phase {
            RacePhase::Registered | RacePhase::CountdownToStart => {
                if remaining_ms == 0 {
                    self.start(now_ms);
                    return;
                }
                if self.state.phase == RacePhase::Registered {
                    info!("Race starts in {}ms", remaining_ms);
                }
                self.state.countdown_remaining_ms = Some(remaining_ms);
                self.state.countdown_deadline_ms = Some(now_ms.wrapping_add(remaining_ms));
                self.set_phase(RacePhase::CountdownToStart);
            }
            phase => {
                debug!("Countdown {}ms ignored in {}", remaining_ms, phase.as_str());
            }
        }
    }

    /// Session status poll result
    pub fn on_session(&mut self, status: SessionStatus, now_ms: u32) {
        match status {
            SessionStatus::Running => {}
            SessionStatus::Finished => {
                if self.state.phase == RacePhase::InProgress {
                    info!("Server finished the race");
                    self.finish(now_ms);
                }
            }
            SessionStatus::Closed => {
                if self.state.phase != RacePhase::NotRegistered {
                    info!("Session closed, returning to registration");
                    self.reset();
                }
            }
        }
    }

    /// Advance tick-driven state (countdown expiry)
    pub fn tick(&mut self, now_ms: u32) {
        if self.state.phase != RacePhase::CountdownToStart {
            return;
        }
        let Some(deadline) = self.state.countdown_deadline_ms else {
            return;
        };
        let remaining = elapsed_ms(deadline, now_ms);
        self.state.countdown_remaining_ms = Some(remaining);
        if remaining == 0 {
            self.start(now_ms);
        }
    }

    /// Apply a detector event. Returns true if the event changed the race.
    pub fn on_detection(&mut self, event: DetectionEvent) -> bool {
        if self.state.phase != RacePhase::InProgress {
            debug!("{:?} ignored in {}", event, self.state.phase.as_str());
            return false;
        }

        match event {
            DetectionEvent::FirstCarDetected { at_ms } => {
                info!("First car detected, lap clock anchored at {}ms", at_ms);
                self.state.lap_anchor_ms = Some(at_ms);
            }
            DetectionEvent::LapCompleted { at_ms } => {
                let anchor = self.state.lap_anchor_ms.unwrap_or(at_ms);
                let lap_time = elapsed_ms(at_ms, anchor);

                self.state.last_lap_ms = Some(lap_time);
                if self.state.best_lap_ms.is_none_or(|best| lap_time < best) {
                    self.state.best_lap_ms = Some(lap_time);
                }
                self.state.lap_count = self.state.lap_count.saturating_add(1);
                self.state.lap_anchor_ms = Some(at_ms);
                info!(
                    "Lap {} completed in {}ms, now on lap {}",
                    self.completed_laps(),
                    lap_time,
                    self.state.lap_count
                );

                if self
                    .max_laps
                    .is_some_and(|max| self.completed_laps() >= max)
                {
                    info!("Reached {} laps", self.completed_laps());
                    self.set_phase(RacePhase::Finished);
                    self.state.frozen_lap_ms = Some(lap_time);
                    self.state.frozen_race_ms = self
                        .state
                        .race_anchor_ms
                        .map(|start| elapsed_ms(at_ms, start));
                }
            }
        }
        true
    }

    /// External finish signal: freeze the clocks
    pub fn finish(&mut self, now_ms: u32) {
        if self.state.phase != RacePhase::InProgress {
            return;
        }
        self.state.frozen_lap_ms = Some(self.elapsed_since_lap_anchor(now_ms));
        self.state.frozen_race_ms = Some(self.elapsed_since_race_start(now_ms));
        self.set_phase(RacePhase::Finished);
    }

    /// External reset: back to NotRegistered with all counters cleared
    pub fn reset(&mut self) {
        self.state = RaceState::new();
    }

    /// Time shown on the display: current lap clock
    ///
    /// Saturates at zero if `now_ms` is before the anchor.
    pub fn elapsed_since_lap_anchor(&self, now_ms: u32) -> u32 {
        match self.state.phase {
            RacePhase::InProgress => self
                .state
                .lap_anchor_ms
                .map_or(0, |anchor| elapsed_ms(now_ms, anchor)),
            RacePhase::Finished => self.state.frozen_lap_ms.unwrap_or(0),
            _ => 0,
        }
    }

    /// Total race time since the server-synchronised start
    pub fn elapsed_since_race_start(&self, now_ms: u32) -> u32 {
        match self.state.phase {
            RacePhase::InProgress => self
                .state
                .race_anchor_ms
                .map_or(0, |anchor| elapsed_ms(now_ms, anchor)),
            RacePhase::Finished => self.state.frozen_race_ms.unwrap_or(0),
            _ => 0,
        }
    }

    fn start(&mut self, now_ms: u32) {
        self.state.countdown_remaining_ms = Some(0);
        self.state.countdown_deadline_ms = None;
        self.state.race_anchor_ms = Some(now_ms);
        self.state.lap_anchor_ms = Some(now_ms);
        self.state.lap_count = 1;
        self.set_phase(RacePhase::InProgress);
    }

    fn set_phase(&mut self, phase: RacePhase) {
        if phase == self.state.phase {
            return;
        }
        info!(
            "Race phase {} -> {}",
            self.state.phase.as_str(),
            phase.as_str()
        );
        self.state.phase = phase;
    }
}

impl Default for RaceStateMachine {
    fn default() -> Self {
        Self::new(&RaceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::LapDetector;

    fn registered() -> RaceStateMachine {
        let mut race = RaceStateMachine::default();
        race.on_registration(RegistrationStatus::Accepted(7));
        race
    }

    fn in_progress_at(now_ms: u32) -> RaceStateMachine {
        let mut race = registered();
        race.on_countdown(Some(0), now_ms);
        race
    }

    // ========================================================================
    // Registration
    // ========================================================================

    #[test]
    fn test_initial_state() {
        let race = RaceStateMachine::default();
        assert_eq!(race.phase(), RacePhase::NotRegistered);
        assert_eq!(race.lap_count(), 0);
        assert_eq!(race.elapsed_since_lap_anchor(1_000), 0);
    }

    #[test]
    fn test_registration_accepted() {
        let race = registered();
        assert_eq!(race.phase(), RacePhase::Registered);
        assert_eq!(race.state().timer_id, Some(7));
    }

    #[test]
    fn test_registration_closed_keeps_waiting() {
        let mut race = RaceStateMachine::default();
        race.on_registration(RegistrationStatus::Closed);
        assert_eq!(race.phase(), RacePhase::NotRegistered);
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let mut race = in_progress_at(0);
        race.on_registration(RegistrationStatus::Accepted(9));
        assert_eq!(race.phase(), RacePhase::InProgress);
        assert_eq!(race.state().timer_id, Some(7));
    }

    #[test]
    fn test_countdown_before_registration_ignored() {
        let mut race = RaceStateMachine::default();
        race.on_countdown(Some(3_000), 0);
        assert_eq!(race.phase(), RacePhase::NotRegistered);
    }

    // ========================================================================
    // Countdown
    // ========================================================================

    #[test]
    fn test_countdown_scenario() {
        let mut race = registered();
        race.on_countdown(Some(3_000), 10_000);
        assert_eq!(race.phase(), RacePhase::CountdownToStart);
        assert_eq!(race.state().countdown_remaining_ms, Some(3_000));

        let mut now = 10_000;
        while now < 13_000 {
            now += 10;
            race.tick(now);
            if now < 13_000 {
                assert_eq!(race.phase(), RacePhase::CountdownToStart);
            }
        }

        assert_eq!(race.phase(), RacePhase::InProgress);
        assert_eq!(race.lap_count(), 1);
        assert_eq!(race.state().race_anchor_ms, Some(13_000));
        assert_eq!(race.state().lap_anchor_ms, Some(13_000));
        assert_eq!(race.state().countdown_remaining_ms, Some(0));
    }

    #[test]
    fn test_countdown_remaining_decrements() {
        let mut race = registered();
        race.on_countdown(Some(3_000), 0);
        race.tick(1_250);
        assert_eq!(race.state().countdown_remaining_ms, Some(1_750));
    }

    #[test]
    fn test_zero_countdown_starts_immediately() {
        let race = in_progress_at(4_200);
        assert_eq!(race.phase(), RacePhase::InProgress);
        assert_eq!(race.lap_count(), 1);
        assert_eq!(race.state().lap_anchor_ms, Some(4_200));
    }

    #[test]
    fn test_missing_countdown_changes_nothing() {
        let mut race = registered();
        race.on_countdown(None, 1_000);
        race.tick(2_000);
        assert_eq!(race.phase(), RacePhase::Registered);
    }

    #[test]
    fn test_countdown_resync_from_server() {
        let mut race = registered();
        race.on_countdown(Some(5_000), 0);
        // Server says 1s left at t=1s (local clock was slow to hear about it)
        race.on_countdown(Some(1_000), 1_000);
        race.tick(1_999);
        assert_eq!(race.phase(), RacePhase::CountdownToStart);
        race.tick(2_000);
        assert_eq!(race.phase(), RacePhase::InProgress);
    }

    #[test]
    fn test_countdown_across_clock_wrap() {
        let mut race = registered();
        race.on_countdown(Some(3_000), u32::MAX - 999);
        race.tick(1_000);
        assert_eq!(race.state().countdown_remaining_ms, Some(1_000));
        assert_eq!(race.phase(), RacePhase::CountdownToStart);
        race.tick(2_000);
        assert_eq!(race.phase(), RacePhase::InProgress);
    }

    #[test]
    fn test_late_countdown_does_not_regress() {
        let mut race = in_progress_at(0);
        race.on_countdown(Some(3_000), 500);
        assert_eq!(race.phase(), RacePhase::InProgress);
        race.on_countdown(Some(0), 600);
        assert_eq!(race.phase(), RacePhase::InProgress);
        assert_eq!(race.state().lap_anchor_ms, Some(0));
    }

    // ========================================================================
    // Detection
    // ========================================================================

    #[test]
    fn test_detection_scenario() {
        let mut race = in_progress_at(0);
        let mut detector = LapDetector::default();

        // Car in range at 0s, 1.0s and 2.5s
        let events: Vec<_> = [0, 1_000, 2_500]
            .into_iter()
            .filter_map(|now| detector.on_sample(3, now))
            .collect();
        assert_eq!(
            events,
            vec![
                DetectionEvent::FirstCarDetected { at_ms: 0 },
                DetectionEvent::LapCompleted { at_ms: 2_500 },
            ]
        );

        assert!(race.on_detection(events[0]));
        assert_eq!(race.state().lap_anchor_ms, Some(0));
        assert_eq!(race.lap_count(), 1);

        assert!(race.on_detection(events[1]));
        assert_eq!(race.lap_count(), 2);
        assert_eq!(race.state().lap_anchor_ms, Some(2_500));
        assert_eq!(race.state().last_lap_ms, Some(2_500));
    }

    #[test]
    fn test_first_car_reanchors_lap_not_race() {
        let mut race = in_progress_at(1_000);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 1_800 });

        assert_eq!(race.state().race_anchor_ms, Some(1_000));
        assert_eq!(race.state().lap_anchor_ms, Some(1_800));
        assert_eq!(race.lap_count(), 1);
        assert_eq!(race.elapsed_since_lap_anchor(2_000), 200);
        assert_eq!(race.elapsed_since_race_start(2_000), 1_000);
    }

    #[test]
    fn test_detection_outside_race_ignored() {
        let mut race = registered();
        assert!(!race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 10 }));
        assert!(!race.on_detection(DetectionEvent::LapCompleted { at_ms: 3_000 }));
        assert_eq!(race.phase(), RacePhase::Registered);
        assert_eq!(race.lap_count(), 0);
        assert_eq!(race.state().lap_anchor_ms, None);
    }

    #[test]
    fn test_best_lap_tracking() {
        let mut race = in_progress_at(0);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 0 });
        race.on_detection(DetectionEvent::LapCompleted { at_ms: 5_000 });
        race.on_detection(DetectionEvent::LapCompleted { at_ms: 9_000 });
        race.on_detection(DetectionEvent::LapCompleted { at_ms: 15_000 });

        assert_eq!(race.lap_count(), 4);
        assert_eq!(race.completed_laps(), 3);
        assert_eq!(race.state().last_lap_ms, Some(6_000));
        assert_eq!(race.state().best_lap_ms, Some(4_000));
    }

    #[test]
    fn test_elapsed_saturates_before_anchor() {
        let mut race = in_progress_at(0);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 5_000 });
        assert_eq!(race.elapsed_since_lap_anchor(4_000), 0);
        assert_eq!(race.elapsed_since_lap_anchor(5_250), 250);
    }

    // ========================================================================
    // Finish and reset
    // ========================================================================

    #[test]
    fn test_server_finish_freezes_clock() {
        let mut race = in_progress_at(0);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 100 });
        race.on_session(SessionStatus::Finished, 4_100);

        assert_eq!(race.phase(), RacePhase::Finished);
        assert_eq!(race.elapsed_since_lap_anchor(4_100), 4_000);
        assert_eq!(race.elapsed_since_lap_anchor(60_000), 4_000);
        assert_eq!(race.elapsed_since_race_start(60_000), 4_100);
    }

    #[test]
    fn test_max_laps_finishes_race() {
        let config = RaceConfig { max_laps: Some(2) };
        let mut race = RaceStateMachine::new(&config);
        race.on_registration(RegistrationStatus::Accepted(1));
        race.on_countdown(Some(0), 0);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 0 });
        race.on_detection(DetectionEvent::LapCompleted { at_ms: 3_000 });
        assert_eq!(race.phase(), RacePhase::InProgress);

        race.on_detection(DetectionEvent::LapCompleted { at_ms: 7_000 });
        assert_eq!(race.phase(), RacePhase::Finished);
        assert_eq!(race.completed_laps(), 2);
        assert_eq!(race.elapsed_since_lap_anchor(20_000), 4_000);
        assert_eq!(race.elapsed_since_race_start(20_000), 7_000);

        // No more laps after the finish
        assert!(!race.on_detection(DetectionEvent::LapCompleted { at_ms: 10_000 }));
        assert_eq!(race.completed_laps(), 2);
    }

    #[test]
    fn test_finished_ignores_countdown() {
        let mut race = in_progress_at(0);
        race.finish(1_000);
        race.on_countdown(Some(3_000), 2_000);
        assert_eq!(race.phase(), RacePhase::Finished);
    }

    #[test]
    fn test_session_closed_resets() {
        let mut race = in_progress_at(0);
        race.on_detection(DetectionEvent::FirstCarDetected { at_ms: 0 });
        race.on_detection(DetectionEvent::LapCompleted { at_ms: 3_000 });
        race.finish(4_000);

        race.on_session(SessionStatus::Closed, 5_000);
        assert_eq!(race.phase(), RacePhase::NotRegistered);
        assert_eq!(race.state(), &RaceState::default());
    }

    #[test]
    fn test_new_registration_after_finish() {
        let mut race = in_progress_at(0);
        race.finish(1_000);
        race.on_registration(RegistrationStatus::Accepted(12));

        assert_eq!(race.phase(), RacePhase::Registered);
        assert_eq!(race.state().timer_id, Some(12));
        assert_eq!(race.lap_count(), 0);
        assert_eq!(race.state().frozen_lap_ms, None);
    }

    #[test]
    fn test_session_running_is_noop() {
        let mut race = in_progress_at(0);
        let before = race.state().clone();
        race.on_session(SessionStatus::Running, 1_000);
        assert_eq!(race.state(), &before);
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(RacePhase::NotRegistered < RacePhase::Registered);
        assert!(RacePhase::Registered < RacePhase::CountdownToStart);
        assert!(RacePhase::CountdownToStart < RacePhase::InProgress);
        assert!(RacePhase::InProgress < RacePhase::Finished);
    }
}
