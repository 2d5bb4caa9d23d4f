//! Race Timing Engine
//!
//! Timing and detection core for ultrasonic slot-car lap timers. A sensor
//! under the track measures the distance to whatever passes over it; this
//! crate turns those readings into debounced lap events, runs the race phase
//! state machine and formats everything for a four-digit seven-segment
//! display. A race server synchronises the start across timer units.
//!
//! ## Features
//!
//! - **Lockout debounce**: one lap per pass, however long the car lingers
//! - **Two-anchor timing**: server countdown anchors the race, the first
//!   physical detection anchors the lap clock
//! - **Poll-and-retry networking**: server failures never stall the timer
//! - **Hardware independent**: sensor, display and server sit behind traits
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────────┐   ┌───────────┐
//! │ EchoSensor   │──▶│ LapDetector │──▶│ RaceStateMachine │──▶│ display:: │──▶ SegmentDisplay
//! │ (distance)   │   │ (lockout)   │   │ (phases, laps)   │   │ formatting│
//! └──────────────┘   └─────────────┘   └──────────────────┘   └───────────┘
//!                                               ▲
//!                                      RaceServer (polled)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use race_timing::{RaceTimer, TimerConfig};
//! # use race_timing::{DisplaySegments, EchoSensor, SegmentDisplay};
//! # use race_timing::server::*;
//! # use core::time::Duration;
//! # struct Hcsr04; impl EchoSensor for Hcsr04 { fn measure_echo_us(&mut self) -> i64 { 0 } }
//! # struct Backpack; impl SegmentDisplay for Backpack { fn render(&mut self, _: &DisplaySegments) {} }
//! # struct Http;
//! # impl RaceServer for Http {
//! #     fn poll_registration(&mut self, _: Duration) -> Result<RegistrationStatus, ServerError> { Err(ServerError::Timeout) }
//! #     fn poll_countdown(&mut self, _: TimerId, _: Duration) -> Result<Option<u32>, ServerError> { Ok(None) }
//! #     fn poll_session(&mut self, _: TimerId, _: Duration) -> Result<SessionStatus, ServerError> { Ok(SessionStatus::Running) }
//! # }
//! # fn millis() -> u32 { 0 }
//! # fn sleep_ms(_: u32) {}
//!
//! let config = TimerConfig::default();
//! let mut timer = RaceTimer::new(config, Hcsr04, Backpack, Http);
//!
//! loop {
//!     timer.tick(millis());
//!     sleep_ms(config.tick_ms);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`clock`] - Wrap-aware millisecond arithmetic
//! - [`distance`] - Echo duration to distance, detection window
//! - [`detector`] - Lockout-debounced lap detection
//! - [`race`] - Race phase state machine
//! - [`display`] - Seven-segment formatting and blink patterns
//! - [`server`] - Race server interface and response parsing
//! - [`sensors`] - Sensor and display traits
//! - [`timer`] - Main loop tick

pub mod clock;
pub mod config;
pub mod detector;
pub mod display;
pub mod distance;
pub mod race;
pub mod sensors;
pub mod server;
pub mod timer;

pub use config::{ConfigError, TimerConfig};
pub use detector::{DetectionEvent, LapDetector};
pub use display::{format_elapsed, format_lap_count, BlinkPattern, DisplaySegments, LedPattern};
pub use distance::{DistanceSample, DistanceSampler};
pub use race::{RacePhase, RaceState, RaceStateMachine};
pub use sensors::{EchoSensor, SegmentDisplay};
pub use server::{RaceServer, RegistrationStatus, ServerError, SessionStatus, TimerId};
pub use timer::{RaceTimer, TickOutcome};
