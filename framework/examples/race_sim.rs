//! Simulates a short race against fake hardware and a scripted race server
//!
//! Exercises the whole timer loop: registration, server countdown, the first
//! car leaving the line, several laps with a car that lingers over the sensor,
//! a dropped network poll mid-race, and the server finishing the race.
//!
//! Run with: cargo run -p race-timing --example race_sim

use core::time::Duration;
use std::collections::VecDeque;

use race_timing::display::{DIGITS, LETTER_A, LETTER_L, LETTER_P};
use race_timing::server::TimerId;
use race_timing::{
    DisplaySegments, EchoSensor, RacePhase, RaceServer, RaceTimer, RegistrationStatus,
    SegmentDisplay, ServerError, SessionStatus, TimerConfig,
};

const TICK_MS: u32 = 10;

/// Echo time for a car 3cm above the sensor
const CAR_ECHO_US: i64 = 175;

/// Simple pseudo-random noise generator (deterministic for reproducibility)
struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns a value in [0, max)
    fn next(&mut self, max: u32) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        (self.state >> 16) % max
    }
}

/// Car that passes over the sensor at scripted times and lingers a while
struct SimulatedTrack {
    passes_ms: Vec<u32>,
    linger_ms: u32,
    now_ms: u32,
    noise: NoiseGen,
}

impl EchoSensor for SimulatedTrack {
    fn measure_echo_us(&mut self) -> i64 {
        let over_sensor = self
            .passes_ms
            .iter()
            .any(|&t| self.now_ms >= t && self.now_ms < t + self.linger_ms);
        if over_sensor {
            CAR_ECHO_US
        } else if self.noise.next(100) == 0 {
            // Occasional reflection off the track wall, outside the window
            2_000
        } else {
            0
        }
    }
}

/// Frames are printed from the loop at one-second resolution instead
struct NullDisplay;

fn glyph_char(glyph: u8) -> char {
    let glyph = glyph & 0x7F;
    if let Some(d) = DIGITS.iter().position(|&g| g == glyph) {
        return char::from(b'0' + d as u8);
    }
    match glyph {
        LETTER_L => 'L',
        LETTER_A => 'A',
        LETTER_P => 'P',
        0x40 => '-',
        _ => ' ',
    }
}

fn render_text(segments: &DisplaySegments) -> String {
    let mut text = String::new();
    for (i, &glyph) in segments.digits.iter().enumerate() {
        if i == 2 && segments.colon {
            text.push(':');
        }
        text.push(glyph_char(glyph));
        if glyph & 0x80 != 0 {
            text.push('.');
        }
    }
    text
}

impl SegmentDisplay for NullDisplay {
    fn render(&mut self, _segments: &DisplaySegments) {}
}

/// Race server that answers from a script, one entry per poll
struct ScriptedServer {
    registration: VecDeque<Result<RegistrationStatus, ServerError>>,
    countdown: VecDeque<Result<Option<u32>, ServerError>>,
    session: VecDeque<Result<SessionStatus, ServerError>>,
}

impl RaceServer for ScriptedServer {
    fn poll_registration(&mut self, _timeout: Duration) -> Result<RegistrationStatus, ServerError> {
        self.registration
            .pop_front()
            .unwrap_or(Ok(RegistrationStatus::Closed))
    }

    fn poll_countdown(
        &mut self,
        _id: TimerId,
        _timeout: Duration,
    ) -> Result<Option<u32>, ServerError> {
        self.countdown.pop_front().unwrap_or(Ok(None))
    }

    fn poll_session(
        &mut self,
        _id: TimerId,
        _timeout: Duration,
    ) -> Result<SessionStatus, ServerError> {
        self.session
            .pop_front()
            .unwrap_or(Ok(SessionStatus::Running))
    }
}

fn main() {
    let config = TimerConfig::default();

    let track = SimulatedTrack {
        // 4s countdown arrives at 2s and ends at 6s; car leaves at 6.4s and laps every ~3.5s
        passes_ms: vec![6_400, 9_900, 13_300, 17_100],
        linger_ms: 120,
        now_ms: 0,
        noise: NoiseGen::new(42),
    };

    let server = ScriptedServer {
        registration: VecDeque::from([
            Err(ServerError::Timeout),
            Ok(RegistrationStatus::Accepted(3)),
        ]),
        countdown: VecDeque::from([Ok(Some(4_000))]),
        // Two checks during the countdown, then one every 5s of racing
        session: VecDeque::from([
            Ok(SessionStatus::Running),
            Ok(SessionStatus::Running),
            Err(ServerError::Unavailable("wifi dropped".into())),
            Ok(SessionStatus::Running),
            Ok(SessionStatus::Finished),
        ]),
    };

    let mut timer = RaceTimer::new(config, track, NullDisplay, server);

    println!("=== Race Timer Simulation ===\n");

    let mut last_phase = None;
    let mut last_text = String::new();
    let mut now_ms = 0;

    while now_ms <= 25_000 {
        timer.sensor_mut().now_ms = now_ms;
        let outcome = timer.tick(now_ms);

        if last_phase != Some(outcome.phase) {
            println!("[{:>6}ms] phase -> {}", now_ms, outcome.phase.as_str());
            last_phase = Some(outcome.phase);
        }
        if let Some(event) = outcome.event {
            println!("[{:>6}ms] {:?}", now_ms, event);
        }

        let text = render_text(&timer.current_frame(now_ms));
        if text != last_text && (outcome.phase != RacePhase::InProgress || now_ms % 1_000 == 0) {
            println!("[{:>6}ms] display '{}'", now_ms, text);
            last_text = text;
        }

        if outcome.phase == RacePhase::Finished && now_ms % 1_000 == 0 {
            break;
        }
        now_ms += TICK_MS;
    }

    let state = timer.race().state();
    println!("\n=== Results ===");
    println!("Completed laps: {}", timer.race().completed_laps());
    println!("Last lap:       {:?} ms", state.last_lap_ms);
    println!("Best lap:       {:?} ms", state.best_lap_ms);
    println!(
        "Race time:      {} ms",
        timer.race().elapsed_since_race_start(now_ms)
    );

    assert_eq!(timer.race().phase(), RacePhase::Finished);
    assert_eq!(timer.race().completed_laps(), 3);
    println!("\nSimulation OK");
}
