/// HC-SR04 ultrasonic sensor on two GPIOs
///
/// Measurement: 10µs trigger pulse, then time the echo pin's high pulse.
/// The pulse width is the sound round trip in microseconds.
use anyhow::Result;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{Input, InputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use log::debug;
use race_timing::sensors::NO_ECHO;
use race_timing::EchoSensor;

/// Give up on an echo after 30ms (~5m round trip)
const ECHO_TIMEOUT_US: i64 = 30_000;

const TRIGGER_PULSE_US: u32 = 10;

pub struct Hcsr04<'d, T: OutputPin, E: InputPin> {
    trigger: PinDriver<'d, T, Output>,
    echo: PinDriver<'d, E, Input>,
}

impl<'d, T: OutputPin, E: InputPin> Hcsr04<'d, T, E> {
    pub fn new(
        trigger: impl Peripheral<P = T> + 'd,
        echo: impl Peripheral<P = E> + 'd,
    ) -> Result<Self> {
        let mut trigger = PinDriver::output(trigger)?;
        trigger.set_low()?;
        let echo = PinDriver::input(echo)?;
        Ok(Self { trigger, echo })
    }

    fn trigger(&mut self) -> Result<()> {
        self.trigger.set_low()?;
        Ets::delay_us(2);
        self.trigger.set_high()?;
        Ets::delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()?;
        Ok(())
    }

    /// Spin until the echo pin reaches `level` or the deadline passes
    fn wait_for(&self, level: bool, deadline_us: i64) -> Option<i64> {
        loop {
            let now = now_us();
            if self.echo.is_high() == level {
                return Some(now);
            }
            if now >= deadline_us {
                return None;
            }
        }
    }
}

impl<T: OutputPin, E: InputPin> EchoSensor for Hcsr04<'_, T, E> {
    fn measure_echo_us(&mut self) -> i64 {
        if let Err(e) = self.trigger() {
            debug!("HC-SR04 trigger failed: {:?}", e);
            return NO_ECHO;
        }

        let deadline = now_us() + ECHO_TIMEOUT_US;
        let Some(rise) = self.wait_for(true, deadline) else {
            return NO_ECHO;
        };
        match self.wait_for(false, rise + ECHO_TIMEOUT_US) {
            Some(fall) => fall - rise,
            None => NO_ECHO,
        }
    }
}

fn now_us() -> i64 {
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}
