/// Status LED: WS2812 on the ESP32-C3 DevKit, driven through RMT
use anyhow::Result;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{FixedLengthSignal, PinState, Pulse, RmtChannel, TxRmtDriver};
use log::warn;

/// Status colour (dimmed to 25%)
const STATUS_RGB: (u8, u8, u8) = (0, 64, 0);

pub struct StatusLed {
    tx: TxRmtDriver<'static>,
    lit: Option<bool>,
}

impl StatusLed {
    pub fn new<C: RmtChannel, P: OutputPin>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = P> + 'static,
    ) -> Result<Self> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;
        Ok(Self { tx, lit: None })
    }

    /// Set LED to a specific color (GRB order for WS2812)
    pub fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        let grb = ((g as u32) << 16) | ((r as u32) << 8) | (b as u32);

        let ticks_hz = self.tx.counter_clock()?;
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(350))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(800))?;
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(700))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(600))?;

        let mut signal = FixedLengthSignal::<24>::new();
        for i in (0..24).rev() {
            let pulse = if (grb >> i) & 1 == 1 {
                (t1h, t1l)
            } else {
                (t0h, t0l)
            };
            signal.set(23 - i as usize, &pulse)?;
        }

        self.tx.start_blocking(&signal)?;
        Ok(())
    }

    pub fn off(&mut self) -> Result<()> {
        self.set_color(0, 0, 0)
    }

    pub fn red(&mut self) -> Result<()> {
        self.set_color(64, 0, 0)
    }

    pub fn blue(&mut self) -> Result<()> {
        self.set_color(0, 0, 64)
    }

    /// Follow the timer's blink pattern; only writes on edges
    pub fn show(&mut self, on: bool) {
        if self.lit == Some(on) {
            return;
        }
        let (r, g, b) = if on { STATUS_RGB } else { (0, 0, 0) };
        match self.set_color(r, g, b) {
            Ok(()) => self.lit = Some(on),
            Err(e) => warn!("Status LED write failed: {:?}", e),
        }
    }
}

fn ns(nanos: u64) -> std::time::Duration {
    std::time::Duration::from_nanos(nanos)
}
