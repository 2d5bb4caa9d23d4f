/// Four-digit display on a HT16K33 backpack over I2C
use anyhow::{anyhow, Result};
use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::i2c::I2cDriver;
use ht16k33::{Blink, Ht16k33};
use log::{info, warn};
use race_timing::{DisplaySegments, SegmentDisplay};

pub struct BackpackDisplay {
    i2c: I2cDriver<'static>,
    chip: Ht16k33,
    failed_writes: u32,
}

impl BackpackDisplay {
    /// Wake the controller and blank the digits
    pub fn new(i2c: I2cDriver<'static>, chip: Ht16k33, brightness: u8) -> Result<Self> {
        let mut display = Self {
            i2c,
            chip,
            failed_writes: 0,
        };

        let init = chip
            .init_sequence(brightness, Blink::Off)
            .map_err(|e| anyhow!("HT16K33 setup: {:?}", e))?;
        for cmd in init {
            display.i2c.write(chip.address(), &[cmd], BLOCK)?;
        }
        display.i2c.write(chip.address(), &chip.clear_frame(), BLOCK)?;

        info!("HT16K33 ready at 0x{:02X}", chip.address());
        Ok(display)
    }
}

impl SegmentDisplay for BackpackDisplay {
    fn render(&mut self, segments: &DisplaySegments) {
        let frame = self.chip.frame(&segments.digits, segments.colon);
        match self.i2c.write(self.chip.address(), &frame, BLOCK) {
            Ok(()) => {
                if self.failed_writes > 0 {
                    info!("Display recovered after {} failed writes", self.failed_writes);
                    self.failed_writes = 0;
                }
            }
            Err(e) => {
                if self.failed_writes == 0 {
                    warn!("Display write failed: {:?}", e);
                }
                self.failed_writes = self.failed_writes.saturating_add(1);
            }
        }
    }
}
