mod config;
mod race_client;
mod segment_display;
mod status_led;
mod ultrasonic;
mod wifi;

use anyhow::{anyhow, Result};
use config::SystemConfig;
use esp_idf_hal::{
    delay::FreeRtos,
    i2c::{I2cConfig, I2cDriver},
    peripherals::Peripherals,
    units::Hertz,
};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use ht16k33::Ht16k33;
use log::{error, info};
use race_client::HttpRaceServer;
use race_timing::{RacePhase, RaceTimer};
use segment_display::BackpackDisplay;
use status_led::StatusLed;
use ultrasonic::Hcsr04;
use wifi::WifiManager;

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(e) = run() {
        error!("Lap timer halted: {:?}", e);
    }
    // Setup failed: park the task so the log stays readable
    loop {
        FreeRtos::delay_ms(1000);
    }
}

fn run() -> Result<()> {
    let config = SystemConfig::from_env();
    config
        .timer
        .validate()
        .map_err(|e| anyhow!("invalid timer configuration: {}", e))?;

    info!("=== ESP32-C3 Lap Timer ===");
    info!(
        "SSID: {}, server: {}, max laps: {:?}",
        config.network.wifi_ssid, config.network.race_server_url, config.timer.race.max_laps
    );

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let mut led = StatusLed::new(peripherals.rmt.channel0, peripherals.pins.gpio8)?;

    // Boot blinks
    led.off()?;
    for i in 0..3 {
        led.blue()?;
        FreeRtos::delay_ms(300);
        led.off()?;
        FreeRtos::delay_ms(300);
        info!("Boot blink {}/3", i + 1);
    }

    let i2c_config = I2cConfig::new().baudrate(Hertz(config.display.i2c_baudrate_hz));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        &i2c_config,
    )?;
    let display = BackpackDisplay::new(
        i2c,
        Ht16k33::new(config.display.i2c_address),
        config.display.brightness,
    )?;

    let sensor = Hcsr04::new(peripherals.pins.gpio4, peripherals.pins.gpio5)?;

    info!("Connecting to WiFi: {}", config.network.wifi_ssid);
    let mut wifi = WifiManager::new(peripherals.modem, sysloop, nvs)?;
    if let Err(e) = wifi.connect(config.network.wifi_ssid, config.network.wifi_password) {
        // Show the failure, then let the timer come up offline; polls retry
        error!("WiFi failed: {:?}", e);
        for _ in 0..5 {
            led.red()?;
            FreeRtos::delay_ms(200);
            led.off()?;
            FreeRtos::delay_ms(200);
        }
    }

    let server = HttpRaceServer::new(config.network.race_server_url);
    let mut timer = RaceTimer::new(config.timer, sensor, display, server);

    info!("Timer ready, tick {}ms", config.timer.tick_ms);

    let mut last_phase = RacePhase::NotRegistered;
    loop {
        // Truncates to a counter that wraps every ~49.7 days; race_timing::clock handles it
        let now_ms = unsafe { (esp_idf_svc::sys::esp_timer_get_time() / 1000) as u32 };

        let outcome = timer.tick(now_ms);
        led.show(timer.status_led_on(now_ms));

        if outcome.phase != last_phase {
            last_phase = outcome.phase;
            if outcome.phase == RacePhase::Finished {
                let state = timer.race().state();
                info!(
                    "Race finished: {} laps, best {:?}ms, race time {}ms",
                    timer.race().completed_laps(),
                    state.best_lap_ms,
                    timer.race().elapsed_since_race_start(now_ms)
                );
            }
        }

        // Check the link between server polls rather than every tick
        if outcome.polled {
            wifi.ensure_connected();
        }

        FreeRtos::delay_ms(config.timer.tick_ms);
    }
}
