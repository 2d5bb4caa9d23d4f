/// Configuration for the lap timer firmware
/// Network settings and race limits are baked in at compile time
use race_timing::TimerConfig;

/// Network configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Track WiFi network to join
    pub wifi_ssid: &'static str,
    /// WiFi password (empty for an open network)
    pub wifi_password: &'static str,
    /// Race server base URL, without trailing slash
    pub race_server_url: &'static str,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: "RaceTrack",
            wifi_password: "racetrack",
            // Placeholder - set RACE_SERVER_URL for a real track
            race_server_url: "http://192.168.4.1:8080",
        }
    }
}

/// Display hardware settings
/// Wiring: HC-SR04 trigger GPIO4, echo GPIO5; HT16K33 SDA GPIO6, SCL GPIO7
#[derive(Debug, Clone, Copy)]
pub struct DisplayHwConfig {
    pub i2c_address: u8,
    /// HT16K33 dimming level 0-15
    pub brightness: u8,
    pub i2c_baudrate_hz: u32,
}

impl Default for DisplayHwConfig {
    fn default() -> Self {
        Self {
            i2c_address: ht16k33::DEFAULT_ADDRESS,
            brightness: ht16k33::MAX_BRIGHTNESS,
            i2c_baudrate_hz: 400_000,
        }
    }
}

/// Master firmware configuration
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub network: NetworkConfig,
    pub display: DisplayHwConfig,
    pub timer: TimerConfig,
}

impl SystemConfig {
    /// Create configuration from environment variables (compile-time)
    ///
    /// ```bash
    /// export WIFI_SSID="TrackNetwork"
    /// export WIFI_PASSWORD="secret"
    /// export RACE_SERVER_URL="http://192.168.1.20:8080"
    /// export MAX_LAPS="10"          # optional, unlimited when unset
    /// cargo build --release
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ssid) = option_env!("WIFI_SSID") {
            config.network.wifi_ssid = ssid;
        }
        if let Some(password) = option_env!("WIFI_PASSWORD") {
            config.network.wifi_password = password;
        }
        if let Some(url) = option_env!("RACE_SERVER_URL") {
            config.network.race_server_url = url.trim_end_matches('/');
        }
        if let Some(laps) = option_env!("MAX_LAPS") {
            config.timer.race.max_laps = laps.trim().parse().ok().filter(|&n| n > 0);
        }

        config
    }
}
