/// WiFi station connection to the track network
use anyhow::{anyhow, Result};
use esp_idf_hal::peripheral;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use log::{info, warn};

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiManager {
    pub fn new(
        modem: impl peripheral::Peripheral<P = esp_idf_hal::modem::Modem> + 'static,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
        Ok(Self { wifi })
    }

    /// Join the track network and wait for a DHCP lease
    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        info!("Setting WiFi configuration (STA mode)");
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow!("SSID too long: {}", ssid))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("WiFi password too long"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_config)?;

        info!("Starting WiFi");
        self.wifi.start()?;

        info!("Connecting to {}", ssid);
        self.wifi.connect()?;

        info!("Waiting for DHCP lease");
        self.wifi.wait_netif_up()?;

        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi connected! IP: {}", ip_info.ip);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Rejoin after the access point dropped us
    ///
    /// Failures are logged; the race server polls keep failing (and being
    /// retried) until the link is back.
    pub fn ensure_connected(&mut self) {
        if self.is_connected() {
            return;
        }
        warn!("WiFi link lost, reconnecting");
        if let Err(e) = self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
            warn!("WiFi reconnect failed: {:?}", e);
        }
    }
}
