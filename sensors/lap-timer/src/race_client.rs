/// HTTP client for the race server
///
/// Every poll opens a fresh connection with the caller's timeout, reads a
/// small body and hands it to the core parsers.
use core::time::Duration;

use embedded_svc::http::client::Client;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys::{EspError, ESP_ERR_HTTP_EAGAIN, ESP_ERR_TIMEOUT};
use log::debug;
use race_timing::server::{
    parse_countdown, parse_registration, parse_session, MAX_RESPONSE_BYTES,
};
use race_timing::{RaceServer, RegistrationStatus, ServerError, SessionStatus, TimerId};

pub struct HttpRaceServer {
    base_url: &'static str,
}

impl HttpRaceServer {
    pub fn new(base_url: &'static str) -> Self {
        Self { base_url }
    }

    /// GET `path` and return the body as text
    fn get(&self, path: &str, timeout: Duration) -> Result<String, ServerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(timeout),
            ..Default::default()
        })
        .map_err(map_esp_error)?;
        let mut client = Client::wrap(connection);

        let request = client.get(&url).map_err(map_io_error)?;
        let mut response = request.submit().map_err(map_io_error)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(ServerError::Status(status));
        }

        // One spare byte tells an exactly-full body from an oversized one
        let mut buf = [0u8; MAX_RESPONSE_BYTES + 1];
        let mut len = 0;
        loop {
            let n = response.read(&mut buf[len..]).map_err(map_io_error)?;
            if n == 0 {
                break;
            }
            len += n;
            if len > MAX_RESPONSE_BYTES {
                return Err(ServerError::ResponseTooLarge);
            }
        }

        let body = std::str::from_utf8(&buf[..len])
            .map_err(|e| ServerError::Malformed(e.to_string()))?;
        Ok(body.to_string())
    }
}

impl RaceServer for HttpRaceServer {
    fn poll_registration(&mut self, timeout: Duration) -> Result<RegistrationStatus, ServerError> {
        let body = self.get("/register", timeout)?;
        parse_registration(&body)
    }

    fn poll_countdown(&mut self, id: TimerId, timeout: Duration) -> Result<Option<u32>, ServerError> {
        let body = self.get(&format!("/countdown?id={}", id), timeout)?;
        parse_countdown(&body)
    }

    fn poll_session(&mut self, id: TimerId, timeout: Duration) -> Result<SessionStatus, ServerError> {
        let body = self.get(&format!("/session?id={}", id), timeout)?;
        parse_session(&body)
    }
}

fn map_io_error(e: EspIOError) -> ServerError {
    map_esp_error(e.0)
}

fn map_esp_error(e: EspError) -> ServerError {
    let code = e.code();
    if code == ESP_ERR_TIMEOUT as i32 || code == ESP_ERR_HTTP_EAGAIN as i32 {
        ServerError::Timeout
    } else {
        ServerError::Unavailable(e.to_string())
    }
}
