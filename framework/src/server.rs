//! Race server interface
//!
//! The race server decides when every timer on the track starts. Timer units
//! poll it over HTTP with a bounded timeout; any failure is "no new data" and
//! never reaches the state machine as a fault.
//!
//! ## Wire format
//!
//! | Endpoint | Body |
//! |---|---|
//! | `GET /register` | `Registration closed` or `{"id": 3}` |
//! | `GET /countdown?id=3` | `{"countdownMs": 2500}` or `{"countdownMs": null}` |
//! | `GET /session?id=3` | `{"status": "running" \| "finished" \| "closed"}` |
//!
//! A negative countdown means the start has already passed.

use core::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Server-assigned timer identifier
pub type TimerId = u32;

/// Largest response body the firmware buffers
pub const MAX_RESPONSE_BYTES: usize = 160;

/// Plain-text body the server sends once registration is over
pub const REGISTRATION_CLOSED: &str = "Registration closed";

/// Result of a registration poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Closed,
    Accepted(TimerId),
}

/// Result of a session poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Finished,
    Closed,
}

/// Server errors. All of them mean "nothing new this poll".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("request timed out")]
    Timeout,

    #[error("server unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("response body exceeds {} bytes", MAX_RESPONSE_BYTES)]
    ResponseTooLarge,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Malformed(e.to_string())
    }
}

/// Blocking race server client
///
/// Implementations must return within `timeout`.
pub trait RaceServer {
    fn poll_registration(&mut self, timeout: Duration) -> Result<RegistrationStatus, ServerError>;

    /// Milliseconds until the start, `None` if no start is scheduled yet
    fn poll_countdown(
        &mut self,
        id: TimerId,
        timeout: Duration,
    ) -> Result<Option<u32>, ServerError>;

    fn poll_session(&mut self, id: TimerId, timeout: Duration)
        -> Result<SessionStatus, ServerError>;
}

#[derive(Deserialize)]
struct RegistrationBody {
    id: TimerId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountdownBody {
    countdown_ms: Option<i64>,
}

#[derive(Deserialize)]
struct SessionBody {
    status: SessionStatus,
}

fn check_size(body: &str) -> Result<&str, ServerError> {
    if body.len() > MAX_RESPONSE_BYTES {
        return Err(ServerError::ResponseTooLarge);
    }
    Ok(body.trim())
}

/// Parse a `/register` response body
pub fn parse_registration(body: &str) -> Result<RegistrationStatus, ServerError> {
    let body = check_size(body)?;
    if body == REGISTRATION_CLOSED {
        return Ok(RegistrationStatus::Closed);
    }
    let parsed: RegistrationBody = serde_json::from_str(body)?;
    Ok(RegistrationStatus::Accepted(parsed.id))
}

/// Parse a `/countdown` response body, clamping elapsed starts to zero
pub fn parse_countdown(body: &str) -> Result<Option<u32>, ServerError> {
    let body = check_size(body)?;
    let parsed: CountdownBody = serde_json::from_str(body)?;
    Ok(parsed
        .countdown_ms
        .map(|ms| ms.clamp(0, u32::MAX as i64) as u32))
}

/// Parse a `/session` response body
pub fn parse_session(body: &str) -> Result<SessionStatus, ServerError> {
    let body = check_size(body)?;
    let parsed: SessionBody = serde_json::from_str(body)?;
    Ok(parsed.status)
}
