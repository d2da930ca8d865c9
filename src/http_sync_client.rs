//! Blocking HTTP client for the ProCon.IP pool controller.
//!
//! Wraps a `reqwest::blocking::Client` and maps the two device endpoints to
//! typed protocol values: `GET /GetState.csv` decodes into a
//! [`proto::StateFrame`], `POST /usrcfg.cgi` encodes a full
//! [`proto::RelaySwitches`] snapshot.
//!
//! This client performs one request per call and holds no device state. For
//! relay commands, which require a serialized read-modify-write cycle, use
//! [`crate::http_sync_safe_client::SafeClient`].

use crate::http_common::{self, DeviceConfig, Result, CONTROL_ENDPOINT, STATE_ENDPOINT};
use crate::protocol as proto;
use reqwest::header::CONTENT_TYPE;

/// Synchronous client for one ProCon.IP device.
///
/// # Examples
///
/// ```no_run
/// use proconip_lib::{http_common::DeviceConfig, http_sync_client::Client};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(DeviceConfig::new("http://192.168.3.17"))?;
/// let frame = client.fetch_state()?;
/// println!("Firmware: {}", frame.sysinfo().firmware().unwrap_or("unknown"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    http: reqwest::blocking::Client,
    config: DeviceConfig,
}

impl Client {
    /// Creates a new client. Fails when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Fetches `GetState.csv` and decodes it into a fresh state frame.
    pub fn fetch_state(&self) -> Result<proto::StateFrame> {
        let mut request = self.http.get(self.config.endpoint(STATE_ENDPOINT));
        if let Some((username, password)) = self.config.credentials() {
            request = request.basic_auth(username, password);
        }
        let text = request.send()?.error_for_status()?.text()?;
        Ok(proto::StateFrame::decode(&text)?)
    }

    /// Writes a complete relay bank snapshot to `usrcfg.cgi`.
    ///
    /// The device replaces the state of every relay with this snapshot, so
    /// the caller must start from the current state (see
    /// [`proto::StateFrame::relays`] and [`proto::RelaySwitches::with_mode`]).
    pub fn write_relays(&self, switches: &proto::RelaySwitches) -> Result<()> {
        let mut request = self
            .http
            .post(self.config.endpoint(CONTROL_ENDPOINT))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(http_common::control_body(switches));
        if let Some((username, password)) = self.config.credentials() {
            request = request.basic_auth(username, password);
        }
        request.send()?.error_for_status()?;
        Ok(())
    }
}
