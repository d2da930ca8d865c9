//! Asynchronous HTTP client for the ProCon.IP pool controller.
//!
//! The async counterpart of [`crate::http_sync_client`]: `GET /GetState.csv`
//! decodes into a [`proto::StateFrame`], `POST /usrcfg.cgi` encodes a full
//! [`proto::RelaySwitches`] snapshot. All methods are `async` and must be
//! `.await`ed.
//!
//! This client performs one request per call and holds no device state. For
//! relay commands, which require a serialized read-modify-write cycle, use
//! [`crate::http_async_safe_client::SafeClient`].

use crate::http_common::{self, DeviceConfig, Result, CONTROL_ENDPOINT, STATE_ENDPOINT};
use crate::protocol as proto;
use reqwest::header::CONTENT_TYPE;

/// Asynchronous client for one ProCon.IP device.
///
/// # Examples
///
/// ```no_run
/// use proconip_lib::{http_common::DeviceConfig, http_async_client::Client};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(DeviceConfig::new("http://192.168.3.17"))?;
/// let frame = client.fetch_state().await?;
/// println!("{} columns decoded", frame.column_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    config: DeviceConfig,
}

impl Client {
    /// Creates a new client. Fails when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Fetches `GetState.csv` and decodes it into a fresh state frame.
    pub async fn fetch_state(&self) -> Result<proto::StateFrame> {
        let mut request = self.http.get(self.config.endpoint(STATE_ENDPOINT));
        if let Some((username, password)) = self.config.credentials() {
            request = request.basic_auth(username, password);
        }
        let text = request.send().await?.error_for_status()?.text().await?;
        Ok(proto::StateFrame::decode(&text)?)
    }

    /// Writes a complete relay bank snapshot to `usrcfg.cgi`.
    ///
    /// The device replaces the state of every relay with this snapshot, so
    /// the caller must start from the current state (see
    /// [`proto::StateFrame::relays`] and [`proto::RelaySwitches::with_mode`]).
    pub async fn write_relays(&self, switches: &proto::RelaySwitches) -> Result<()> {
        let mut request = self
            .http
            .post(self.config.endpoint(CONTROL_ENDPOINT))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(http_common::control_body(switches));
        if let Some((username, password)) = self.config.credentials() {
            request = request.basic_auth(username, password);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}
