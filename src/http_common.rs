//! Common data structures and error types for the HTTP based clients.
//!
//! It defines the `Error` enum, which encapsulates all possible communication
//! errors, and [`DeviceConfig`], the connection settings shared by the
//! blocking and async clients.

use crate::protocol as proto;
use std::time::Duration;

/// Represents all possible errors that can occur while talking to the device.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wraps `proto::Error`.
    #[error(transparent)]
    Protocol(#[from] proto::Error),

    /// Wraps `reqwest::Error` (connection, timeout, and HTTP status errors).
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Path of the read endpoint, relative to the device base URL.
pub const STATE_ENDPOINT: &str = "GetState.csv";
/// Path of the relay write endpoint.
pub const CONTROL_ENDPOINT: &str = "usrcfg.cgi";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one ProCon.IP device.
///
/// Credentials are optional; when no username is configured the clients omit
/// the `Authorization` header entirely (some firmware versions reject
/// non-empty auth headers when authentication is disabled).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl DeviceConfig {
    /// Creates a configuration for the device at `base_url`, e.g.
    /// `"http://192.168.3.17"`. A trailing slash is tolerated.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Enables HTTP basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Overrides the per-request timeout (default 10 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Basic-auth credentials, or `None` when authentication is disabled
    /// (no username, or an empty one).
    pub(crate) fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .filter(|username| !username.is_empty())
            .map(|username| (username, self.password.as_deref()))
    }
}

/// Form-urlencoded body of a relay write: the full bank snapshot.
pub(crate) fn control_body(switches: &proto::RelaySwitches) -> String {
    format!("ENA={}&MANUAL=1", switches.ena_parameter())
}
