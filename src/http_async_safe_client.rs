//! Task-safe asynchronous client with serialized relay commands.
//!
//! The async counterpart of [`crate::http_sync_safe_client`]: because every
//! `/usrcfg.cgi` write replaces the whole relay bank, concurrent commands
//! must not interleave their read-modify-write cycles. `SafeClient` holds
//! the inner client behind a `tokio::sync::Mutex` and keeps the lock across
//! the await points of [`SafeClient::switch_relay`].
//!
//! ## Example
//!
//! ```no_run
//! use proconip_lib::{
//!     http_common::DeviceConfig,
//!     http_async_client::Client,
//!     http_async_safe_client::SafeClient,
//!     protocol::RelayMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(DeviceConfig::new("http://192.168.3.17"))?;
//!     let client = SafeClient::new(client);
//!
//!     let switches = client.switch_relay(2, RelayMode::Auto).await?;
//!     println!("Relay bank is now: {switches}");
//!     Ok(())
//! }
//! ```

use crate::{http_async_client::Client, http_common::Result, protocol as proto};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable, task-safe wrapper around the asynchronous [`Client`].
#[derive(Debug, Clone)]
pub struct SafeClient {
    client: Arc<Mutex<Client>>,
}

impl SafeClient {
    /// Wraps an asynchronous client.
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
        }
    }

    /// Creates a `SafeClient` from an already shared client.
    pub fn from_shared(client: Arc<Mutex<Client>>) -> Self {
        Self { client }
    }

    /// Clones the shared inner client.
    pub fn clone_shared(&self) -> Arc<Mutex<Client>> {
        self.client.clone()
    }

    /// Fetches and decodes one state frame.
    pub async fn fetch_state(&self) -> Result<proto::StateFrame> {
        let client = self.client.lock().await;
        client.fetch_state().await
    }

    /// Writes a complete relay bank snapshot.
    pub async fn write_relays(&self, switches: &proto::RelaySwitches) -> Result<()> {
        let client = self.client.lock().await;
        client.write_relays(switches).await
    }

    /// Switches one relay to `mode` without disturbing any other relay.
    ///
    /// The lock is held across both requests, so no other command on this
    /// `SafeClient` can interleave. Returns the snapshot that was written.
    ///
    /// Fails with [`proto::Error::RelayIndexOutOfRange`] before anything is
    /// sent when `relay` is not part of the decoded bank.
    pub async fn switch_relay(
        &self,
        relay: usize,
        mode: proto::RelayMode,
    ) -> Result<proto::RelaySwitches> {
        let client = self.client.lock().await;
        let frame = client.fetch_state().await?;
        let switches = frame.relays().with_mode(relay, mode)?;
        client.write_relays(&switches).await?;
        Ok(switches)
    }
}
