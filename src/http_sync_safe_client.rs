//! Thread-safe blocking client with serialized relay commands.
//!
//! The `/usrcfg.cgi` protocol is set-all-at-once: every write replaces the
//! state of the whole relay bank. Two concurrent commands for different
//! relays would therefore clobber each other if each read the current state,
//! flipped its own bits, and wrote back independently. `SafeClient` prevents
//! that by holding the inner client behind a mutex and running the complete
//! fetch-decode-mutate-write sequence of [`SafeClient::switch_relay`] under
//! one lock.
//!
//! ## Example
//!
//! ```no_run
//! use proconip_lib::{
//!     http_common::DeviceConfig,
//!     http_sync_client::Client,
//!     http_sync_safe_client::SafeClient,
//!     protocol::RelayMode,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(DeviceConfig::new("http://192.168.3.17"))?;
//!     let client = SafeClient::new(client);
//!
//!     // Force relay 2 on; all other relays keep their current state.
//!     let switches = client.switch_relay(2, RelayMode::On)?;
//!     println!("Relay bank is now: {switches}");
//!     Ok(())
//! }
//! ```

use crate::{http_common::Result, http_sync_client::Client, protocol as proto};
use std::sync::{Arc, Mutex};

/// Cloneable, thread-safe wrapper around the blocking [`Client`].
#[derive(Debug, Clone)]
pub struct SafeClient {
    client: Arc<Mutex<Client>>,
}

impl SafeClient {
    /// Wraps a blocking client.
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
    pub fn fetch_state(&self) -> Result<proto::StateFrame> {
        let client = self.client.lock().unwrap();
        client.fetch_state()
    }

    /// Writes a complete relay bank snapshot.
    pub fn write_relays(&self, switches: &proto::RelaySwitches) -> Result<()> {
        let client = self.client.lock().unwrap();
        client.write_relays(switches)
    }

    /// Switches one relay to `mode` without disturbing any other relay.
    ///
    /// Reads the latest state frame, changes only the target relay's two
    /// bits, and writes the full snapshot back, all under one lock so no
    /// other command can interleave. Returns the snapshot that was written.
    ///
    /// Fails with [`proto::Error::RelayIndexOutOfRange`] before anything is
    /// sent when `relay` is not part of the decoded bank.
    pub fn switch_relay(
        &self,
        relay: usize,
        mode: proto::RelayMode,
    ) -> Result<proto::RelaySwitches> {
        let client = self.client.lock().unwrap();
        let frame = client.fetch_state()?;
        let switches = frame.relays().with_mode(relay, mode)?;
        client.write_relays(&switches)?;
        Ok(switches)
    }
}
