//! A library for reading and controlling the ProCon.IP pool controller via HTTP.
//!
//! This crate provides two main ways to interact with the pool controller:
//!
//! 1.  **High-Level, Safe Clients**: Stateful, thread-safe clients that serialize the relay read-modify-write cycle and are easy to share in concurrent applications. This is the recommended approach for most users. See [`http_sync_safe_client::SafeClient`] (blocking) and [`http_async_safe_client::SafeClient`] (`async`).
//!
//! 2.  **Low-Level Clients and Protocol Types**: Plain one-request-per-call
//!     clients ([`http_sync_client::Client`], [`http_async_client::Client`])
//!     plus the pure [`protocol`] module, which decodes the `GetState.csv`
//!     frame and encodes relay commands without any I/O at all.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Complete decoder for the positionally aligned `GetState.csv` frame and the two-bits-per-relay `usrcfg.cgi` command encoding.
//! - **Stateful, Thread-Safe Clients**: For easy and safe concurrent use.
//! - **Pure Protocol Layer**: Decode and encode without a device at hand.
//! - **Synchronous and Asynchronous APIs**: Both blocking and `async/await` APIs are available.
//! - **Strongly-Typed API**: Utilizes Rust's type system for protocol correctness (e.g., `StateFrame`, `Reading`, `RelayMode`, `RelaySwitches`).
//!
//! ## Quick Start
//!
//! This example shows how to use the recommended high-level, synchronous `SafeClient`.
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
//!     // Connect to the device and create a stateful, safe client
//!     let config = DeviceConfig::new("http://192.168.3.17");
//!     let client = SafeClient::new(Client::new(config)?);
//!
//!     // Use the client to interact with the device
//!     let frame = client.fetch_state()?;
//!     for (key, reading) in frame.keyed_readings() {
//!         if let Some(value) = reading.value() {
//!             println!("{key}: {value}");
//!         }
//!     }
//!
//!     // Force the filter pump relay on
//!     client.switch_relay(2, RelayMode::On)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! For more details, see the documentation for the specific client you wish to use.

pub mod protocol;

#[cfg(any(feature = "blocking", feature = "async"))]
pub mod http_common;

#[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
#[cfg(feature = "blocking")]
pub mod http_sync_client;

#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
#[cfg(feature = "async")]
pub mod http_async_client;

#[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
#[cfg(feature = "blocking")]
pub mod http_sync_safe_client;

#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
#[cfg(feature = "async")]
pub mod http_async_safe_client;
