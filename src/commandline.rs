use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use proconip_lib::protocol as proto;
use std::time::Duration;

fn parse_relay(s: &str) -> Result<usize, String> {
    let relay_num =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid relay number format: {e}"))?;
    let relay_num = usize::from(relay_num);
    if relay_num >= proto::MAX_RELAY_COUNT {
        return Err(format!(
            "Relay number {relay_num} out of range (0 to {})",
            proto::MAX_RELAY_COUNT - 1
        ));
    }
    Ok(relay_num)
}

fn parse_mode(s: &str) -> Result<proto::RelayMode, String> {
    s.parse::<proto::RelayMode>().map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Run in daemon mode: continuously poll the controller state at a
    /// specified interval and print all readings to the standard output.
    #[clap(verbatim_doc_comment)]
    Daemon {
        /// Interval for fetching the controller state (e.g., "10s", "1m")
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "30sec", verbatim_doc_comment)]
        poll_interval: Duration,
    },

    /// Read and display all currently available readings from the controller.
    Read,

    /// Read and display the controller firmware version and device identifier.
    Sysinfo,

    /// Read and display the current state of all relays.
    ReadRelays,

    /// Switch a relay to manual-on, manual-off, or automatic mode.
    /// In automatic mode the controller's own schedule drives the relay.
    /// All other relays keep their current state.
    #[clap(verbatim_doc_comment)]
    SetRelay {
        /// Target relay number (0 to 7 for internal relays, 8 to 15 for
        /// external relays when an external module is installed).
        /// Can be specified in decimal or hexadecimal (e.g., "0x0" to "0xF").
        #[arg(value_parser = parse_relay, verbatim_doc_comment)]
        relay: usize,
        /// The new relay mode: "auto", "on", or "off".
        #[arg(value_parser = parse_mode, verbatim_doc_comment)]
        mode: proto::RelayMode,
    },
}

const fn about_text() -> &'static str {
    "ProCon.IP Pool Controller CLI - Read pool sensor data and switch relays over HTTP."
}

#[derive(Parser, Debug)]
#[command(name="poolcon", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Base URL of the pool controller.
    /// Example: "http://192.168.3.17" or "http://pool.local".
    #[arg(short, long, verbatim_doc_comment)]
    pub url: String,

    /// Username for HTTP basic authentication.
    /// Omit when the controller has authentication disabled.
    #[arg(global = true, long, verbatim_doc_comment)]
    pub username: Option<String>,

    /// Password for HTTP basic authentication.
    #[arg(global = true, long, default_value = "", verbatim_doc_comment)]
    pub password: String,

    /// HTTP timeout for each request.
    /// Examples: "10s", "500ms".
    #[arg(global = true, long, default_value = "10s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// The command to execute.
    #[command(subcommand)]
    pub command: CliCommands,
}
