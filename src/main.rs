//! ProCon.IP Pool Controller CLI
//!
//! A command-line interface (CLI) application for interacting with the
//! ProCon.IP pool controller over its HTTP interface.
//!
//! This tool allows users to:
//! - Read all current sensor readings (temperatures, pH, Redox, pressure,
//!   canister fill levels, consumption counters, relay states).
//! - Display the controller firmware version and device identifier.
//! - Read the state of all internal and external relays.
//! - Switch individual relays to manual-on, manual-off, or automatic mode.
//! - Run in a continuous daemon mode to poll the controller state and print
//!   it to the console.
//!
//! The CLI leverages the `proconip_lib` crate for protocol definitions and
//! client operations.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use proconip_lib::{
    http_common::DeviceConfig, http_sync_client::Client, http_sync_safe_client::SafeClient,
    protocol as proto,
};
use std::panic;

mod commandline;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// One line per connected reading: `key: value unit`.
fn format_reading(key: &str, reading: &proto::Reading) -> Option<String> {
    let kind = reading.kind()?;
    match kind {
        proto::EntityKind::Relay => {
            let state = proto::RelayState::from_raw(reading.raw());
            Some(format!("{key}: {}", describe_relay(&state)))
        }
        proto::EntityKind::Digital => {
            let on = reading.is_on()?;
            Some(format!("{key}: {}", if on { "on" } else { "off" }))
        }
        _ => {
            let value = reading.value()?;
            let precision = kind.display_precision();
            match kind.display_unit() {
                Some(unit) => Some(format!("{key}: {value:.precision$} {unit}")),
                None => Some(format!("{key}: {value:.precision$}")),
            }
        }
    }
}

fn print_readings(frame: &proto::StateFrame) {
    for (key, reading) in frame.keyed_readings() {
        if let Some(line) = format_reading(&key, reading) {
            println!("{line}");
        }
    }
}

/// Human-readable relay state, e.g. "manual on" or "auto (off)".
fn describe_relay(state: &proto::RelayState) -> String {
    match state.mode() {
        proto::RelayMode::On => "manual on".to_string(),
        proto::RelayMode::Off => "manual off".to_string(),
        proto::RelayMode::Auto => {
            format!("auto ({})", if state.on { "on" } else { "off" })
        }
    }
}

/// The device-configured relay label, or a positional fallback.
fn relay_label(frame: &proto::StateFrame, index: usize) -> String {
    proto::relay_column(index)
        .and_then(|column| frame.reading(column))
        .filter(|reading| reading.is_valid())
        .map(|reading| reading.name().to_string())
        .unwrap_or_else(|| format!("relay {index}"))
}

fn print_relays(frame: &proto::StateFrame) {
    let switches = frame.relays();
    for (index, state) in switches.states().iter().enumerate() {
        println!(
            "{index:2}  {}: {}",
            relay_label(frame, index),
            describe_relay(state)
        );
    }
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "ProCon.IP CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let mut config = DeviceConfig::new(&args.url).with_timeout(args.timeout);
    if let Some(username) = &args.username {
        config = config.with_basic_auth(username, &args.password);
    }

    let client = SafeClient::new(
        Client::new(config).with_context(|| format!("Cannot create client for {}", args.url))?,
    );

    match &args.command {
        commandline::CliCommands::Daemon { poll_interval } => {
            info!("Starting daemon mode: interval={poll_interval:?}");
            loop {
                debug!("Daemon: Fetching controller state...");
                match client.fetch_state() {
                    Ok(frame) => print_readings(&frame),
                    Err(error) => warn!("Cannot fetch controller state: {error}"),
                }
                std::thread::sleep(*poll_interval);
            }
        }
        commandline::CliCommands::Read => {
            info!("Executing: Read State");
            let frame = client
                .fetch_state()
                .with_context(|| "Cannot fetch controller state")?;
            print_readings(&frame);
        }
        commandline::CliCommands::Sysinfo => {
            info!("Executing: Read System Information");
            let frame = client
                .fetch_state()
                .with_context(|| "Cannot fetch controller state")?;
            let sysinfo = frame.sysinfo();
            println!("Firmware: {}", sysinfo.firmware().unwrap_or("unknown"));
            println!("Device id: {}", sysinfo.device_id().unwrap_or("unknown"));
        }
        commandline::CliCommands::ReadRelays => {
            info!("Executing: Read Relays");
            let frame = client
                .fetch_state()
                .with_context(|| "Cannot fetch controller state")?;
            print_relays(&frame);
        }
        commandline::CliCommands::SetRelay { relay, mode } => {
            info!("Executing: Set Relay {relay} to {mode}");
            let switches = client
                .switch_relay(*relay, *mode)
                .with_context(|| format!("Failed to switch relay {relay} to {mode}"))?;
            println!("Relay {relay} set to {mode} successfully.");
            println!("Relay bank is now: {switches}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(index: usize, name: &str, unit: &str, offset: &str, factor: &str, raw: &str) -> proto::Reading {
        proto::Reading::decode(index, name, unit, offset, factor, raw)
    }

    #[test]
    fn format_reading_uses_kind_precision_and_unit() {
        let pool = reading(1, "Pool", "C", "0", "0.1", "245");
        assert_eq!(
            format_reading("pool", &pool),
            Some("pool: 24.5 °C".to_string())
        );

        let ph = reading(7, "pH", "pH", "0", "0.01", "735");
        assert_eq!(format_reading("ph", &ph), Some("ph: 7.35 pH".to_string()));
    }

    #[test]
    fn format_reading_skips_unconnected_columns() {
        let gap = reading(3, "n.a.", "C", "0", "0.1", "0");
        assert_eq!(format_reading("n_a", &gap), None);
    }

    #[test]
    fn format_reading_shows_relay_and_digital_states() {
        let pump = reading(16, "Filterpumpe", "--", "0", "1", "3");
        assert_eq!(
            format_reading("filterpumpe", &pump),
            Some("filterpumpe: manual on".to_string())
        );

        let door = reading(24, "Tuer", "--", "0", "1", "1");
        assert_eq!(format_reading("tuer", &door), Some("tuer: on".to_string()));
    }

    #[test]
    fn describe_relay_distinguishes_auto_states() {
        let auto_on = proto::RelayState { on: true, manual: false };
        let auto_off = proto::RelayState { on: false, manual: false };
        let manual_off = proto::RelayState { on: false, manual: true };
        assert_eq!(describe_relay(&auto_on), "auto (on)");
        assert_eq!(describe_relay(&auto_off), "auto (off)");
        assert_eq!(describe_relay(&manual_off), "manual off");
    }
}
