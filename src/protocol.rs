//! ProCon.IP pool controller wire protocol.
//!
//! The device exposes its entire state through `GET /GetState.csv`, a
//! fixed-layout CSV document of six rows:
//!
//! - Row 0: `SYSINFO` tokens (firmware version, device id, system flags).
//! - Row 1: human-readable column labels (`"n.a."` for unconnected channels).
//! - Row 2: unit strings (`C`, `Bar`, `mV`, `pH`, `%`, `ml`, `l/h`, `--`).
//! - Row 3: per-column calibration offsets.
//! - Row 4: per-column scale factors.
//! - Row 5: raw integer readings.
//!
//! Rows 1-5 are positionally aligned; the displayed value of column `i` is
//! `offset[i] + factor[i] * raw[i]`.
//!
//! Relays are controlled through `POST /usrcfg.cgi`, which replaces the state
//! of *all* relays at once with a composite `ENA` parameter. This module
//! implements both directions: [`StateFrame::decode`] for the read path and
//! [`RelaySwitches`] for the relay write path. Everything here is pure; the
//! HTTP transport lives in the client modules.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Field delimiter used by `GetState.csv`.
pub const DELIMITER: char = ',';
/// A state frame consists of the SYSINFO row plus five aligned data rows.
pub const MIN_FRAME_LINES: usize = 6;

/// Placeholder label for channels that are not physically wired.
pub const NOT_AVAILABLE: &str = "n.a.";
/// Unit string of dimensionless columns (relays, digital inputs).
pub const NO_UNIT: &str = "--";

// Fixed column layout of the data rows (0-indexed). Channels inside a range
// that are not wired carry the "n.a." label.
pub const TIME_COLS: Range<usize> = 0..1;
pub const ANALOG_COLS: Range<usize> = 1..6;
pub const ELECTRODE_COLS: Range<usize> = 6..8;
pub const TEMPERATURE_COLS: Range<usize> = 8..16;
pub const INTERNAL_RELAY_COLS: Range<usize> = 16..24;
pub const DIGITAL_INPUT_COLS: Range<usize> = 24..28;
pub const EXTERNAL_RELAY_COLS: Range<usize> = 28..36;
pub const CANISTER_COLS: Range<usize> = 36..39;
pub const CANISTER_CONSUMPTION_COLS: Range<usize> = 39..42;

/// Number of relays in the internal bank.
pub const INTERNAL_RELAY_COUNT: usize = 8;
/// Internal plus optional external relay bank.
pub const MAX_RELAY_COUNT: usize = 16;

/// Raw relay value bit: relay output is currently energised.
pub const RELAY_BIT_ON: i64 = 0b01;
/// Raw relay value bit: relay is in manual mode instead of auto/schedule.
pub const RELAY_BIT_MANUAL: i64 = 0b10;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The CSV payload has fewer than six usable lines; nothing can be
    /// decoded from it.
    #[error("malformed state frame: expected at least 6 CSV lines, got {lines}")]
    MalformedFrame { lines: usize },

    /// The five data rows disagree on their column count, so positional
    /// alignment is meaningless. `row` is the 1-based CSV line number.
    #[error("CSV row {row} has {found} columns, expected {expected}")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A relay command addressed a relay outside the decoded bank.
    #[error("relay index {index} out of range for a bank of {count} relays")]
    RelayIndexOutOfRange { index: usize, count: usize },

    /// A relay mode string could not be parsed.
    #[error("invalid relay mode '{0}', expected 'auto', 'on' or 'off'")]
    InvalidRelayMode(String),
}

/// Maps a logical relay index (bit position in the `ENA` parameter) to its
/// CSV column: bit 0 → first internal relay column, bit 8 → first external
/// relay column. Returns `None` for indices beyond [`MAX_RELAY_COUNT`].
pub fn relay_column(index: usize) -> Option<usize> {
    if index < INTERNAL_RELAY_COUNT {
        Some(INTERNAL_RELAY_COLS.start + index)
    } else if index < MAX_RELAY_COUNT {
        Some(EXTERNAL_RELAY_COLS.start + index - INTERNAL_RELAY_COUNT)
    } else {
        None
    }
}

/// Inverse of [`relay_column`]: maps a CSV column to its logical relay index,
/// or `None` when the column does not belong to a relay bank.
pub fn relay_index(column: usize) -> Option<usize> {
    if INTERNAL_RELAY_COLS.contains(&column) {
        Some(column - INTERNAL_RELAY_COLS.start)
    } else if EXTERNAL_RELAY_COLS.contains(&column) {
        Some(column - EXTERNAL_RELAY_COLS.start + INTERNAL_RELAY_COUNT)
    } else {
        None
    }
}

/// The user-facing control vocabulary for one relay.
///
/// `Auto` returns the relay to the device's internal timer/schedule; `On` and
/// `Off` force the output in manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelayMode {
    Auto,
    On,
    Off,
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RelayMode::Auto => write!(f, "auto"),
            RelayMode::On => write!(f, "on"),
            RelayMode::Off => write!(f, "off"),
        }
    }
}

impl FromStr for RelayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(RelayMode::Auto),
            "on" => Ok(RelayMode::On),
            "off" => Ok(RelayMode::Off),
            _ => Err(Error::InvalidRelayMode(s.to_string())),
        }
    }
}

/// Wire representation of one relay: two bits, on/off and manual/auto.
///
/// In auto mode the `on` flag still reflects whether the schedule currently
/// drives the output; it only becomes a user command in manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelayState {
    pub on: bool,
    pub manual: bool,
}

impl RelayState {
    /// Decodes the 2-bit raw value of a relay column (0..=3).
    pub fn from_raw(raw: i64) -> Self {
        Self {
            on: raw & RELAY_BIT_ON != 0,
            manual: raw & RELAY_BIT_MANUAL != 0,
        }
    }

    /// Derived tri-state mode: `Auto` whenever the manual bit is clear.
    pub fn mode(&self) -> RelayMode {
        if !self.manual {
            RelayMode::Auto
        } else if self.on {
            RelayMode::On
        } else {
            RelayMode::Off
        }
    }
}

/// Full snapshot of one relay bank, the unit of the `/usrcfg.cgi` protocol.
///
/// The endpoint does not accept per-relay commands: every write replaces the
/// state of all relays, encoded as two bit patterns `manual_bits,on_bits`
/// where bit `i` belongs to the relay at [`relay_column`]`(i)`. A command for
/// a single relay therefore goes through [`RelaySwitches::with_mode`], which
/// changes exactly the target relay and leaves every other bit untouched.
///
/// ```
/// use proconip_lib::protocol::{RelayMode, RelaySwitches};
///
/// // A bank of 8 relays, all in auto mode and currently off.
/// let bank = RelaySwitches::decode(0, 0, 8);
/// let bank = bank.with_mode(2, RelayMode::On)?;
/// assert_eq!(bank.encode(), (0b100, 0b100));
/// # Ok::<(), proconip_lib::protocol::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelaySwitches {
    states: Vec<RelayState>,
}

impl RelaySwitches {
    /// Builds a snapshot from explicit per-relay states.
    pub fn from_states(states: Vec<RelayState>) -> Self {
        let mut states = states;
        states.truncate(MAX_RELAY_COUNT);
        Self { states }
    }

    /// Unpacks the two composite bit patterns into `count` relay states.
    ///
    /// `count` is 8 for devices without the external relay extension and 16
    /// with it; larger values are clamped.
    pub fn decode(manual_bits: u16, on_bits: u16, count: usize) -> Self {
        let count = count.min(MAX_RELAY_COUNT);
        let states = (0..count)
            .map(|i| RelayState {
                on: on_bits >> i & 1 != 0,
                manual: manual_bits >> i & 1 != 0,
            })
            .collect();
        Self { states }
    }

    /// Packs the snapshot back into `(manual_bits, on_bits)`. Exact inverse
    /// of [`RelaySwitches::decode`] for the same relay count.
    pub fn encode(&self) -> (u16, u16) {
        let mut manual_bits: u16 = 0;
        let mut on_bits: u16 = 0;
        for (i, state) in self.states.iter().enumerate() {
            if state.manual {
                manual_bits |= 1 << i;
            }
            if state.on {
                on_bits |= 1 << i;
            }
        }
        (manual_bits, on_bits)
    }

    /// Number of relays in this bank (8 or 16).
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[RelayState] {
        &self.states
    }

    /// State of one relay, or [`Error::RelayIndexOutOfRange`].
    pub fn get(&self, index: usize) -> Result<RelayState, Error> {
        self.states
            .get(index)
            .copied()
            .ok_or(Error::RelayIndexOutOfRange {
                index,
                count: self.states.len(),
            })
    }

    /// Returns a new snapshot with relay `index` switched to `mode` and all
    /// other relays bit-identical to the current snapshot.
    ///
    /// `Auto` writes the well-defined pattern manual=0, on=0; the device's
    /// schedule then takes over the output. `On`/`Off` set the manual bit and
    /// force the output accordingly.
    pub fn with_mode(&self, index: usize, mode: RelayMode) -> Result<Self, Error> {
        if index >= self.states.len() {
            return Err(Error::RelayIndexOutOfRange {
                index,
                count: self.states.len(),
            });
        }
        let mut states = self.states.clone();
        states[index] = match mode {
            RelayMode::Auto => RelayState {
                on: false,
                manual: false,
            },
            RelayMode::On => RelayState {
                on: true,
                manual: true,
            },
            RelayMode::Off => RelayState {
                on: false,
                manual: true,
            },
        };
        Ok(Self { states })
    }

    /// The value of the `ENA` POST parameter: `"<manual_bits>,<on_bits>"`.
    pub fn ena_parameter(&self) -> String {
        let (manual_bits, on_bits) = self.encode();
        format!("{manual_bits},{on_bits}")
    }
}

impl fmt::Display for RelaySwitches {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for state in &self.states {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", state.mode())?;
            first = false;
        }
        Ok(())
    }
}

/// Presentation kind of one decoded column, derived from its unit and its
/// position in the fixed column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Temperature,
    Pressure,
    Voltage,
    Ph,
    Percentage,
    Flow,
    Volume,
    OperatingHours,
    /// Relay metadata; consumed by the relay codec, not a plain measurement.
    Relay,
    /// Dimensionless on/off signal from a digital input.
    Digital,
    /// Fallback for unrecognised units; never an error.
    Dimensionless,
}

impl EntityKind {
    /// Display unit string, normalised from the device's short ASCII unit
    /// (`C` → `°C`, `ml` → `mL`, `l/h` → `L/h`).
    pub fn display_unit(&self) -> Option<&'static str> {
        match self {
            EntityKind::Temperature => Some("°C"),
            EntityKind::Pressure => Some("bar"),
            EntityKind::Voltage => Some("mV"),
            EntityKind::Ph => Some("pH"),
            EntityKind::Percentage => Some("%"),
            EntityKind::Flow => Some("L/h"),
            EntityKind::Volume => Some("mL"),
            EntityKind::OperatingHours => Some("h"),
            EntityKind::Relay | EntityKind::Digital | EntityKind::Dimensionless => None,
        }
    }

    /// Suggested number of decimal places for display. Matches what the
    /// physical quantity needs: pool temperatures one decimal, filter
    /// pressure three, pH two, everything else whole numbers.
    pub fn display_precision(&self) -> usize {
        match self {
            EntityKind::Temperature => 1,
            EntityKind::Pressure => 3,
            EntityKind::Ph => 2,
            _ => 0,
        }
    }
}

// Suppresses binary floating-point noise so one- and two-decimal display
// values compare exactly (22.499999999 -> 22.5).
fn round_value(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_separator = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('_');
            last_was_separator = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// One decoded measurement column.
///
/// A reading always occupies its column slot, even when the channel is not
/// wired (`"n.a."`) or its numeric fields failed to parse; that keeps the
/// index alignment of all following columns intact. Whether the reading
/// becomes a visible entity is decided by [`Reading::kind`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    index: usize,
    name: String,
    unit: String,
    offset: f64,
    factor: f64,
    raw: i64,
    valid: bool,
}

impl Reading {
    /// Combines the five aligned fields of column `index` into a reading.
    ///
    /// Numeric parse failures flag the reading invalid instead of failing;
    /// one malformed column must not hide the rest of the frame. Labels are
    /// kept verbatim, only the numeric fields are trimmed.
    pub fn decode(
        index: usize,
        name: &str,
        unit: &str,
        offset: &str,
        factor: &str,
        raw: &str,
    ) -> Self {
        let offset = offset.trim().parse::<f64>();
        let factor = factor.trim().parse::<f64>();
        // Some firmware versions format raw integers as floats ("124.0").
        let raw = raw.trim().parse::<f64>();
        match (offset, factor, raw) {
            (Ok(offset), Ok(factor), Ok(raw)) if raw.is_finite() => Self {
                index,
                name: name.to_string(),
                unit: unit.to_string(),
                offset,
                factor,
                raw: raw as i64,
                valid: true,
            },
            _ => Self {
                index,
                name: name.to_string(),
                unit: unit.to_string(),
                offset: 0.0,
                factor: 0.0,
                raw: 0,
                valid: false,
            },
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw label from the CSV, verbatim.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw unit string from the CSV (`C`, `Bar`, `--`, ...).
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn raw(&self) -> i64 {
        self.raw
    }

    /// False when a numeric field failed to parse; invalid readings are
    /// excluded from classification but keep their column slot.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True when the channel is physically wired (label is neither empty nor
    /// `"n.a."`, and the unit is not the `"n.a."` sentinel).
    pub fn is_connected(&self) -> bool {
        let name = self.name.trim();
        !name.is_empty()
            && !name.eq_ignore_ascii_case(NOT_AVAILABLE)
            && !self.unit.trim().eq_ignore_ascii_case(NOT_AVAILABLE)
    }

    /// The displayed value `offset + factor * raw`, or `None` for invalid
    /// readings. Rounded so display digits reproduce exactly.
    pub fn value(&self) -> Option<f64> {
        self.valid
            .then(|| round_value(self.offset + self.factor * self.raw as f64))
    }

    /// Digital interpretation of the raw value (`raw != 0`).
    pub fn is_on(&self) -> Option<bool> {
        self.valid.then(|| self.raw != 0)
    }

    /// Classifies the reading, or `None` when no entity should be emitted.
    ///
    /// Pure function of the column's identity `(index, name, unit)`, so the
    /// kind is stable across polls and restarts. Precedence, first match
    /// wins:
    ///
    /// 1. invalid or unconnected (`"n.a."`) → no entity,
    /// 2. known physical unit → the matching measurement kind,
    /// 3. relay bank column → [`EntityKind::Relay`],
    /// 4. dimensionless digital input → [`EntityKind::Digital`],
    /// 5. fallback → [`EntityKind::Dimensionless`] (unknown units never
    ///    fail).
    pub fn kind(&self) -> Option<EntityKind> {
        if !self.valid || !self.is_connected() {
            return None;
        }
        let unit = self.unit.trim();
        let by_unit = match unit {
            "C" | "°C" => Some(EntityKind::Temperature),
            "Bar" | "bar" => Some(EntityKind::Pressure),
            "mV" => Some(EntityKind::Voltage),
            "pH" => Some(EntityKind::Ph),
            "%" => Some(EntityKind::Percentage),
            "l/h" | "L/h" => Some(EntityKind::Flow),
            "ml" | "mL" => Some(EntityKind::Volume),
            "h" => Some(EntityKind::OperatingHours),
            _ => None,
        };
        if let Some(kind) = by_unit {
            return Some(kind);
        }
        if relay_index(self.index).is_some() {
            return Some(EntityKind::Relay);
        }
        if unit.is_empty() || unit == NO_UNIT {
            if self.name.trim() == "pH" {
                return Some(EntityKind::Ph);
            }
            if DIGITAL_INPUT_COLS.contains(&self.index) {
                return Some(EntityKind::Digital);
            }
        }
        Some(EntityKind::Dimensionless)
    }

    /// Stable identifier derived from the label (lowercased, non-alphanumeric
    /// runs collapsed to `_`). Labels are device-configured, so collisions
    /// are possible; [`StateFrame::keyed_readings`] disambiguates them with
    /// the column index.
    pub fn object_id(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            format!("column_{}", self.index)
        } else {
            slug
        }
    }
}

/// Tokens of the SYSINFO row, parsed leniently: fields beyond the known
/// positions are kept but ignored, missing fields are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SysInfo {
    tokens: Vec<String>,
}

impl SysInfo {
    fn parse(line: &str) -> Self {
        Self {
            tokens: line.split(DELIMITER).map(|t| t.trim().to_string()).collect(),
        }
    }

    /// Firmware version string, e.g. `"1.7.6"`.
    pub fn firmware(&self) -> Option<&str> {
        self.tokens
            .get(1)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Unique device identifier, e.g. `"30217075"`. Stable across IP address
    /// changes, absent on very old firmware.
    pub fn device_id(&self) -> Option<&str> {
        self.tokens
            .get(2)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Immutable snapshot of one `GetState.csv` response.
///
/// A frame is decoded once per poll and fully replaces the previous one;
/// nothing is mutated across polls.
///
/// ```
/// use proconip_lib::protocol::StateFrame;
///
/// let csv = "SYSINFO,1.7.6,30217075\n\
///            Pool,Redox,pH\n\
///            C,mV,pH\n\
///            0,0,0\n\
///            0.1,1,0.01\n\
///            245,650,735\n";
/// let frame = StateFrame::decode(csv)?;
/// assert_eq!(frame.sysinfo().firmware(), Some("1.7.6"));
/// assert_eq!(frame.readings()[0].value(), Some(24.5));
/// # Ok::<(), proconip_lib::protocol::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateFrame {
    sysinfo: SysInfo,
    readings: Vec<Reading>,
}

impl StateFrame {
    /// Parses the raw CSV payload into a frame.
    ///
    /// Tolerates CRLF line endings and blank lines (some firmware appends a
    /// trailing one). Fails with [`Error::MalformedFrame`] when fewer than
    /// six usable lines remain and with [`Error::ColumnCountMismatch`] when
    /// the five data rows disagree on their field count. Numeric problems in
    /// individual columns do not fail the frame; see [`Reading::is_valid`].
    pub fn decode(text: &str) -> Result<Self, Error> {
        let lines: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.len() < MIN_FRAME_LINES {
            return Err(Error::MalformedFrame {
                lines: lines.len(),
            });
        }

        let sysinfo = SysInfo::parse(lines[0]);
        let rows: Vec<Vec<&str>> = lines[1..MIN_FRAME_LINES]
            .iter()
            .map(|line| line.split(DELIMITER).collect())
            .collect();

        let expected = rows[0].len();
        for (offset, row) in rows.iter().enumerate().skip(1) {
            if row.len() != expected {
                return Err(Error::ColumnCountMismatch {
                    row: offset + 2,
                    expected,
                    found: row.len(),
                });
            }
        }

        let readings = (0..expected)
            .map(|col| {
                Reading::decode(
                    col,
                    rows[0][col],
                    rows[1][col],
                    rows[2][col],
                    rows[3][col],
                    rows[4][col],
                )
            })
            .collect();
        Ok(Self { sysinfo, readings })
    }

    pub fn sysinfo(&self) -> &SysInfo {
        &self.sysinfo
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn column_count(&self) -> usize {
        self.readings.len()
    }

    pub fn reading(&self, index: usize) -> Option<&Reading> {
        self.readings.get(index)
    }

    /// Size of the relay bank: 16 when any external relay column carries a
    /// real label, otherwise 8.
    pub fn relay_count(&self) -> usize {
        let has_external = EXTERNAL_RELAY_COLS
            .into_iter()
            .any(|col| self.readings.get(col).is_some_and(Reading::is_connected));
        if has_external {
            MAX_RELAY_COUNT
        } else {
            INTERNAL_RELAY_COUNT
        }
    }

    /// Extracts the relay bank snapshot from the relay columns' raw values.
    ///
    /// Missing or invalid relay columns decode as auto/off, the neutral
    /// pattern (older firmware may omit trailing columns).
    pub fn relays(&self) -> RelaySwitches {
        let states = (0..self.relay_count())
            .map(|index| {
                relay_column(index)
                    .and_then(|col| self.readings.get(col))
                    .filter(|reading| reading.is_valid())
                    .map(|reading| RelayState::from_raw(reading.raw()))
                    .unwrap_or_default()
            })
            .collect();
        RelaySwitches::from_states(states)
    }

    /// All emitted readings keyed by a stable identifier.
    ///
    /// The identifier is derived from the device-configured label and is
    /// rebuilt each poll; when two labels collapse to the same slug, later
    /// occurrences get the column index appended.
    pub fn keyed_readings(&self) -> Vec<(String, &Reading)> {
        let mut seen = std::collections::HashSet::new();
        let mut keyed = Vec::new();
        for reading in &self.readings {
            if reading.kind().is_none() {
                continue;
            }
            let mut key = reading.object_id();
            if !seen.insert(key.clone()) {
                key = format!("{key}_{}", reading.index());
                seen.insert(key.clone());
            }
            keyed.push((key, reading));
        }
        keyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const COLUMNS: usize = 42;

    /// A realistic 42-column frame: analog pressure, Redox/pH electrodes,
    /// two temperature probes, three wired internal relays, flow plus two
    /// digital inputs, one canister level and one consumption counter.
    fn sample_csv() -> String {
        let mut names = vec!["n.a."; COLUMNS];
        let mut units = vec!["--"; COLUMNS];
        let offsets = vec!["0"; COLUMNS];
        let mut factors = vec!["1"; COLUMNS];
        let mut raws = vec!["0"; COLUMNS];

        names[0] = "Zeit";
        units[0] = "h";
        raws[0] = "2333";
        names[3] = "Druck";
        units[3] = "Bar";
        factors[3] = "0.001";
        raws[3] = "1034";
        names[6] = "Redox";
        units[6] = "mV";
        raws[6] = "650";
        names[7] = "pH";
        units[7] = "pH";
        factors[7] = "0.01";
        raws[7] = "735";
        names[8] = "Pool";
        units[8] = "C";
        factors[8] = "0.1";
        raws[8] = "245";
        names[9] = "Aussen";
        units[9] = "C";
        factors[9] = "0.1";
        raws[9] = "182";
        names[16] = "FilterPumpe";
        raws[16] = "1"; // auto, schedule currently on
        names[17] = "Waermepumpe";
        raws[17] = "3"; // manual on
        names[18] = "Licht";
        raws[18] = "2"; // manual off
        names[24] = "Durchfluss";
        units[24] = "l/h";
        raws[24] = "150";
        names[25] = "TASTER2";
        raws[25] = "1";
        names[27] = "Poolabdeckung";
        raws[27] = "0";
        names[36] = "Chlor";
        units[36] = "%";
        raws[36] = "95";
        names[39] = "Chlor Verbrauch";
        units[39] = "ml";
        raws[39] = "125";

        format!(
            "SYSINFO,1.7.6,30217075\r\n{}\r\n{}\r\n{}\r\n{}\r\n{}\r\n\r\n",
            names.join(","),
            units.join(","),
            offsets.join(","),
            factors.join(","),
            raws.join(",")
        )
    }

    fn sample_frame() -> StateFrame {
        StateFrame::decode(&sample_csv()).expect("sample frame must decode")
    }

    #[test]
    fn decode_sample_frame() {
        let frame = sample_frame();
        assert_eq!(frame.column_count(), COLUMNS);
        assert_eq!(frame.sysinfo().firmware(), Some("1.7.6"));
        assert_eq!(frame.sysinfo().device_id(), Some("30217075"));

        let pool = frame.reading(8).unwrap();
        assert_eq!(pool.name(), "Pool");
        assert_eq!(pool.value(), Some(24.5));
        assert_eq!(pool.kind(), Some(EntityKind::Temperature));

        let ph = frame.reading(7).unwrap();
        assert_eq!(ph.value(), Some(7.35));
        assert_eq!(ph.kind(), Some(EntityKind::Ph));

        let pressure = frame.reading(3).unwrap();
        assert_eq!(pressure.value(), Some(1.034));
        assert_eq!(pressure.kind(), Some(EntityKind::Pressure));
    }

    #[test]
    fn sysinfo_is_parsed_leniently() {
        let frame = StateFrame::decode("SYSINFO\na\n--\n0\n1\n5\n").unwrap();
        assert_eq!(frame.sysinfo().firmware(), None);
        assert_eq!(frame.sysinfo().device_id(), None);
        assert_eq!(frame.column_count(), 1);
    }

    #[test]
    fn malformed_frame_produces_no_readings() {
        let err = StateFrame::decode("SYSINFO,1.7.6\nPool\nC\n0\n").unwrap_err();
        assert_eq!(err, Error::MalformedFrame { lines: 4 });

        assert_matches!(
            StateFrame::decode(""),
            Err(Error::MalformedFrame { lines: 0 })
        );
    }

    #[test]
    fn column_count_mismatch() {
        let err = StateFrame::decode("SYSINFO,1.7.6\nPool,Redox\nC,mV\n0,0\n0.1,1,9\n245,650\n")
            .unwrap_err();
        assert_eq!(
            err,
            Error::ColumnCountMismatch {
                row: 5,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn invalid_column_does_not_hide_the_rest() {
        let frame =
            StateFrame::decode("SYSINFO,1.7.6\nPool,Redox\nC,mV\n0,0\nabc,1\n245,650\n").unwrap();
        let broken = frame.reading(0).unwrap();
        assert!(!broken.is_valid());
        assert_eq!(broken.value(), None);
        assert_eq!(broken.kind(), None);

        let redox = frame.reading(1).unwrap();
        assert!(redox.is_valid());
        assert_eq!(redox.value(), Some(650.0));
        assert_eq!(redox.kind(), Some(EntityKind::Voltage));
    }

    #[test]
    fn raw_values_formatted_as_floats_decode() {
        let frame = StateFrame::decode("SYSINFO,1.7.6\nPool\nC\n0\n0.1\n124.0\n").unwrap();
        assert_eq!(frame.reading(0).unwrap().raw(), 124);
        assert_eq!(frame.reading(0).unwrap().value(), Some(12.4));
    }

    #[test]
    fn value_arithmetic_is_exact_for_display_digits() {
        let reading = Reading::decode(0, "Pool", "°C", "0", "0.1", "235");
        assert_eq!(reading.value(), Some(23.5));

        let reading = Reading::decode(0, "Becken", "C", "-1.5", "0.1", "245");
        assert_eq!(reading.value(), Some(23.0));
    }

    #[test]
    fn not_available_columns_emit_no_entity_but_keep_their_slot() {
        let frame = sample_frame();
        let spare = frame.reading(4).unwrap();
        assert!(spare.is_valid());
        assert_eq!(spare.kind(), None);

        // The columns after the gap still align.
        assert_eq!(frame.reading(6).unwrap().name(), "Redox");
        assert!(frame
            .keyed_readings()
            .iter()
            .all(|(_, reading)| reading.is_connected()));
    }

    #[test]
    fn classification_precedence() {
        // Known units, including already-normalised spellings.
        for (unit, kind) in [
            ("C", EntityKind::Temperature),
            ("°C", EntityKind::Temperature),
            ("Bar", EntityKind::Pressure),
            ("mV", EntityKind::Voltage),
            ("pH", EntityKind::Ph),
            ("%", EntityKind::Percentage),
            ("l/h", EntityKind::Flow),
            ("ml", EntityKind::Volume),
            ("h", EntityKind::OperatingHours),
        ] {
            let reading = Reading::decode(1, "Kanal", unit, "0", "1", "1");
            assert_eq!(reading.kind(), Some(kind), "unit {unit:?}");
        }

        // Relay bank columns are relay metadata, internal and external.
        let relay = Reading::decode(16, "FilterPumpe", "--", "0", "1", "1");
        assert_eq!(relay.kind(), Some(EntityKind::Relay));
        let relay = Reading::decode(35, "Ext8", "--", "0", "1", "0");
        assert_eq!(relay.kind(), Some(EntityKind::Relay));

        // Dimensionless digital inputs.
        let taster = Reading::decode(25, "TASTER2", "--", "0", "1", "1");
        assert_eq!(taster.kind(), Some(EntityKind::Digital));
        assert_eq!(taster.is_on(), Some(true));

        // A pH channel without unit string still classifies as pH.
        let ph = Reading::decode(7, "pH", "--", "0", "0.01", "702");
        assert_eq!(ph.kind(), Some(EntityKind::Ph));

        // Unknown units fall through to dimensionless, never an error.
        let exotic = Reading::decode(1, "Salz", "ppm", "0", "1", "3200");
        assert_eq!(exotic.kind(), Some(EntityKind::Dimensionless));
    }

    #[test]
    fn display_metadata() {
        assert_eq!(EntityKind::Temperature.display_unit(), Some("°C"));
        assert_eq!(EntityKind::Temperature.display_precision(), 1);
        assert_eq!(EntityKind::Pressure.display_precision(), 3);
        assert_eq!(EntityKind::Ph.display_precision(), 2);
        assert_eq!(EntityKind::Flow.display_unit(), Some("L/h"));
        assert_eq!(EntityKind::Volume.display_unit(), Some("mL"));
        assert_eq!(EntityKind::Digital.display_unit(), None);
    }

    #[test]
    fn keyed_readings_disambiguate_label_collisions() {
        let frame = StateFrame::decode(
            "SYSINFO,1.7.6\nPool,Pool,pH- Dosierung\nC,C,%\n0,0,0\n0.1,0.1,1\n245,182,95\n",
        )
        .unwrap();
        let keys: Vec<String> = frame
            .keyed_readings()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["pool", "pool_1", "ph_dosierung"]);
    }

    #[test]
    fn relay_column_mapping_round_trips() {
        assert_eq!(relay_column(0), Some(16));
        assert_eq!(relay_column(7), Some(23));
        assert_eq!(relay_column(8), Some(28));
        assert_eq!(relay_column(15), Some(35));
        assert_eq!(relay_column(16), None);

        for index in 0..MAX_RELAY_COUNT {
            let col = relay_column(index).unwrap();
            assert_eq!(relay_index(col), Some(index));
        }
        assert_eq!(relay_index(15), None);
        assert_eq!(relay_index(24), None);
        assert_eq!(relay_index(36), None);
    }

    #[test]
    fn relay_state_from_raw() {
        assert_eq!(RelayState::from_raw(0).mode(), RelayMode::Auto);
        assert_eq!(RelayState::from_raw(1).mode(), RelayMode::Auto);
        assert!(RelayState::from_raw(1).on);
        assert_eq!(RelayState::from_raw(2).mode(), RelayMode::Off);
        assert_eq!(RelayState::from_raw(3).mode(), RelayMode::On);
    }

    #[test]
    fn relay_mode_parse_and_display() {
        assert_eq!("auto".parse::<RelayMode>().unwrap(), RelayMode::Auto);
        assert_eq!("ON".parse::<RelayMode>().unwrap(), RelayMode::On);
        assert_eq!("Off".parse::<RelayMode>().unwrap(), RelayMode::Off);
        assert_matches!(
            "standby".parse::<RelayMode>(),
            Err(Error::InvalidRelayMode(..))
        );
        assert_eq!(RelayMode::Auto.to_string(), "auto");
    }

    #[test]
    fn switches_round_trip_all_internal_patterns() {
        // Exhaustive for the 8-relay bank: every manual/on combination.
        for manual_bits in 0..=255u16 {
            for on_bits in 0..=255u16 {
                let switches = RelaySwitches::decode(manual_bits, on_bits, 8);
                assert_eq!(switches.encode(), (manual_bits, on_bits));
            }
        }
    }

    #[test]
    fn switches_round_trip_external_patterns() {
        // Deterministic sweep through 16-bit patterns.
        for seed in 0..=u16::MAX {
            let manual_bits = seed.rotate_left(3) ^ 0xA5A5;
            let on_bits = seed;
            let switches = RelaySwitches::decode(manual_bits, on_bits, 16);
            assert_eq!(switches.len(), 16);
            assert_eq!(switches.encode(), (manual_bits, on_bits));
        }
    }

    #[test]
    fn with_mode_changes_exactly_one_relay() {
        for count in [8usize, 16] {
            for seed in [0u16, 0xFFFF, 0x00FF, 0xA5A5, 0x5A5A, 0x1234] {
                let initial = RelaySwitches::decode(seed.rotate_left(5) ^ 0x3C3C, seed, count);
                for target in 0..count {
                    for mode in [RelayMode::Auto, RelayMode::On, RelayMode::Off] {
                        let updated = initial.with_mode(target, mode).unwrap();
                        assert_eq!(updated.get(target).unwrap().mode(), mode);
                        for other in (0..count).filter(|&i| i != target) {
                            assert_eq!(
                                updated.get(other).unwrap(),
                                initial.get(other).unwrap(),
                                "relay {other} disturbed by command for {target}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn with_mode_writes_the_documented_auto_pattern() {
        let bank = RelaySwitches::decode(0b111, 0b101, 8);
        let updated = bank.with_mode(0, RelayMode::Auto).unwrap();
        let state = updated.get(0).unwrap();
        assert!(!state.manual);
        assert!(!state.on);
        assert_eq!(updated.encode(), (0b110, 0b100));
    }

    #[test]
    fn switching_one_relay_in_an_all_auto_bank() {
        let bank = RelaySwitches::decode(0, 0, 8);
        let updated = bank.with_mode(2, RelayMode::On).unwrap();
        assert_eq!(updated.get(2).unwrap().mode(), RelayMode::On);
        for other in (0..8).filter(|&i| i != 2) {
            assert_eq!(updated.get(other).unwrap().mode(), RelayMode::Auto);
        }
        assert_eq!(updated.encode(), (0b100, 0b100));
        assert_eq!(updated.ena_parameter(), "4,4");
    }

    #[test]
    fn relay_index_out_of_range() {
        let bank = RelaySwitches::decode(0, 0, 8);
        assert_matches!(
            bank.with_mode(8, RelayMode::On),
            Err(Error::RelayIndexOutOfRange { index: 8, count: 8 })
        );
        assert_matches!(
            bank.get(20),
            Err(Error::RelayIndexOutOfRange {
                index: 20,
                count: 8
            })
        );
    }

    #[test]
    fn frame_relay_extraction() {
        let frame = sample_frame();
        assert_eq!(frame.relay_count(), 8);

        let switches = frame.relays();
        assert_eq!(switches.len(), 8);
        let filter_pump = switches.get(0).unwrap();
        assert_eq!(filter_pump.mode(), RelayMode::Auto);
        assert!(filter_pump.on);
        assert_eq!(switches.get(1).unwrap().mode(), RelayMode::On);
        assert_eq!(switches.get(2).unwrap().mode(), RelayMode::Off);
        for index in 3..8 {
            assert_eq!(switches.get(index).unwrap().mode(), RelayMode::Auto);
        }
    }

    #[test]
    fn external_relay_bank_widens_the_snapshot() {
        let csv = sample_csv();
        // Wire up the first external relay column (col 28) with a label.
        let mut lines: Vec<String> = csv.lines().map(str::to_string).collect();
        let mut names: Vec<&str> = lines[1].split(',').collect();
        names[28] = "Gartenlicht";
        lines[1] = names.join(",");
        let mut raws: Vec<&str> = lines[5].split(',').collect();
        raws[28] = "3";
        lines[5] = raws.join(",");

        let frame = StateFrame::decode(&lines.join("\n")).unwrap();
        assert_eq!(frame.relay_count(), 16);
        let switches = frame.relays();
        assert_eq!(switches.len(), 16);
        assert_eq!(switches.get(8).unwrap().mode(), RelayMode::On);
    }

    #[test]
    fn end_to_end_command_against_sample_frame() {
        let frame = sample_frame();
        // Force the light (relay 2, currently manual off) back to auto.
        let switches = frame.relays().with_mode(2, RelayMode::Auto).unwrap();
        let (manual_bits, on_bits) = switches.encode();

        let reread = RelaySwitches::decode(manual_bits, on_bits, frame.relay_count());
        assert_eq!(reread, switches);
        assert_eq!(reread.get(2).unwrap().mode(), RelayMode::Auto);
        // The heat pump's manual-on state survived the rewrite.
        assert_eq!(reread.get(1).unwrap().mode(), RelayMode::On);
        // And the filter pump is still auto with the schedule output on.
        assert!(reread.get(0).unwrap().on);
        assert_eq!(reread.get(0).unwrap().mode(), RelayMode::Auto);
    }
}
