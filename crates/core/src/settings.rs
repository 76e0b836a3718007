//! Value types for device settings.
//!
//! Everything here is a plain data type: conversions between user-facing
//! units (DPI, Hz, 1-10 scales) and the raw bytes the register file stores,
//! plus the cached snapshot the session keeps of what it believes the
//! device state to be.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::safety::DPI_STEP;

/// USB polling rates supported by the mouse.
///
/// The register file stores the report interval in milliseconds, not the
/// frequency, hence the divider conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum PollingRate {
    Hz125 = 125,
    Hz250 = 250,
    Hz500 = 500,
    Hz1000 = 1000,
}

impl PollingRate {
    pub const ALL: [PollingRate; 4] = [
        PollingRate::Hz125,
        PollingRate::Hz250,
        PollingRate::Hz500,
        PollingRate::Hz1000,
    ];

    pub fn from_hz(hz: u16) -> Option<Self> {
        match hz {
            125 => Some(PollingRate::Hz125),
            250 => Some(PollingRate::Hz250),
            500 => Some(PollingRate::Hz500),
            1000 => Some(PollingRate::Hz1000),
            _ => None,
        }
    }

    pub fn as_hz(&self) -> u16 {
        *self as u16
    }

    /// Report interval in milliseconds as stored in the register file.
    pub fn divider(&self) -> u8 {
        match self {
            PollingRate::Hz125 => 8,
            PollingRate::Hz250 => 4,
            PollingRate::Hz500 => 2,
            PollingRate::Hz1000 => 1,
        }
    }

    pub fn from_divider(divider: u8) -> Option<Self> {
        match divider {
            8 => Some(PollingRate::Hz125),
            4 => Some(PollingRate::Hz250),
            2 => Some(PollingRate::Hz500),
            1 => Some(PollingRate::Hz1000),
            _ => None,
        }
    }
}

impl fmt::Display for PollingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.as_hz())
    }
}

/// Sensor-correction toggles, one bit each in the toggles register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    RippleControl,
    AngleSnap,
    MotionSync,
}

impl Toggle {
    pub const ALL: [Toggle; 3] = [Toggle::RippleControl, Toggle::AngleSnap, Toggle::MotionSync];

    pub fn bit(&self) -> u8 {
        match self {
            Toggle::RippleControl => 0x01,
            Toggle::AngleSnap => 0x02,
            Toggle::MotionSync => 0x04,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Toggle::RippleControl => "ripple control",
            Toggle::AngleSnap => "angle snap",
            Toggle::MotionSync => "motion sync",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace(['-', '_'], " ").as_str() {
            "ripple" | "ripple control" => Some(Toggle::RippleControl),
            "snap" | "angle snap" => Some(Toggle::AngleSnap),
            "sync" | "motion sync" => Some(Toggle::MotionSync),
            _ => None,
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lighting effect selector, stored verbatim in the LED config block.
///
/// Only mode 2 (steady color) honors the RGB fields; the other effects cycle
/// through fixed palettes on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedMode(u8);

impl LedMode {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    /// The steady-color effect, the only one that uses the RGB fields.
    pub const CUSTOM_COLOR: LedMode = LedMode(2);

    pub fn new(mode: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&mode).then_some(LedMode(mode))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn has_custom_color(&self) -> bool {
        *self == Self::CUSTOM_COLOR
    }
}

impl fmt::Display for LedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", self.0)
    }
}

/// An RGB color for the steady-color LED effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `RRGGBB` hex string (leading `#` allowed).
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Convert a DPI value to the raw sensor byte (DPI divided by the step).
/// Callers must validate the DPI first; see [`crate::safety::validate_dpi`].
pub fn dpi_to_raw(dpi: u32) -> u8 {
    (dpi / DPI_STEP) as u8
}

/// Convert a raw sensor byte back to DPI.
pub fn raw_to_dpi(raw: u8) -> u32 {
    raw as u32 * DPI_STEP
}

/// The full LED configuration block in user units (levels 1-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedSettings {
    pub mode: LedMode,
    pub color: Rgb,
    /// Effect speed, 1 (slowest) to 10 (fastest).
    pub speed: u8,
    /// Brightness, 1 (dimmest) to 10 (brightest).
    pub brightness: u8,
}

/// The session's cached picture of the device configuration.
///
/// Every field is optional: `None` means "not read yet or no longer
/// trusted". Fields fall back to `None` whenever a write's outcome is
/// uncertain, and are refilled by the next successful read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSettings {
    pub dpi: Option<u32>,
    pub dpi_level: Option<u8>,
    pub polling_rate: Option<PollingRate>,
    pub ripple_control: Option<bool>,
    pub angle_snap: Option<bool>,
    pub motion_sync: Option<bool>,
    pub led: Option<LedSettings>,
    /// Whether button 4 fires the macro slot instead of the stock Back action.
    pub button4_macro: Option<bool>,
    /// Keyboard-macro trigger table; 0 means the slot is unbound.
    pub macro_triggers: Option<[u8; 4]>,
}

/// Battery charge level as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatteryLevel {
    Percent(u8),
    Charging,
    Unknown,
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatteryLevel::Percent(p) => write!(f, "{p}%"),
            BatteryLevel::Charging => f.write_str("charging"),
            BatteryLevel::Unknown => f.write_str("unknown"),
        }
    }
}

/// Whether the mouse is answering queries or has powered its radio down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SleepState {
    Awake,
    Asleep,
    Unknown,
}

impl fmt::Display for SleepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepState::Awake => f.write_str("awake"),
            SleepState::Asleep => f.write_str("asleep"),
            SleepState::Unknown => f.write_str("unknown"),
        }
    }
}

/// One battery-monitor observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryStatus {
    pub level: BatteryLevel,
    pub sleep: SleepState,
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.level, self.sleep)
    }
}

/// Raw fields of one successful battery query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReport {
    pub percent: u8,
    pub charging: bool,
}

/// Summary of a macro slot as read back from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroInfo {
    pub name: String,
    pub events: u8,
    /// Whether the stored data checksum matches the stored events. False
    /// indicates an interrupted write.
    pub checksum_ok: bool,
}
