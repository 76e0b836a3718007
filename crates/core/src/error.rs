//! Error types for open-ragnok-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No supported device found during enumeration or probing.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Insufficient rights on the HID node (missing udev rule).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Transport-level I/O failure (short write, broken pipe, unplug).
    #[error("HID I/O error: {0}")]
    Io(String),

    /// No acknowledgement arrived within the round-trip deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Frame checksum did not match its payload.
    #[error("checksum mismatch: stored 0x{stored:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch { stored: u8, computed: u8 },

    /// Response violated a protocol assumption.
    #[error("unexpected response: {what} (raw 0x{raw:02X})")]
    UnexpectedResponse { what: &'static str, raw: u8 },

    /// Value outside the device-supported range.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Value inside the range but not aligned to the device step size.
    #[error("{field} = {value} is not a multiple of {step}")]
    Misaligned {
        field: &'static str,
        value: u32,
        step: u32,
    },

    /// Macro exceeds the device slot capacity.
    #[error("macro too long: {events} events (slot capacity {capacity})")]
    MacroTooLong { events: usize, capacity: usize },

    /// Every keyboard macro slot is already bound to another trigger.
    #[error("no free keyboard macro slot (all {total} in use)")]
    SlotsFull { total: usize },

    /// Character with no HID usage mapping.
    #[error("unsupported key in macro: {0:?}")]
    UnsupportedKey(char),

    /// Device stopped answering; retries exhausted.
    #[error("device unresponsive after {attempts} attempts")]
    DeviceUnresponsive { attempts: u32 },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
