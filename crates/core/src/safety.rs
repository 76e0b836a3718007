//! Safety layer: validates all write parameters and target registers against
//! known-safe ranges before sending to the device.
//!
//! This prevents bricking the mouse by rejecting values the hardware was
//! never observed to accept. Nothing in this module performs I/O.
//!
//! # Ragnok 2 Safety Bounds
//!
//! The vendor publishes no documentation. The ranges below are the limits
//! the vendor configurator enforces in its own UI, cross-checked against
//! captured traffic.
//!
//! ## DPI
//! - **Range**: 100 – 25,500 DPI
//! - **Step size**: 100 DPI increments (a level slot stores DPI / 100 in a
//!   single byte, which is also where the 25,500 ceiling comes from)
//! - **Default**: 800 DPI (factory setting)
//! - **Note**: values that are not a multiple of 100 are rejected, not
//!   rounded. The register cannot represent them, and silently changing the
//!   pointer speed behind the caller's back is worse than failing loudly.
//!
//! ## Polling Rate
//! - **Supported values**: 125 Hz, 250 Hz, 500 Hz, 1000 Hz
//! - **Default**: 1000 Hz (1ms report interval)
//! - **Encoding**: the register stores the report interval in ms (8, 4, 2, 1)
//!
//! ## LED
//! - **Modes**: 1–5; only mode 2 (steady color) honors the RGB fields
//! - **Speed / brightness**: 1–10 user scale, stored as 0–9
//!
//! ## Flash Writes
//! - Every write-flash frame must land entirely inside a whitelisted
//!   register region. The settings flash also holds calibration and pairing
//!   data at offsets this driver must never touch.
//!
//! ## Safety Invariants
//! 1. DPI values are bounds-checked against [100, 25500] and must align to 100
//! 2. Only known polling rate enum values are accepted (no raw divider pass-through)
//! 3. Write-flash target regions are whitelisted; anything else is rejected
//! 4. All validation happens BEFORE any HID communication — no invalid data
//!    ever reaches the device

use crate::error::{Error, Result};
use crate::protocol::regs;
use crate::settings::{LedMode, PollingRate};

/// Bricking risk disclaimer — include in any user-facing output about device writes.
pub const BRICKING_DISCLAIMER: &str = "\
WARNING: This software writes directly to your mouse's settings flash over a \
reverse-engineered vendor protocol. While all writes are bounds-checked and \
restricted to known configuration registers, incorrect usage or software bugs \
could theoretically render the device unresponsive. Firmware and pairing \
operations are intentionally not supported due to higher risk. \
Use at your own risk.";

/// Settings-flash regions that write-flash frames are allowed to target.
///
/// Any write that does not fall entirely inside one of these `(start, len)`
/// spans is rejected before reaching the device. Captured traffic shows the
/// vendor configurator itself never writes outside them.
const WRITABLE_REGIONS: &[(u16, u16)] = &[
    (regs::POLLING_DIVIDER, 1),
    (regs::DPI_LEVEL_SELECT, 1),
    (regs::TOGGLES, 1),
    // Five 3-byte DPI level slots at stride 4.
    (regs::DPI_LEVEL_BASE, 0x13),
    (regs::BUTTON4_BINDING, 1),
    (regs::MACRO_TRIGGERS, regs::MACRO_SLOT_COUNT as u16),
    (regs::LED_CONFIG, 6),
    (regs::LED_APPLY, 1),
    (regs::MACRO_BUTTON4, crate::macros::SLOT_CAPACITY as u16),
    (regs::MACRO_KEYBOARD_BASE, crate::macros::SLOT_CAPACITY as u16),
    (
        regs::MACRO_KEYBOARD_BASE + regs::MACRO_SLOT_STRIDE,
        crate::macros::SLOT_CAPACITY as u16,
    ),
    (
        regs::MACRO_KEYBOARD_BASE + 2 * regs::MACRO_SLOT_STRIDE,
        crate::macros::SLOT_CAPACITY as u16,
    ),
    (
        regs::MACRO_KEYBOARD_BASE + 3 * regs::MACRO_SLOT_STRIDE,
        crate::macros::SLOT_CAPACITY as u16,
    ),
];

/// Validate that a write of `len` bytes at `addr` stays inside a
/// whitelisted register region.
pub fn validate_write_region(addr: u16, len: usize) -> Result<()> {
    let end = addr as u32 + len as u32;
    for (start, region_len) in WRITABLE_REGIONS {
        if addr >= *start && end <= *start as u32 + *region_len as u32 {
            return Ok(());
        }
    }
    Err(Error::OutOfRange {
        field: "flash write region",
        value: addr as u32,
        min: 0,
        max: 0xFFFF,
    })
}

/// Ragnok 2 DPI constraints.
pub const DPI_MIN: u32 = 100;
pub const DPI_MAX: u32 = 25500;
pub const DPI_STEP: u32 = 100;

/// Validate a DPI value is within safe bounds and aligned to step size.
pub fn validate_dpi(dpi: u32) -> Result<u32> {
    if !(DPI_MIN..=DPI_MAX).contains(&dpi) {
        return Err(Error::OutOfRange {
            field: "dpi",
            value: dpi,
            min: DPI_MIN,
            max: DPI_MAX,
        });
    }
    if dpi % DPI_STEP != 0 {
        return Err(Error::Misaligned {
            field: "dpi",
            value: dpi,
            step: DPI_STEP,
        });
    }
    Ok(dpi)
}

/// Validate a DPI level index (0-based).
pub fn validate_dpi_level(level: u8) -> Result<()> {
    if level >= regs::DPI_LEVEL_COUNT {
        return Err(Error::OutOfRange {
            field: "dpi_level",
            value: level as u32,
            min: 0,
            max: (regs::DPI_LEVEL_COUNT - 1) as u32,
        });
    }
    Ok(())
}

/// Validate a polling rate value.
pub fn validate_polling_rate(hz: u16) -> Result<PollingRate> {
    PollingRate::from_hz(hz).ok_or(Error::OutOfRange {
        field: "polling_rate",
        value: hz as u32,
        min: 125,
        max: 1000,
    })
}

/// Validate an LED effect mode number.
pub fn validate_led_mode(mode: u8) -> Result<LedMode> {
    LedMode::new(mode).ok_or(Error::OutOfRange {
        field: "led_mode",
        value: mode as u32,
        min: LedMode::MIN as u32,
        max: LedMode::MAX as u32,
    })
}

/// LED speed and brightness user-scale bounds.
pub const LED_LEVEL_MIN: u8 = 1;
pub const LED_LEVEL_MAX: u8 = 10;

/// Validate an LED speed or brightness level on the 1-10 user scale.
pub fn validate_led_level(field: &'static str, level: u8) -> Result<()> {
    if !(LED_LEVEL_MIN..=LED_LEVEL_MAX).contains(&level) {
        return Err(Error::OutOfRange {
            field,
            value: level as u32,
            min: LED_LEVEL_MIN as u32,
            max: LED_LEVEL_MAX as u32,
        });
    }
    Ok(())
}
