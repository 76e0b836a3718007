//! LED config block packing.
//!
//! The block at [`regs::LED_CONFIG`](crate::protocol::regs::LED_CONFIG) is
//! `[mode, r, g, b, speed, brightness]`. Speed and brightness are stored
//! zero-based (0-9) but presented to users one-based (1-10). Writing the
//! block stages the change; the device only restyles the LEDs once 0x01 is
//! written to the apply register.

use crate::error::{Error, Result};
use crate::settings::{LedMode, LedSettings, Rgb};

/// Bytes of the config block that carry settings.
pub const BLOCK_WRITE_LEN: usize = 6;
/// Read-back length; bytes past the config are scratch and ignored.
pub const BLOCK_READ_LEN: usize = 10;
/// Value written to the apply register to commit a staged config.
pub const APPLY_VALUE: u8 = 0x01;

/// Pack a config into its stored form.
///
/// Levels must already be on the 1-10 user scale; see
/// [`crate::safety::validate_led_level`].
pub fn pack(led: &LedSettings) -> [u8; BLOCK_WRITE_LEN] {
    [
        led.mode.get(),
        led.color.r,
        led.color.g,
        led.color.b,
        led.speed.saturating_sub(1),
        led.brightness.saturating_sub(1),
    ]
}

/// Unpack a read-back config block.
///
/// A mode byte outside 1-5 means the block is not what this driver wrote
/// and the whole read is rejected. Off-scale level bytes are clamped; some
/// firmware revisions leave them at 0x0F after a factory reset.
pub fn unpack(raw: &[u8]) -> Result<LedSettings> {
    if raw.len() < BLOCK_WRITE_LEN {
        return Err(Error::UnexpectedResponse {
            what: "LED config block too short",
            raw: raw.len() as u8,
        });
    }
    let mode = LedMode::new(raw[0]).ok_or(Error::UnexpectedResponse {
        what: "LED mode byte",
        raw: raw[0],
    })?;
    Ok(LedSettings {
        mode,
        color: Rgb::new(raw[1], raw[2], raw[3]),
        speed: raw[4].min(9) + 1,
        brightness: raw[5].min(9) + 1,
    })
}
