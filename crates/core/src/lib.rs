//! open-ragnok-core: vendor protocol, device discovery, and mouse
//! configuration for Ragnok 2 gaming mice.
//!
//! This crate provides the cross-platform core logic for talking to the
//! mouse's settings flash over its reverse-engineered 17-byte HID report
//! protocol.

pub mod error;
#[cfg(test)]
mod integration_tests;
pub mod keymap;
pub mod led;
pub mod macros;
pub mod monitor;
pub mod protocol;
pub mod safety;
pub mod session;
pub mod settings;
pub mod transport;

/// USB Vendor ID shared by Ragnok devices (SinoWealth OEM controller).
pub const RAGNOK_VID: u16 = 0x258A;

/// Known Ragnok 2 product IDs.
pub mod pids {
    /// Ragnok 2 wireless receiver dongle.
    pub const RAGNOK2_RECEIVER: u16 = 0x2011;
    /// Ragnok 2 in wired (charging cable) mode.
    pub const RAGNOK2_WIRED: u16 = 0x2012;
}
