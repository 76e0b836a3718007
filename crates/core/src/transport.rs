//! HID transport abstraction and device discovery.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::REPORT_LEN;
use crate::{pids, RAGNOK_VID};
use tracing::{debug, info, warn};

/// Abstraction over raw HID report I/O.
///
/// Implementations take and return bare 17-byte protocol frames; any
/// report-id plumbing the OS needs is theirs to handle. Reads may hand back
/// more than one report's worth of bytes — callers scan for a valid frame.
pub trait ReportTransport: Send {
    /// Transmit one frame to the device.
    fn write_report(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next inbound report.
    fn read_report(&mut self, timeout: Duration) -> Result<Vec<u8>>;
}

/// Supported Ragnok mouse models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseModel {
    /// Ragnok 2 behind its 2.4 GHz receiver dongle.
    Ragnok2Wireless,
    /// Ragnok 2 on the charging cable.
    Ragnok2Wired,
}

impl MouseModel {
    /// Look up model from USB product ID.
    pub fn from_pid(pid: u16) -> Option<Self> {
        match pid {
            pids::RAGNOK2_RECEIVER => Some(Self::Ragnok2Wireless),
            pids::RAGNOK2_WIRED => Some(Self::Ragnok2Wired),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ragnok2Wireless => "Ragnok 2 (wireless receiver)",
            Self::Ragnok2Wired => "Ragnok 2 (wired)",
        }
    }

    /// USB Product ID.
    pub fn pid(&self) -> u16 {
        match self {
            Self::Ragnok2Wireless => pids::RAGNOK2_RECEIVER,
            Self::Ragnok2Wired => pids::RAGNOK2_WIRED,
        }
    }
}

/// Information about a discovered Ragnok HID interface.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub model: MouseModel,
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub serial: Option<String>,
    pub usage_page: u16,
}

/// Discover all connected Ragnok mice.
///
/// Enumerates USB HID devices and returns info for any recognized models.
/// The mouse exposes several HID interfaces; only the vendor one answers
/// configuration frames, so candidates are ordered vendor-page first and
/// callers probe down the list.
pub fn discover_devices() -> Result<Vec<DeviceInfo>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::Io(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        if info.vendor_id() != RAGNOK_VID {
            continue;
        }

        if let Some(model) = MouseModel::from_pid(info.product_id()) {
            info!(
                model = model.name(),
                vid = format_args!("0x{:04X}", info.vendor_id()),
                pid = format_args!("0x{:04X}", info.product_id()),
                usage_page = format_args!("0x{:04X}", info.usage_page()),
                path = %info.path().to_string_lossy(),
                "Found Ragnok device"
            );
            devices.push(DeviceInfo {
                model,
                vid: info.vendor_id(),
                pid: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(|s| s.to_string()),
                usage_page: info.usage_page(),
            });
        }
    }

    devices.sort_by_key(|d| if d.usage_page >= 0xFF00 { 0u8 } else { 1 });
    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

fn map_hid_error(e: hidapi::HidError) -> Error {
    let msg = e.to_string();
    if msg.to_lowercase().contains("permission") {
        Error::PermissionDenied(msg)
    } else {
        Error::Io(msg)
    }
}

/// Transport over a real HID device via hidapi.
pub struct HidTransport {
    device: hidapi::HidDevice,
}

impl HidTransport {
    /// Open the HID interface described by `info`.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Io(e.to_string()))?;
        let path = std::ffi::CString::new(info.path.as_bytes())
            .map_err(|_| Error::DeviceNotFound(format!("bad device path {:?}", info.path)))?;
        let device = api.open_path(&path).map_err(map_hid_error)?;
        debug!(path = %info.path, model = info.model.name(), "Opened HID device");
        Ok(Self { device })
    }
}

impl ReportTransport for HidTransport {
    fn write_report(&mut self, frame: &[u8]) -> Result<()> {
        // Unnumbered reports: hidapi wants a leading 0x00 report id.
        let mut buf = Vec::with_capacity(frame.len() + 1);
        buf.push(0x00);
        buf.extend_from_slice(frame);
        let written = self.device.write(&buf).map_err(map_hid_error)?;
        if written != buf.len() {
            warn!(written, expected = buf.len(), "Short HID write");
            return Err(Error::Io(format!(
                "short write: {written} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }

    fn read_report(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let mut buf = [0u8; 64];
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let n = self
            .device
            .read_timeout(&mut buf, ms)
            .map_err(map_hid_error)?;
        if n == 0 {
            return Err(Error::Timeout(format!(
                "no report within {}ms",
                timeout.as_millis()
            )));
        }
        Ok(buf[..n].to_vec())
    }
}
