//! Device session: connection lifecycle, retries, and every configuration
//! operation the driver offers.
//!
//! A [`Session`] owns its transport and a cached [`DeviceSettings`]
//! snapshot. All traffic funnels through one request/response exchange that
//! classifies failures: timeouts are retried a bounded number of times,
//! I/O failures tear the connection down, and protocol surprises surface to
//! the caller with the link intact. Whenever a write's outcome is uncertain
//! the affected snapshot fields are reconciled by read-back or dropped to
//! "unknown" rather than left guessing.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::led;
use crate::macros::{self, MacroDefinition};
use crate::protocol::{self, cmd, regs, CommandFrame, Response};
use crate::safety;
use crate::settings::{
    self, BatteryReport, DeviceSettings, LedSettings, MacroInfo, PollingRate, Rgb, Toggle,
};
use crate::transport::{discover_devices, HidTransport, ReportTransport};

/// Retries after a timed-out exchange, so three attempts in total.
pub const TIMEOUT_RETRIES: u32 = 2;
/// Default wait for the response to any single command.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Shorter wait used while probing candidate interfaces at connect time.
const PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// Connection lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport; every operation fails fast.
    Disconnected,
    /// Probing candidate interfaces.
    Connecting,
    /// Idle with a live transport.
    Ready,
    /// An exchange is in flight.
    Busy,
}

/// Classification of communication errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry (timeout).
    Transient,
    /// The link itself is gone or unusable; the session must drop it.
    Fatal,
    /// The device answered, but not with what the protocol promises.
    Protocol,
    /// The caller's value was rejected before any I/O happened.
    Caller,
}

impl ErrorClass {
    /// Classify an error for retry and teardown decisions.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Timeout(_) => Self::Transient,
            Error::Io(_) | Error::DeviceNotFound(_) | Error::PermissionDenied(_) => Self::Fatal,
            Error::ChecksumMismatch { .. }
            | Error::UnexpectedResponse { .. }
            | Error::DeviceUnresponsive { .. } => Self::Protocol,
            Error::OutOfRange { .. }
            | Error::Misaligned { .. }
            | Error::MacroTooLong { .. }
            | Error::SlotsFull { .. }
            | Error::UnsupportedKey(_) => Self::Caller,
        }
    }

    /// Whether this error class is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// An exclusive connection to one mouse.
pub struct Session {
    transport: Option<Box<dyn ReportTransport>>,
    state: SessionState,
    read_timeout: Duration,
    snapshot: DeviceSettings,
}

impl Session {
    /// Discover attached mice and open a session on the first interface
    /// that answers a battery probe.
    pub fn connect() -> Result<Self> {
        let candidates = discover_devices()?;
        if candidates.is_empty() {
            return Err(Error::DeviceNotFound("no Ragnok mouse attached".to_string()));
        }

        let mut last_error = None;
        for info in &candidates {
            let transport = match HidTransport::open(info) {
                Ok(t) => t,
                Err(e) => {
                    debug!(path = %info.path, error = %e, "Could not open interface");
                    last_error = Some(e);
                    continue;
                }
            };
            match Self::with_transport(Box::new(transport)) {
                Ok(session) => {
                    info!(model = info.model.name(), "Connected");
                    return Ok(session);
                }
                Err(e) => {
                    debug!(path = %info.path, error = %e, "Interface did not answer probe");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| Error::DeviceNotFound("no Ragnok interface answered".to_string())))
    }

    /// Open a session over an already-built transport.
    ///
    /// Probes with a battery query, then hydrates the settings snapshot.
    pub fn with_transport(transport: Box<dyn ReportTransport>) -> Result<Self> {
        let mut session = Self {
            transport: Some(transport),
            state: SessionState::Connecting,
            read_timeout: READ_TIMEOUT,
            snapshot: DeviceSettings::default(),
        };
        session.probe()?;
        session.state = SessionState::Ready;
        session.refresh_settings()?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// The cached settings snapshot. `None` fields have not been read yet,
    /// or their last write ended in uncertainty.
    pub fn settings(&self) -> &DeviceSettings {
        &self.snapshot
    }

    /// Override the per-command response deadline.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Drop the transport and forget everything cached about the device.
    pub fn disconnect(&mut self) {
        if self.transport.is_some() {
            info!("Session disconnected");
        }
        self.drop_transport();
    }

    fn drop_transport(&mut self) {
        self.transport = None;
        self.state = SessionState::Disconnected;
        self.snapshot = DeviceSettings::default();
    }

    /// One quick battery exchange to confirm the interface speaks the
    /// vendor protocol.
    fn probe(&mut self) -> Result<BatteryReport> {
        let frame = protocol::read_battery();
        let resp = self.exchange_once(&frame, PROBE_TIMEOUT)?;
        let (percent, charging) = resp.battery();
        debug!(percent, charging, "Probe answered");
        Ok(BatteryReport { percent, charging })
    }

    /// Send one frame and return its acknowledging response, managing
    /// session state around the exchange.
    fn transact(&mut self, frame: &CommandFrame) -> Result<Response> {
        if !matches!(self.state, SessionState::Ready | SessionState::Busy) {
            return Err(Error::DeviceNotFound("no active device session".to_string()));
        }
        self.state = SessionState::Busy;
        let result = self.exchange_with_retry(frame);
        match &result {
            Err(e) if ErrorClass::classify(e) == ErrorClass::Fatal => {
                warn!(error = %e, "Fatal transport error, dropping connection");
                self.drop_transport();
            }
            _ => self.state = SessionState::Ready,
        }
        result
    }

    /// Exchange with automatic retry for transient errors.
    fn exchange_with_retry(&mut self, frame: &CommandFrame) -> Result<Response> {
        for attempt in 0..=TIMEOUT_RETRIES {
            match self.exchange_once(frame, self.read_timeout) {
                Ok(resp) => {
                    if attempt > 0 {
                        debug!("Command succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    let class = ErrorClass::classify(&e);
                    if !class.is_retryable() {
                        warn!(
                            "Command failed (class={:?}, attempt={}/{}): {}",
                            class,
                            attempt + 1,
                            TIMEOUT_RETRIES + 1,
                            e
                        );
                        return Err(e);
                    }
                    debug!(
                        "Transient error (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        TIMEOUT_RETRIES + 1,
                        e
                    );
                }
            }
        }
        Err(Error::DeviceUnresponsive {
            attempts: TIMEOUT_RETRIES + 1,
        })
    }

    /// One write-then-read exchange against the transport.
    ///
    /// Reads until the deadline, skipping valid-but-stale reports (answers
    /// to an earlier command that the device flushed late).
    fn exchange_once(&mut self, frame: &CommandFrame, timeout: Duration) -> Result<Response> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::DeviceNotFound("no open transport".to_string()))?;

        let encoded = frame.encode();
        trace!(
            sub = format_args!("0x{:02X}", frame.sub_command()),
            report_hex = format_args!("{:02X?}", encoded),
            "Ragnok TX"
        );
        transport.write_report(&encoded)?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(format!(
                    "no matching response within {}ms",
                    timeout.as_millis()
                )));
            }
            let raw = transport.read_report(remaining)?;
            let resp = match Response::locate(&raw) {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        raw_hex = format_args!("{:02X?}", raw),
                        "No valid frame in read burst"
                    );
                    return Err(e);
                }
            };
            trace!(
                sub = format_args!("0x{:02X}", resp.sub_command()),
                report_hex = format_args!("{:02X?}", resp.to_bytes()),
                "Ragnok RX"
            );

            if resp.acknowledges(frame) {
                if resp.status() != 0 {
                    warn!(status = resp.status(), "Device rejected command");
                    return Err(Error::UnexpectedResponse {
                        what: "command rejected by device",
                        raw: resp.status(),
                    });
                }
                return Ok(resp);
            }
            if cmd::is_known(resp.sub_command()) {
                debug!(
                    sub = format_args!("0x{:02X}", resp.sub_command()),
                    "Skipping stale report"
                );
                continue;
            }
            return Err(Error::UnexpectedResponse {
                what: "unknown sub-command echo",
                raw: resp.sub_command(),
            });
        }
    }

    fn read_flash(&mut self, addr: u16, count: u8) -> Result<Vec<u8>> {
        let frame = protocol::read_flash(addr, count)?;
        let resp = self.transact(&frame)?;
        Ok(resp.flash_data(count).to_vec())
    }

    /// Read an arbitrarily long register run in chunks.
    fn read_flash_run(&mut self, addr: u16, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        let mut offset = 0usize;
        while offset < len {
            let count = (len - offset).min(protocol::READ_CHUNK) as u8;
            out.extend_from_slice(&self.read_flash(addr + offset as u16, count)?);
            offset += count as usize;
        }
        Ok(out)
    }

    fn write_flash(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        safety::validate_write_region(addr, data.len())?;
        let frame = protocol::write_flash(addr, data)?;
        self.transact(&frame)?;
        Ok(())
    }

    fn transmit_all(&mut self, frames: &[CommandFrame]) -> Result<()> {
        for frame in frames {
            self.transact(frame)?;
        }
        Ok(())
    }

    /// Re-read every setting from the device into the snapshot.
    ///
    /// Individual fields that come back unparseable are logged and left
    /// `None`; only transport-level failures abort the refresh.
    pub fn refresh_settings(&mut self) -> Result<DeviceSettings> {
        let level = self.read_flash(regs::DPI_LEVEL_SELECT, 1)?[0] & 0x7F;
        if level < regs::DPI_LEVEL_COUNT {
            self.snapshot.dpi_level = Some(level);
            let slot = self.read_flash(Self::dpi_slot_addr(level), 3)?;
            if slot[0] != 0 {
                self.snapshot.dpi = Some(settings::raw_to_dpi(slot[0]));
            } else {
                warn!(level, "DPI level slot holds zero");
                self.snapshot.dpi = None;
            }
        } else {
            warn!(level, "Active DPI level out of range");
            self.snapshot.dpi_level = None;
            self.snapshot.dpi = None;
        }

        let divider = self.read_flash(regs::POLLING_DIVIDER, 1)?[0];
        self.snapshot.polling_rate = PollingRate::from_divider(divider);
        if self.snapshot.polling_rate.is_none() {
            warn!(divider, "Unknown polling divider");
        }

        let bits = self.read_flash(regs::TOGGLES, 1)?[0];
        self.cache_toggles(bits);

        let block = self.read_flash(regs::LED_CONFIG, led::BLOCK_READ_LEN as u8)?;
        self.snapshot.led = match led::unpack(&block) {
            Ok(led) => Some(led),
            Err(e) => {
                warn!(error = %e, "LED config block unreadable");
                None
            }
        };

        let binding = self.read_flash(regs::BUTTON4_BINDING, 1)?[0];
        self.snapshot.button4_macro = Some(binding != 0);

        let raw = self.read_flash(regs::MACRO_TRIGGERS, regs::MACRO_SLOT_COUNT)?;
        let mut triggers = [0u8; regs::MACRO_SLOT_COUNT as usize];
        triggers.copy_from_slice(&raw);
        self.snapshot.macro_triggers = Some(triggers);

        debug!(settings = ?self.snapshot, "Settings refreshed");
        Ok(self.snapshot)
    }

    fn dpi_slot_addr(level: u8) -> u16 {
        regs::DPI_LEVEL_BASE + level as u16 * regs::DPI_LEVEL_STRIDE
    }

    /// Write `dpi` into the active DPI level slot.
    pub fn set_dpi(&mut self, dpi: u32) -> Result<()> {
        let dpi = safety::validate_dpi(dpi)?;
        let raw = settings::dpi_to_raw(dpi);

        let level = match self.snapshot.dpi_level {
            Some(level) => level,
            None => {
                let level = self.read_flash(regs::DPI_LEVEL_SELECT, 1)?[0] & 0x7F;
                safety::validate_dpi_level(level).map_err(|_| Error::UnexpectedResponse {
                    what: "active DPI level",
                    raw: level,
                })?;
                self.snapshot.dpi_level = Some(level);
                level
            }
        };

        let slot_addr = Self::dpi_slot_addr(level);
        match self.write_flash(slot_addr, &[raw, raw, 0x00]) {
            Ok(()) => {
                self.snapshot.dpi = Some(dpi);
                info!(dpi, level, "DPI updated");
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.reconcile_dpi(slot_addr);
                }
                Err(e)
            }
        }
    }

    /// After a write whose ack never arrived, read the slot back once so
    /// the cache tells the truth either way.
    fn reconcile_dpi(&mut self, slot_addr: u16) {
        self.snapshot.dpi = match self.read_flash(slot_addr, 1) {
            Ok(slot) if slot[0] != 0 => Some(settings::raw_to_dpi(slot[0])),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "DPI read-back failed");
                None
            }
        };
        if let Some(dpi) = self.snapshot.dpi {
            debug!(dpi, "DPI cache reconciled by read-back");
        }
    }

    /// Read the active DPI from the device, bypassing the cache.
    pub fn read_dpi(&mut self) -> Result<u32> {
        let level = self.read_flash(regs::DPI_LEVEL_SELECT, 1)?[0] & 0x7F;
        safety::validate_dpi_level(level).map_err(|_| Error::UnexpectedResponse {
            what: "active DPI level",
            raw: level,
        })?;
        let slot = self.read_flash(Self::dpi_slot_addr(level), 3)?;
        if slot[0] == 0 {
            return Err(Error::UnexpectedResponse {
                what: "DPI slot byte",
                raw: 0,
            });
        }
        let dpi = settings::raw_to_dpi(slot[0]);
        self.snapshot.dpi_level = Some(level);
        self.snapshot.dpi = Some(dpi);
        Ok(dpi)
    }

    /// Switch the active DPI level and return the DPI stored in it.
    pub fn set_dpi_level(&mut self, level: u8) -> Result<u32> {
        safety::validate_dpi_level(level)?;
        self.write_flash(regs::DPI_LEVEL_SELECT, &[level])?;
        self.snapshot.dpi_level = Some(level);
        let slot = self.read_flash(Self::dpi_slot_addr(level), 3)?;
        let dpi = settings::raw_to_dpi(slot[0]);
        self.snapshot.dpi = (slot[0] != 0).then_some(dpi);
        info!(level, dpi, "Active DPI level changed");
        Ok(dpi)
    }

    /// Read the polling rate from the device, bypassing the cache.
    pub fn read_polling_rate(&mut self) -> Result<PollingRate> {
        let divider = self.read_flash(regs::POLLING_DIVIDER, 1)?[0];
        let rate = PollingRate::from_divider(divider).ok_or(Error::UnexpectedResponse {
            what: "polling divider byte",
            raw: divider,
        })?;
        self.snapshot.polling_rate = Some(rate);
        Ok(rate)
    }

    pub fn set_polling_rate(&mut self, hz: u16) -> Result<()> {
        let rate = safety::validate_polling_rate(hz)?;
        match self.write_flash(regs::POLLING_DIVIDER, &[rate.divider()]) {
            Ok(()) => {
                self.snapshot.polling_rate = Some(rate);
                info!(rate = %rate, "Polling rate updated");
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.snapshot.polling_rate = None;
                }
                Err(e)
            }
        }
    }

    /// Flip one sensor toggle, preserving the others (read-modify-write on
    /// the shared bitmask register).
    pub fn set_toggle(&mut self, toggle: Toggle, enabled: bool) -> Result<()> {
        let current = self.read_flash(regs::TOGGLES, 1)?[0];
        let updated = if enabled {
            current | toggle.bit()
        } else {
            current & !toggle.bit()
        };
        match self.write_flash(regs::TOGGLES, &[updated]) {
            Ok(()) => {
                self.cache_toggles(updated);
                info!(toggle = toggle.label(), enabled, "Toggle updated");
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.cache_toggles_unknown();
                }
                Err(e)
            }
        }
    }

    fn cache_toggles(&mut self, bits: u8) {
        self.snapshot.ripple_control = Some(bits & Toggle::RippleControl.bit() != 0);
        self.snapshot.angle_snap = Some(bits & Toggle::AngleSnap.bit() != 0);
        self.snapshot.motion_sync = Some(bits & Toggle::MotionSync.bit() != 0);
    }

    fn cache_toggles_unknown(&mut self) {
        self.snapshot.ripple_control = None;
        self.snapshot.angle_snap = None;
        self.snapshot.motion_sync = None;
    }

    /// Select an LED effect. `color` is honored only by the steady-color
    /// mode; the rest of the block (speed, brightness, previous color) is
    /// preserved via read-modify-write.
    pub fn set_led_mode(&mut self, mode: u8, color: Option<Rgb>) -> Result<()> {
        let mode = safety::validate_led_mode(mode)?;
        let mut led = self.current_led()?;
        led.mode = mode;
        if let Some(color) = color {
            led.color = color;
        }
        self.apply_led(led)
    }

    /// Adjust LED brightness and/or speed on the 1-10 user scale.
    pub fn set_led_levels(&mut self, brightness: Option<u8>, speed: Option<u8>) -> Result<()> {
        if brightness.is_none() && speed.is_none() {
            return Ok(());
        }
        if let Some(b) = brightness {
            safety::validate_led_level("led_brightness", b)?;
        }
        if let Some(s) = speed {
            safety::validate_led_level("led_speed", s)?;
        }
        let mut led = self.current_led()?;
        if let Some(b) = brightness {
            led.brightness = b;
        }
        if let Some(s) = speed {
            led.speed = s;
        }
        self.apply_led(led)
    }

    fn current_led(&mut self) -> Result<LedSettings> {
        if let Some(led) = self.snapshot.led {
            return Ok(led);
        }
        let block = self.read_flash(regs::LED_CONFIG, led::BLOCK_READ_LEN as u8)?;
        led::unpack(&block)
    }

    /// Stage the config block, then strobe the apply register. The LEDs
    /// only change once the strobe lands.
    fn apply_led(&mut self, settings: LedSettings) -> Result<()> {
        let block = led::pack(&settings);
        match self.stage_and_strobe(&block) {
            Ok(()) => {
                self.snapshot.led = Some(settings);
                info!(mode = %settings.mode, color = %settings.color, "LED config applied");
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.snapshot.led = None;
                }
                Err(e)
            }
        }
    }

    fn stage_and_strobe(&mut self, block: &[u8]) -> Result<()> {
        self.write_flash(regs::LED_CONFIG, block)?;
        self.write_flash(regs::LED_APPLY, &[led::APPLY_VALUE])
    }

    /// Program the button-4 macro slot and bind the button to it.
    ///
    /// The slot image goes out events first; its header checksum is the
    /// final byte written, so an interrupted transfer leaves the slot
    /// disarmed rather than half-programmed.
    pub fn set_button4_macro(&mut self, def: &MacroDefinition) -> Result<()> {
        let image = macros::encode_slot(macros::BUTTON4_SLOT_NAME, def)?;
        let frames = macros::slot_frames(regs::MACRO_BUTTON4, &image)?;
        self.transmit_all(&frames)?;
        self.bind_button4(true)?;
        info!(events = def.len(), "Button-4 macro programmed");
        Ok(())
    }

    /// Point button 4 at the macro slot (`true`) or its stock Back action
    /// (`false`). The slot contents are untouched either way.
    pub fn bind_button4(&mut self, macro_binding: bool) -> Result<()> {
        match self.write_flash(regs::BUTTON4_BINDING, &[macro_binding as u8]) {
            Ok(()) => {
                self.snapshot.button4_macro = Some(macro_binding);
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.snapshot.button4_macro = None;
                }
                Err(e)
            }
        }
    }

    /// Read back the button-4 macro slot summary.
    pub fn button4_macro_info(&mut self) -> Result<MacroInfo> {
        self.macro_info_at(regs::MACRO_BUTTON4)
    }

    /// Program a keyboard macro fired by `trigger` (a HID usage byte).
    ///
    /// Reuses the slot already bound to that trigger, otherwise claims the
    /// first free one. Returns the slot index used.
    pub fn set_keyboard_macro(&mut self, trigger: u8, def: &MacroDefinition) -> Result<u8> {
        if trigger == 0 {
            return Err(Error::OutOfRange {
                field: "trigger usage",
                value: 0,
                min: 1,
                max: 0xFF,
            });
        }
        let triggers = self.macro_triggers()?;
        let slot = triggers
            .iter()
            .position(|&t| t == trigger)
            .or_else(|| triggers.iter().position(|&t| t == 0))
            .ok_or(Error::SlotsFull {
                total: regs::MACRO_SLOT_COUNT as usize,
            })?;

        let slot_addr = regs::MACRO_KEYBOARD_BASE + slot as u16 * regs::MACRO_SLOT_STRIDE;
        let image = macros::encode_slot(macros::KEYBOARD_SLOT_NAMES[slot], def)?;
        let frames = macros::slot_frames(slot_addr, &image)?;
        self.transmit_all(&frames)?;

        let mut updated = triggers;
        updated[slot] = trigger;
        self.write_triggers(updated)?;
        info!(
            slot,
            trigger = format_args!("0x{trigger:02X}"),
            events = def.len(),
            "Keyboard macro programmed"
        );
        Ok(slot as u8)
    }

    /// Unbind the keyboard macro fired by `trigger`. Returns whether a
    /// binding existed.
    pub fn clear_keyboard_macro(&mut self, trigger: u8) -> Result<bool> {
        let triggers = self.macro_triggers()?;
        let Some(slot) = triggers.iter().position(|&t| t != 0 && t == trigger) else {
            return Ok(false);
        };
        let mut updated = triggers;
        updated[slot] = 0;
        self.write_triggers(updated)?;
        info!(slot, "Keyboard macro unbound");
        Ok(true)
    }

    /// Read back one keyboard macro slot summary.
    pub fn keyboard_macro_info(&mut self, slot: u8) -> Result<MacroInfo> {
        if slot >= regs::MACRO_SLOT_COUNT {
            return Err(Error::OutOfRange {
                field: "macro slot",
                value: slot as u32,
                min: 0,
                max: (regs::MACRO_SLOT_COUNT - 1) as u32,
            });
        }
        self.macro_info_at(regs::MACRO_KEYBOARD_BASE + slot as u16 * regs::MACRO_SLOT_STRIDE)
    }

    /// The current trigger table, cached.
    pub fn macro_triggers(&mut self) -> Result<[u8; 4]> {
        if let Some(triggers) = self.snapshot.macro_triggers {
            return Ok(triggers);
        }
        let raw = self.read_flash(regs::MACRO_TRIGGERS, regs::MACRO_SLOT_COUNT)?;
        let mut triggers = [0u8; regs::MACRO_SLOT_COUNT as usize];
        triggers.copy_from_slice(&raw);
        self.snapshot.macro_triggers = Some(triggers);
        Ok(triggers)
    }

    fn write_triggers(&mut self, triggers: [u8; 4]) -> Result<()> {
        match self.write_flash(regs::MACRO_TRIGGERS, &triggers) {
            Ok(()) => {
                self.snapshot.macro_triggers = Some(triggers);
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::DeviceUnresponsive { .. }) {
                    self.snapshot.macro_triggers = None;
                }
                Err(e)
            }
        }
    }

    fn macro_info_at(&mut self, slot_addr: u16) -> Result<MacroInfo> {
        let header_raw = self.read_flash_run(slot_addr, macros::HEADER_LEN)?;
        let mut header = [0u8; macros::HEADER_LEN];
        header.copy_from_slice(&header_raw);
        let (name, events, stored_checksum) = macros::decode_header(&header);
        if events as usize > macros::EVENTS_MAX {
            return Err(Error::UnexpectedResponse {
                what: "macro event count",
                raw: events,
            });
        }
        let data = self.read_flash_run(
            slot_addr + macros::HEADER_LEN as u16,
            events as usize * macros::EVENT_LEN,
        )?;
        let checksum_ok = protocol::checksum(&data) == stored_checksum;
        Ok(MacroInfo {
            name,
            events,
            checksum_ok,
        })
    }

    /// Query battery charge and charging state.
    pub fn read_battery(&mut self) -> Result<BatteryReport> {
        let resp = self.transact(&protocol::read_battery())?;
        let (percent, charging) = resp.battery();
        Ok(BatteryReport { percent, charging })
    }
}
