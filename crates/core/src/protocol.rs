//! Ragnok vendor protocol encoding and decoding.
//!
//! The mouse speaks fixed 17-byte reports: a 16-byte payload followed by one
//! checksum byte. All configuration lives in a small settings-flash register
//! file addressed by 16-bit offsets, and three sub-commands cover the whole
//! protocol: read battery, write flash, read flash. Responses reuse the same
//! 17-byte shape and echo the sub-command (and, for flash operations, the
//! register address) of the request they acknowledge.
//!
//! There is no vendor documentation; byte values were recovered from
//! captured traffic.

use crate::error::{Error, Result};

/// Total report length on the wire (payload + checksum).
pub const REPORT_LEN: usize = 17;
/// Payload length covered by the trailing checksum.
pub const PAYLOAD_LEN: usize = 16;
/// Command class byte carried at payload\[0\] by every frame.
pub const COMMAND_CLASS: u8 = 0x08;
/// Maximum data bytes per write-flash frame (data plus its inner checksum
/// must fit in payload\[6..16\]).
pub const WRITE_CHUNK: usize = 9;
/// Maximum data bytes per read-flash frame.
pub const READ_CHUNK: usize = 10;

/// Vendor sub-commands (payload\[1\]), echoed back by the device.
pub mod cmd {
    /// Query battery charge state.
    pub const READ_BATTERY: u8 = 0x04;
    /// Write a run of bytes into the settings flash.
    pub const WRITE_FLASH: u8 = 0x07;
    /// Read a run of bytes from the settings flash.
    pub const READ_FLASH: u8 = 0x08;

    /// Whether a sub-command byte is one this driver knows about.
    pub fn is_known(sub: u8) -> bool {
        matches!(sub, READ_BATTERY | WRITE_FLASH | READ_FLASH)
    }
}

/// Settings-flash register map.
pub mod regs {
    /// Polling-rate report interval in milliseconds (1, 2, 4 or 8).
    pub const POLLING_DIVIDER: u16 = 0x0002;
    /// Active DPI level index, low 7 bits.
    pub const DPI_LEVEL_SELECT: u16 = 0x0004;
    /// Sensor-correction toggles bitmask.
    pub const TOGGLES: u16 = 0x0006;
    /// First DPI level slot: `[raw_x, raw_y, flags]`.
    pub const DPI_LEVEL_BASE: u16 = 0x000C;
    /// Distance between consecutive DPI level slots.
    pub const DPI_LEVEL_STRIDE: u16 = 0x0004;
    /// Number of DPI level slots.
    pub const DPI_LEVEL_COUNT: u8 = 5;
    /// Button-4 binding: 0 = stock Back action, 1 = macro slot.
    pub const BUTTON4_BINDING: u16 = 0x0060;
    /// Keyboard-macro trigger table, one HID usage byte per slot (0 = unbound).
    pub const MACRO_TRIGGERS: u16 = 0x0068;
    /// LED config block: `[mode, r, g, b, speed, brightness, ...]`.
    pub const LED_CONFIG: u16 = 0x00A0;
    /// Writing 0x01 here applies the staged LED config.
    pub const LED_APPLY: u16 = 0x00A7;
    /// Button-4 macro slot.
    pub const MACRO_BUTTON4: u16 = 0x0200;
    /// First keyboard macro slot.
    pub const MACRO_KEYBOARD_BASE: u16 = 0x0400;
    /// Distance between consecutive keyboard macro slots.
    pub const MACRO_SLOT_STRIDE: u16 = 0x0140;
    /// Number of keyboard macro slots.
    pub const MACRO_SLOT_COUNT: u8 = 4;
}

/// Checksum used for whole frames and for write-flash data runs alike:
/// `0x55` minus the byte sum, truncated to one byte.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0x55u8.wrapping_sub(sum)
}

/// A command frame ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    payload: [u8; PAYLOAD_LEN],
}

impl CommandFrame {
    fn new(sub: u8) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = COMMAND_CLASS;
        payload[1] = sub;
        Self { payload }
    }

    /// Sub-command carried at payload\[1\].
    pub fn sub_command(&self) -> u8 {
        self.payload[1]
    }

    /// Register address of a flash frame (big-endian at payload\[3..=4\]).
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.payload[3], self.payload[4]])
    }

    /// Encode into the 17-byte wire form: payload plus trailing checksum.
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[..PAYLOAD_LEN].copy_from_slice(&self.payload);
        buf[PAYLOAD_LEN] = checksum(&self.payload);
        buf
    }
}

/// Build a battery query frame.
pub fn read_battery() -> CommandFrame {
    CommandFrame::new(cmd::READ_BATTERY)
}

/// Build a read-flash frame for `count` bytes at `addr`.
pub fn read_flash(addr: u16, count: u8) -> Result<CommandFrame> {
    if count == 0 || count as usize > READ_CHUNK {
        return Err(Error::OutOfRange {
            field: "read length",
            value: count as u32,
            min: 1,
            max: READ_CHUNK as u32,
        });
    }
    let mut frame = CommandFrame::new(cmd::READ_FLASH);
    frame.payload[3] = (addr >> 8) as u8;
    frame.payload[4] = (addr & 0xFF) as u8;
    frame.payload[5] = count;
    Ok(frame)
}

/// Build a write-flash frame.
///
/// The data run carries its own inner checksum, so the count field on the
/// wire is `data.len() + 1`.
pub fn write_flash(addr: u16, data: &[u8]) -> Result<CommandFrame> {
    if data.is_empty() || data.len() > WRITE_CHUNK {
        return Err(Error::OutOfRange {
            field: "write length",
            value: data.len() as u32,
            min: 1,
            max: WRITE_CHUNK as u32,
        });
    }
    let mut frame = CommandFrame::new(cmd::WRITE_FLASH);
    frame.payload[3] = (addr >> 8) as u8;
    frame.payload[4] = (addr & 0xFF) as u8;
    frame.payload[5] = data.len() as u8 + 1;
    frame.payload[6..6 + data.len()].copy_from_slice(data);
    frame.payload[6 + data.len()] = checksum(data);
    Ok(frame)
}

/// Split a long register write into sequential write-flash frames.
pub fn write_flash_run(addr: u16, data: &[u8]) -> Result<Vec<CommandFrame>> {
    let mut frames = Vec::with_capacity((data.len() + WRITE_CHUNK - 1) / WRITE_CHUNK);
    for (i, chunk) in data.chunks(WRITE_CHUNK).enumerate() {
        frames.push(write_flash(addr + (i * WRITE_CHUNK) as u16, chunk)?);
    }
    Ok(frames)
}

/// A decoded, checksum-verified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: [u8; PAYLOAD_LEN],
}

impl Response {
    /// Decode one 17-byte report, verifying the trailing checksum.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < REPORT_LEN {
            return Err(Error::UnexpectedResponse {
                what: "report shorter than 17 bytes",
                raw: raw.len() as u8,
            });
        }
        let stored = raw[PAYLOAD_LEN];
        let computed = checksum(&raw[..PAYLOAD_LEN]);
        if stored != computed {
            return Err(Error::ChecksumMismatch { stored, computed });
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&raw[..PAYLOAD_LEN]);
        Ok(Self { payload })
    }

    /// Locate and decode the first valid frame inside a raw read buffer.
    ///
    /// hidraw reads can hand back padded or coalesced buffers with the frame
    /// at a nonzero offset, so every 17-byte window is tried before the
    /// buffer is rejected.
    pub fn locate(buf: &[u8]) -> Result<Self> {
        if buf.len() < REPORT_LEN {
            return Err(Error::UnexpectedResponse {
                what: "report shorter than 17 bytes",
                raw: buf.len() as u8,
            });
        }
        for win in buf.windows(REPORT_LEN) {
            if checksum(&win[..PAYLOAD_LEN]) == win[PAYLOAD_LEN] {
                return Self::decode(win);
            }
        }
        Err(Error::ChecksumMismatch {
            stored: buf[PAYLOAD_LEN],
            computed: checksum(&buf[..PAYLOAD_LEN]),
        })
    }

    /// Sub-command echoed at payload\[1\].
    pub fn sub_command(&self) -> u8 {
        self.payload[1]
    }

    /// Status byte at payload\[2\]; nonzero means the device rejected the
    /// command.
    pub fn status(&self) -> u8 {
        self.payload[2]
    }

    /// Register address echoed by flash responses.
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.payload[3], self.payload[4]])
    }

    /// Data run carried by a read-flash response.
    pub fn flash_data(&self, count: u8) -> &[u8] {
        let count = (count as usize).min(READ_CHUNK);
        &self.payload[6..6 + count]
    }

    /// Battery response fields: charge percent (clamped to 100) and the
    /// charging flag.
    pub fn battery(&self) -> (u8, bool) {
        (self.payload[6].min(100), self.payload[7] != 0)
    }

    /// Whether this response acknowledges `frame`: the sub-command must
    /// echo, and flash operations must also echo the register address.
    /// Anything else is a stale or unrelated report.
    pub fn acknowledges(&self, frame: &CommandFrame) -> bool {
        if self.sub_command() != frame.sub_command() {
            return false;
        }
        match self.sub_command() {
            cmd::WRITE_FLASH | cmd::READ_FLASH => self.address() == frame.address(),
            _ => true,
        }
    }

    /// Re-encode into wire form (round-trips with [`Response::decode`]).
    pub fn to_bytes(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[..PAYLOAD_LEN].copy_from_slice(&self.payload);
        buf[PAYLOAD_LEN] = checksum(&self.payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_reference_values() {
        // 16 zero bytes sum to 0, so the checksum is the 0x55 seed itself.
        assert_eq!(checksum(&[0u8; PAYLOAD_LEN]), 0x55);
        // Battery query payload [0x08, 0x04, 0...] sums to 0x0C.
        assert_eq!(checksum(&read_battery().payload), 0x49);
        assert_eq!(checksum(&[0xFF]), 0x56);
    }

    #[test]
    fn encode_battery_frame() {
        let frame = read_battery().encode();
        assert_eq!(frame.len(), REPORT_LEN);
        assert_eq!(frame[0], COMMAND_CLASS);
        assert_eq!(frame[1], cmd::READ_BATTERY);
        assert!(frame[2..PAYLOAD_LEN].iter().all(|&b| b == 0));
        assert_eq!(frame[PAYLOAD_LEN], 0x49);
    }

    #[test]
    fn encode_read_flash_frame() {
        let frame = read_flash(0x00A0, 10).unwrap();
        let raw = frame.encode();
        assert_eq!(raw[1], cmd::READ_FLASH);
        assert_eq!(raw[3], 0x00);
        assert_eq!(raw[4], 0xA0);
        assert_eq!(raw[5], 10);
        assert_eq!(frame.address(), 0x00A0);
    }

    #[test]
    fn encode_write_flash_frame_carries_inner_checksum() {
        let data = [0x08, 0x08, 0x00];
        let frame = write_flash(regs::DPI_LEVEL_BASE, &data).unwrap();
        let raw = frame.encode();
        assert_eq!(raw[1], cmd::WRITE_FLASH);
        assert_eq!(raw[3], 0x00);
        assert_eq!(raw[4], 0x0C);
        // Count covers the data plus its inner checksum.
        assert_eq!(raw[5], 4);
        assert_eq!(&raw[6..9], &data);
        assert_eq!(raw[9], checksum(&data));
        // Outer checksum covers the whole payload.
        assert_eq!(raw[PAYLOAD_LEN], checksum(&raw[..PAYLOAD_LEN]));
    }

    #[test]
    fn read_flash_rejects_bad_length() {
        assert!(read_flash(0x0000, 0).is_err());
        assert!(read_flash(0x0000, 11).is_err());
    }

    #[test]
    fn write_flash_rejects_bad_length() {
        assert!(write_flash(0x0000, &[]).is_err());
        assert!(write_flash(0x0000, &[0u8; 10]).is_err());
    }

    #[test]
    fn write_flash_run_chunks_addresses() {
        let data: Vec<u8> = (0..25).collect();
        let frames = write_flash_run(0x0400, &data).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].address(), 0x0400);
        assert_eq!(frames[1].address(), 0x0409);
        assert_eq!(frames[2].address(), 0x0412);
        // Final frame carries the 7-byte tail.
        assert_eq!(frames[2].encode()[5], 8);
    }

    #[test]
    fn decode_reencode_roundtrip() {
        for raw_dpi in [1u8, 8, 64, 255] {
            let frame = write_flash(regs::DPI_LEVEL_BASE, &[raw_dpi, raw_dpi, 0x00]).unwrap();
            let wire = frame.encode();
            let decoded = Response::decode(&wire).unwrap();
            assert_eq!(decoded.to_bytes(), wire);
        }
    }

    #[test]
    fn decode_rejects_any_single_byte_mutation() {
        let wire = read_flash(0x00A0, 6).unwrap().encode();
        for i in 0..PAYLOAD_LEN {
            let mut bad = wire;
            bad[i] ^= 0x01;
            match Response::decode(&bad) {
                Err(Error::ChecksumMismatch { .. }) => {}
                other => panic!("byte {i}: expected checksum mismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(Response::decode(&[0x08, 0x04, 0x00]).is_err());
    }

    #[test]
    fn locate_finds_frame_at_offset() {
        let wire = read_battery().encode();
        let mut buf = vec![0u8; 5];
        buf.extend_from_slice(&wire);
        buf.resize(64, 0);
        let resp = Response::locate(&buf).unwrap();
        assert_eq!(resp.sub_command(), cmd::READ_BATTERY);
        assert_eq!(resp.to_bytes(), wire);
    }

    #[test]
    fn locate_rejects_garbage_buffer() {
        let buf = [0xAAu8; 64];
        match Response::locate(&buf) {
            Err(Error::ChecksumMismatch { .. }) => {}
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn acknowledges_matches_echo_and_address() {
        let req = write_flash(0x00A0, &[1, 2, 3]).unwrap();
        let ack = Response::decode(&write_flash(0x00A0, &[1, 2, 3]).unwrap().encode()).unwrap();
        assert!(ack.acknowledges(&req));

        // Same sub-command, different address: stale.
        let stale = Response::decode(&write_flash(0x0002, &[1]).unwrap().encode()).unwrap();
        assert!(!stale.acknowledges(&req));

        // Different sub-command entirely.
        let battery = Response::decode(&read_battery().encode()).unwrap();
        assert!(!battery.acknowledges(&req));
    }

    #[test]
    fn battery_fields_clamped() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = COMMAND_CLASS;
        payload[1] = cmd::READ_BATTERY;
        payload[6] = 130;
        payload[7] = 0x01;
        let mut wire = [0u8; REPORT_LEN];
        wire[..PAYLOAD_LEN].copy_from_slice(&payload);
        wire[PAYLOAD_LEN] = checksum(&payload);
        let resp = Response::decode(&wire).unwrap();
        assert_eq!(resp.battery(), (100, true));
    }
}
