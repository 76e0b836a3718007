//! Macro definitions and their on-device slot format.
//!
//! A macro slot holds a 10-byte header followed by packed 4-byte events:
//!
//! ```text
//! header: [name; 8][event_count][data_checksum]
//! event:  [usage][flags][delay_lo][delay_hi]     (flags bit0 = key down,
//!                                                 bit1 = shift held;
//!                                                 usage 0 = pure delay)
//! ```
//!
//! The header is written LAST, checksum byte last of all. Firmware treats a
//! slot whose stored checksum does not match its events as empty, so an
//! interrupted write leaves the slot disarmed instead of half-programmed.

use crate::error::{Error, Result};
use crate::keymap;
use crate::protocol::{self, CommandFrame};
use crate::safety;

/// Maximum events a slot can hold.
pub const EVENTS_MAX: usize = 70;
/// Packed size of one event.
pub const EVENT_LEN: usize = 4;
/// Slot header size.
pub const HEADER_LEN: usize = 10;
/// Maximum stored name length.
pub const NAME_LEN: usize = 8;
/// Full slot image capacity: header plus a full event table.
pub const SLOT_CAPACITY: usize = HEADER_LEN + EVENTS_MAX * EVENT_LEN;

/// Default hold time between key down and key up.
pub const PRESS_DELAY_DEFAULT_MS: u16 = 20;
/// Default gap between consecutive keys.
pub const INTER_KEY_DELAY_DEFAULT_MS: u16 = 30;

/// Stored name of the button-4 macro slot.
pub const BUTTON4_SLOT_NAME: &str = "BTN4";
/// Stored names of the keyboard macro slots.
pub const KEYBOARD_SLOT_NAMES: [&str; 4] = ["KM1", "KM2", "KM3", "KM4"];

/// One replayable macro step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroEvent {
    /// Press or release a key, then wait `delay_ms`.
    Key {
        usage: u8,
        down: bool,
        shift: bool,
        delay_ms: u16,
    },
    /// Wait without touching any key.
    Delay { ms: u16 },
}

impl MacroEvent {
    pub fn encode(&self) -> [u8; EVENT_LEN] {
        match *self {
            MacroEvent::Key {
                usage,
                down,
                shift,
                delay_ms,
            } => {
                let mut flags = 0u8;
                if down {
                    flags |= 0x01;
                }
                if shift {
                    flags |= 0x02;
                }
                let [lo, hi] = delay_ms.to_le_bytes();
                [usage, flags, lo, hi]
            }
            MacroEvent::Delay { ms } => {
                let [lo, hi] = ms.to_le_bytes();
                [0, 0, lo, hi]
            }
        }
    }

    pub fn decode(raw: &[u8; EVENT_LEN]) -> Self {
        let delay_ms = u16::from_le_bytes([raw[2], raw[3]]);
        if raw[0] == 0 {
            MacroEvent::Delay { ms: delay_ms }
        } else {
            MacroEvent::Key {
                usage: raw[0],
                down: raw[1] & 0x01 != 0,
                shift: raw[1] & 0x02 != 0,
                delay_ms,
            }
        }
    }
}

/// An ordered sequence of macro events, not yet tied to a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroDefinition {
    pub events: Vec<MacroEvent>,
}

impl MacroDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a typing macro from plain text: a down and an up event per
    /// character, with the given hold and inter-key delays.
    pub fn from_text(text: &str, press_delay_ms: u16, inter_key_delay_ms: u16) -> Result<Self> {
        let mut events = Vec::with_capacity(text.chars().count() * 2);
        for c in text.chars() {
            let (usage, shift) = keymap::usage_for_char(c).ok_or(Error::UnsupportedKey(c))?;
            events.push(MacroEvent::Key {
                usage,
                down: true,
                shift,
                delay_ms: press_delay_ms,
            });
            events.push(MacroEvent::Key {
                usage,
                down: false,
                shift,
                delay_ms: inter_key_delay_ms,
            });
        }
        Ok(Self { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Serialize a definition into a full slot image (header + events).
pub fn encode_slot(name: &str, def: &MacroDefinition) -> Result<Vec<u8>> {
    if def.is_empty() {
        return Err(Error::OutOfRange {
            field: "macro events",
            value: 0,
            min: 1,
            max: EVENTS_MAX as u32,
        });
    }
    if def.len() > EVENTS_MAX {
        return Err(Error::MacroTooLong {
            events: def.len(),
            capacity: EVENTS_MAX,
        });
    }
    if name.len() > NAME_LEN {
        return Err(Error::OutOfRange {
            field: "macro name length",
            value: name.len() as u32,
            min: 0,
            max: NAME_LEN as u32,
        });
    }

    let mut data = Vec::with_capacity(def.len() * EVENT_LEN);
    for event in &def.events {
        data.extend_from_slice(&event.encode());
    }

    let mut image = vec![0u8; HEADER_LEN];
    image[..name.len()].copy_from_slice(name.as_bytes());
    image[8] = def.len() as u8;
    image[9] = protocol::checksum(&data);
    image.extend_from_slice(&data);
    Ok(image)
}

/// Split a slot image into write frames, events first.
///
/// The header goes out after every event frame, and its trailing checksum
/// byte is the final single-byte write. Until that byte lands the stored
/// checksum still mismatches the new events and the firmware keeps the slot
/// disarmed.
pub fn slot_frames(slot_addr: u16, image: &[u8]) -> Result<Vec<CommandFrame>> {
    if image.len() < HEADER_LEN || image.len() > SLOT_CAPACITY {
        return Err(Error::OutOfRange {
            field: "macro image length",
            value: image.len() as u32,
            min: HEADER_LEN as u32,
            max: SLOT_CAPACITY as u32,
        });
    }
    safety::validate_write_region(slot_addr, image.len())?;

    let mut frames =
        protocol::write_flash_run(slot_addr + HEADER_LEN as u16, &image[HEADER_LEN..])?;
    frames.extend(protocol::write_flash_run(slot_addr, &image[..HEADER_LEN])?);
    Ok(frames)
}

/// Parse a slot header into `(name, event_count, data_checksum)`.
pub fn decode_header(raw: &[u8; HEADER_LEN]) -> (String, u8, u8) {
    let name_end = raw[..NAME_LEN].iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    let name = String::from_utf8_lossy(&raw[..name_end]).into_owned();
    (name, raw[8], raw[9])
}

/// Parse a packed event table; trailing partial events are dropped.
pub fn decode_events(raw: &[u8]) -> Vec<MacroEvent> {
    raw.chunks_exact(EVENT_LEN)
        .map(|chunk| {
            let mut buf = [0u8; EVENT_LEN];
            buf.copy_from_slice(chunk);
            MacroEvent::decode(&buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::regs;

    fn key_events(n: usize) -> MacroDefinition {
        let events = (0..n)
            .map(|i| MacroEvent::Key {
                usage: 0x04,
                down: i % 2 == 0,
                shift: false,
                delay_ms: 10,
            })
            .collect();
        MacroDefinition { events }
    }

    #[test]
    fn event_codec_roundtrip() {
        let key = MacroEvent::Key {
            usage: 0x0A,
            down: true,
            shift: true,
            delay_ms: 500,
        };
        assert_eq!(MacroEvent::decode(&key.encode()), key);

        let delay = MacroEvent::Delay { ms: 1200 };
        assert_eq!(MacroEvent::decode(&delay.encode()), delay);
    }

    #[test]
    fn event_layout() {
        let raw = MacroEvent::Key {
            usage: 0x05,
            down: false,
            shift: true,
            delay_ms: 0x0102,
        }
        .encode();
        assert_eq!(raw, [0x05, 0x02, 0x02, 0x01]);
    }

    #[test]
    fn from_text_two_events_per_char() {
        let def = MacroDefinition::from_text("Hi", 20, 30).unwrap();
        assert_eq!(def.len(), 4);
        assert_eq!(
            def.events[0],
            MacroEvent::Key {
                usage: 0x0B,
                down: true,
                shift: true,
                delay_ms: 20
            }
        );
        assert_eq!(
            def.events[3],
            MacroEvent::Key {
                usage: 0x0C,
                down: false,
                shift: false,
                delay_ms: 30
            }
        );
    }

    #[test]
    fn from_text_rejects_unmapped_chars() {
        match MacroDefinition::from_text("café", 20, 30) {
            Err(Error::UnsupportedKey('é')) => {}
            other => panic!("expected unsupported key, got {other:?}"),
        }
    }

    #[test]
    fn capacity_boundary() {
        assert!(encode_slot("KM1", &key_events(EVENTS_MAX - 1)).is_ok());
        assert!(encode_slot("KM1", &key_events(EVENTS_MAX)).is_ok());
        match encode_slot("KM1", &key_events(EVENTS_MAX + 1)) {
            Err(Error::MacroTooLong { events: 71, capacity: 70 }) => {}
            other => panic!("expected macro too long, got {other:?}"),
        }
    }

    #[test]
    fn empty_definition_rejected() {
        assert!(encode_slot("KM1", &MacroDefinition::new()).is_err());
    }

    #[test]
    fn slot_image_layout() {
        let def = key_events(2);
        let image = encode_slot("BTN4", &def).unwrap();
        assert_eq!(image.len(), HEADER_LEN + 2 * EVENT_LEN);
        assert_eq!(&image[..4], b"BTN4");
        assert!(image[4..8].iter().all(|&b| b == 0));
        assert_eq!(image[8], 2);
        assert_eq!(image[9], protocol::checksum(&image[HEADER_LEN..]));

        let (name, count, checksum) = decode_header(image[..HEADER_LEN].try_into().unwrap());
        assert_eq!(name, "BTN4");
        assert_eq!(count, 2);
        assert_eq!(checksum, image[9]);
        assert_eq!(decode_events(&image[HEADER_LEN..]), def.events);
    }

    #[test]
    fn frames_write_events_before_header() {
        let image = encode_slot("KM1", &key_events(5)).unwrap();
        let frames = slot_frames(regs::MACRO_KEYBOARD_BASE, &image).unwrap();

        // 20 event bytes in chunks of 9, then the header in 9 + 1.
        assert_eq!(frames.len(), 5);
        for frame in &frames[..3] {
            assert!(frame.address() >= regs::MACRO_KEYBOARD_BASE + HEADER_LEN as u16);
        }
        assert_eq!(frames[3].address(), regs::MACRO_KEYBOARD_BASE);

        // The very last frame is the single checksum byte.
        let last = frames[4].encode();
        assert_eq!(frames[4].address(), regs::MACRO_KEYBOARD_BASE + 9);
        assert_eq!(last[5], 2);
        assert_eq!(last[6], image[9]);
    }

    #[test]
    fn frames_reject_foreign_address() {
        let image = encode_slot("KM1", &key_events(1)).unwrap();
        assert!(slot_frames(0x0800, &image).is_err());
    }
}
