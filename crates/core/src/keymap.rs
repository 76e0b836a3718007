//! US-layout mapping between characters and HID keyboard usage codes.
//!
//! Macro events store the raw usage byte plus a shift flag; this module is
//! the only place that knows the layout.

/// Map a character to its HID usage code and whether Shift must be held.
///
/// Covers the printable ASCII range plus newline and tab. Returns `None`
/// for anything the US layout cannot produce with at most a Shift modifier.
pub fn usage_for_char(c: char) -> Option<(u8, bool)> {
    if c.is_ascii_lowercase() {
        return Some((0x04 + (c as u8 - b'a'), false));
    }
    if c.is_ascii_uppercase() {
        return Some((0x04 + (c as u8 - b'A'), true));
    }
    if ('1'..='9').contains(&c) {
        return Some((0x1E + (c as u8 - b'1'), false));
    }
    let (usage, shift) = match c {
        '0' => (0x27, false),
        '\n' => (0x28, false),
        '\t' => (0x2B, false),
        ' ' => (0x2C, false),
        '-' => (0x2D, false),
        '_' => (0x2D, true),
        '=' => (0x2E, false),
        '+' => (0x2E, true),
        '[' => (0x2F, false),
        '{' => (0x2F, true),
        ']' => (0x30, false),
        '}' => (0x30, true),
        '\\' => (0x31, false),
        '|' => (0x31, true),
        ';' => (0x33, false),
        ':' => (0x33, true),
        '\'' => (0x34, false),
        '"' => (0x34, true),
        '`' => (0x35, false),
        '~' => (0x35, true),
        ',' => (0x36, false),
        '<' => (0x36, true),
        '.' => (0x37, false),
        '>' => (0x37, true),
        '/' => (0x38, false),
        '?' => (0x38, true),
        '!' => (0x1E, true),
        '@' => (0x1F, true),
        '#' => (0x20, true),
        '$' => (0x21, true),
        '%' => (0x22, true),
        '^' => (0x23, true),
        '&' => (0x24, true),
        '*' => (0x25, true),
        '(' => (0x26, true),
        ')' => (0x27, true),
        _ => return None,
    };
    Some((usage, shift))
}

/// Human-readable label for a usage code, for status output.
pub fn usage_label(usage: u8) -> String {
    match usage {
        0x04..=0x1D => ((b'a' + (usage - 0x04)) as char).to_string(),
        0x1E..=0x26 => ((b'1' + (usage - 0x1E)) as char).to_string(),
        0x27 => "0".to_string(),
        0x28 => "enter".to_string(),
        0x29 => "esc".to_string(),
        0x2B => "tab".to_string(),
        0x2C => "space".to_string(),
        0x3A..=0x45 => format!("f{}", usage - 0x39),
        _ => format!("0x{usage:02X}"),
    }
}

/// Resolve a key name from the command line into a usage code.
///
/// Accepts a single character (`g`, `4`), function keys (`f1`-`f12`) and a
/// few named keys.
pub fn key_from_name(name: &str) -> Option<u8> {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "enter" | "return" => return Some(0x28),
        "esc" | "escape" => return Some(0x29),
        "tab" => return Some(0x2B),
        "space" => return Some(0x2C),
        _ => {}
    }
    if let Some(num) = lower.strip_prefix('f') {
        if let Ok(n) = num.parse::<u8>() {
            if (1..=12).contains(&n) {
                return Some(0x39 + n);
            }
        }
    }
    let mut chars = lower.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => usage_for_char(c).map(|(usage, _)| usage),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_case() {
        assert_eq!(usage_for_char('a'), Some((0x04, false)));
        assert_eq!(usage_for_char('z'), Some((0x1D, false)));
        assert_eq!(usage_for_char('A'), Some((0x04, true)));
        assert_eq!(usage_for_char('Z'), Some((0x1D, true)));
    }

    #[test]
    fn digits_and_shifted_symbols() {
        assert_eq!(usage_for_char('1'), Some((0x1E, false)));
        assert_eq!(usage_for_char('0'), Some((0x27, false)));
        assert_eq!(usage_for_char('!'), Some((0x1E, true)));
        assert_eq!(usage_for_char(')'), Some((0x27, true)));
        assert_eq!(usage_for_char('?'), Some((0x38, true)));
        assert_eq!(usage_for_char('_'), Some((0x2D, true)));
    }

    #[test]
    fn whitespace_keys() {
        assert_eq!(usage_for_char(' '), Some((0x2C, false)));
        assert_eq!(usage_for_char('\n'), Some((0x28, false)));
        assert_eq!(usage_for_char('\t'), Some((0x2B, false)));
    }

    #[test]
    fn unmapped_characters() {
        assert_eq!(usage_for_char('é'), None);
        assert_eq!(usage_for_char('\r'), None);
    }

    #[test]
    fn key_names_resolve() {
        assert_eq!(key_from_name("g"), Some(0x0A));
        assert_eq!(key_from_name("4"), Some(0x21));
        assert_eq!(key_from_name("f1"), Some(0x3A));
        assert_eq!(key_from_name("F12"), Some(0x45));
        assert_eq!(key_from_name("enter"), Some(0x28));
        assert_eq!(key_from_name("f13"), None);
        assert_eq!(key_from_name("ctrl"), None);
    }

    #[test]
    fn labels_roundtrip_names() {
        assert_eq!(usage_label(0x0A), "g");
        assert_eq!(usage_label(0x3A), "f1");
        assert_eq!(usage_label(0x2C), "space");
        assert_eq!(usage_label(0xE0), "0xE0");
    }
}
