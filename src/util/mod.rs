//! Utility module
//!
//! Hexadecimal helpers shared by the configuration layer and the log lines.

use std::fmt::Write;

/// Parses a hexadecimal string with an optional `0x`/`0X` prefix.
///
/// Leading zeros are accepted, so `"0X001"` and `"1"` both parse to 1.
pub fn parse_hex(text: &str) -> Option<u32> {
    let digits = text
        .trim()
        .strip_prefix("0x")
        .or_else(|| text.trim().strip_prefix("0X"))
        .unwrap_or_else(|| text.trim());

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Parses a hexadecimal identifier that must fit in one byte
pub fn parse_hex_byte(text: &str) -> Option<u8> {
    parse_hex(text).and_then(|value| u8::try_from(value).ok())
}

/// Formats bytes as comma separated hex pairs, e.g. `01,ff,20`
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_prefixes() {
        assert_eq!(parse_hex("0X01"), Some(1));
        assert_eq!(parse_hex("0x1f"), Some(0x1f));
        assert_eq!(parse_hex("ff"), Some(0xff));
        assert_eq!(parse_hex("0X001"), Some(1));
        assert_eq!(parse_hex(" 0x30 "), Some(0x30));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_hex("0xZZ"), None);
        assert_eq!(parse_hex("-1"), None);
        assert_eq!(parse_hex("+1"), None);
        assert_eq!(parse_hex("0x1FFFFFFFF"), None);
    }

    #[test]
    fn test_parse_hex_byte_range() {
        assert_eq!(parse_hex_byte("0XFF"), Some(0xff));
        assert_eq!(parse_hex_byte("0x100"), None);
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes(&[]), "");
        assert_eq!(hex_bytes(&[0x01, 0xff, 0x20]), "01,ff,20");
    }
}
