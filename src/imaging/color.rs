//! Fill color parsing: hex (`#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`) and a
//! handful of CSS named colors.

use super::params::FillColor;

/// Parse a color string into a [`FillColor`].
///
/// The leading `#` is optional. Three- and six-digit forms are opaque.
/// Named colors are matched case-insensitively.
pub(crate) fn parse_color(s: &str) -> Option<FillColor> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if let Some(color) = parse_hex(hex) {
        return Some(color);
    }

    lookup_named(s)
}

fn parse_hex(hex: &str) -> Option<FillColor> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Some(FillColor::rgba(
            expand_nibble(bytes[0])?,
            expand_nibble(bytes[1])?,
            expand_nibble(bytes[2])?,
            255,
        )),
        4 => Some(FillColor::rgba(
            expand_nibble(bytes[0])?,
            expand_nibble(bytes[1])?,
            expand_nibble(bytes[2])?,
            expand_nibble(bytes[3])?,
        )),
        6 => Some(FillColor::rgba(
            parse_byte(&bytes[0..2])?,
            parse_byte(&bytes[2..4])?,
            parse_byte(&bytes[4..6])?,
            255,
        )),
        8 => Some(FillColor::rgba(
            parse_byte(&bytes[0..2])?,
            parse_byte(&bytes[2..4])?,
            parse_byte(&bytes[4..6])?,
            parse_byte(&bytes[6..8])?,
        )),
        _ => None,
    }
}

/// 'f' → 0xFF, 'a' → 0xAA.
fn expand_nibble(ch: u8) -> Option<u8> {
    let n = hex_val(ch)?;
    Some(n << 4 | n)
}

fn parse_byte(pair: &[u8]) -> Option<u8> {
    Some(hex_val(pair[0])? << 4 | hex_val(pair[1])?)
}

fn hex_val(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn lookup_named(name: &str) -> Option<FillColor> {
    let lower = name.to_ascii_lowercase();
    NAMED_COLORS
        .binary_search_by_key(&lower.as_str(), |&(n, _)| n)
        .ok()
        .map(|idx| {
            let [r, g, b, a] = NAMED_COLORS[idx].1;
            FillColor::rgba(r, g, b, a)
        })
}

/// Sorted alphabetically for binary search.
const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("green", [0, 128, 0, 255]),
    ("grey", [128, 128, 128, 255]),
    ("red", [255, 0, 0, 255]),
    ("silver", [192, 192, 192, 255]),
    ("transparent", [0, 0, 0, 0]),
    ("white", [255, 255, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_table_is_sorted() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#FFFFFF"), Some(FillColor::WHITE));
        assert_eq!(parse_color("fff"), Some(FillColor::WHITE));
        assert_eq!(parse_color("#0000"), Some(FillColor::TRANSPARENT));
        assert_eq!(
            parse_color("#11223344"),
            Some(FillColor::rgba(0x11, 0x22, 0x33, 0x44))
        );
        assert_eq!(parse_color("#a1b2c3"), Some(FillColor::rgba(0xa1, 0xb2, 0xc3, 255)));
    }

    #[test]
    fn parses_named_colors_case_insensitively() {
        assert_eq!(parse_color("White"), Some(FillColor::WHITE));
        assert_eq!(parse_color("  transparent "), Some(FillColor::TRANSPARENT));
        assert_eq!(parse_color("RED"), Some(FillColor::rgba(255, 0, 0, 255)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#ggg"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
    }
}
