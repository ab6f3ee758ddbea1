//! Decoders for the elementary files (EF) of the EDATA application.

pub mod address;
pub mod document;
pub mod personal;

pub use self::address::AddressRecord;
pub use self::document::DocumentRecord;
pub use self::personal::{PersonalRecord, Sex};

use std::collections::BTreeMap;

use crate::tlv::TlvMap;

/// Tag map of a file rendered for troubleshooting: `"80" => "POPESCU"`.
pub type TagDump = BTreeMap<String, String>;

/// Decodes the octets as UTF-8, dropping invalid sequences instead of failing.
pub fn decode_text(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Renders the tag map for diagnostics.
pub fn dump(children: &TlvMap) -> TagDump {
    children
        .iter()
        .map(|(tag, value)| (format!("{:02X}", tag), decode_text(value)))
        .collect()
}

/// Reads the text field of the tag, trimmed; empty or missing fields are absent.
pub(crate) fn text(children: &TlvMap, tag: u8) -> Option<String> {
    children
        .get(&tag)
        .map(|value| decode_text(value).trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Normalizes a `DDMMYYYY` date into `DD.MM.YYYY`.
///
/// Only the digits are taken into account. Values without exactly eight digits, or with a day,
/// month or year out of range, are passed through unchanged.
pub fn format_date(value: Option<String>) -> Option<String> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    let digits = value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();

    if digits.len() != 8 {
        return Some(value);
    }

    let number = |range: std::ops::Range<usize>| digits[range].parse::<u32>().unwrap_or(0);
    let (day, month, year) = (number(0..2), number(2..4), number(4..8));

    if (1..=31).contains(&day) && (1..=12).contains(&month) && (1900..=2100).contains(&year) {
        Some(format!("{:02}.{:02}.{:04}", day, month, year))
    } else {
        Some(value)
    }
}

/// Accepts the national numeric identifier only if it consists of exactly 13 digits.
pub fn national_id(value: Option<String>) -> Option<String> {
    value.filter(|v| v.len() == 13 && v.bytes().all(|b| b.is_ascii_digit()))
}
