//! EF 0101: personal data of the holder.

use crate::ef::{format_date, national_id, text};
use crate::tlv::{self, TlvMap};

const TAG_SURNAME: u8 = 0x80;
const TAG_GIVEN_NAME: u8 = 0x81;
const TAG_SEX: u8 = 0x82;
const TAG_BIRTHDATE: u8 = 0x83;
const TAG_NATIONAL_ID: u8 = 0x84;
const TAG_CITIZENSHIP: u8 = 0x85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Sex {
    #[cfg_attr(feature = "serde", serde(rename = "M"))]
    Male,

    #[cfg_attr(feature = "serde", serde(rename = "F"))]
    Female,
}

impl Sex {
    /// Accepts exactly `M` or `F`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PersonalRecord {
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub sex: Option<Sex>,
    /// `DD.MM.YYYY` when the card carries a valid date.
    pub birthdate: Option<String>,
    /// National numeric identifier (CNP), 13 digits.
    pub national_id: Option<String>,
    pub citizenship: Option<String>,
}

impl<'a> From<&'a TlvMap> for PersonalRecord {
    fn from(children: &'a TlvMap) -> Self {
        Self {
            surname: text(children, TAG_SURNAME),
            given_name: text(children, TAG_GIVEN_NAME),
            sex: text(children, TAG_SEX).as_deref().and_then(Sex::parse),
            birthdate: format_date(text(children, TAG_BIRTHDATE)),
            national_id: national_id(text(children, TAG_NATIONAL_ID)),
            citizenship: text(children, TAG_CITIZENSHIP),
        }
    }
}

impl<'a> From<&'a [u8]> for PersonalRecord {
    fn from(raw: &'a [u8]) -> Self {
        Self::from(&tlv::decode_framed(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::tests::{encode, sequence};

    #[test]
    fn test_parse() {
        let raw = sequence(encode(&[
            (0x80, "POPESCU"),
            (0x81, "ION "),
            (0x82, "M"),
            (0x83, "01011980"),
            (0x84, "1800101394211"),
            (0x85, "ROU"),
        ]));

        assert_eq!(
            PersonalRecord {
                surname: Some("POPESCU".to_string()),
                given_name: Some("ION".to_string()),
                sex: Some(Sex::Male),
                birthdate: Some("01.01.1980".to_string()),
                national_id: Some("1800101394211".to_string()),
                citizenship: Some("ROU".to_string()),
            },
            PersonalRecord::from(raw.as_slice()),
        );
    }

    #[test]
    fn test_parse_invalid_fields() {
        let raw = sequence(encode(&[
            (0x82, "X"),
            (0x83, "1980"),
            (0x84, "12345"),
        ]));
        let record = PersonalRecord::from(raw.as_slice());

        assert_eq!(None, record.sex);
        assert_eq!(Some("1980".to_string()), record.birthdate);
        assert_eq!(None, record.national_id);
        assert_eq!(None, record.surname);
    }

    #[test]
    fn test_parse_padded() {
        let fields = encode(&[(0x80, "POPESCU"), (0x84, "1800101394211")]);

        // Padding after the SEQUENCE, and padding counted inside it.
        let mut after = sequence(fields.clone());
        after.extend([0xFF; 8]);
        let mut inside = fields;
        inside.extend([0xFF; 8]);

        for raw in [after, sequence(inside)] {
            let record = PersonalRecord::from(raw.as_slice());

            assert_eq!(Some("POPESCU".to_string()), record.surname);
            assert_eq!(Some("1800101394211".to_string()), record.national_id);
        }
    }

    #[test]
    fn test_parse_absent() {
        assert_eq!(PersonalRecord::default(), PersonalRecord::from(&[][..]));
        assert_eq!(
            PersonalRecord::default(),
            PersonalRecord::from(&b"POPESCU ION"[..])
        );
    }
}
