//! EF 0104: data of the identity document itself.

use crate::ef::{format_date, text};
use crate::tlv::{self, TlvMap};

const TAG_NUMBER: u8 = 0x80;
const TAG_ISSUING_DATE: u8 = 0x81;
const TAG_EXPIRY_DATE: u8 = 0x82;
const TAG_ISSUER: u8 = 0x83;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DocumentRecord {
    pub document_number: Option<String>,
    pub issuing_date: Option<String>,
    pub expiry_date: Option<String>,
    pub issuer: Option<String>,
}

impl<'a> From<&'a TlvMap> for DocumentRecord {
    fn from(children: &'a TlvMap) -> Self {
        Self {
            document_number: text(children, TAG_NUMBER),
            issuing_date: format_date(text(children, TAG_ISSUING_DATE)),
            expiry_date: format_date(text(children, TAG_EXPIRY_DATE)),
            issuer: text(children, TAG_ISSUER),
        }
    }
}

impl<'a> From<&'a [u8]> for DocumentRecord {
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
            (0x80, "VN123456"),
            (0x81, "15032021"),
            (0x82, "01011980"),
            (0x83, "SPCLEP Adjud"),
        ]));

        assert_eq!(
            DocumentRecord {
                document_number: Some("VN123456".to_string()),
                issuing_date: Some("15.03.2021".to_string()),
                expiry_date: Some("01.01.1980".to_string()),
                issuer: Some("SPCLEP Adjud".to_string()),
            },
            DocumentRecord::from(raw.as_slice()),
        );
    }

    #[test]
    fn test_parse_partial() {
        let raw = sequence(encode(&[(0x80, "VN123456"), (0x82, "")]));
        let record = DocumentRecord::from(raw.as_slice());

        assert_eq!(Some("VN123456".to_string()), record.document_number);
        assert_eq!(None, record.expiry_date);
        assert_eq!(None, record.issuer);
    }

    #[test]
    fn test_parse_absent() {
        assert_eq!(DocumentRecord::default(), DocumentRecord::from(&[][..]));
        assert_eq!(
            DocumentRecord::default(),
            DocumentRecord::from(&[0x04, 0x02, 0x41, 0x42][..])
        );
    }
}
