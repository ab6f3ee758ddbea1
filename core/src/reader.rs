//! Reading every piece of data off the card in one session.
//!
//! A read goes through the certificate source first, then through the APDU session:
//!
//! 1. the identity from the certificates, any failure making it absent,
//! 2. connection to the first reader,
//! 3. selection of the EDATA application, the only fatal step once connected,
//! 4. PIN verification, whose failure only hides the protected files,
//! 5. the personal, document and first non-empty address file,
//! 6. disconnection, on every path.
//!
//! Records are parsed after the card is released.

use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::card::{self, Card};
use crate::certificate::{CertificateIdentity, IdentitySource};
use crate::config::Config;
use crate::ef::{self, AddressRecord, DocumentRecord, PersonalRecord, TagDump};
use crate::tlv;
use crate::transport::{self, Connector};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not connect to the card: {0}")]
    Connect(#[from] transport::Error),

    #[error("Could not select the EDATA application: {0}")]
    ApplicationNotSelected(#[source] card::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Identifier of an elementary file, displayed as `0x0102`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u16);

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

#[cfg(feature = "serde")]
impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Tag maps of the files as read, for troubleshooting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Diagnostics {
    pub personal: TagDump,
    pub document: TagDump,
    /// Present only when the address file is TLV framed.
    pub address: Option<TagDump>,
    /// The address candidate that was actually used.
    pub address_file: Option<FileId>,
}

/// Everything read from the card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ReadResult {
    pub identity_from_certificate: Option<CertificateIdentity>,
    pub personal: PersonalRecord,
    pub document: DocumentRecord,
    pub address: AddressRecord,
    pub diagnostics: Diagnostics,
}

/// Raw contents of the files, absent when they could not be read.
#[derive(Debug, Default)]
struct RawFiles {
    personal: Option<Vec<u8>>,
    document: Option<Vec<u8>>,
    address: Option<(FileId, Vec<u8>)>,
}

impl RawFiles {
    fn parse(self, identity_from_certificate: Option<CertificateIdentity>) -> ReadResult {
        let personal = tlv::decode_framed(self.personal.as_deref().unwrap_or_default());
        let document = tlv::decode_framed(self.document.as_deref().unwrap_or_default());

        let (address_file, raw_address) = match self.address {
            Some((id, raw)) => (Some(id), raw),
            None => (None, Vec::new()),
        };

        let address_dump = tlv::unwrap_outer_sequence(&raw_address)
            .map(|_| ef::dump(&tlv::decode_framed(&raw_address)));

        ReadResult {
            identity_from_certificate,
            personal: PersonalRecord::from(&personal),
            document: DocumentRecord::from(&document),
            address: AddressRecord::from(raw_address.as_slice()),
            diagnostics: Diagnostics {
                personal: ef::dump(&personal),
                document: ef::dump(&document),
                address: address_dump,
                address_file,
            },
        }
    }
}

/// Reads the card through the connector, and the certificates through the identity source.
#[derive(Debug)]
pub struct Reader<C, I>
where
    C: Connector,
    I: IdentitySource,
{
    config: Config,
    connector: C,
    identity: I,
}

impl<C, I> Reader<C, I>
where
    C: Connector,
    I: IdentitySource,
{
    pub fn new(config: Config, connector: C, identity: I) -> Self {
        Self {
            config,
            connector,
            identity,
        }
    }

    /// Reads everything with the PIN.
    /// Fails only if the card cannot be reached or the application cannot be selected.
    pub fn read(&self, pin: &str) -> Result<ReadResult> {
        let identity = match self.identity.read_identity(pin) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Identity from the certificate is not available: {}", e);
                None
            }
        };

        let card = Card::new(self.connector.connect()?);
        info!("Connected to the card");

        let files = self.read_files(&card, pin);

        if let Err(e) = card.disconnect() {
            debug!("Failed to disconnect from the card: {}", e);
        }

        Ok(files?.parse(identity))
    }

    fn read_files(&self, card: &Card<C::Transport>, pin: &str) -> Result<RawFiles> {
        card.select_application(&self.config.application_id)
            .map_err(Error::ApplicationNotSelected)?;

        // Some files are readable without the PIN.
        if let Err(e) = card.verify_pin(pin, self.config.pin_reference) {
            warn!("PIN verification failed: {}", e);
        }

        let personal = card.read_elementary_file(self.config.personal_file);
        let document = card.read_elementary_file(self.config.document_file);
        let address = self.config.address_files.iter().find_map(|&id| {
            card.read_elementary_file(id).map(|raw| (FileId(id), raw))
        });

        if let Some((id, _)) = &address {
            debug!("Using address file {}", id);
        }

        Ok(RawFiles {
            personal,
            document,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::{self, NoIdentity};
    use crate::ef::Sex;
    use crate::tlv::tests::{encode, sequence};
    use crate::transport::testing::{Script, ScriptedCard};

    struct FixedIdentity(CertificateIdentity);

    impl IdentitySource for FixedIdentity {
        fn read_identity(&self, _: &str) -> certificate::Result<Option<CertificateIdentity>> {
            Ok(Some(self.0.clone()))
        }
    }

    struct FailingIdentity;

    impl IdentitySource for FailingIdentity {
        fn read_identity(&self, _: &str) -> certificate::Result<Option<CertificateIdentity>> {
            Err(certificate::Error::NoToken)
        }
    }

    fn personal() -> Vec<u8> {
        sequence(encode(&[
            (0x80, "POPESCU"),
            (0x81, "ION"),
            (0x82, "M"),
            (0x83, "01011980"),
            (0x84, "1800101394211"),
        ]))
    }

    fn document() -> Vec<u8> {
        sequence(encode(&[
            (0x80, "VN123456"),
            (0x81, "15032021"),
            (0x82, "01012031"),
            (0x83, "SPCLEP Adjud"),
        ]))
    }

    fn script(address: Vec<(u16, Vec<u8>)>) -> Script {
        let mut files = vec![(0x0101, (0x9000, personal())), (0x0104, (0x9000, document()))];
        files.extend(address.into_iter().map(|(id, raw)| (id, (0x9000, raw))));

        Script {
            aid_status: 0x9000,
            verify_status: 0x9000,
            files: files.into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_read() {
        let card = ScriptedCard::new(script(vec![(
            0x0106,
            sequence(encode(&[(0x80, "Str.Republicii nr.261"), (0x81, "Adjud"), (0x82, "VN")])),
        )]));
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        let result = reader.read("1234").unwrap();

        assert_eq!(Some("POPESCU".to_string()), result.personal.surname);
        assert_eq!(Some(Sex::Male), result.personal.sex);
        assert_eq!(Some("01.01.1980".to_string()), result.personal.birthdate);
        assert_eq!(Some("VN123456".to_string()), result.document.document_number);
        assert_eq!(Some("01.01.2031".to_string()), result.document.expiry_date);
        assert_eq!(Some("VN".to_string()), result.address.county_code);
        assert_eq!(None, result.identity_from_certificate);

        assert_eq!(Some(FileId(0x0106)), result.diagnostics.address_file);
        assert_eq!(Some(&"POPESCU".to_string()), result.diagnostics.personal.get("80"));
        assert_eq!(
            Some(&"Adjud".to_string()),
            result.diagnostics.address.as_ref().and_then(|d| d.get("81"))
        );

        let log = card.log();
        assert!(log.connected);
        assert!(log.disconnected);
        assert_eq!(vec![0x0101, 0x0104, 0x0106], log.selected_files());
    }

    #[test]
    fn test_address_fallback() {
        let card = ScriptedCard::new(script(vec![
            (0x0106, vec![]),
            (0x0103, vec![]),
            (0x0102, b"Jud.BC Sat.Sascut (Com.Sascut), Str.Republicii, nr.261".to_vec()),
        ]));
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        let result = reader.read("1234").unwrap();

        assert_eq!(Some(FileId(0x0102)), result.diagnostics.address_file);
        assert_eq!(None, result.diagnostics.address);
        assert_eq!(Some("BC".to_string()), result.address.county_code);
        assert_eq!(
            Some("STR.REPUBLICII, NR.261".to_string()),
            result.address.remainder
        );
        assert_eq!(
            vec![0x0101, 0x0104, 0x0106, 0x0103, 0x0102],
            card.log().selected_files()
        );
    }

    #[test]
    fn test_no_address() {
        let card = ScriptedCard::new(script(vec![]));
        let reader = Reader::new(Config::default(), card, NoIdentity);

        let result = reader.read("1234").unwrap();

        assert_eq!(None, result.diagnostics.address_file);
        assert_eq!(AddressRecord::default(), result.address);
    }

    #[test]
    fn test_no_reader() {
        let card = ScriptedCard::new(Script {
            no_reader: true,
            ..script(vec![])
        });
        let identity = FixedIdentity(CertificateIdentity {
            serial_number: Some("1800101394211".to_string()),
            ..Default::default()
        });
        let reader = Reader::new(Config::default(), card.clone(), identity);

        assert!(matches!(
            reader.read("1234"),
            Err(Error::Connect(transport::Error::ReaderNotFound))
        ));
        assert!(card.log().commands.is_empty());
    }

    #[test]
    fn test_application_not_selected() {
        let card = ScriptedCard::new(Script {
            aid_status: 0x6A82,
            ..script(vec![])
        });
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        assert!(matches!(
            reader.read("1234"),
            Err(Error::ApplicationNotSelected(card::Error::Status(0x6A82)))
        ));

        let log = card.log();
        assert!(log.disconnected);
        assert!(log.selected_files().is_empty());
    }

    #[test]
    fn test_disconnect_failure() {
        let card = ScriptedCard::new(Script {
            disconnect_fails: true,
            ..script(vec![])
        });
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        let result = reader.read("1234").unwrap();

        assert_eq!(Some("POPESCU".to_string()), result.personal.surname);
        assert_eq!(Some("VN123456".to_string()), result.document.document_number);
        assert!(card.log().disconnected);
    }

    #[test]
    fn test_application_not_selected_disconnect_failure() {
        let card = ScriptedCard::new(Script {
            aid_status: 0x6A82,
            disconnect_fails: true,
            ..script(vec![])
        });
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        assert!(matches!(
            reader.read("1234"),
            Err(Error::ApplicationNotSelected(card::Error::Status(0x6A82)))
        ));
        assert!(card.log().disconnected);
    }

    #[test]
    fn test_wrong_pin() {
        let card = ScriptedCard::new(Script {
            verify_status: 0x63C2,
            protected: vec![0x0101],
            ..script(vec![])
        });
        let reader = Reader::new(Config::default(), card.clone(), NoIdentity);

        let result = reader.read("0000").unwrap();

        assert_eq!(PersonalRecord::default(), result.personal);
        assert!(result.diagnostics.personal.is_empty());
        assert_eq!(Some("SPCLEP Adjud".to_string()), result.document.issuer);
        assert!(card.log().disconnected);
    }

    #[test]
    fn test_identity() {
        let identity = CertificateIdentity {
            surname: Some("POPESCU".to_string()),
            ..Default::default()
        };
        let card = ScriptedCard::new(script(vec![]));
        let reader = Reader::new(Config::default(), card, FixedIdentity(identity.clone()));

        assert_eq!(
            Some(identity),
            reader.read("1234").unwrap().identity_from_certificate
        );
    }

    #[test]
    fn test_identity_failure() {
        let card = ScriptedCard::new(script(vec![]));
        let reader = Reader::new(Config::default(), card, FailingIdentity);

        let result = reader.read("1234").unwrap();

        assert_eq!(None, result.identity_from_certificate);
        assert_eq!(Some("ION".to_string()), result.personal.given_name);
    }

    #[cfg(feature = "pkcs11")]
    #[test]
    fn test_missing_module() {
        let config = Config::default().with_module_path("/nonexistent/idplug-pkcs11.so");
        let source = certificate::Pkcs11Source::from(&config);
        let reader = Reader::new(config, ScriptedCard::new(script(vec![])), source);

        let result = reader.read("1234").unwrap();

        assert_eq!(None, result.identity_from_certificate);
        assert_eq!(
            Some("1800101394211".to_string()),
            result.personal.national_id
        );
    }

    #[test]
    fn test_file_id() {
        assert_eq!("0x0102", FileId(0x0102).to_string());
        assert_eq!("0xABCD", FileId(0xABCD).to_string());
    }
}
