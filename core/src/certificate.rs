//! Identity read from the certificates stored on the card token.
//!
//! The token is reached through the vendor PKCS#11 module, independently of the APDU session. The
//! subject of the certificate issued to the holder carries their name, national identifier and
//! domicile, which serves as a cross-check for the data read from the elementary files.

use std::path::PathBuf;

#[cfg(feature = "pkcs11")]
use bcder::Oid;
#[cfg(feature = "pkcs11")]
use bytes::Bytes;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(all(feature = "pkcs11", feature = "tracing"))]
use tracing::debug;
#[cfg(feature = "pkcs11")]
use x509_certificate::X509Certificate;

#[cfg(feature = "pkcs11")]
use crate::config::Config;
#[cfg(feature = "pkcs11")]
use crate::pkcs::attribute::{Attribute, ObjectClass};
#[cfg(feature = "pkcs11")]
use crate::pkcs::slot::OpenSessionCfg;
#[cfg(feature = "pkcs11")]
use crate::pkcs::Pkcs11;

// Attribute types of the subject, encoded as OID contents.
#[cfg(feature = "pkcs11")]
mod oid {
    pub(super) const COMMON_NAME: &[u8] = &[85, 4, 3];
    pub(super) const SURNAME: &[u8] = &[85, 4, 4];
    pub(super) const SERIAL_NUMBER: &[u8] = &[85, 4, 5];
    pub(super) const COUNTRY: &[u8] = &[85, 4, 6];
    pub(super) const LOCALITY: &[u8] = &[85, 4, 7];
    pub(super) const STATE: &[u8] = &[85, 4, 8];
    pub(super) const STREET_ADDRESS: &[u8] = &[85, 4, 9];
    pub(super) const POSTAL_CODE: &[u8] = &[85, 4, 17];
    pub(super) const GIVEN_NAME: &[u8] = &[85, 4, 42];
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("PKCS#11 module not found at {}", .0.display())]
    NoDriver(PathBuf),

    #[error("No token is present in any slot")]
    NoToken,

    #[cfg(feature = "pkcs11")]
    #[error("Error occurred in the PKCS#11 module: {0}")]
    Pkcs11(#[from] pkcs11::errors::Error),

    #[error("Could not decode the certificate: {0}")]
    Decode(String),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Subject attributes of the certificate issued to the holder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CertificateIdentity {
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub common_name: Option<String>,
    /// The national identifier for personal certificates.
    pub serial_number: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl CertificateIdentity {
    /// Determines whether the serial number is made of digits only.
    pub fn has_numeric_serial(&self) -> bool {
        self.serial_number
            .as_deref()
            .map(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }
}

/// A source of the identity of the holder, read with their PIN.
pub trait IdentitySource {
    /// Reads the identity, or `None` if the token holds no certificate.
    fn read_identity(&self, pin: &str) -> Result<Option<CertificateIdentity>>;
}

/// Skips the certificate step entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIdentity;

impl IdentitySource for NoIdentity {
    fn read_identity(&self, _: &str) -> Result<Option<CertificateIdentity>> {
        Ok(None)
    }
}

/// Decodes the subject of a DER encoded X.509 certificate.
#[cfg(feature = "pkcs11")]
pub fn identity_from_der(der: &[u8]) -> Result<CertificateIdentity> {
    let certificate = X509Certificate::from_der(der).map_err(|e| Error::Decode(e.to_string()))?;
    let subject = certificate.subject_name();
    let field = |oid: &[u8]| {
        subject
            .find_first_attribute_string(Oid(Bytes::copy_from_slice(oid)))
            .map_err(|e| Error::Decode(e.to_string()))
    };

    Ok(CertificateIdentity {
        surname: field(oid::SURNAME)?,
        given_name: field(oid::GIVEN_NAME)?,
        common_name: field(oid::COMMON_NAME)?,
        serial_number: field(oid::SERIAL_NUMBER)?,
        street_address: field(oid::STREET_ADDRESS)?,
        postal_code: field(oid::POSTAL_CODE)?,
        locality: field(oid::LOCALITY)?,
        state: field(oid::STATE)?,
        country: field(oid::COUNTRY)?,
    })
}

/// Picks the identity among the certificates, in the order of the token.
///
/// The first certificate with a numeric serial number wins, otherwise the first certificate.
/// Certificates after the winner are never decoded.
#[cfg(feature = "pkcs11")]
pub fn select_identity<D>(certificates: &[D]) -> Result<Option<CertificateIdentity>>
where
    D: AsRef<[u8]>,
{
    let mut first = None;

    for der in certificates {
        let identity = identity_from_der(der.as_ref())?;
        if identity.has_numeric_serial() {
            return Ok(Some(identity));
        }

        first.get_or_insert(identity);
    }

    Ok(first)
}

/// Reads the certificates through the PKCS#11 module of the card vendor.
#[cfg(feature = "pkcs11")]
#[derive(Debug, Clone)]
pub struct Pkcs11Source {
    module_path: PathBuf,
}

#[cfg(feature = "pkcs11")]
impl Pkcs11Source {
    pub fn new<P>(module_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            module_path: module_path.into(),
        }
    }
}

#[cfg(feature = "pkcs11")]
impl From<&Config> for Pkcs11Source {
    fn from(config: &Config) -> Self {
        Self::new(config.module_path.clone())
    }
}

#[cfg(feature = "pkcs11")]
impl IdentitySource for Pkcs11Source {
    fn read_identity(&self, pin: &str) -> Result<Option<CertificateIdentity>> {
        if !self.module_path.is_file() {
            return Err(Error::NoDriver(self.module_path.clone()));
        }

        let pkcs11 = Pkcs11::open(&self.module_path)?;
        let slot = pkcs11
            .get_slots(true)?
            .into_iter()
            .next()
            .ok_or(Error::NoToken)?;

        debug!("Using PKCS#11 slot {}", slot.id());

        let session = slot.open_session(OpenSessionCfg::default())?;
        session.login(pin)?;

        let certificates = session
            .finder()
            .find_all(&[Attribute::Class(ObjectClass::Certificate)])?
            .iter()
            .map(|object| {
                #[cfg(feature = "tracing")]
                if let Ok(Some(label)) = object.label() {
                    debug!("Found certificate: {}", label);
                }

                object.value()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        select_identity(&certificates)
    }
}
