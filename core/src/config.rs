//! Fixed parameters of a read, overridable by the caller.

use std::path::PathBuf;

/// Default location of the PKCS#11 module shipped with the card middleware.
pub const DEFAULT_MODULE_PATH: &str =
    r"C:\Program Files\IDEMIA\IDPlugClassic\DLLs\idplug-pkcs11.dll";

/// Name of the EDATA application holding the identity files.
pub const EDATA_AID: [u8; 15] = [
    0xE8, 0x28, 0xBD, 0x08, 0x0F, 0xA0, 0x00, 0x00, 0x01, 0x67, 0x45, 0x44, 0x41, 0x54, 0x41,
];

/// Reference of the PIN protecting the EDATA files.
pub const PIN_REFERENCE: u8 = 0x03;

pub const EF_PERSONAL: u16 = 0x0101;
pub const EF_DOCUMENT: u16 = 0x0104;

/// Files the address may be stored in, by priority.
pub const EF_ADDRESS: [u16; 3] = [0x0106, 0x0103, 0x0102];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the PKCS#11 module used to read the certificates.
    pub module_path: PathBuf,
    pub application_id: Vec<u8>,
    pub pin_reference: u8,
    pub personal_file: u16,
    pub document_file: u16,
    /// Address candidates; the first non-empty one is used.
    pub address_files: Vec<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(DEFAULT_MODULE_PATH),
            application_id: EDATA_AID.to_vec(),
            pin_reference: PIN_REFERENCE,
            personal_file: EF_PERSONAL,
            document_file: EF_DOCUMENT,
            address_files: EF_ADDRESS.to_vec(),
        }
    }
}

impl Config {
    /// Replaces the path of the PKCS#11 module.
    pub fn with_module_path<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.module_path = path.into();
        self
    }
}
