//! A crate to read the Romanian electronic identity card (CEI) through a card reader.
//!
//! Data is read from the EDATA application with plain APDU commands, and optionally cross-checked
//! with the identity in the certificates on the card, read through the PKCS#11 module of the card
//! middleware.
//!
//! ## Features
//! - `pcsc`: PC/SC backend to reach the card through a reader.
//! - `pkcs11` (default): reading the identity from the certificates.
//! - `serde`: serializing the result.
//! - `tracing`: logs, including every APDU exchanged.

// Without tracing, the arguments are still type-checked and borrowed but never evaluated.
#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($t: tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($t: tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($t: tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($t: tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(feature = "pcsc")]
pub mod pcsc;
#[cfg(feature = "pkcs11")]
mod pkcs;

pub mod card;
pub mod certificate;
pub mod config;
pub mod ef;
pub mod reader;
pub mod tlv;
pub mod transport;

pub use card::Card;
#[cfg(feature = "pkcs11")]
pub use certificate::Pkcs11Source;
pub use certificate::{CertificateIdentity, IdentitySource, NoIdentity};
pub use config::Config;
pub use reader::{ReadResult, Reader};
