//! PC/SC support for the card reader.
//! Can be enabled by turning `pcsc` feature on.
//!
//! ## Supported platform
//! Linux, Windows and macOS are supported by pcsc-rust, backend of this implementation.
//! Linux requires the pcsc-lite shared library and its daemon running.
//! Refer the documentation of pcsc-rust for details:
//! <https://github.com/bluetech/pcsc-rust>
//!
//! ## Usage
//! ```rust,no_run
//! use cei::pcsc::Context;
//! use cei::{Config, NoIdentity, Reader};
//!
//! let ctx = Context::try_new().unwrap();
//! let reader = Reader::new(Config::default(), ctx, NoIdentity);
//! let result = reader.read("1234").unwrap();
//! ```

use std::ffi::CString;

use pcsc::{Card, Disposition, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::transport::{Connector, Error, Result, Transport};

impl Error {
    fn from_pcsc(e: pcsc::Error) -> Self {
        match e {
            pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader => Self::ReaderNotFound,
            pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard => Self::NoCard,
            _ => Self::PcscError(e),
        }
    }
}

/// PC/SC context.
pub struct Context {
    ctx: pcsc::Context,
}

impl Context {
    /// Creates a PC/SC context in user scope.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            ctx: pcsc::Context::establish(Scope::User).map_err(Error::from_pcsc)?,
        })
    }

    /// Lists names of the readers attached.
    pub fn readers(&self) -> Result<Vec<String>> {
        let mut buf = [0u8; 2048];

        match self.ctx.list_readers(&mut buf) {
            Ok(readers) => Ok(readers
                .map(|reader| reader.to_string_lossy().into_owned())
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(vec![]),
            Err(e) => Err(Error::from_pcsc(e)),
        }
    }

    fn first_reader(&self) -> Result<CString> {
        let mut buf = [0u8; 2048];

        let reader = self
            .ctx
            .list_readers(&mut buf)
            .map_err(Error::from_pcsc)?
            .next()
            .ok_or(Error::ReaderNotFound)?
            .to_owned();

        debug!("Using reader: {}", reader.to_string_lossy());

        Ok(reader)
    }
}

impl Connector for Context {
    type Transport = PcscCard;

    /// Connects to the card in the first reader, failing if no card is inserted.
    fn connect(&self) -> Result<PcscCard> {
        let reader = self.first_reader()?;
        let card = self
            .ctx
            .connect(&reader, ShareMode::Shared, Protocols::ANY)
            .map_err(Error::from_pcsc)?;

        debug!("Connected to the card");

        Ok(PcscCard { card })
    }
}

/// A card to be communicated through PC/SC.
pub struct PcscCard {
    card: Card,
}

impl Transport for PcscCard {
    fn transmit(&self, tx: &[u8]) -> Result<Vec<u8>> {
        let mut rx = [0u8; MAX_BUFFER_SIZE];
        let rx = self.card.transmit(tx, &mut rx).map_err(Error::from_pcsc)?;

        trace!("RX: {}", hex::encode_upper(rx));

        Ok(Vec::from(rx))
    }

    fn disconnect(self) -> Result<()> {
        self.card
            .disconnect(Disposition::LeaveCard)
            .map_err(|(_, e)| Error::from_pcsc(e))
    }
}
