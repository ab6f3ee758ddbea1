//! Communicating with the card through a reader delegate.
//!
//! The protocol layer only ever sees raw command octets going out and raw response octets coming
//! back, so readers can be swapped: the PC/SC backend in [`crate::pcsc`], or a scripted card in
//! tests.

/// Status word of a successful command.
pub const SW_OK: u16 = 0x9000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(feature = "pcsc")]
    #[error("Error occurred while communicating with PC/SC: {0}")]
    PcscError(#[from] pcsc::Error),

    #[error("Reader not found on PC/SC service")]
    ReaderNotFound,

    #[error("No card is present in the reader")]
    NoCard,

    #[error("The reader has been disconnected")]
    Disconnected,
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// A delegate to transmit APDU commands to the card.
pub trait Transport {
    /// Transmits the command octets, then returns the response octets including the status word.
    fn transmit(&self, command: &[u8]) -> Result<Vec<u8>>;

    /// Releases the connection to the card.
    fn disconnect(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens connections to a card through the first reader available.
pub trait Connector {
    type Transport: Transport;

    /// Connects to the card inserted into the first reader found.
    fn connect(&self) -> Result<Self::Transport>;
}

/// A response that was received from the card.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    status: u16,
}

impl From<Vec<u8>> for Response {
    fn from(mut bytes: Vec<u8>) -> Self {
        let sw2 = bytes.pop();
        let sw1 = bytes.pop();

        Self {
            payload: bytes,
            status: match (sw1, sw2) {
                (Some(a), Some(b)) => u16::from_be_bytes([a, b]),
                _ => 0x0000,
            },
        }
    }
}

impl Response {
    /// Combined status word (SW1 SW2).
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Length of the payload without the status word.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Determines whether the response carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Determines whether the command succeeded (`90 00`).
    pub fn is_ok(&self) -> bool {
        self.status == SW_OK
    }

    /// Determines whether a file was selected, i.e. `90 00` or a `62 XX` warning.
    pub fn is_selected(&self) -> bool {
        self.is_ok() || self.status & 0xFF00 == 0x6200
    }

    /// Takes the payload out of the response.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
