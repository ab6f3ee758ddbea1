use apdu::{command, Command};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::transport::{self, Response, Transport};

const SELECT_P1_DF: u8 = 0x04;
const SELECT_P1_EF: u8 = 0x02;
const SELECT_P2: u8 = 0x0C;

const INS_VERIFY: u8 = 0x20;
const HEADER_LENGTH: usize = 5;

const PIN_LENGTH: usize = 12;
const PIN_PADDING: u8 = 0xFF;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error occurred while communicating with the reader: {0}")]
    Transport(#[from] transport::Error),

    #[error("The card returned an error ({0:#06X})")]
    Status(u16),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// An adapter to communicate with the card through the delegate
#[derive(Debug)]
pub struct Card<T>
where
    T: Transport,
{
    delegate: T,
}

impl<T> Card<T>
where
    T: Transport,
{
    /// Initiates an adapter with the delegate.
    pub fn new(delegate: T) -> Self {
        Self { delegate }
    }

    /// Selects a DF (an application) with their name.
    pub fn select_application(&self, name: &[u8]) -> Result<()> {
        let response = self.handle(command::select_file(
            SELECT_P1_DF,
            SELECT_P2,
            name,
        ))?;

        match response.is_ok() {
            true => Ok(()),
            _ => Err(Error::Status(response.status())),
        }
    }

    /// Selects a EF under the current DF with their identifier.
    /// Warnings (`62 XX`) still leave the file selected.
    pub fn select_elementary_file(&self, id: u16) -> Result<()> {
        let response = self.handle(command::select_file(
            SELECT_P1_EF,
            SELECT_P2,
            &id.to_be_bytes(),
        ))?;

        match response.is_selected() {
            true => Ok(()),
            _ => Err(Error::Status(response.status())),
        }
    }

    /// Reads the whole selected file at once.
    pub fn read_binary_full(&self) -> Result<Vec<u8>> {
        let response = self.handle(command::read_binary(0x00, 0x00, 0x00))?;

        match response.is_ok() {
            true => Ok(response.into_payload()),
            _ => Err(Error::Status(response.status())),
        }
    }

    /// Verifies the PIN against the reference.
    /// The PIN is padded with `FF` to 12 octets, or truncated if longer.
    pub fn verify_pin(&self, pin: &str, reference: u8) -> Result<()> {
        let pin = pad_pin(pin);
        let response = self.handle(command::verify(reference, &pin))?;

        match response.is_ok() {
            true => Ok(()),
            _ => Err(Error::Status(response.status())),
        }
    }

    /// Selects the EF then reads it whole.
    /// Any failure only loses this file, leaving the session usable.
    pub fn read_elementary_file(&self, id: u16) -> Option<Vec<u8>> {
        match self.select_elementary_file(id).and_then(|_| self.read_binary_full()) {
            Ok(content) if !content.is_empty() => Some(content),
            Ok(_) => {
                debug!("EF {:04X} is empty", id);
                None
            }
            Err(e) => {
                debug!("EF {:04X} is not readable: {}", id, e);
                None
            }
        }
    }

    /// Disconnects from the card, consuming the adapter.
    pub fn disconnect(self) -> Result<()> {
        self.delegate.disconnect().map_err(Error::Transport)
    }

    fn handle<'c>(&self, command: impl Into<Command<'c>>) -> Result<Response> {
        let tx = Vec::from(command.into());
        let response = Response::from(self.delegate.transmit(&tx)?);

        debug!(
            "APDU {} -> SW={:04X} len={}",
            describe(&tx),
            response.status(),
            response.len()
        );

        Ok(response)
    }
}

fn pad_pin(pin: &str) -> Vec<u8> {
    let mut padded = pin.as_bytes().to_vec();
    padded.resize(PIN_LENGTH, PIN_PADDING);
    padded
}

/// Formats the command for logs, masking the data field of VERIFY.
fn describe(tx: &[u8]) -> String {
    match tx.get(1) {
        Some(&INS_VERIFY) if tx.len() > HEADER_LENGTH => {
            format!("{} **", hex::encode_upper(&tx[..HEADER_LENGTH]))
        }
        _ => hex::encode_upper(tx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{Script, ScriptedCard};

    const AID: [u8; 3] = [0xE8, 0x28, 0xBD];

    fn card(script: Script) -> (Card<ScriptedCard>, ScriptedCard) {
        let scripted = ScriptedCard::new(script);
        (Card::new(scripted.clone()), scripted)
    }

    #[test]
    fn test_select_df() {
        let (card, scripted) = card(Script {
            aid_status: 0x9000,
            ..Default::default()
        });

        assert!(card.select_application(&AID).is_ok());
        assert_eq!(
            vec![0x00, 0xA4, 0x04, 0x0C, 0x03, 0xE8, 0x28, 0xBD],
            scripted.log().commands[0]
        );
    }

    #[test]
    fn test_select_df_failure() {
        let (card, _) = card(Script {
            aid_status: 0x6A82,
            ..Default::default()
        });

        assert!(matches!(card.select_application(&AID), Err(Error::Status(0x6A82))));
    }

    #[test]
    fn test_verify_pads_pin() {
        let (card, scripted) = card(Script {
            verify_status: 0x9000,
            ..Default::default()
        });

        assert!(card.verify_pin("1234", 0x03).is_ok());

        let mut expected = vec![0x00, 0x20, 0x00, 0x03, 0x0C, b'1', b'2', b'3', b'4'];
        expected.extend([0xFF; 8]);
        assert_eq!(expected, scripted.log().commands[0]);
    }

    #[test]
    fn test_verify_truncates_pin() {
        assert_eq!(b"123456789012".to_vec(), pad_pin("1234567890123456"));
    }

    #[test]
    fn test_verify_failure() {
        let (card, _) = card(Script {
            verify_status: 0x63C2,
            ..Default::default()
        });

        assert!(matches!(card.verify_pin("0000", 0x03), Err(Error::Status(0x63C2))));
    }

    #[test]
    fn test_read_ef() {
        let (card, scripted) = card(Script {
            files: [(0x0101, (0x9000, vec![0x30, 0x00]))].into_iter().collect(),
            ..Default::default()
        });

        assert_eq!(Some(vec![0x30, 0x00]), card.read_elementary_file(0x0101));
        assert_eq!(
            vec![0x00, 0xA4, 0x02, 0x0C, 0x02, 0x01, 0x01],
            scripted.log().commands[0]
        );
        assert_eq!(vec![0x00, 0xB0, 0x00, 0x00, 0x00], scripted.log().commands[1]);
    }

    #[test]
    fn test_read_ef_after_warning() {
        let (card, _) = card(Script {
            files: [(0x0104, (0x6283, b"data".to_vec()))].into_iter().collect(),
            ..Default::default()
        });

        assert_eq!(Some(b"data".to_vec()), card.read_elementary_file(0x0104));
    }

    #[test]
    fn test_read_ef_failures() {
        let (card, scripted) = card(Script {
            files: [
                (0x0102, (0x9000, b"secret".to_vec())),
                (0x0103, (0x9000, vec![])),
            ]
            .into_iter()
            .collect(),
            protected: vec![0x0102],
            ..Default::default()
        });

        assert_eq!(None, card.read_elementary_file(0x0106));
        assert_eq!(None, card.read_elementary_file(0x0102));
        assert_eq!(None, card.read_elementary_file(0x0103));

        // The missing file is not read at all.
        assert_eq!(5, scripted.log().commands.len());
    }

    #[test]
    fn test_describe_masks_pin() {
        let pin = pad_pin("1234");
        let command: Command = command::verify(0x03, &pin).into();
        let tx = Vec::from(command);

        assert_eq!("002000030C **", describe(&tx));
        assert_eq!("00B0000000", describe(&[0x00, 0xB0, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn test_log_arguments_not_evaluated() {
        let tx = vec![0x00, 0xB0, 0x00, 0x00, 0x00];
        let calls = std::cell::Cell::new(0);
        let count = || calls.set(calls.get() + 1);

        debug!("APDU {} {:?}", describe(&tx), count());

        assert_eq!(0, calls.get());
        assert_eq!(5, tx.len());
    }

    #[test]
    fn test_disconnect() {
        let (card, scripted) = card(Script::default());

        assert!(card.disconnect().is_ok());
        assert!(scripted.log().disconnected);
    }
}
