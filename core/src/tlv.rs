//! Flat TLV (tag / length / value) support for the elementary files on the card.
//!
//! Every record file on the card is a single constructed `SEQUENCE` (tag `0x30`) holding a flat
//! list of one-byte context tags. Nested structures never occur, so the decoder makes one pass
//! over the children and does not recurse.

use std::collections::BTreeMap;

/// Tag of the outer `SEQUENCE` that frames a TLV-encoded elementary file.
pub const SEQUENCE: u8 = 0x30;

/// Mapping from a one-byte tag to its value.
/// A later occurrence of a tag overwrites an earlier one.
pub type TlvMap = BTreeMap<u8, Vec<u8>>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unsupported length form ({0:#04X})")]
    UnsupportedLength(u8),

    #[error("Buffer ended while reading at offset {0}")]
    Truncated(usize),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Stateful, simple flat TLV reader.
#[derive(Debug)]
pub struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from the buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Determines whether all octets were consumed.
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    /// Reads a next octet and seeks the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<u8> {
        let byte = *self
            .buffer
            .get(self.cursor)
            .ok_or(Error::Truncated(self.cursor))?;

        self.cursor += 1;
        Ok(byte)
    }

    /// Reads the length field at the current position, seeking the cursor.
    pub fn read_length(&mut self) -> Result<usize> {
        let (length, consumed) = decode_length(self.buffer, self.cursor)?;
        self.cursor += consumed;

        Ok(length)
    }

    /// Reads up to `length` octets and seeks the cursor.
    /// Values running past the end of the buffer are cut at the end.
    pub fn read(&mut self, length: usize) -> &'a [u8] {
        let start = self.cursor.min(self.buffer.len());
        let end = start.saturating_add(length).min(self.buffer.len());
        self.cursor = end;

        &self.buffer[start..end]
    }

    /// Reads a whole tag / length / value triplet.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8])> {
        let tag = self.next()?;
        let length = self.read_length()?;

        Ok((tag, self.read(length)))
    }
}

/// Decodes the length field at `index`, returning the length and the octets consumed.
///
/// Short form when the high bit is clear, long form otherwise where the low seven bits count the
/// big-endian length octets that follow. The indefinite form (`0x80`) is not supported.
pub fn decode_length(buffer: &[u8], index: usize) -> Result<(usize, usize)> {
    let head = *buffer.get(index).ok_or(Error::Truncated(index))?;
    if head & 0x80 == 0 {
        return Ok((head as usize, 1));
    }

    let count = (head & 0x7F) as usize;
    if count == 0 || count > std::mem::size_of::<usize>() {
        return Err(Error::UnsupportedLength(head));
    }

    let octets = buffer
        .get(index + 1..index + 1 + count)
        .ok_or(Error::Truncated(index + 1))?;

    let length = octets
        .iter()
        .fold(0usize, |size, &octet| (size << 8) | octet as usize);

    Ok((length, 1 + count))
}

/// Decodes a flat list of TLV triplets until the buffer is exhausted.
///
/// Decoding stops at the first triplet that cannot be read, such as a dangling tag or an
/// unsupported length (`FF` padding), keeping the triplets decoded before it.
pub fn decode_flat_tlv(buffer: &[u8]) -> TlvMap {
    let mut reader = Reader::new(buffer);
    let mut map = TlvMap::new();

    while !reader.is_empty() {
        match reader.read_tlv() {
            Ok((tag, value)) => {
                map.insert(tag, value.to_vec());
            }
            Err(_) => break,
        }
    }

    map
}

/// Skips the outer `SEQUENCE` header, returning its children up to the declared length.
/// Returns `None` if the buffer is not framed by a `SEQUENCE`, i.e. carries free text instead.
pub fn unwrap_outer_sequence(raw: &[u8]) -> Option<Result<&[u8]>> {
    match raw.first() {
        Some(&SEQUENCE) => Some(decode_length(raw, 1).map(|(length, consumed)| {
            let start = 1 + consumed;
            let end = start.saturating_add(length).min(raw.len());
            &raw[start..end]
        })),
        _ => None,
    }
}

/// Decodes a `SEQUENCE`-framed file into its flat children.
/// Files that are empty, unframed or with a malformed header yield an empty map.
pub fn decode_framed(raw: &[u8]) -> TlvMap {
    unwrap_outer_sequence(raw)
        .and_then(|inner| inner.ok())
        .map(decode_flat_tlv)
        .unwrap_or_default()
}
