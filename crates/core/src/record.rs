//! Log-record codec.
//!
//! Every state-changing operation is journaled as one record. The encoded
//! form is a fixed 22-byte big-endian header followed by three variable
//! byte fields:
//!
//! ```text
//! ┌──────────┬─────────────┬────────────┬────────────┬───────────────┐
//! │ key len  │ member len  │ value len  │ state      │ timestamp     │
//! │ u32      │ u32         │ u32        │ u16        │ u64           │
//! ├──────────┴─────────────┴────────────┴────────────┴───────────────┤
//! │ key bytes │ member bytes │ value bytes                           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The state field packs the data type tag in its high byte and the op mark
//! in its low byte. The timestamp carries wall-clock nanoseconds at write
//! time, except for expire records where it carries the absolute deadline in
//! unix seconds.

use crate::clock;
use crate::error::{Error, Result};
use crate::types::DataType;
use byteorder::{BigEndian, ByteOrder};

/// Size of the fixed record header in bytes.
pub const RECORD_HEADER_SIZE: usize = 22;

/// One journaled mutation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// User key. Never empty in a valid record.
    pub key: Vec<u8>,
    /// Second operand: hash field, set member, zset member, or the string
    /// value (string values travel in the member field).
    pub member: Vec<u8>,
    /// Third operand: hash value, smove destination, or zset score text.
    pub value: Vec<u8>,
    /// High byte: data type tag. Low byte: op mark.
    pub state: u16,
    /// Write-time nanoseconds, or the expire deadline in unix seconds.
    pub timestamp: u64,
}

impl Record {
    /// Build a record with no value field, stamped with the current time.
    pub fn new(key: &[u8], member: &[u8], data_type: DataType, mark: u16) -> Self {
        Record {
            key: key.to_vec(),
            member: member.to_vec(),
            value: Vec::new(),
            state: pack_state(data_type, mark),
            timestamp: clock::unix_nanos(),
        }
    }

    /// Build a record carrying all three fields.
    pub fn with_value(
        key: &[u8],
        member: &[u8],
        value: &[u8],
        data_type: DataType,
        mark: u16,
    ) -> Self {
        Record {
            key: key.to_vec(),
            member: member.to_vec(),
            value: value.to_vec(),
            state: pack_state(data_type, mark),
            timestamp: clock::unix_nanos(),
        }
    }

    /// Build an expire record whose timestamp is the absolute deadline.
    pub fn with_deadline(
        key: &[u8],
        member: &[u8],
        deadline: i64,
        data_type: DataType,
        mark: u16,
    ) -> Self {
        Record {
            key: key.to_vec(),
            member: member.to_vec(),
            value: Vec::new(),
            state: pack_state(data_type, mark),
            timestamp: deadline as u64,
        }
    }

    /// Data type tag from the state's high byte.
    pub fn data_type(&self) -> Result<DataType> {
        DataType::from_tag(self.state >> 8)
    }

    /// Op mark from the state's low byte.
    pub fn mark(&self) -> u16 {
        self.state & 0xFF
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.key.len() + self.member.len() + self.value.len()
    }

    /// Encode to the wire format.
    ///
    /// Fails with `InvalidEntry` when the key is empty — a zero key length
    /// is reserved as the replay loader's skip marker.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.key.is_empty() {
            return Err(Error::InvalidEntry);
        }

        let mut buf = vec![0u8; self.encoded_len()];
        BigEndian::write_u32(&mut buf[0..4], self.key.len() as u32);
        BigEndian::write_u32(&mut buf[4..8], self.member.len() as u32);
        BigEndian::write_u32(&mut buf[8..12], self.value.len() as u32);
        BigEndian::write_u16(&mut buf[12..14], self.state);
        BigEndian::write_u64(&mut buf[14..22], self.timestamp);

        let ks = self.key.len();
        let ms = self.member.len();
        buf[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + ks].copy_from_slice(&self.key);
        buf[RECORD_HEADER_SIZE + ks..RECORD_HEADER_SIZE + ks + ms].copy_from_slice(&self.member);
        buf[RECORD_HEADER_SIZE + ks + ms..].copy_from_slice(&self.value);

        Ok(buf)
    }

    /// Decode from the wire format, taking owning copies of the byte fields.
    ///
    /// Fails with `InvalidEntry` when the buffer is shorter than the header
    /// or than the lengths the header declares.
    pub fn decode(buf: &[u8]) -> Result<Record> {
        if buf.len() < RECORD_HEADER_SIZE {
            return Err(Error::InvalidEntry);
        }

        let ks = BigEndian::read_u32(&buf[0..4]) as usize;
        let ms = BigEndian::read_u32(&buf[4..8]) as usize;
        let vs = BigEndian::read_u32(&buf[8..12]) as usize;
        let state = BigEndian::read_u16(&buf[12..14]);
        let timestamp = BigEndian::read_u64(&buf[14..22]);

        let total = RECORD_HEADER_SIZE
            .checked_add(ks)
            .and_then(|n| n.checked_add(ms))
            .and_then(|n| n.checked_add(vs))
            .ok_or(Error::InvalidEntry)?;
        if buf.len() < total {
            return Err(Error::InvalidEntry);
        }

        Ok(Record {
            key: buf[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + ks].to_vec(),
            member: buf[RECORD_HEADER_SIZE + ks..RECORD_HEADER_SIZE + ks + ms].to_vec(),
            value: buf[RECORD_HEADER_SIZE + ks + ms..total].to_vec(),
            state,
            timestamp,
        })
    }
}

fn pack_state(data_type: DataType, mark: u16) -> u16 {
    (data_type.tag() << 8) | (mark & 0xFF)
}
