//! Per-entry frame codec.
//!
//! Each logical entry in a segment is framed as:
//!
//! ```text
//! ┌──────────────────┬─────────────────────────┬──────────────────┐
//! │ length (u32 LE)  │ payload (length bytes)  │ crc32 (u32 LE)   │
//! └──────────────────┴─────────────────────────┴──────────────────┘
//! ```
//!
//! The CRC covers the payload only. A frame that cannot be read to
//! completion is treated as the end of the segment — that is the expected
//! shape of a crash-torn tail. A frame that reads completely but fails its
//! checksum is corruption and aborts the caller.

use super::WalError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{ErrorKind, Read};

/// Bytes of framing added around each payload.
pub const FRAME_OVERHEAD: usize = 8;

/// Upper bound on a single frame's payload. A declared length beyond this
/// cannot be a frame we wrote and is treated as tail garbage.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Result of attempting to read one frame.
#[derive(Debug)]
pub enum FrameRead {
    /// A complete, checksum-verified payload.
    Entry(Vec<u8>),
    /// End of readable data: clean end of file, or an unreadable tail.
    Eof,
}

/// Append one framed payload to `buf`.
pub fn write_frame(buf: &mut Vec<u8>, payload: &[u8]) {
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
}

/// Encoded size of a payload once framed.
pub fn framed_len(payload_len: usize) -> u64 {
    (payload_len + FRAME_OVERHEAD) as u64
}

/// Read the next frame from `reader`.
///
/// Returns `FrameRead::Eof` on clean end-of-file and on a truncated or
/// implausible tail (logged at `warn`); returns `WalError::InvalidCrc` when
/// a fully-read payload fails its checksum.
pub fn read_frame(reader: &mut impl Read) -> Result<FrameRead, WalError> {
    let len = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(FrameRead::Eof),
        Err(e) => return Err(WalError::Io(e)),
    };

    if len > MAX_FRAME_LEN {
        tracing::warn!(declared_len = len, "implausible frame length, treating as log tail");
        return Ok(FrameRead::Eof);
    }

    let mut payload = vec![0u8; len as usize];
    if let Err(e) = reader.read_exact(&mut payload) {
        if e.kind() == ErrorKind::UnexpectedEof {
            tracing::warn!(declared_len = len, "truncated frame at log tail");
            return Ok(FrameRead::Eof);
        }
        return Err(WalError::Io(e));
    }

    let stored_crc = match reader.read_u32::<LittleEndian>() {
        Ok(crc) => crc,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            tracing::warn!("frame missing checksum at log tail");
            return Ok(FrameRead::Eof);
        }
        Err(e) => return Err(WalError::Io(e)),
    };

    if stored_crc != crc32fast::hash(&payload) {
        return Err(WalError::InvalidCrc);
    }

    Ok(FrameRead::Entry(payload))
}
