//! WAL segment files.
//!
//! Segments are named `wal-NNNNNN.seg` where `NNNNNN` is a zero-padded
//! segment number. Each file starts with a fixed header that is validated
//! on open; the rest of the file is a run of length-prefixed entry frames.
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Segment header (16 bytes)          │
//! ├────────────────────────────────────┤
//! │ Frame 1                            │
//! ├────────────────────────────────────┤
//! │ Frame 2                            │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a WAL segment file: "EMBR"
pub const SEGMENT_MAGIC: [u8; 4] = *b"EMBR";

/// Current segment format version
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

/// Size of the segment header in bytes
pub const SEGMENT_HEADER_SIZE: usize = 16;

/// Fixed per-segment header: magic, format version, segment number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Magic bytes: "EMBR"
    pub magic: [u8; 4],
    /// Format version for forward compatibility
    pub format_version: u32,
    /// Segment number (monotonically increasing from 1)
    pub segment_number: u64,
}

impl SegmentHeader {
    /// Create a header for a new segment.
    pub fn new(segment_number: u64) -> Self {
        SegmentHeader {
            magic: SEGMENT_MAGIC,
            format_version: SEGMENT_FORMAT_VERSION,
            segment_number,
        }
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; SEGMENT_HEADER_SIZE] {
        let mut bytes = [0u8; SEGMENT_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.segment_number.to_le_bytes());
        bytes
    }

    /// Deserialize a header.
    pub fn from_bytes(bytes: &[u8; SEGMENT_HEADER_SIZE]) -> Option<Self> {
        Some(SegmentHeader {
            magic: bytes[0..4].try_into().ok()?,
            format_version: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
            segment_number: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
        })
    }

    /// Whether the magic bytes match.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC
    }
}

/// Writable handle to one segment file.
///
/// Only the latest segment is ever written; earlier segments are immutable.
pub struct WalSegment {
    file: File,
    segment_number: u64,
    write_position: u64,
    path: PathBuf,
}

impl WalSegment {
    /// Create a new segment file and write its header.
    pub fn create(dir: &Path, segment_number: u64) -> io::Result<Self> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .read(true)
            .open(&path)?;

        let header = SegmentHeader::new(segment_number);
        file.write_all(&header.to_bytes())?;

        Ok(WalSegment {
            file,
            segment_number,
            write_position: SEGMENT_HEADER_SIZE as u64,
            path,
        })
    }

    /// Open an existing segment for appending, validating its header.
    pub fn open_append(dir: &Path, segment_number: u64) -> io::Result<Self> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let header = read_header(&mut file)?;
        if header.segment_number != segment_number {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "segment number mismatch: expected {}, got {}",
                    segment_number, header.segment_number
                ),
            ));
        }

        let write_position = file.seek(SeekFrom::End(0))?;
        Ok(WalSegment {
            file,
            segment_number,
            write_position,
            path,
        })
    }

    /// Open a segment read-only, positioned just past the header.
    pub fn open_read(dir: &Path, segment_number: u64) -> io::Result<File> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new().read(true).open(&path)?;
        read_header(&mut file)?;
        Ok(file)
    }

    /// Path of a segment file: `wal-NNNNNN.seg`.
    pub fn segment_path(dir: &Path, segment_number: u64) -> PathBuf {
        dir.join(format!("wal-{:06}.seg", segment_number))
    }

    /// Append raw bytes at the tail.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.write_position += bytes.len() as u64;
        Ok(())
    }

    /// Flush file contents to stable storage.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Current size in bytes, header included.
    pub fn size(&self) -> u64 {
        self.write_position
    }

    /// Segment number.
    pub fn segment_number(&self) -> u64 {
        self.segment_number
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_header(file: &mut File) -> io::Result<SegmentHeader> {
    let mut header_bytes = [0u8; SEGMENT_HEADER_SIZE];
    file.read_exact(&mut header_bytes)?;
    let header = SegmentHeader::from_bytes(&header_bytes)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid segment header"))?;
    if !header.is_valid() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid segment magic bytes",
        ));
    }
    Ok(header)
}
