//! The log facade: append, batch append, and read-by-position.
//!
//! All writer state lives behind one internal mutex, so concurrent callers
//! (committing transactions and the engine's lazy-eviction path) serialize
//! here without any external locking.

use super::config::WalConfig;
use super::frame::{self, FrameRead};
use super::segment::{WalSegment, SEGMENT_HEADER_SIZE};
use super::{SyncPolicy, WalError};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Segmented append-only log.
pub struct Wal {
    dir: PathBuf,
    sync: SyncPolicy,
    inner: Mutex<WalInner>,
}

struct WalInner {
    config: WalConfig,
    active: WalSegment,
    segment_count: u64,
    cursor: Option<SegmentCursor>,
}

/// Cached sequential read position. Replay reads entries in order, so the
/// common case is "next entry of the same segment" without reopening.
struct SegmentCursor {
    segment: u64,
    next_entry: u64,
    file: BufReader<File>,
}

impl Wal {
    /// Open the log in `dir`, resuming the latest segment or creating the
    /// first one.
    pub fn open(
        dir: impl AsRef<Path>,
        config: WalConfig,
        sync: SyncPolicy,
    ) -> Result<Self, WalError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let existing = list_segments(&dir)?;
        let (active, segment_count) = match existing.last() {
            Some(&latest) => (WalSegment::open_append(&dir, latest)?, latest),
            None => (WalSegment::create(&dir, 1)?, 1),
        };

        debug!(
            dir = %dir.display(),
            segments = segment_count,
            "opened append-only log"
        );

        Ok(Wal {
            dir,
            sync,
            inner: Mutex::new(WalInner {
                config,
                active,
                segment_count,
                cursor: None,
            }),
        })
    }

    /// Append one entry, respecting the fsync policy.
    pub fn append(&self, payload: &[u8]) -> Result<(), WalError> {
        let mut buf = Vec::with_capacity(payload.len() + frame::FRAME_OVERHEAD);
        frame::write_frame(&mut buf, payload);

        let mut inner = self.inner.lock();
        inner.rotate_if_needed(&self.dir, buf.len() as u64)?;
        inner.active.write(&buf)?;
        if self.sync.requires_fsync() {
            inner.active.sync()?;
        }
        Ok(())
    }

    /// Append a batch of entries as one write and at most one fsync.
    ///
    /// The whole batch lands in a single segment, so replay sees either all
    /// of it or a truncated tail that recovery discards.
    pub fn append_batch(&self, batch: &[Vec<u8>]) -> Result<(), WalError> {
        if batch.is_empty() {
            return Ok(());
        }

        let total: usize = batch
            .iter()
            .map(|payload| payload.len() + frame::FRAME_OVERHEAD)
            .sum();
        let mut buf = Vec::with_capacity(total);
        for payload in batch {
            frame::write_frame(&mut buf, payload);
        }

        let mut inner = self.inner.lock();
        inner.rotate_if_needed(&self.dir, buf.len() as u64)?;
        inner.active.write(&buf)?;
        if self.sync.requires_fsync() {
            inner.active.sync()?;
        }
        Ok(())
    }

    /// Number of segments. Segment indices run `1..=segments()`.
    pub fn segments(&self) -> u64 {
        self.inner.lock().segment_count
    }

    /// Read the entry at `(segment, entry)`.
    ///
    /// Returns `WalError::Eof` once the cursor passes the segment's last
    /// entry; callers iterate entries `0..` until then.
    pub fn read(&self, segment: u64, entry: u64) -> Result<Vec<u8>, WalError> {
        let mut inner = self.inner.lock();
        if segment == 0 || segment > inner.segment_count {
            return Err(WalError::SegmentNotFound(segment));
        }

        let reuse = matches!(
            &inner.cursor,
            Some(c) if c.segment == segment && c.next_entry == entry
        );
        if !reuse {
            inner.cursor = Some(Self::seek_cursor(&self.dir, segment, entry)?);
        }

        let cursor = inner.cursor.as_mut().unwrap();
        match frame::read_frame(&mut cursor.file)? {
            FrameRead::Entry(payload) => {
                cursor.next_entry += 1;
                Ok(payload)
            }
            FrameRead::Eof => {
                inner.cursor = None;
                Err(WalError::Eof)
            }
        }
    }

    /// Flush the active segment to stable storage.
    pub fn sync(&self) -> Result<(), WalError> {
        self.inner.lock().active.sync()?;
        Ok(())
    }

    /// Flush and release. The `Wal` is unusable afterwards only by
    /// convention; the engine drops its handle after calling this.
    pub fn close(&self) -> Result<(), WalError> {
        self.sync()
    }

    fn seek_cursor(dir: &Path, segment: u64, entry: u64) -> Result<SegmentCursor, WalError> {
        let file = WalSegment::open_read(dir, segment)?;
        let mut cursor = SegmentCursor {
            segment,
            next_entry: 0,
            file: BufReader::new(file),
        };
        while cursor.next_entry < entry {
            match frame::read_frame(&mut cursor.file)? {
                FrameRead::Entry(_) => cursor.next_entry += 1,
                FrameRead::Eof => return Err(WalError::Eof),
            }
        }
        Ok(cursor)
    }
}

impl WalInner {
    /// Start a new segment when the incoming write would overflow the
    /// active one. A write larger than the segment limit still goes into
    /// its own fresh segment.
    fn rotate_if_needed(&mut self, dir: &Path, incoming: u64) -> Result<(), WalError> {
        let has_entries = self.active.size() > SEGMENT_HEADER_SIZE as u64;
        if has_entries && self.active.size() + incoming > self.config.segment_size {
            self.active.sync()?;
            let next = self.segment_count + 1;
            self.active = WalSegment::create(dir, next)?;
            self.segment_count = next;
            debug!(segment = next, "rotated to new log segment");
        }
        Ok(())
    }
}

/// Attempt to flush when the log handle is dropped without `close`.
impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.inner.lock().active.sync() {
            error!("failed to sync log on drop: {}", e);
        }
    }
}

/// Sorted list of segment numbers present in `dir`.
fn list_segments(dir: &Path) -> Result<Vec<u64>, WalError> {
    let mut segments = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        // Expected: "wal-NNNNNN.seg" — "wal-" (4) + 6 digits + ".seg" (4).
        if name.starts_with("wal-") && name.ends_with(".seg") && name.len() >= 14 {
            if let Ok(num) = name[4..10].parse::<u64>() {
                segments.push(num);
            }
        }
    }
    segments.sort_unstable();
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn open_small(dir: &Path) -> Wal {
        Wal::open(dir, WalConfig::for_testing(), SyncPolicy::Always).unwrap()
    }

    /// Read every entry of every segment, in order.
    fn read_all(wal: &Wal) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for segment in 1..=wal.segments() {
            let mut entry = 0;
            loop {
                match wal.read(segment, entry) {
                    Ok(payload) => {
                        out.push(payload);
                        entry += 1;
                    }
                    Err(WalError::Eof) => break,
                    Err(e) => panic!("unexpected read error: {}", e),
                }
            }
        }
        out
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());

        wal.append(b"one").unwrap();
        wal.append(b"two").unwrap();

        assert_eq!(read_all(&wal), vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_eof_signal() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());
        wal.append(b"only").unwrap();

        assert!(wal.read(1, 0).is_ok());
        assert!(matches!(wal.read(1, 1), Err(WalError::Eof)));
        // Out-of-range segment index.
        assert!(matches!(wal.read(2, 0), Err(WalError::SegmentNotFound(2))));
        assert!(matches!(wal.read(0, 0), Err(WalError::SegmentNotFound(0))));
    }

    #[test]
    fn test_random_access_reopens_cursor() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());
        for i in 0..5u8 {
            wal.append(&[i]).unwrap();
        }

        // Backwards and repeated reads must work, not just sequential ones.
        assert_eq!(wal.read(1, 3).unwrap(), vec![3]);
        assert_eq!(wal.read(1, 0).unwrap(), vec![0]);
        assert_eq!(wal.read(1, 0).unwrap(), vec![0]);
        assert_eq!(wal.read(1, 4).unwrap(), vec![4]);
    }

    #[test]
    fn test_rotation_spans_segments() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());

        let payload = vec![7u8; 200];
        for _ in 0..8 {
            wal.append(&payload).unwrap();
        }

        assert!(wal.segments() > 1, "expected rotation past one segment");
        assert_eq!(read_all(&wal).len(), 8);
    }

    #[test]
    fn test_batch_lands_in_one_segment() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());

        // Nearly fill the first segment, then batch past the limit.
        wal.append(&vec![1u8; 400]).unwrap();
        let batch: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; 100]).collect();
        wal.append_batch(&batch).unwrap();

        assert_eq!(wal.segments(), 2);
        // Segment 1 holds only the first entry; the batch is whole in 2.
        assert!(wal.read(1, 0).is_ok());
        assert!(matches!(wal.read(1, 1), Err(WalError::Eof)));
        for i in 0..4 {
            assert_eq!(wal.read(2, i).unwrap(), vec![i as u8; 100]);
        }
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = tempdir().unwrap();
        let wal = open_small(dir.path());
        wal.append_batch(&[]).unwrap();
        assert!(matches!(wal.read(1, 0), Err(WalError::Eof)));
    }

    #[test]
    fn test_reopen_resumes_segment() {
        let dir = tempdir().unwrap();
        {
            let wal = open_small(dir.path());
            wal.append(b"before").unwrap();
            wal.close().unwrap();
        }

        let wal = open_small(dir.path());
        assert_eq!(wal.segments(), 1);
        wal.append(b"after").unwrap();

        assert_eq!(read_all(&wal), vec![b"before".to_vec(), b"after".to_vec()]);
    }

    #[test]
    fn test_garbage_tail_tolerated() {
        let dir = tempdir().unwrap();
        {
            let wal = open_small(dir.path());
            wal.append(b"good").unwrap();
            wal.close().unwrap();
        }

        // Simulate a crash-torn write at the tail.
        let path = WalSegment::segment_path(dir.path(), 1);
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(&[0xFF; 10]).unwrap();
        drop(file);

        let wal = open_small(dir.path());
        assert_eq!(wal.read(1, 0).unwrap(), b"good".to_vec());
        assert!(matches!(wal.read(1, 1), Err(WalError::Eof)));
    }

    #[test]
    fn test_corrupt_payload_is_invalid_crc() {
        let dir = tempdir().unwrap();
        {
            let wal = open_small(dir.path());
            wal.append(b"aaaaaaaa").unwrap();
            wal.close().unwrap();
        }

        // Flip one payload byte in place.
        let path = WalSegment::segment_path(dir.path(), 1);
        let mut bytes = std::fs::read(&path).unwrap();
        let idx = SEGMENT_HEADER_SIZE + 4 + 2;
        bytes[idx] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();

        let wal = open_small(dir.path());
        assert!(matches!(wal.read(1, 0), Err(WalError::InvalidCrc)));
    }

    #[test]
    fn test_no_sync_policy_still_readable() {
        let dir = tempdir().unwrap();
        let wal = Wal::open(dir.path(), WalConfig::for_testing(), SyncPolicy::Never).unwrap();
        wal.append(b"lazy").unwrap();
        assert_eq!(wal.read(1, 0).unwrap(), b"lazy".to_vec());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_batches_round_trip_across_reopen(
            batches in proptest::collection::vec(
                proptest::collection::vec(
                    proptest::collection::vec(any::<u8>(), 0..64),
                    1..4,
                ),
                1..6,
            )
        ) {
            let dir = tempdir().unwrap();
            let expected: Vec<Vec<u8>> = batches.iter().flatten().cloned().collect();

            {
                let wal = open_small(dir.path());
                for batch in &batches {
                    wal.append_batch(batch).unwrap();
                }
                wal.close().unwrap();
            }

            let wal = open_small(dir.path());
            prop_assert_eq!(read_all(&wal), expected);
        }
    }
}
