use crate::commitlog::index::{Index, IndexLookup};
use crate::commitlog::store::Store;
use crate::commitlog::{LogError, Record, SegmentConfig};
use std::convert::TryFrom;
use std::path::{Path, PathBuf};

pub(super) const STORE_EXTENSION: &str = "store";
pub(super) const INDEX_EXTENSION: &str = "index";

/// Segment pairs a store with its index and owns the offsets `[base_offset, next_offset)`.
pub(super) struct Segment {
    base_offset: u64,
    next_offset: u64,
    store: Store,
    index: Index,
    config: SegmentConfig,
}

impl Segment {
    pub(super) fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self, LogError> {
        let mut store = Store::open(segment_path(dir, base_offset, STORE_EXTENSION))?;
        let index = Index::open(
            segment_path(dir, base_offset, INDEX_EXTENSION),
            config.max_index_bytes,
            |position| Ok(store.frame_end(position)?.is_some()),
        )?;

        let (next_offset, used_bytes) = match index.read(IndexLookup::Last) {
            Some((relative, position)) => (
                base_offset + relative as u64 + 1,
                store.frame_end(position)?.unwrap_or_else(|| store.size()),
            ),
            None => (base_offset, 0),
        };
        // Bytes past the last indexed frame belong to an append that never completed.
        if store.size() > used_bytes {
            store.truncate(used_bytes)?;
        }

        Ok(Segment {
            base_offset,
            next_offset,
            store,
            index,
            config,
        })
    }

    /// Assigns the next offset to `record` and persists it. The index bound is a hard limit; the
    /// store bound is checked by [`is_maxed`](Self::is_maxed) after the append.
    pub(super) fn append(&mut self, mut record: Record) -> Result<u64, LogError> {
        if self.index.is_full() {
            return Err(LogError::SegmentFull);
        }
        let relative = u32::try_from(self.next_offset - self.base_offset).map_err(|_| LogError::SegmentFull)?;

        record.offset = self.next_offset;
        let (_, position) = self.store.append(&record.encode())?;
        self.index.write(relative, position)?;

        self.next_offset += 1;
        Ok(record.offset)
    }

    pub(super) fn read(&self, offset: u64) -> Result<Record, LogError> {
        if !self.contains(offset) {
            return Err(LogError::OffsetOutOfRange { offset });
        }
        let relative = (offset - self.base_offset) as u32;
        let (_, position) = self
            .index
            .read(IndexLookup::Relative(relative))
            .ok_or(LogError::OffsetOutOfRange { offset })?;

        let record = Record::decode(self.store.read(position)?)?;
        if record.offset != offset {
            return Err(LogError::Corrupt(format!(
                "index points offset {} at a record stamped {}",
                offset, record.offset
            )));
        }
        Ok(record)
    }

    pub(super) fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.is_full()
    }

    pub(super) fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    pub(super) fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub(super) fn next_offset(&self) -> u64 {
        self.next_offset
    }

    pub(super) fn sync(&self) -> Result<(), LogError> {
        self.store.sync()?;
        self.index.sync()?;
        Ok(())
    }

    pub(super) fn close(self) -> Result<(), LogError> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Closes the segment and deletes both of its files.
    pub(super) fn remove(self, dir: &Path) -> Result<(), LogError> {
        let index_path = segment_path(dir, self.base_offset, INDEX_EXTENSION);
        self.index.close()?;
        self.store.remove()?;
        std::fs::remove_file(index_path)?;
        Ok(())
    }
}

pub(super) fn segment_path(dir: &Path, base_offset: u64, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", base_offset, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::index::ENTRY_WIDTH;
    use bytes::Bytes;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn config(max_store_bytes: u64, max_index_bytes: u64) -> SegmentConfig {
        SegmentConfig {
            max_store_bytes,
            max_index_bytes,
            initial_offset: 0,
        }
    }

    #[test]
    fn fills_up_to_index_bound() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let config = config(1024, ENTRY_WIDTH as u64 * 3);
        let mut segment = Segment::open(dir.path(), 16, config).unwrap();
        assert_eq!(segment.next_offset(), 16);
        assert!(!segment.is_maxed());

        // -- execute --
        for i in 0..3u64 {
            let offset = segment.append(Record::new("hello world")).unwrap();
            assert_eq!(offset, 16 + i);

            let record = segment.read(offset).unwrap();
            assert_eq!(record.value, Bytes::from_static(b"hello world"));
            assert_eq!(record.offset, offset);
        }

        // -- verify --
        assert!(segment.is_maxed());
        assert!(matches!(segment.append(Record::new("x")), Err(LogError::SegmentFull)));
    }

    #[test]
    fn store_bound_marks_segment_maxed() {
        let dir = tempfile::tempdir().unwrap();
        let frame_width = (8 + 8 + "hello world".len()) as u64;
        let mut segment = Segment::open(dir.path(), 0, config(frame_width * 3, 1024)).unwrap();

        for _ in 0..3 {
            segment.append(Record::new("hello world")).unwrap();
        }

        assert!(segment.is_maxed());
    }

    #[test]
    fn reopen_recovers_next_offset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(1024, 1024);

        let mut segment = Segment::open(dir.path(), 16, config).unwrap();
        segment.append(Record::new("a")).unwrap();
        segment.append(Record::new("b")).unwrap();
        segment.close().unwrap();

        let segment = Segment::open(dir.path(), 16, config).unwrap();
        assert_eq!(segment.next_offset(), 18);
        assert_eq!(segment.read(17).unwrap().value, Bytes::from_static(b"b"));
    }

    #[test]
    fn reopen_drops_torn_tail_frame() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let config = config(1024, 1024);
        let store_path = segment_path(dir.path(), 16, STORE_EXTENSION);
        let index_path = segment_path(dir.path(), 16, INDEX_EXTENSION);

        let mut segment = Segment::open(dir.path(), 16, config).unwrap();
        segment.append(Record::new("a")).unwrap();
        segment.append(Record::new("b")).unwrap();
        segment.close().unwrap();
        let complete_size = std::fs::metadata(&store_path).unwrap().len();

        // A crash mid-flush: the index entry landed, only part of the frame did.
        let mut index_file = OpenOptions::new().append(true).open(&index_path).unwrap();
        index_file.write_all(&2u32.to_be_bytes()).unwrap();
        index_file.write_all(&complete_size.to_be_bytes()).unwrap();
        let mut store_file = OpenOptions::new().append(true).open(&store_path).unwrap();
        store_file.write_all(&64u64.to_be_bytes()).unwrap();
        store_file.write_all(b"c").unwrap();
        drop(index_file);
        drop(store_file);

        // -- execute --
        let mut segment = Segment::open(dir.path(), 16, config).unwrap();

        // -- verify --
        assert_eq!(segment.next_offset(), 18);
        assert!(matches!(segment.read(18), Err(LogError::OffsetOutOfRange { offset: 18 })));
        assert_eq!(std::fs::metadata(&store_path).unwrap().len(), complete_size);

        assert_eq!(segment.append(Record::new("c")).unwrap(), 18);
        assert_eq!(segment.read(18).unwrap().value, Bytes::from_static(b"c"));
        assert_eq!(segment.read(17).unwrap().value, Bytes::from_static(b"b"));
    }

    #[test]
    fn read_outside_range_is_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 16, config(1024, 1024)).unwrap();
        segment.append(Record::new("a")).unwrap();

        assert!(matches!(segment.read(15), Err(LogError::OffsetOutOfRange { offset: 15 })));
        assert!(matches!(segment.read(17), Err(LogError::OffsetOutOfRange { offset: 17 })));
    }

    #[test]
    fn remove_deletes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 0, config(1024, 1024)).unwrap();
        segment.append(Record::new("a")).unwrap();

        segment.remove(dir.path()).unwrap();

        assert!(!segment_path(dir.path(), 0, STORE_EXTENSION).exists());
        assert!(!segment_path(dir.path(), 0, INDEX_EXTENSION).exists());
    }
}
