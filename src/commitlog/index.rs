use crate::commitlog::LogError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

const OFFSET_WIDTH: usize = 4;
const POSITION_WIDTH: usize = 8;
pub(super) const ENTRY_WIDTH: usize = OFFSET_WIDTH + POSITION_WIDTH;

/// Which entry to look up in an [`Index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum IndexLookup {
    Relative(u32),
    Last,
}

/// Index maps a record's offset relative to its segment base to the record's position in the store.
///
/// Entry layout:
///
/// ```text
/// |                                           1               |
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 0 | 1 |
/// +---+---+---+---+---+---+---+---+---+---+---+---+
/// | RelOffset (4) |     Store position (8 BE)     |
/// +---------------+-------------------------------+
/// ```
///
/// All entries live in an in-memory region whose capacity is reserved up front to the configured
/// maximum. Every write goes through to the file, and `close()` finalizes the file to exactly the
/// bytes in use.
pub(super) struct Index {
    file: File,
    entries: Vec<u8>,
    max_bytes: u64,
}

impl Index {
    /// Opens (or creates) the index at `path`. Entries are only trusted while their relative offsets
    /// count up from zero and `is_complete` confirms the store frame they point at; a torn tail from
    /// a crash is dropped.
    pub(super) fn open<P, F>(path: P, max_bytes: u64, mut is_complete: F) -> io::Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(u64) -> io::Result<bool>,
    {
        let mut file = OpenOptions::new().read(true).append(true).create(true).open(path)?;

        let mut persisted = Vec::new();
        file.read_to_end(&mut persisted)?;

        let mut entries = Vec::with_capacity(max_bytes as usize);
        for (expected, chunk) in persisted.chunks_exact(ENTRY_WIDTH).enumerate() {
            let (relative, position) = decode_entry(chunk);
            if relative as usize != expected || !is_complete(position)? {
                break;
            }
            entries.extend_from_slice(chunk);
        }

        if entries.len() != persisted.len() {
            file.set_len(entries.len() as u64)?;
        }

        Ok(Index {
            file,
            entries,
            max_bytes,
        })
    }

    pub(super) fn write(&mut self, relative: u32, position: u64) -> Result<(), LogError> {
        if self.is_full() {
            return Err(LogError::SegmentFull);
        }

        let mut entry = [0u8; ENTRY_WIDTH];
        entry[..OFFSET_WIDTH].copy_from_slice(&relative.to_be_bytes());
        entry[OFFSET_WIDTH..].copy_from_slice(&position.to_be_bytes());

        self.file.write_all(&entry)?;
        self.entries.extend_from_slice(&entry);
        Ok(())
    }

    /// Returns `(relative_offset, position)` or `None` if no such entry exists.
    pub(super) fn read(&self, lookup: IndexLookup) -> Option<(u32, u64)> {
        let slot = match lookup {
            IndexLookup::Relative(relative) => relative as usize,
            IndexLookup::Last => self.len().checked_sub(1)?,
        };
        let start = slot.checked_mul(ENTRY_WIDTH)?;
        let chunk = self.entries.get(start..start + ENTRY_WIDTH)?;
        Some(decode_entry(chunk))
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len() / ENTRY_WIDTH
    }

    pub(super) fn size(&self) -> u64 {
        self.entries.len() as u64
    }

    /// True once another entry would no longer fit under the configured maximum.
    pub(super) fn is_full(&self) -> bool {
        self.size() + ENTRY_WIDTH as u64 > self.max_bytes
    }

    pub(super) fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Finalizes the file at its logical size.
    pub(super) fn close(self) -> io::Result<()> {
        self.file.set_len(self.size())?;
        self.file.sync_all()
    }
}

fn decode_entry(chunk: &[u8]) -> (u32, u64) {
    let mut relative = [0u8; OFFSET_WIDTH];
    relative.copy_from_slice(&chunk[..OFFSET_WIDTH]);
    let mut position = [0u8; POSITION_WIDTH];
    position.copy_from_slice(&chunk[OFFSET_WIDTH..ENTRY_WIDTH]);
    (u32::from_be_bytes(relative), u64::from_be_bytes(position))
}
