use bytes::Bytes;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Width of the big-endian length prefix written before every payload.
pub(super) const LEN_WIDTH: u64 = 8;

/// Store is the append-only file backing a segment. Each payload is framed as:
///
/// ```text
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | ... |
/// +---+---+---+---+---+---+---+---+---+-...-+
/// |    Length (8 bytes, BE)       |  Payload|
/// +-------------------------------+-----...-+
/// ```
///
/// Writes are buffered. The file is opened in append mode, so moving the cursor to serve a read
/// never affects where the next write lands.
pub(super) struct Store {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    size: u64,
}

impl Store {
    pub(super) fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).append(true).create(true).open(&path)?;
        let size = file.metadata()?.len();

        Ok(Store {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            size,
        })
    }

    /// Appends one framed payload. Returns the number of bytes written (prefix included) and the
    /// position the frame starts at.
    pub(super) fn append(&mut self, payload: &[u8]) -> io::Result<(u64, u64)> {
        let position = self.size;
        let writer = self.writer.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&(payload.len() as u64).to_be_bytes())?;
        writer.write_all(payload)?;

        let written = LEN_WIDTH + payload.len() as u64;
        self.size += written;
        Ok((written, position))
    }

    pub(super) fn read(&self, position: u64) -> io::Result<Bytes> {
        if position + LEN_WIDTH > self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("position {} is past the end of store {:?}", position, self.path),
            ));
        }

        let mut writer = self.lock_writer();
        writer.flush()?;
        let file = writer.get_mut();
        file.seek(SeekFrom::Start(position))?;

        let mut len_bytes = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_be_bytes(len_bytes);
        if position + LEN_WIDTH + len > self.size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame at {} claims {} bytes, beyond store {:?}", position, len, self.path),
            ));
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;
        Ok(Bytes::from(payload))
    }

    /// End of the frame starting at `position`, or `None` when that frame is not wholly in the file.
    pub(super) fn frame_end(&self, position: u64) -> io::Result<Option<u64>> {
        if position + LEN_WIDTH > self.size {
            return Ok(None);
        }

        let mut writer = self.lock_writer();
        writer.flush()?;
        let file = writer.get_mut();
        file.seek(SeekFrom::Start(position))?;

        let mut len_bytes = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_bytes)?;
        let end = LEN_WIDTH
            .checked_add(u64::from_be_bytes(len_bytes))
            .and_then(|frame| position.checked_add(frame));
        Ok(end.filter(|end| *end <= self.size))
    }

    /// Drops every byte from `len` on.
    pub(super) fn truncate(&mut self, len: u64) -> io::Result<()> {
        let writer = self.writer.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.flush()?;
        writer.get_ref().set_len(len)?;
        writer.get_ref().sync_data()?;
        self.size = len;
        Ok(())
    }

    pub(super) fn size(&self) -> u64 {
        self.size
    }

    /// Pushes buffered frames to the OS and waits for them to reach the disk.
    pub(super) fn sync(&self) -> io::Result<()> {
        let mut writer = self.lock_writer();
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    pub(super) fn close(self) -> io::Result<()> {
        self.sync()
    }

    pub(super) fn remove(self) -> io::Result<()> {
        let path = self.path.clone();
        self.close()?;
        fs::remove_file(path)
    }

    fn lock_writer(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"hello world";
    const FRAME_WIDTH: u64 = LEN_WIDTH + PAYLOAD.len() as u64;

    #[test]
    fn append_then_read() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path().join("0.store")).unwrap();

        // -- execute --
        let mut positions = Vec::new();
        for i in 1..4u64 {
            let (n, position) = store.append(PAYLOAD).unwrap();
            assert_eq!(n, FRAME_WIDTH);
            assert_eq!(position + n, FRAME_WIDTH * i);
            positions.push(position);
        }

        // -- verify --
        for position in positions {
            assert_eq!(store.read(position).unwrap(), Bytes::from_static(PAYLOAD));
        }
        assert_eq!(store.size(), FRAME_WIDTH * 3);
    }

    #[test]
    fn append_after_read_lands_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path().join("0.store")).unwrap();

        let (_, first) = store.append(b"first").unwrap();
        assert_eq!(store.read(first).unwrap(), Bytes::from_static(b"first"));
        let (_, second) = store.append(b"second").unwrap();

        assert_eq!(store.read(second).unwrap(), Bytes::from_static(b"second"));
        assert_eq!(store.read(first).unwrap(), Bytes::from_static(b"first"));
    }

    #[test]
    fn reopen_recovers_size_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.store");

        let mut store = Store::open(&path).unwrap();
        store.append(PAYLOAD).unwrap();
        store.close().unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!(store.size(), FRAME_WIDTH);
        assert_eq!(store.read(0).unwrap(), Bytes::from_static(PAYLOAD));
    }

    #[test]
    fn frame_end_rejects_partial_frames() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.store");
        let mut store = Store::open(&path).unwrap();
        store.append(PAYLOAD).unwrap();
        store.close().unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u64.to_be_bytes()).unwrap();
        file.write_all(b"abc").unwrap();
        drop(file);

        // -- execute --
        let mut store = Store::open(&path).unwrap();

        // -- verify --
        assert_eq!(store.frame_end(0).unwrap(), Some(FRAME_WIDTH));
        assert_eq!(store.frame_end(FRAME_WIDTH).unwrap(), None);
        assert_eq!(store.frame_end(FRAME_WIDTH + 4).unwrap(), None);

        store.truncate(FRAME_WIDTH).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), FRAME_WIDTH);
        let (_, position) = store.append(b"next").unwrap();
        assert_eq!(position, FRAME_WIDTH);
        assert_eq!(store.read(position).unwrap(), Bytes::from_static(b"next"));
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path().join("0.store")).unwrap();
        store.append(PAYLOAD).unwrap();

        let err = store.read(FRAME_WIDTH).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
