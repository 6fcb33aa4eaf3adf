use crate::commitlog::segment::{Segment, INDEX_EXTENSION, STORE_EXTENSION};
use crate::commitlog::{LogError, Record, SegmentConfig};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Log is an append only, segmented commit log stored in a single directory.
///
/// Offsets are assigned on append and increase by one per record, starting at the configured
/// initial offset. Appends are expected to come from a single writer; reads may run concurrently
/// and always observe either the state before or after any append or segment roll.
pub struct Log {
    logger: slog::Logger,
    dir: PathBuf,
    config: SegmentConfig,
    segments: RwLock<Vec<Segment>>,
    appended: watch::Sender<Option<u64>>,
}

impl Log {
    /// Opens the log in `dir`, recovering any segments already there. An empty directory starts
    /// with one empty segment at `config.initial_offset`.
    pub fn open<P: AsRef<Path>>(logger: slog::Logger, dir: P, config: SegmentConfig) -> Result<Self, LogError> {
        let dir = dir.as_ref().to_path_buf();
        let config = config.with_defaults();
        fs::create_dir_all(&dir)?;

        let segments = Self::recover_segments(&logger, &dir, config)?;
        let highest = highest_offset_of(&segments);
        slog::info!(
            logger,
            "Opened log at {:?} with {} segment(s), highest offset {:?}",
            dir,
            segments.len(),
            highest
        );

        let (appended, _) = watch::channel(highest);
        Ok(Log {
            logger,
            dir,
            config,
            segments: RwLock::new(segments),
            appended,
        })
    }

    fn recover_segments(logger: &slog::Logger, dir: &Path, config: SegmentConfig) -> Result<Vec<Segment>, LogError> {
        let mut base_offsets = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let extension = path.extension().and_then(|e| e.to_str());
            if extension != Some(STORE_EXTENSION) && extension != Some(INDEX_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<u64>) {
                Some(Ok(base_offset)) => {
                    base_offsets.insert(base_offset);
                }
                _ => slog::warn!(logger, "Ignoring unrecognized file {:?} in log directory", path),
            }
        }

        let mut segments = Vec::with_capacity(base_offsets.len() + 1);
        for base_offset in base_offsets {
            let segment = Segment::open(dir, base_offset, config)?;
            if let Some(previous) = segments.last().map(Segment::next_offset) {
                if previous != base_offset {
                    return Err(LogError::Corrupt(format!(
                        "segment {} does not continue from previous segment's next offset {}",
                        base_offset, previous
                    )));
                }
            }
            segments.push(segment);
        }

        match segments.last() {
            None => segments.push(Segment::open(dir, config.initial_offset, config)?),
            Some(active) if active.is_maxed() => {
                let base_offset = active.next_offset();
                segments.push(Segment::open(dir, base_offset, config)?);
            }
            Some(_) => {}
        }

        Ok(segments)
    }

    /// Appends `record` and returns the offset assigned to it.
    pub fn append(&self, record: Record) -> Result<u64, LogError> {
        let offset = {
            let mut segments = self.write_segments();
            let active = active_segment_mut(&mut segments)?;
            let offset = active.append(record)?;

            if active.is_maxed() {
                // Only the active segment is synced later; the outgoing one must be durable first.
                active.sync()?;
                segments.push(Segment::open(&self.dir, offset + 1, self.config)?);
            }
            offset
        };

        self.appended.send_replace(Some(offset));
        Ok(offset)
    }

    pub fn read(&self, offset: u64) -> Result<Record, LogError> {
        let segments = self.read_segments();
        let slot = segments.partition_point(|s| s.next_offset() <= offset);
        match segments.get(slot) {
            Some(segment) if segment.contains(offset) => segment.read(offset),
            _ => Err(LogError::OffsetOutOfRange { offset }),
        }
    }

    pub fn lowest_offset(&self) -> u64 {
        self.read_segments().first().map(Segment::base_offset).unwrap_or(self.config.initial_offset)
    }

    /// Offset of the newest record, or `None` when the log holds no records.
    pub fn highest_offset(&self) -> Option<u64> {
        highest_offset_of(&self.read_segments())
    }

    /// Removes every segment whose records all lie below `lowest`. A segment holding any offset
    /// at or above `lowest` is kept whole.
    pub fn truncate(&self, lowest: u64) -> Result<(), LogError> {
        let mut segments = self.write_segments();
        let keep_from = segments.iter().position(|s| s.next_offset() > lowest);

        match keep_from {
            Some(0) => {}
            Some(count) => {
                for segment in segments.drain(..count) {
                    segment.remove(&self.dir)?;
                }
            }
            None => {
                // Everything is below `lowest`; restart empty without reusing offsets.
                let next_offset = segments.last().map(Segment::next_offset).unwrap_or(lowest);
                for segment in segments.drain(..) {
                    segment.remove(&self.dir)?;
                }
                segments.push(Segment::open(&self.dir, next_offset, self.config)?);
            }
        }

        slog::debug!(self.logger, "Truncated log below {}", lowest);
        Ok(())
    }

    /// Removes all segments and starts over with one empty segment at `initial_offset`.
    pub fn reset(&self, initial_offset: u64) -> Result<(), LogError> {
        {
            let mut segments = self.write_segments();
            for segment in segments.drain(..) {
                segment.remove(&self.dir)?;
            }
            segments.push(Segment::open(&self.dir, initial_offset, self.config)?);
        }

        slog::info!(self.logger, "Reset log to initial offset {}", initial_offset);
        self.appended.send_replace(None);
        Ok(())
    }

    /// Iterates every record in ascending offset order, starting from the current lowest offset.
    pub fn reader(&self) -> LogReader<'_> {
        LogReader {
            log: self,
            next: self.lowest_offset(),
        }
    }

    /// Listener that wakes whenever the highest offset changes.
    pub fn subscribe(&self) -> AppendListener {
        AppendListener {
            rcv: self.appended.subscribe(),
        }
    }

    /// Flushes buffered writes of the active segment to disk.
    pub fn sync(&self) -> Result<(), LogError> {
        let segments = self.read_segments();
        match segments.last() {
            Some(active) => active.sync(),
            None => Ok(()),
        }
    }

    pub fn close(self) -> Result<(), LogError> {
        let segments = self.segments.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        for segment in segments {
            segment.close()?;
        }
        Ok(())
    }

    /// Closes the log and deletes its directory.
    pub fn remove(self) -> Result<(), LogError> {
        let dir = self.dir.clone();
        self.close()?;
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn read_segments(&self) -> RwLockReadGuard<'_, Vec<Segment>> {
        self.segments.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_segments(&self) -> RwLockWriteGuard<'_, Vec<Segment>> {
        self.segments.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn active_segment_mut(segments: &mut [Segment]) -> Result<&mut Segment, LogError> {
    segments
        .last_mut()
        .ok_or_else(|| LogError::Corrupt("log has no active segment".to_string()))
}

fn highest_offset_of(segments: &[Segment]) -> Option<u64> {
    let lowest = segments.first()?.base_offset();
    let next = segments.last()?.next_offset();
    if next > lowest {
        Some(next - 1)
    } else {
        None
    }
}

/// Lazy iterator over a [`Log`]'s records. Ends at the first offset past the newest record.
pub struct LogReader<'a> {
    log: &'a Log,
    next: u64,
}

impl LogReader<'_> {
    /// Starts over from the log's current lowest offset.
    pub fn rewind(&mut self) {
        self.next = self.log.lowest_offset();
    }
}

impl Iterator for LogReader<'_> {
    type Item = Result<Record, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.log.read(self.next) {
            Ok(record) => {
                self.next += 1;
                Some(Ok(record))
            }
            Err(e) if e.is_out_of_range() => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// AppendListener observes the highest offset of a [`Log`].
#[derive(Clone)]
pub struct AppendListener {
    rcv: watch::Receiver<Option<u64>>,
}

impl AppendListener {
    /// Waits for the next change. Returns `None` once the log has been dropped.
    pub async fn next(&mut self) -> Option<Option<u64>> {
        match self.rcv.changed().await {
            Ok(_) => Some(*self.rcv.borrow()),
            Err(_) => None,
        }
    }

    pub fn current(&self) -> Option<u64> {
        *self.rcv.borrow()
    }
}
