use crate::commitlog::{Log, LogError, Record, SegmentConfig};
use crate::replica::{RaftNodeId, TypeConfig};
use openraft::{Entry, LogId, Vote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::path::Path;

const JOURNAL_SEGMENT: SegmentConfig = SegmentConfig {
    max_store_bytes: 1 << 20,
    max_index_bytes: 48 * 1024,
    initial_offset: 0,
};

/// One durable mutation of the consensus layer's own log.
#[derive(Serialize, Deserialize)]
enum JournalOp {
    SaveVote(Vote<RaftNodeId>),
    Append(Vec<Entry<TypeConfig>>),
    DeleteSince(u64),
    /// Complete state at the time it was written; replay discards everything before it.
    Checkpoint {
        vote: Option<Vote<RaftNodeId>>,
        last_purged: Option<LogId<RaftNodeId>>,
        entries: Vec<Entry<TypeConfig>>,
    },
}

/// Journal is the consensus write-ahead log: votes and log entries kept in memory and recorded,
/// op by op, in a dedicated [`Log`]. Reopening replays the ops.
pub(crate) struct Journal {
    logger: slog::Logger,
    log: Log,
    vote: Option<Vote<RaftNodeId>>,
    entries: BTreeMap<u64, Entry<TypeConfig>>,
    last_purged: Option<LogId<RaftNodeId>>,
}

impl Journal {
    pub(crate) fn open<P: AsRef<Path>>(logger: slog::Logger, dir: P) -> Result<Self, LogError> {
        Self::open_with(logger, dir, JOURNAL_SEGMENT)
    }

    fn open_with<P: AsRef<Path>>(logger: slog::Logger, dir: P, segment: SegmentConfig) -> Result<Self, LogError> {
        let log = Log::open(logger.clone(), dir, segment)?;
        let ops = log
            .reader()
            .map(|record| {
                let record = record?;
                serde_json::from_slice::<JournalOp>(&record.value)
                    .map_err(|e| LogError::Corrupt(format!("journal op at {}: {}", record.offset, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut journal = Journal {
            logger,
            log,
            vote: None,
            entries: BTreeMap::new(),
            last_purged: None,
        };
        let replayed = ops.len();
        for op in ops {
            journal.apply(op);
        }
        slog::info!(
            journal.logger,
            "Replayed {} journal op(s); {} entries, last purged {:?}",
            replayed,
            journal.entries.len(),
            journal.last_purged
        );

        Ok(journal)
    }

    fn apply(&mut self, op: JournalOp) {
        match op {
            JournalOp::SaveVote(vote) => self.vote = Some(vote),
            JournalOp::Append(entries) => {
                for entry in entries {
                    self.entries.insert(entry.log_id.index, entry);
                }
            }
            JournalOp::DeleteSince(index) => {
                self.entries.split_off(&index);
            }
            JournalOp::Checkpoint {
                vote,
                last_purged,
                entries,
            } => {
                self.vote = vote;
                self.last_purged = last_purged;
                self.entries = entries.into_iter().map(|e| (e.log_id.index, e)).collect();
            }
        }
    }

    fn record(&self, op: &JournalOp) -> Result<u64, LogError> {
        let bytes = serde_json::to_vec(op).map_err(|e| LogError::Corrupt(format!("encode journal op: {}", e)))?;
        let offset = self.log.append(Record::new(bytes))?;
        self.log.sync()?;
        Ok(offset)
    }

    pub(crate) fn vote(&self) -> Option<Vote<RaftNodeId>> {
        self.vote
    }

    pub(crate) fn save_vote(&mut self, vote: Vote<RaftNodeId>) -> Result<(), LogError> {
        let op = JournalOp::SaveVote(vote);
        self.record(&op)?;
        self.apply(op);
        Ok(())
    }

    pub(crate) fn append(&mut self, entries: Vec<Entry<TypeConfig>>) -> Result<(), LogError> {
        if entries.is_empty() {
            return Ok(());
        }
        let op = JournalOp::Append(entries);
        self.record(&op)?;
        self.apply(op);
        Ok(())
    }

    /// Removes the entry at `index` and everything after it.
    pub(crate) fn delete_since(&mut self, index: u64) -> Result<(), LogError> {
        let op = JournalOp::DeleteSince(index);
        self.record(&op)?;
        self.apply(op);
        Ok(())
    }

    /// Drops entries up to and including `log_id`, then compacts the journal: a checkpoint of the
    /// remaining state is written and every journal segment wholly before it is deleted.
    pub(crate) fn purge_upto(&mut self, log_id: LogId<RaftNodeId>) -> Result<(), LogError> {
        let kept = self.entries.split_off(&(log_id.index + 1));
        let checkpoint = JournalOp::Checkpoint {
            vote: self.vote,
            last_purged: Some(log_id),
            entries: kept.values().cloned().collect(),
        };

        let offset = self.record(&checkpoint)?;
        self.apply(checkpoint);
        self.log.truncate(offset)?;

        slog::debug!(self.logger, "Purged journal up to {}; checkpoint at {}", log_id, offset);
        Ok(())
    }

    pub(crate) fn entries<R: RangeBounds<u64>>(&self, range: R) -> Vec<Entry<TypeConfig>> {
        self.entries.range(range).map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn last_log_id(&self) -> Option<LogId<RaftNodeId>> {
        self.entries.values().next_back().map(|e| e.log_id).or(self.last_purged)
    }

    pub(crate) fn last_purged(&self) -> Option<LogId<RaftNodeId>> {
        self.last_purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replica::AppendCommand;
    use openraft::{CommittedLeaderId, EntryPayload};

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn log_id(term: u64, index: u64) -> LogId<RaftNodeId> {
        LogId::new(CommittedLeaderId::new(term, 1), index)
    }

    fn entry(term: u64, index: u64) -> Entry<TypeConfig> {
        Entry {
            log_id: log_id(term, index),
            payload: EntryPayload::Normal(AppendCommand {
                value: format!("value-{}", index).into_bytes(),
            }),
        }
    }

    fn indexes(journal: &Journal) -> Vec<u64> {
        journal.entries(..).iter().map(|e| e.log_id.index).collect()
    }

    #[test]
    fn reopen_replays_votes_and_entries() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::open(test_logger(), dir.path()).unwrap();

        // -- execute --
        journal.save_vote(Vote::new(2, 1)).unwrap();
        journal.append(vec![entry(1, 1), entry(1, 2), entry(1, 3)]).unwrap();
        journal.delete_since(3).unwrap();
        journal.append(vec![entry(2, 3)]).unwrap();
        drop(journal);

        // -- verify --
        let journal = Journal::open(test_logger(), dir.path()).unwrap();
        assert_eq!(journal.vote(), Some(Vote::new(2, 1)));
        assert_eq!(indexes(&journal), vec![1, 2, 3]);
        assert_eq!(journal.last_log_id(), Some(log_id(2, 3)));
    }

    #[test]
    fn recorded_vote_survives_crash_after_roll() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let segment = SegmentConfig {
            max_store_bytes: 1 << 20,
            max_index_bytes: 12 * 4,
            initial_offset: 0,
        };
        let mut journal = Journal::open_with(test_logger(), dir.path(), segment).unwrap();

        // -- execute --
        // The fourth op fills the first segment and rolls the journal.
        for term in 1..=4 {
            journal.save_vote(Vote::new(term, 1)).unwrap();
        }
        std::mem::forget(journal);

        // -- verify --
        let journal = Journal::open_with(test_logger(), dir.path(), segment).unwrap();
        assert_eq!(journal.vote(), Some(Vote::new(4, 1)));
    }

    #[test]
    fn purge_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::open(test_logger(), dir.path()).unwrap();
        journal.append((1..=5).map(|i| entry(1, i)).collect()).unwrap();

        journal.purge_upto(log_id(1, 3)).unwrap();
        assert_eq!(indexes(&journal), vec![4, 5]);
        drop(journal);

        let journal = Journal::open(test_logger(), dir.path()).unwrap();
        assert_eq!(indexes(&journal), vec![4, 5]);
        assert_eq!(journal.last_purged(), Some(log_id(1, 3)));
    }

    #[test]
    fn last_log_id_falls_back_to_last_purged() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::open(test_logger(), dir.path()).unwrap();
        journal.append(vec![entry(1, 1), entry(1, 2)]).unwrap();

        journal.purge_upto(log_id(1, 2)).unwrap();

        assert!(journal.entries(..).is_empty());
        assert_eq!(journal.last_log_id(), Some(log_id(1, 2)));
    }
}
