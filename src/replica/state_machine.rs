use crate::commitlog::{Log, LogError, Record};
use crate::replica::{AppendCommand, AppendOutcome, RaftNodeId, ServerNode, TypeConfig};
use bytes::{Buf, BufMut, Bytes};
use openraft::{Entry, EntryPayload, LogId, StoredMembership};
use std::sync::Arc;

const FRAME_LEN_WIDTH: usize = 8;

/// LogStateMachine applies committed consensus entries to the node's local [`Log`].
///
/// Entries are applied strictly in commit order, one at a time; this is the only code path that
/// appends to the local log. Readers share the same `Arc<Log>` and read concurrently.
pub(crate) struct LogStateMachine {
    logger: slog::Logger,
    log: Arc<Log>,
    initial_offset: u64,
    last_applied: Option<LogId<RaftNodeId>>,
    membership: StoredMembership<RaftNodeId, ServerNode>,
}

impl LogStateMachine {
    pub(crate) fn new(logger: slog::Logger, log: Arc<Log>, initial_offset: u64) -> Self {
        LogStateMachine {
            logger,
            log,
            initial_offset,
            last_applied: None,
            membership: StoredMembership::default(),
        }
    }

    pub(crate) fn log(&self) -> &Arc<Log> {
        &self.log
    }

    pub(crate) fn last_applied(&self) -> Option<LogId<RaftNodeId>> {
        self.last_applied
    }

    pub(crate) fn membership(&self) -> &StoredMembership<RaftNodeId, ServerNode> {
        &self.membership
    }

    pub(crate) fn apply(&mut self, entries: &[Entry<TypeConfig>]) -> Result<Vec<AppendOutcome>, LogError> {
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let outcome = match &entry.payload {
                EntryPayload::Blank => AppendOutcome::default(),
                EntryPayload::Normal(AppendCommand { value }) => {
                    let offset = self.log.append(Record::new(value.clone()))?;
                    AppendOutcome { offset: Some(offset) }
                }
                EntryPayload::Membership(membership) => {
                    self.membership = StoredMembership::new(Some(entry.log_id), membership.clone());
                    AppendOutcome::default()
                }
            };
            self.last_applied = Some(entry.log_id);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Serializes every record of the log. See [`encode_snapshot`].
    pub(crate) fn snapshot(&self) -> Result<Vec<u8>, LogError> {
        encode_snapshot(self.log.reader())
    }

    /// Replaces the log's contents with the records of a snapshot and adopts its consensus position.
    pub(crate) fn install(
        &mut self,
        data: &[u8],
        last_applied: Option<LogId<RaftNodeId>>,
        membership: StoredMembership<RaftNodeId, ServerNode>,
    ) -> Result<(), LogError> {
        let restored = restore(&self.log, data, self.initial_offset)?;
        slog::info!(
            self.logger,
            "Restored {} record(s) from snapshot up to {:?}",
            restored,
            last_applied
        );

        self.last_applied = last_applied;
        self.membership = membership;
        Ok(())
    }

    /// Drops all applied state. The consensus layer re-applies committed entries afterwards.
    pub(crate) fn clear(&mut self) -> Result<(), LogError> {
        self.log.reset(self.initial_offset)?;
        self.last_applied = None;
        self.membership = StoredMembership::default();
        Ok(())
    }
}

/// Snapshot payload layout, repeated once per record in ascending offset order:
///
/// ```text
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | ... |
/// +---+---+---+---+---+---+---+---+---+-...-+
/// |     Length (8 bytes, BE)      | Record  |
/// +-------------------------------+-----...-+
/// ```
///
/// `Record` is the stored record encoding (offset followed by value).
pub(crate) fn encode_snapshot<I>(records: I) -> Result<Vec<u8>, LogError>
where
    I: IntoIterator<Item = Result<Record, LogError>>,
{
    let mut data = Vec::new();
    for record in records {
        let encoded = record?.encode();
        data.put_u64(encoded.len() as u64);
        data.put_slice(&encoded);
    }
    Ok(data)
}

pub(crate) fn decode_snapshot(data: &[u8]) -> Result<Vec<Record>, LogError> {
    let mut data = Bytes::copy_from_slice(data);
    let mut records = Vec::new();

    while data.has_remaining() {
        if data.remaining() < FRAME_LEN_WIDTH {
            return Err(LogError::Corrupt("snapshot ends inside a frame header".to_string()));
        }
        let len = data.get_u64() as usize;
        if data.remaining() < len {
            return Err(LogError::Corrupt(format!(
                "snapshot frame claims {} bytes but only {} remain",
                len,
                data.remaining()
            )));
        }
        records.push(Record::decode(data.split_to(len))?);
    }

    Ok(records)
}

/// Resets `log` and re-appends every record in `data`. The log restarts at the first record's
/// offset, and each offset the log assigns must match the one in the snapshot.
pub(crate) fn restore(log: &Log, data: &[u8], initial_offset: u64) -> Result<usize, LogError> {
    let records = decode_snapshot(data)?;
    let start = records.first().map(|r| r.offset).unwrap_or(initial_offset);
    log.reset(start)?;

    for record in &records {
        let expected = record.offset;
        let assigned = log.append(record.clone())?;
        if assigned != expected {
            return Err(LogError::Corrupt(format!(
                "snapshot record at offset {} was re-appended at {}",
                expected, assigned
            )));
        }
    }

    Ok(records.len())
}
