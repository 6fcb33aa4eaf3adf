use crate::commitlog::{Log, LogError, SegmentConfig};
use crate::replica::journal::Journal;
use crate::replica::state_machine::LogStateMachine;
use crate::replica::{AppendOutcome, RaftNodeId, ServerNode, TypeConfig};
use chrono::Utc;
use openraft::storage::LogState;
use openraft::{
    Entry, ErrorSubject, ErrorVerb, LogId, OptionalSend, RaftLogReader, RaftSnapshotBuilder, RaftStorage, Snapshot,
    SnapshotMeta, StorageError, StoredMembership, Vote,
};
use std::fmt::Debug;
use std::fs;
use std::io::{self, Cursor, Write};
use std::ops::RangeBounds;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

const SNAPSHOT_META_FILE: &str = "snapshot.meta";
const SNAPSHOT_DATA_FILE: &str = "snapshot.data";

#[derive(Clone)]
struct StoredSnapshot {
    meta: SnapshotMeta<RaftNodeId, ServerNode>,
    data: Vec<u8>,
}

/// RaftStore is the consensus layer's storage: the [`Journal`] as its log store, and the node's
/// applied [`Log`] (through [`LogStateMachine`]) as its state machine.
///
/// On-disk layout under the data directory:
///
/// ```text
/// log/                  applied records, one store/index pair per segment
/// raft/journal/         consensus write-ahead journal
/// raft/snapshot.meta    latest snapshot metadata (json)
/// raft/snapshot.data    latest snapshot payload
/// ```
#[derive(Clone)]
pub(crate) struct RaftStore {
    logger: slog::Logger,
    raft_dir: PathBuf,
    journal: Arc<Mutex<Journal>>,
    state_machine: Arc<RwLock<LogStateMachine>>,
    snapshot: Arc<RwLock<Option<StoredSnapshot>>>,
}

impl RaftStore {
    /// Opens the store. The applied log is rebuilt from the latest snapshot; entries committed
    /// after it are re-applied by the consensus layer once it starts.
    pub(crate) fn open(logger: slog::Logger, data_dir: &Path, segment: SegmentConfig) -> Result<Self, LogError> {
        let raft_dir = data_dir.join("raft");
        fs::create_dir_all(&raft_dir)?;

        let journal = Journal::open(logger.new(slog::o!("Component" => "Journal")), raft_dir.join("journal"))?;
        let log = Arc::new(Log::open(logger.new(slog::o!("Component" => "Log")), data_dir.join("log"), segment)?);
        let mut state_machine = LogStateMachine::new(logger.clone(), log, segment.initial_offset);

        let snapshot = load_snapshot(&raft_dir)?;
        match &snapshot {
            Some(stored) => state_machine.install(
                &stored.data,
                stored.meta.last_log_id,
                stored.meta.last_membership.clone(),
            )?,
            None => state_machine.clear()?,
        }

        Ok(RaftStore {
            logger,
            raft_dir,
            journal: Arc::new(Mutex::new(journal)),
            state_machine: Arc::new(RwLock::new(state_machine)),
            snapshot: Arc::new(RwLock::new(snapshot)),
        })
    }

    /// The applied log, for serving reads.
    pub(crate) async fn applied_log(&self) -> Arc<Log> {
        self.state_machine.read().await.log().clone()
    }

    fn persist_snapshot(&self, stored: &StoredSnapshot) -> Result<(), StorageError<RaftNodeId>> {
        let meta = serde_json::to_vec(&stored.meta).map_err(|e| snapshot_error(ErrorVerb::Write, e))?;

        // Data first; the meta file is the commit point.
        write_atomically(&self.raft_dir, SNAPSHOT_DATA_FILE, &stored.data)
            .map_err(|e| snapshot_error(ErrorVerb::Write, e))?;
        write_atomically(&self.raft_dir, SNAPSHOT_META_FILE, &meta).map_err(|e| snapshot_error(ErrorVerb::Write, e))?;

        slog::info!(
            self.logger,
            "Persisted snapshot {} ({} bytes) up to {:?}",
            stored.meta.snapshot_id,
            stored.data.len(),
            stored.meta.last_log_id
        );
        Ok(())
    }
}

fn load_snapshot(raft_dir: &Path) -> Result<Option<StoredSnapshot>, LogError> {
    let meta_path = raft_dir.join(SNAPSHOT_META_FILE);
    if !meta_path.exists() {
        return Ok(None);
    }

    let meta: SnapshotMeta<RaftNodeId, ServerNode> = serde_json::from_slice(&fs::read(&meta_path)?)
        .map_err(|e| LogError::Corrupt(format!("snapshot meta {:?}: {}", meta_path, e)))?;
    let data = fs::read(raft_dir.join(SNAPSHOT_DATA_FILE))?;

    Ok(Some(StoredSnapshot { meta, data }))
}

fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<()> {
    let temp_path = dir.join(format!("{}.tmp", file_name));
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(temp_path, dir.join(file_name))
}

fn snapshot_error<E: ToString>(verb: ErrorVerb, e: E) -> StorageError<RaftNodeId> {
    StorageError::from_io_error(ErrorSubject::Snapshot(None), verb, io::Error::other(e.to_string()))
}

fn storage_error(subject: ErrorSubject<RaftNodeId>, verb: ErrorVerb, e: LogError) -> StorageError<RaftNodeId> {
    StorageError::from_io_error(subject, verb, io::Error::other(e))
}

impl RaftLogReader<TypeConfig> for RaftStore {
    async fn try_get_log_entries<RB: RangeBounds<u64> + Clone + Debug + OptionalSend>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<RaftNodeId>> {
        Ok(self.journal.lock().await.entries(range))
    }
}

impl RaftSnapshotBuilder<TypeConfig> for RaftStore {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<RaftNodeId>> {
        let stored = {
            let state_machine = self.state_machine.read().await;
            let data = state_machine
                .snapshot()
                .map_err(|e| storage_error(ErrorSubject::StateMachine, ErrorVerb::Read, e))?;
            let last_log_id = state_machine.last_applied();
            let snapshot_id = format!(
                "{}-{}",
                last_log_id.map(|id| id.index).unwrap_or_default(),
                Utc::now().timestamp_millis()
            );

            StoredSnapshot {
                meta: SnapshotMeta {
                    last_log_id,
                    last_membership: state_machine.membership().clone(),
                    snapshot_id,
                },
                data,
            }
        };

        self.persist_snapshot(&stored)?;
        *self.snapshot.write().await = Some(stored.clone());

        Ok(Snapshot {
            meta: stored.meta,
            snapshot: Box::new(Cursor::new(stored.data)),
        })
    }
}

impl RaftStorage<TypeConfig> for RaftStore {
    type LogReader = Self;
    type SnapshotBuilder = Self;

    async fn get_log_reader(&mut self) -> Self::LogReader {
        self.clone()
    }

    async fn save_vote(&mut self, vote: &Vote<RaftNodeId>) -> Result<(), StorageError<RaftNodeId>> {
        self.journal
            .lock()
            .await
            .save_vote(*vote)
            .map_err(|e| storage_error(ErrorSubject::Vote, ErrorVerb::Write, e))
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<RaftNodeId>>, StorageError<RaftNodeId>> {
        Ok(self.journal.lock().await.vote())
    }

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<RaftNodeId>> {
        let journal = self.journal.lock().await;
        Ok(LogState {
            last_purged_log_id: journal.last_purged(),
            last_log_id: journal.last_log_id(),
        })
    }

    async fn append_to_log<I>(&mut self, entries: I) -> Result<(), StorageError<RaftNodeId>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + OptionalSend,
    {
        self.journal
            .lock()
            .await
            .append(entries.into_iter().collect())
            .map_err(|e| storage_error(ErrorSubject::Logs, ErrorVerb::Write, e))
    }

    async fn delete_conflict_logs_since(&mut self, log_id: LogId<RaftNodeId>) -> Result<(), StorageError<RaftNodeId>> {
        self.journal
            .lock()
            .await
            .delete_since(log_id.index)
            .map_err(|e| storage_error(ErrorSubject::Logs, ErrorVerb::Delete, e))
    }

    async fn purge_logs_upto(&mut self, log_id: LogId<RaftNodeId>) -> Result<(), StorageError<RaftNodeId>> {
        self.journal
            .lock()
            .await
            .purge_upto(log_id)
            .map_err(|e| storage_error(ErrorSubject::Logs, ErrorVerb::Delete, e))
    }

    async fn last_applied_state(
        &mut self,
    ) -> Result<(Option<LogId<RaftNodeId>>, StoredMembership<RaftNodeId, ServerNode>), StorageError<RaftNodeId>> {
        let state_machine = self.state_machine.read().await;
        Ok((state_machine.last_applied(), state_machine.membership().clone()))
    }

    async fn apply_to_state_machine(
        &mut self,
        entries: &[Entry<TypeConfig>],
    ) -> Result<Vec<AppendOutcome>, StorageError<RaftNodeId>> {
        self.state_machine.write().await.apply(entries).map_err(|e| {
            slog::error!(self.logger, "Failed to apply committed entries: {}", e);
            storage_error(ErrorSubject::StateMachine, ErrorVerb::Write, e)
        })
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        self.clone()
    }

    async fn begin_receiving_snapshot(&mut self) -> Result<Box<Cursor<Vec<u8>>>, StorageError<RaftNodeId>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<RaftNodeId, ServerNode>,
        snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<RaftNodeId>> {
        let stored = StoredSnapshot {
            meta: meta.clone(),
            data: snapshot.into_inner(),
        };

        self.state_machine
            .write()
            .await
            .install(&stored.data, meta.last_log_id, meta.last_membership.clone())
            .map_err(|e| snapshot_error(ErrorVerb::Write, e))?;

        self.persist_snapshot(&stored)?;
        *self.snapshot.write().await = Some(stored);
        Ok(())
    }

    async fn get_current_snapshot(&mut self) -> Result<Option<Snapshot<TypeConfig>>, StorageError<RaftNodeId>> {
        Ok(self.snapshot.read().await.as_ref().map(|stored| Snapshot {
            meta: stored.meta.clone(),
            snapshot: Box::new(Cursor::new(stored.data.clone())),
        }))
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

    fn entry(index: u64, value: &str) -> Entry<TypeConfig> {
        Entry {
            log_id: LogId::new(CommittedLeaderId::new(1, 1), index),
            payload: EntryPayload::Normal(AppendCommand {
                value: value.as_bytes().to_vec(),
            }),
        }
    }

    #[tokio::test]
    async fn snapshot_survives_reopen_and_rebuilds_applied_log() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let mut store = RaftStore::open(test_logger(), dir.path(), SegmentConfig::default()).unwrap();
        store.append_to_log(vec![entry(1, "foo"), entry(2, "bar")]).await.unwrap();
        store.apply_to_state_machine(&[entry(1, "foo"), entry(2, "bar")]).await.unwrap();

        // -- execute --
        let snapshot = store.build_snapshot().await.unwrap();
        store.apply_to_state_machine(&[entry(3, "not in snapshot")]).await.unwrap();
        drop(store);

        // -- verify --
        let mut store = RaftStore::open(test_logger(), dir.path(), SegmentConfig::default()).unwrap();
        let (last_applied, _) = store.last_applied_state().await.unwrap();
        assert_eq!(last_applied, snapshot.meta.last_log_id);

        let log = store.applied_log().await;
        assert_eq!(log.highest_offset(), Some(1));
        assert_eq!(&log.read(1).unwrap().value[..], b"bar");

        let current = store.get_current_snapshot().await.unwrap().unwrap();
        assert_eq!(current.meta.snapshot_id, snapshot.meta.snapshot_id);
    }

    #[tokio::test]
    async fn install_snapshot_replaces_applied_log() {
        let source_dir = tempfile::tempdir().unwrap();
        let mut source = RaftStore::open(test_logger(), source_dir.path(), SegmentConfig::default()).unwrap();
        source.apply_to_state_machine(&[entry(1, "a"), entry(2, "b")]).await.unwrap();
        let snapshot = source.build_snapshot().await.unwrap();

        let target_dir = tempfile::tempdir().unwrap();
        let mut target = RaftStore::open(test_logger(), target_dir.path(), SegmentConfig::default()).unwrap();
        target.apply_to_state_machine(&[entry(1, "stale")]).await.unwrap();

        target.install_snapshot(&snapshot.meta, snapshot.snapshot).await.unwrap();

        let log = target.applied_log().await;
        assert_eq!(log.highest_offset(), Some(1));
        assert_eq!(&log.read(0).unwrap().value[..], b"a");
        let (last_applied, _) = target.last_applied_state().await.unwrap();
        assert_eq!(last_applied.map(|id| id.index), Some(2));
    }
}
