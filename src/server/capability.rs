use crate::commitlog::{AppendListener, Log, LogError, Record};
use crate::replica::{AppendError, ReplicatedLog, ServerInfo};

/// The log operations the RPC surface needs. Implemented by a local [`Log`] and by a
/// [`ReplicatedLog`].
#[async_trait::async_trait]
pub trait CommitLog: Send + Sync + 'static {
    async fn append(&self, record: Record) -> Result<u64, AppendError>;
    fn read(&self, offset: u64) -> Result<Record, LogError>;
    fn lowest_offset(&self) -> u64;
    fn subscribe(&self) -> AppendListener;
}

/// Lists the servers of the cluster this server belongs to.
pub trait GetServerer: Send + Sync + 'static {
    fn servers(&self) -> Vec<ServerInfo>;
}

#[async_trait::async_trait]
impl CommitLog for Log {
    async fn append(&self, record: Record) -> Result<u64, AppendError> {
        Ok(Log::append(self, record)?)
    }

    fn read(&self, offset: u64) -> Result<Record, LogError> {
        Log::read(self, offset)
    }

    fn lowest_offset(&self) -> u64 {
        Log::lowest_offset(self)
    }

    fn subscribe(&self) -> AppendListener {
        Log::subscribe(self)
    }
}

#[async_trait::async_trait]
impl CommitLog for ReplicatedLog {
    async fn append(&self, record: Record) -> Result<u64, AppendError> {
        ReplicatedLog::append(self, record).await
    }

    fn read(&self, offset: u64) -> Result<Record, LogError> {
        ReplicatedLog::read(self, offset)
    }

    fn lowest_offset(&self) -> u64 {
        ReplicatedLog::lowest_offset(self)
    }

    fn subscribe(&self) -> AppendListener {
        ReplicatedLog::subscribe(self)
    }
}

impl GetServerer for ReplicatedLog {
    fn servers(&self) -> Vec<ServerInfo> {
        ReplicatedLog::servers(self)
    }
}
