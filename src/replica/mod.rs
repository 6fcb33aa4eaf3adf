mod error;
mod journal;
mod network;
mod options;
mod raft_store;
mod replicated_log;
mod state_machine;
mod types;

pub use error::AppendError;
pub use error::MembershipError;
pub use error::OpenError;
pub use options::RaftOptions;
pub use replicated_log::ReplicatedLog;
pub use replicated_log::ReplicatedLogConfig;
pub use types::raft_node_id;
pub use types::AppendCommand;
pub use types::AppendOutcome;
pub use types::RaftNodeId;
pub use types::ServerInfo;
pub use types::ServerNode;
pub use types::TypeConfig;
pub(crate) use network::MAX_PEER_MESSAGE_BYTES;
