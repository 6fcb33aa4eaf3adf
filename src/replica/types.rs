use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// Consensus-level node id. Derived from the cluster-facing string id with [`raft_node_id`].
pub type RaftNodeId = u64;

openraft::declare_raft_types!(
    pub TypeConfig:
        D = AppendCommand,
        R = AppendOutcome,
        NodeId = RaftNodeId,
        Node = ServerNode,
        SnapshotData = Cursor<Vec<u8>>,
);

/// A cluster member as the consensus layer stores it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNode {
    pub id: String,
    pub rpc_addr: String,
}

impl ServerNode {
    pub fn new<I: Into<String>, A: Into<String>>(id: I, rpc_addr: A) -> Self {
        ServerNode {
            id: id.into(),
            rpc_addr: rpc_addr.into(),
        }
    }
}

impl fmt::Display for ServerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.rpc_addr)
    }
}

/// Consensus log entry payload: one record value to append to every node's log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendCommand {
    pub value: Vec<u8>,
}

/// Result of applying one consensus entry. Only [`AppendCommand`] entries carry an offset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    pub offset: Option<u64>,
}

/// One member of the current configuration, as reported to clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: String,
    pub rpc_addr: String,
    pub is_leader: bool,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Maps a string server id to the numeric id used by the consensus layer (64-bit FNV-1a). Stable
/// across processes and restarts, so every node derives the same id for the same server.
pub fn raft_node_id(id: &str) -> RaftNodeId {
    id.bytes()
        .fold(FNV_OFFSET_BASIS, |hash, b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}
