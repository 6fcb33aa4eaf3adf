use crate::commitlog::{AppendListener, Log, LogError, Record, SegmentConfig};
use crate::replica::network::GrpcRaftNetwork;
use crate::replica::options::RaftOptionsValidated;
use crate::replica::raft_store::RaftStore;
use crate::replica::{
    raft_node_id, AppendCommand, AppendError, MembershipError, OpenError, RaftNodeId, RaftOptions, ServerInfo,
    ServerNode, TypeConfig,
};
use openraft::error::{ChangeMembershipError, ClientWriteError, InitializeError, RaftError};
use openraft::raft::ClientWriteResponse;
use openraft::storage::Adaptor;
use openraft::{ChangeMembers, Raft, RaftMetrics};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{self, Duration};

type WriteResult = Result<ClientWriteResponse<TypeConfig>, RaftError<RaftNodeId, ClientWriteError<RaftNodeId, ServerNode>>>;

const MEMBERSHIP_RETRY_BACKOFF: Duration = Duration::from_millis(100);

pub struct ReplicatedLogConfig {
    pub data_dir: PathBuf,
    /// This server's id and the RPC address peers and clients reach it at.
    pub local: ServerNode,
    pub segment: SegmentConfig,
    pub options: RaftOptions,
}

/// ReplicatedLog is a [`Log`] whose appends are agreed on by the cluster before being applied, in
/// the same order, to every member's local copy.
///
/// Appends must go to the leader; other members answer with the leader's address. Reads are served
/// from the local copy and see whatever this member has applied so far.
pub struct ReplicatedLog {
    logger: slog::Logger,
    node_id: RaftNodeId,
    local: ServerNode,
    raft: Raft<TypeConfig>,
    log: Arc<Log>,
    options: RaftOptionsValidated,
}

impl ReplicatedLog {
    pub async fn open(logger: slog::Logger, config: ReplicatedLogConfig) -> Result<Self, OpenError> {
        let options = RaftOptionsValidated::try_from(config.options).map_err(OpenError::InvalidOptions)?;
        let raft_config = Arc::new(options.to_openraft_config().map_err(OpenError::Config)?);
        let node_id = raft_node_id(&config.local.id);

        let store = RaftStore::open(logger.clone(), &config.data_dir, config.segment)?;
        let log = store.applied_log().await;
        let (log_store, state_machine) = Adaptor::new(store);

        let network = GrpcRaftNetwork::new(logger.new(slog::o!("Component" => "RaftNetwork")));
        let raft = Raft::new(node_id, raft_config, network, log_store, state_machine)
            .await
            .map_err(|e| OpenError::Consensus(e.to_string()))?;

        slog::info!(logger, "Opened replicated log for {} (raft id {})", config.local, node_id);
        Ok(ReplicatedLog {
            logger,
            node_id,
            local: config.local,
            raft,
            log,
            options,
        })
    }

    /// Makes this server the single voter of a brand-new cluster. A no-op if this server already
    /// belongs to a configuration, such as after a restart.
    pub async fn bootstrap(&self) -> Result<(), MembershipError> {
        if self.is_initialized() {
            slog::info!(self.logger, "Already part of a cluster, skipping bootstrap");
            return Ok(());
        }

        let members = BTreeMap::from([(self.node_id, self.local.clone())]);
        match self.raft.initialize(members).await {
            Ok(()) => {
                slog::info!(self.logger, "Bootstrapped cluster with {} as the only voter", self.local);
                Ok(())
            }
            Err(RaftError::APIError(InitializeError::NotAllowed(_))) => Ok(()),
            Err(e) => Err(MembershipError::Consensus(e.to_string())),
        }
    }

    /// Replicates `record` and returns the offset it was applied at.
    ///
    /// Dropping the returned future stops waiting but does not withdraw the proposal; it may still
    /// commit.
    pub async fn append(&self, record: Record) -> Result<u64, AppendError> {
        let command = AppendCommand {
            value: record.value.to_vec(),
        };

        let result = time::timeout(self.options.apply_timeout, self.raft.client_write(command))
            .await
            .map_err(|_| AppendError::ConsensusTimeout(self.options.apply_timeout))?;

        match result {
            Ok(response) => response
                .data
                .offset
                .ok_or_else(|| AppendError::Consensus("append applied without an offset".to_string())),
            Err(e) => Err(self.append_error(e)),
        }
    }

    pub fn read(&self, offset: u64) -> Result<Record, LogError> {
        self.log.read(offset)
    }

    pub fn lowest_offset(&self) -> u64 {
        self.log.lowest_offset()
    }

    pub fn highest_offset(&self) -> Option<u64> {
        self.log.highest_offset()
    }

    pub fn subscribe(&self) -> AppendListener {
        self.log.subscribe()
    }

    /// Adds a server to the cluster: as a voter, or as a learner when configured to join servers
    /// as learners. Joining a server already present at the same address is a no-op; a server
    /// present under the same id or address with the other value changed is replaced.
    pub async fn join(&self, id: &str, rpc_addr: &str) -> Result<(), MembershipError> {
        let node_id = raft_node_id(id);
        let node = ServerNode::new(id, rpc_addr);

        let (already_present, is_voter, stale) = {
            let metrics = self.raft.metrics();
            let metrics = metrics.borrow();
            let membership = metrics.membership_config.membership();

            let mut already_present = false;
            let mut stale = Vec::new();
            for (member_id, member) in membership.nodes() {
                let same_id = *member_id == node_id;
                let same_addr = member.rpc_addr == rpc_addr;
                if same_id && same_addr {
                    already_present = true;
                } else if same_id || same_addr {
                    stale.push(*member_id);
                }
            }
            let is_voter = membership.voter_ids().any(|voter| voter == node_id);
            (already_present, is_voter, stale)
        };

        if already_present {
            if is_voter || self.options.join_as_learner {
                slog::debug!(self.logger, "{} is already a member", node);
                return Ok(());
            }
            return self.promote(node_id).await;
        }

        for member_id in stale {
            slog::info!(self.logger, "Replacing stale member {} before joining {}", member_id, node);
            self.remove_member(member_id).await?;
        }

        self.reconfigure("add learner", || self.raft.add_learner(node_id, node.clone(), true))
            .await?;
        if !self.options.join_as_learner {
            self.promote(node_id).await?;
        }

        slog::info!(self.logger, "{} joined the cluster", node);
        Ok(())
    }

    /// Removes a server from the cluster. A no-op if it is not a member.
    pub async fn leave(&self, id: &str) -> Result<(), MembershipError> {
        let node_id = raft_node_id(id);
        let is_member = {
            let metrics = self.raft.metrics();
            let is_member = metrics
                .borrow()
                .membership_config
                .membership()
                .get_node(&node_id)
                .is_some();
            is_member
        };
        if !is_member {
            slog::debug!(self.logger, "{} is not a member, nothing to remove", id);
            return Ok(());
        }

        self.remove_member(node_id).await?;
        slog::info!(self.logger, "{} left the cluster", id);
        Ok(())
    }

    async fn promote(&self, node_id: RaftNodeId) -> Result<(), MembershipError> {
        let changes = ChangeMembers::AddVoterIds(BTreeSet::from([node_id]));
        self.reconfigure("add voter", || self.raft.change_membership(changes.clone(), false))
            .await
    }

    async fn remove_member(&self, node_id: RaftNodeId) -> Result<(), MembershipError> {
        let changes = if self.has_voter(node_id) {
            ChangeMembers::RemoveVoters(BTreeSet::from([node_id]))
        } else {
            ChangeMembers::RemoveNodes(BTreeSet::from([node_id]))
        };
        self.reconfigure("remove member", || self.raft.change_membership(changes.clone(), false))
            .await
    }

    /// Runs a membership change, retrying while another change is still in progress.
    async fn reconfigure<F, Fut>(&self, what: &str, change: F) -> Result<(), MembershipError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = WriteResult>,
    {
        let mut attempt = 1;
        loop {
            let result = time::timeout(self.options.apply_timeout, change())
                .await
                .map_err(|_| MembershipError::Timeout(self.options.apply_timeout))?;

            match result {
                Ok(_) => return Ok(()),
                Err(e) if is_change_in_progress(&e) && attempt < self.options.membership_retries => {
                    slog::debug!(self.logger, "Retrying {} (attempt {}): {}", what, attempt, e);
                    time::sleep(MEMBERSHIP_RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(self.membership_error(e)),
            }
        }
    }

    /// Every member of the current configuration, voters and learners.
    pub fn servers(&self) -> Vec<ServerInfo> {
        let metrics = self.raft.metrics();
        let metrics = metrics.borrow();
        metrics
            .membership_config
            .membership()
            .nodes()
            .map(|(member_id, member)| ServerInfo {
                id: member.id.clone(),
                rpc_addr: member.rpc_addr.clone(),
                is_leader: metrics.current_leader == Some(*member_id),
            })
            .collect()
    }

    pub fn leader(&self) -> Option<ServerNode> {
        let metrics = self.raft.metrics();
        let leader = leader_of(&metrics.borrow());
        leader
    }

    pub fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.node_id)
    }

    /// Whether the server `id` counts toward quorum. Learners and non-members do not.
    pub fn is_voter(&self, id: &str) -> bool {
        self.has_voter(raft_node_id(id))
    }

    fn has_voter(&self, node_id: RaftNodeId) -> bool {
        let metrics = self.raft.metrics();
        let is_voter = metrics
            .borrow()
            .membership_config
            .membership()
            .voter_ids()
            .any(|voter| voter == node_id);
        is_voter
    }

    pub async fn wait_for_leader(&self, timeout: Duration) -> Result<ServerNode, MembershipError> {
        let mut metrics = self.raft.metrics();
        let wait = async {
            loop {
                let leader = leader_of(&metrics.borrow_and_update());
                if let Some(leader) = leader {
                    return Ok(leader);
                }
                if metrics.changed().await.is_err() {
                    return Err(MembershipError::Consensus("raft node has shut down".to_string()));
                }
            }
        };

        time::timeout(timeout, wait)
            .await
            .map_err(|_| MembershipError::Timeout(timeout))?
    }

    /// Asks the consensus layer to snapshot now instead of waiting for the configured threshold.
    pub async fn trigger_snapshot(&self) -> Result<(), MembershipError> {
        self.raft
            .trigger()
            .snapshot()
            .await
            .map_err(|e| MembershipError::Consensus(e.to_string()))
    }

    pub(crate) fn raft(&self) -> &Raft<TypeConfig> {
        &self.raft
    }

    /// Stops the consensus node and flushes the local log.
    pub async fn shutdown(&self) -> Result<(), LogError> {
        if let Err(e) = self.raft.shutdown().await {
            slog::warn!(self.logger, "Raft node did not shut down cleanly: {}", e);
        }
        self.log.sync()?;
        slog::info!(self.logger, "Replicated log shut down");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.raft
            .metrics()
            .borrow()
            .membership_config
            .membership()
            .voter_ids()
            .next()
            .is_some()
    }

    fn append_error(&self, e: RaftError<RaftNodeId, ClientWriteError<RaftNodeId, ServerNode>>) -> AppendError {
        if let Some(forward) = e.forward_to_leader() {
            return match &forward.leader_node {
                Some(leader) => AppendError::NotLeader {
                    leader_id: leader.id.clone(),
                    leader_addr: leader.rpc_addr.clone(),
                },
                None => AppendError::NoLeader,
            };
        }
        slog::error!(self.logger, "Append failed in consensus: {}", e);
        AppendError::Consensus(e.to_string())
    }

    fn membership_error(&self, e: RaftError<RaftNodeId, ClientWriteError<RaftNodeId, ServerNode>>) -> MembershipError {
        if let Some(forward) = e.forward_to_leader() {
            return match &forward.leader_node {
                Some(leader) => MembershipError::NotLeader {
                    leader_id: leader.id.clone(),
                    leader_addr: leader.rpc_addr.clone(),
                },
                None => MembershipError::NoLeader,
            };
        }
        MembershipError::Consensus(e.to_string())
    }
}

fn is_change_in_progress(e: &RaftError<RaftNodeId, ClientWriteError<RaftNodeId, ServerNode>>) -> bool {
    matches!(
        e.api_error(),
        Some(ClientWriteError::ChangeMembershipError(ChangeMembershipError::InProgress(_)))
    )
}

fn leader_of(metrics: &RaftMetrics<RaftNodeId, ServerNode>) -> Option<ServerNode> {
    let leader_id = metrics.current_leader?;
    metrics.membership_config.membership().get_node(&leader_id).cloned()
}
