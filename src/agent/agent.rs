use crate::agent::{AgentConfig, AgentError};
use crate::grpc::log::grpc_log_client::GrpcLogClient;
use crate::grpc::log::ProtoJoinReq;
use crate::loadbalance::{ClientError, ResolveError};
use crate::membership::{self, MembershipClient};
use crate::replica::{ReplicatedLog, ReplicatedLogConfig, ServerNode};
use crate::server::{AclAuthorizer, AllowAll, Authorizer, RaftRpcServer, RpcServer, RpcServerConfig};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tonic::transport::Endpoint;

const MEMBERSHIP_BUFFER: usize = 64;
const JOIN_ATTEMPTS: u32 = 5;
const JOIN_BACKOFF: Duration = Duration::from_millis(250);
const JOIN_MAX_REDIRECTS: usize = 3;

/// Agent runs one server: the replicated log, the gRPC surface (client API and peer consensus
/// traffic on one listener) and the membership coordinator.
pub struct Agent {
    logger: slog::Logger,
    config: AgentConfig,
    rpc_addr: SocketAddr,
    replicated_log: Arc<ReplicatedLog>,
    membership: MembershipClient,
    shutdown: CancellationToken,
    server_task: JoinHandle<()>,
    membership_task: JoinHandle<()>,
}

impl Agent {
    pub async fn start(logger: slog::Logger, config: AgentConfig) -> Result<Self, AgentError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| AgentError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        let rpc_addr = listener.local_addr().map_err(|source| AgentError::Bind {
            addr: config.bind_addr,
            source,
        })?;
        let logger = logger.new(slog::o!("RpcAddr" => rpc_addr.to_string()));

        let replicated_log = Arc::new(
            ReplicatedLog::open(
                logger.new(slog::o!("Component" => "ReplicatedLog")),
                ReplicatedLogConfig {
                    data_dir: config.data_dir.clone(),
                    local: ServerNode::new(config.node_id.clone(), rpc_addr.to_string()),
                    segment: config.segment,
                    options: config.raft.clone(),
                },
            )
            .await?,
        );

        let authorizer: Arc<dyn Authorizer> = match &config.acl_policy_file {
            Some(path) => Arc::new(AclAuthorizer::from_file(path)?),
            None => Arc::new(AllowAll),
        };

        let shutdown = CancellationToken::new();
        let server = RpcServer::new(
            logger.new(slog::o!("Component" => "RpcServer")),
            RpcServerConfig {
                commit_log: replicated_log.clone(),
                authorizer,
                get_serverer: Some(replicated_log.clone()),
                membership: Some(replicated_log.clone()),
            },
            shutdown.clone(),
        );
        let raft_server = RaftRpcServer::new(
            logger.new(slog::o!("Component" => "RaftRpcServer")),
            replicated_log.clone(),
        );
        let server_task = tokio::spawn(server.run(listener, Some(raft_server)));

        let (membership, coordinator) = membership::create(
            logger.new(slog::o!("Component" => "Membership")),
            MEMBERSHIP_BUFFER,
            config.node_id.clone(),
            replicated_log.clone(),
        );
        let membership_task = tokio::spawn(coordinator.run_event_loop());

        let agent = Agent {
            logger,
            config,
            rpc_addr,
            replicated_log,
            membership,
            shutdown,
            server_task,
            membership_task,
        };

        if let Err(e) = agent.enter_cluster().await {
            let logger = agent.logger.clone();
            if let Err(shutdown_err) = agent.shutdown().await {
                slog::warn!(logger, "Failed to shut down after start failure: {}", shutdown_err);
            }
            return Err(e);
        }

        slog::info!(agent.logger, "Agent {} started", agent.config.node_id);
        Ok(agent)
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    /// Entry point for discovery events about other servers.
    pub fn membership(&self) -> &MembershipClient {
        &self.membership
    }

    pub fn replicated_log(&self) -> &Arc<ReplicatedLog> {
        &self.replicated_log
    }

    /// Stops serving, stops the membership coordinator and the consensus node, then flushes the
    /// log to disk.
    pub async fn shutdown(self) -> Result<(), AgentError> {
        slog::info!(self.logger, "Shutting down agent {}", self.config.node_id);

        self.shutdown.cancel();
        if let Err(e) = self.server_task.await {
            slog::warn!(self.logger, "Server task failed: {}", e);
        }

        self.membership_task.abort();
        drop(self.membership);

        self.replicated_log.shutdown().await?;
        Ok(())
    }

    async fn enter_cluster(&self) -> Result<(), AgentError> {
        if self.config.bootstrap {
            self.replicated_log.bootstrap().await?;
        }
        if !self.config.start_join_addrs.is_empty() {
            self.join_cluster().await?;
        }
        Ok(())
    }

    /// Asks the seeds to add this server to their cluster, following leader redirects.
    async fn join_cluster(&self) -> Result<(), AgentError> {
        let request = ProtoJoinReq {
            id: self.config.node_id.clone(),
            rpc_addr: self.rpc_addr.to_string(),
        };

        let mut last_error = String::new();
        for attempt in 1..=JOIN_ATTEMPTS {
            for seed in &self.config.start_join_addrs {
                let mut target = seed.clone();
                for _ in 0..=JOIN_MAX_REDIRECTS {
                    match request_join(&target, request.clone()).await {
                        Ok(()) => {
                            slog::info!(self.logger, "Joined cluster via {}", target);
                            return Ok(());
                        }
                        Err(ClientError::NotLeader { leader_addr, .. }) => {
                            slog::debug!(self.logger, "{} redirected join to {}", target, leader_addr);
                            target = leader_addr;
                        }
                        Err(e) => {
                            slog::debug!(self.logger, "Join via {} failed (attempt {}): {}", target, attempt, e);
                            last_error = e.to_string();
                            break;
                        }
                    }
                }
            }

            let jitter = rand::thread_rng().gen_range(0..JOIN_BACKOFF.as_millis() as u64);
            time::sleep(JOIN_BACKOFF * attempt + Duration::from_millis(jitter)).await;
        }

        Err(AgentError::Join {
            seeds: self.config.start_join_addrs.clone(),
            reason: last_error,
        })
    }
}

async fn request_join(target: &str, request: ProtoJoinReq) -> Result<(), ClientError> {
    let endpoint = Endpoint::from_shared(format!("http://{}", target))
        .map_err(|_| ResolveError::InvalidTarget(target.to_string()))?;
    let channel = endpoint
        .connect()
        .await
        .map_err(|e| ClientError::Unavailable(e.to_string()))?;

    GrpcLogClient::new(channel).join(request).await?;
    Ok(())
}
