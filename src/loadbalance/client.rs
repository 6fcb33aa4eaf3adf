use crate::commitlog::Record;
use crate::grpc::log::grpc_log_client::GrpcLogClient;
use crate::grpc::log::{ProtoConsumeReq, ProtoProduceReq, ProtoRecord};
use crate::loadbalance::{Address, PickError, Picker, ResolveError, ResolvedState, Resolver};
use crate::server::{LEADER_ADDR_METADATA, LEADER_ID_METADATA, OFFSET_METADATA};
use std::sync::{Arc, RwLock};
use tokio::time::{self, Duration};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

const PRODUCE_METHOD: &str = "/log.GrpcLog/Produce";
const CONSUME_METHOD: &str = "/log.GrpcLog/Consume";
const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// A failed call, decoded from the server's status so callers can act on the kind.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("offset out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    #[error("I'm not leader; leader is {leader_id} at {leader_addr}")]
    NotLeader { leader_id: String, leader_addr: String },

    #[error("Server unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not committed in time: {0}")]
    Timeout(String),

    #[error(transparent)]
    NotReady(#[from] PickError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Rpc failed: {0}")]
    Rpc(Status),
}

impl ClientError {
    /// Worth retrying after re-resolving the cluster.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::NotLeader { .. } | ClientError::Unavailable(_) | ClientError::NotReady(_)
        )
    }
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let metadata = |key: &str| {
            status
                .metadata()
                .get(key)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        match status.code() {
            Code::OutOfRange => match metadata(OFFSET_METADATA).and_then(|offset| offset.parse().ok()) {
                Some(offset) => ClientError::OffsetOutOfRange { offset },
                None => ClientError::Rpc(status),
            },
            Code::FailedPrecondition => match (metadata(LEADER_ID_METADATA), metadata(LEADER_ADDR_METADATA)) {
                (Some(leader_id), Some(leader_addr)) => ClientError::NotLeader { leader_id, leader_addr },
                _ => ClientError::Rpc(status),
            },
            Code::Unavailable => ClientError::Unavailable(status.message().to_string()),
            Code::PermissionDenied => ClientError::PermissionDenied(status.message().to_string()),
            Code::DeadlineExceeded => ClientError::Timeout(status.message().to_string()),
            _ => ClientError::Rpc(status),
        }
    }
}

struct Routing {
    state: ResolvedState,
    picker: Arc<Picker<GrpcLogClient<Channel>>>,
}

/// ClusterClient sends produces to the leader and spreads consumes over the followers, re-resolving
/// the cluster when a call lands on the wrong server.
pub struct ClusterClient {
    logger: slog::Logger,
    resolver: Resolver,
    routing: RwLock<Routing>,
}

impl ClusterClient {
    pub async fn connect(logger: slog::Logger, target: &str) -> Result<Self, ClientError> {
        let resolver = Resolver::connect(logger.clone(), target).await?;
        let state = resolver.state();
        let routing = Routing {
            picker: Arc::new(build_picker(&state)?),
            state,
        };

        Ok(ClusterClient {
            logger,
            resolver,
            routing: RwLock::new(routing),
        })
    }

    pub async fn produce<V: Into<Vec<u8>>>(&self, value: V) -> Result<u64, ClientError> {
        let request = ProtoProduceReq {
            record: Some(ProtoRecord {
                value: value.into(),
                offset: 0,
            }),
        };

        let mut attempt = 1;
        loop {
            let result = match self.pick(PRODUCE_METHOD) {
                Ok(mut client) => client
                    .produce(request.clone())
                    .await
                    .map(|reply| reply.into_inner().offset)
                    .map_err(ClientError::from),
                Err(e) => Err(e),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    slog::debug!(self.logger, "Retrying produce (attempt {}): {}", attempt, e);
                    self.backoff_and_refresh(attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn consume(&self, offset: u64) -> Result<Record, ClientError> {
        let mut attempt = 1;
        loop {
            let result = match self.pick(CONSUME_METHOD) {
                Ok(mut client) => client
                    .consume(ProtoConsumeReq { offset })
                    .await
                    .map_err(ClientError::from)
                    .and_then(|reply| {
                        reply
                            .into_inner()
                            .record
                            .ok_or_else(|| ClientError::Rpc(Status::internal("Missing record")))
                    })
                    .map(|record| Record {
                        value: record.value.into(),
                        offset: record.offset,
                    }),
                Err(e) => Err(e),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    slog::debug!(self.logger, "Retrying consume (attempt {}): {}", attempt, e);
                    self.backoff_and_refresh(attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Re-resolves the cluster. The picker is rebuilt only if the address set changed.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let state = self.resolver.resolve_now().await?;

        let mut routing = self.routing.write().unwrap_or_else(|p| p.into_inner());
        if routing.state != state {
            routing.picker = Arc::new(build_picker(&state)?);
            routing.state = state;
        }
        Ok(())
    }

    pub fn addresses(&self) -> Vec<Address> {
        let routing = self.routing.read().unwrap_or_else(|p| p.into_inner());
        routing.state.addresses.clone()
    }

    fn pick(&self, method: &str) -> Result<GrpcLogClient<Channel>, ClientError> {
        let picker = {
            let routing = self.routing.read().unwrap_or_else(|p| p.into_inner());
            routing.picker.clone()
        };
        Ok(picker.pick(method)?)
    }

    async fn backoff_and_refresh(&self, attempt: u32) {
        time::sleep(RETRY_BACKOFF * attempt).await;
        if let Err(e) = self.refresh().await {
            slog::warn!(self.logger, "Failed to re-resolve cluster: {}", e);
        }
    }
}

fn build_picker(state: &ResolvedState) -> Result<Picker<GrpcLogClient<Channel>>, ClientError> {
    let mut connections = Vec::with_capacity(state.addresses.len());
    for address in &state.addresses {
        let endpoint = Endpoint::from_shared(format!("http://{}", address.addr))
            .map_err(|_| ResolveError::InvalidTarget(address.addr.clone()))?;
        connections.push((address.clone(), GrpcLogClient::new(endpoint.connect_lazy())));
    }
    Ok(Picker::new(connections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataMap;

    #[test]
    fn decodes_not_leader_status() {
        let mut metadata = MetadataMap::new();
        metadata.insert(LEADER_ID_METADATA, "node-0".parse().unwrap());
        metadata.insert(LEADER_ADDR_METADATA, "127.0.0.1:9000".parse().unwrap());
        let status = Status::with_metadata(Code::FailedPrecondition, "not leader", metadata);

        match ClientError::from(status) {
            ClientError::NotLeader { leader_id, leader_addr } => {
                assert_eq!(leader_id, "node-0");
                assert_eq!(leader_addr, "127.0.0.1:9000");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn decodes_out_of_range_status() {
        let mut metadata = MetadataMap::new();
        metadata.insert(OFFSET_METADATA, "42".parse().unwrap());
        let status = Status::with_metadata(Code::OutOfRange, "offset out of range: 42", metadata);

        assert!(matches!(ClientError::from(status), ClientError::OffsetOutOfRange { offset: 42 }));
    }

    #[test]
    fn unknown_statuses_stay_opaque() {
        let err = ClientError::from(Status::failed_precondition("no metadata"));

        assert!(matches!(err, ClientError::Rpc(_)));
        assert!(!err.is_retryable());
        assert!(ClientError::from(Status::unavailable("down")).is_retryable());
    }
}
