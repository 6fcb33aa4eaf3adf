use crate::grpc::raft::grpc_raft_server::{GrpcRaft, GrpcRaftServer};
use crate::grpc::raft::ProtoRaftPayload;
use crate::replica::{RaftNodeId, ReplicatedLog, TypeConfig, MAX_PEER_MESSAGE_BYTES};
use openraft::raft::{AppendEntriesRequest, InstallSnapshotRequest, VoteRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// RaftRpcServer receives consensus traffic from peers and hands it to the local raft node.
///
/// Requests and results are json inside a [`ProtoRaftPayload`]. A consensus-level failure is a
/// successful RPC whose payload holds the `Err` half.
pub struct RaftRpcServer {
    logger: slog::Logger,
    replicated_log: Arc<ReplicatedLog>,
}

impl RaftRpcServer {
    pub fn new(logger: slog::Logger, replicated_log: Arc<ReplicatedLog>) -> Self {
        RaftRpcServer { logger, replicated_log }
    }

    pub(crate) fn into_service(self) -> GrpcRaftServer<Self> {
        GrpcRaftServer::new(self)
            .max_decoding_message_size(MAX_PEER_MESSAGE_BYTES)
            .max_encoding_message_size(MAX_PEER_MESSAGE_BYTES)
    }

    fn convert_input<T: DeserializeOwned>(rpc_request: ProtoRaftPayload) -> Result<T, Status> {
        serde_json::from_slice(&rpc_request.data)
            .map_err(|e| Status::invalid_argument(format!("Malformed raft payload: {}", e)))
    }

    fn convert_result<T: Serialize>(app_result: &T) -> Result<ProtoRaftPayload, Status> {
        serde_json::to_vec(app_result)
            .map(|data| ProtoRaftPayload { data })
            .map_err(|e| Status::internal(format!("Failed to encode raft result: {}", e)))
    }
}

#[tonic::async_trait]
impl GrpcRaft for RaftRpcServer {
    async fn append_entries(&self, request: Request<ProtoRaftPayload>) -> Result<Response<ProtoRaftPayload>, Status> {
        let app_input: AppendEntriesRequest<TypeConfig> = Self::convert_input(request.into_inner())?;
        let app_result = self.replicated_log.raft().append_entries(app_input).await;
        if let Err(e) = &app_result {
            slog::debug!(self.logger, "AppendEntries rejected: {}", e);
        }
        Self::convert_result(&app_result).map(Response::new)
    }

    async fn vote(&self, request: Request<ProtoRaftPayload>) -> Result<Response<ProtoRaftPayload>, Status> {
        let app_input: VoteRequest<RaftNodeId> = Self::convert_input(request.into_inner())?;
        let app_result = self.replicated_log.raft().vote(app_input).await;
        Self::convert_result(&app_result).map(Response::new)
    }

    async fn install_snapshot(
        &self,
        request: Request<ProtoRaftPayload>,
    ) -> Result<Response<ProtoRaftPayload>, Status> {
        let app_input: InstallSnapshotRequest<TypeConfig> = Self::convert_input(request.into_inner())?;
        let app_result = self.replicated_log.raft().install_snapshot(app_input).await;
        if let Err(e) = &app_result {
            slog::warn!(self.logger, "InstallSnapshot failed: {}", e);
        }
        Self::convert_result(&app_result).map(Response::new)
    }
}
