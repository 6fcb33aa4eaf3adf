use crate::grpc::raft::grpc_raft_client::GrpcRaftClient;
use crate::grpc::raft::ProtoRaftPayload;
use crate::replica::{RaftNodeId, ServerNode, TypeConfig};
use openraft::error::{InstallSnapshotError, NetworkError, RPCError, RaftError, RemoteError, Unreachable};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse, VoteRequest,
    VoteResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::io;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

type RpcResult<T, E = RaftError<RaftNodeId>> = Result<T, RPCError<RaftNodeId, ServerNode, E>>;

/// Upper bound on a single peer message, in both directions.
pub(crate) const MAX_PEER_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// GrpcRaftNetwork opens peer connections for the consensus layer over the `GrpcRaft` service.
pub(crate) struct GrpcRaftNetwork {
    logger: slog::Logger,
}

impl GrpcRaftNetwork {
    pub(crate) fn new(logger: slog::Logger) -> Self {
        GrpcRaftNetwork { logger }
    }
}

impl RaftNetworkFactory<TypeConfig> for GrpcRaftNetwork {
    type Network = GrpcRaftPeer;

    async fn new_client(&mut self, target: RaftNodeId, node: &ServerNode) -> Self::Network {
        let client = Endpoint::from_shared(format!("http://{}", node.rpc_addr))
            .map(|endpoint| {
                GrpcRaftClient::new(endpoint.connect_lazy())
                    .max_decoding_message_size(MAX_PEER_MESSAGE_BYTES)
                    .max_encoding_message_size(MAX_PEER_MESSAGE_BYTES)
            })
            .map_err(|e| e.to_string());
        if let Err(e) = &client {
            slog::warn!(self.logger, "Peer {} has an unusable address: {}", node, e);
        }

        GrpcRaftPeer {
            target,
            peer: node.clone(),
            client,
        }
    }
}

/// Connection to a single peer. The channel connects lazily and reconnects on its own.
pub(crate) struct GrpcRaftPeer {
    target: RaftNodeId,
    peer: ServerNode,
    client: Result<GrpcRaftClient<Channel>, String>,
}

#[derive(Clone, Copy, Debug)]
enum PeerRpc {
    AppendEntries,
    Vote,
    InstallSnapshot,
}

/// Failure before the peer produced a result.
#[derive(Debug)]
enum TransportFailure {
    Unreachable(String),
    Network(String),
}

impl TransportFailure {
    fn into_rpc_error<E: Error>(self) -> RPCError<RaftNodeId, ServerNode, E> {
        match self {
            TransportFailure::Unreachable(message) => RPCError::Unreachable(Unreachable::new(&io::Error::new(
                io::ErrorKind::NotConnected,
                message,
            ))),
            TransportFailure::Network(message) => RPCError::Network(NetworkError::new(&io::Error::other(message))),
        }
    }
}

impl From<tonic::Status> for TransportFailure {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            Code::Unavailable => TransportFailure::Unreachable(status.to_string()),
            _ => TransportFailure::Network(status.to_string()),
        }
    }
}

impl GrpcRaftPeer {
    async fn send<T: Serialize>(&mut self, rpc: PeerRpc, request: &T) -> Result<ProtoRaftPayload, TransportFailure> {
        let data = serde_json::to_vec(request).map_err(|e| TransportFailure::Network(e.to_string()))?;
        let client = self.client.as_mut().map_err(|e| {
            TransportFailure::Unreachable(format!("bad address {} for {:?}: {}", self.peer.rpc_addr, rpc, e))
        })?;

        let request = ProtoRaftPayload { data };
        let reply = match rpc {
            PeerRpc::AppendEntries => client.append_entries(request).await,
            PeerRpc::Vote => client.vote(request).await,
            PeerRpc::InstallSnapshot => client.install_snapshot(request).await,
        };
        Ok(reply?.into_inner())
    }

    /// The peer answers with a json `Result`; its error half becomes a remote error.
    fn decode<T, E>(&self, payload: ProtoRaftPayload) -> RpcResult<T, E>
    where
        T: DeserializeOwned,
        E: Error + DeserializeOwned,
    {
        let result: Result<T, E> = match serde_json::from_slice(&payload.data) {
            Ok(result) => result,
            Err(e) => return Err(TransportFailure::Network(e.to_string()).into_rpc_error()),
        };
        result.map_err(|e| RPCError::RemoteError(RemoteError::new(self.target, e)))
    }

    async fn call<Req, Resp, E>(&mut self, rpc: PeerRpc, request: &Req) -> RpcResult<Resp, E>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
        E: Error + DeserializeOwned,
    {
        match self.send(rpc, request).await {
            Ok(payload) => self.decode(payload),
            Err(failure) => Err(failure.into_rpc_error()),
        }
    }
}

impl RaftNetwork<TypeConfig> for GrpcRaftPeer {
    async fn append_entries(
        &mut self,
        rpc: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> RpcResult<AppendEntriesResponse<RaftNodeId>> {
        self.call(PeerRpc::AppendEntries, &rpc).await
    }

    async fn vote(&mut self, rpc: VoteRequest<RaftNodeId>, _option: RPCOption) -> RpcResult<VoteResponse<RaftNodeId>> {
        self.call(PeerRpc::Vote, &rpc).await
    }

    async fn install_snapshot(
        &mut self,
        rpc: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> RpcResult<InstallSnapshotResponse<RaftNodeId>, RaftError<RaftNodeId, InstallSnapshotError>> {
        self.call(PeerRpc::InstallSnapshot, &rpc).await
    }
}
