use crate::commitlog::Record;
use crate::grpc::log::grpc_log_server::{GrpcLog, GrpcLogServer};
use crate::grpc::log::{
    ProtoConsumeReq, ProtoConsumeResult, ProtoGetServersReq, ProtoGetServersResult, ProtoJoinReq, ProtoJoinResult,
    ProtoLeaveReq, ProtoLeaveResult, ProtoProduceReq, ProtoProduceResult, ProtoRecord, ProtoServer,
};
use crate::membership::MembershipHandler;
use crate::replica::ServerInfo;
use crate::server::auth::subject_of;
use crate::server::status::{append_status, auth_status, log_status, membership_status};
use crate::server::tail::Tail;
use crate::server::{
    Authorizer, CommitLog, GetServerer, RaftRpcServer, SubjectInterceptor, CONSUME_ACTION, OBJECT_WILDCARD,
    PRODUCE_ACTION,
};
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

type ResultStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

const STREAM_BUFFER: usize = 16;

/// What an [`RpcServer`] serves. Cluster RPCs answer `UNIMPLEMENTED` when their collaborator is
/// absent.
pub struct RpcServerConfig {
    pub commit_log: Arc<dyn CommitLog>,
    pub authorizer: Arc<dyn Authorizer>,
    pub get_serverer: Option<Arc<dyn GetServerer>>,
    pub membership: Option<Arc<dyn MembershipHandler>>,
}

/// RpcServer is the type that implements the client-facing `GrpcLog` interface.
pub struct RpcServer {
    logger: slog::Logger,
    commit_log: Arc<dyn CommitLog>,
    authorizer: Arc<dyn Authorizer>,
    get_serverer: Option<Arc<dyn GetServerer>>,
    membership: Option<Arc<dyn MembershipHandler>>,
    shutdown: CancellationToken,
}

impl RpcServer {
    pub fn new(logger: slog::Logger, config: RpcServerConfig, shutdown: CancellationToken) -> Self {
        RpcServer {
            logger,
            commit_log: config.commit_log,
            authorizer: config.authorizer,
            get_serverer: config.get_serverer,
            membership: config.membership,
            shutdown,
        }
    }

    /// Serves on `listener` until the shutdown token is cancelled. Peer consensus traffic shares the
    /// listener when `raft` is given.
    pub async fn run(self, listener: TcpListener, raft: Option<RaftRpcServer>) {
        let logger = self.logger.clone();
        let shutdown = self.shutdown.clone();
        slog::info!(logger, "Listening on '{:?}'", listener.local_addr());

        let result = Server::builder()
            .add_service(GrpcLogServer::with_interceptor(self, SubjectInterceptor))
            .add_optional_service(raft.map(RaftRpcServer::into_service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                shutdown.cancelled().await
            })
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    fn authorize(&self, subject: &str, action: &str) -> Result<(), Status> {
        self.authorizer
            .authorize(subject, OBJECT_WILDCARD, action)
            .map_err(auth_status)
    }

    async fn handle_produce(&self, subject: &str, rpc_request: ProtoProduceReq) -> Result<ProtoProduceResult, Status> {
        self.authorize(subject, PRODUCE_ACTION)?;
        let record = Self::convert_produce_input(rpc_request)?;
        let offset = self
            .commit_log
            .append(record)
            .await
            .map_err(|e| append_status(&self.logger, e))?;
        Ok(ProtoProduceResult { offset })
    }

    fn convert_produce_input(rpc_request: ProtoProduceReq) -> Result<Record, Status> {
        match rpc_request.record {
            Some(record) => Ok(Record::new(record.value)),
            None => Err(Status::invalid_argument("Missing record")),
        }
    }

    fn handle_consume(&self, subject: &str, rpc_request: ProtoConsumeReq) -> Result<ProtoConsumeResult, Status> {
        self.authorize(subject, CONSUME_ACTION)?;
        let record = self
            .commit_log
            .read(rpc_request.offset)
            .map_err(|e| log_status(&self.logger, e))?;
        Ok(Self::convert_consume_result(record))
    }

    fn convert_consume_result(record: Record) -> ProtoConsumeResult {
        ProtoConsumeResult {
            record: Some(ProtoRecord {
                value: record.value.to_vec(),
                offset: record.offset,
            }),
        }
    }

    async fn handle_join(&self, rpc_request: ProtoJoinReq) -> Result<ProtoJoinResult, Status> {
        if rpc_request.id.is_empty() || rpc_request.rpc_addr.is_empty() {
            return Err(Status::invalid_argument("Join requires an id and an rpc address"));
        }
        let membership = self.membership()?;
        membership
            .join(&rpc_request.id, &rpc_request.rpc_addr)
            .await
            .map_err(|e| membership_status(&self.logger, e))?;
        Ok(ProtoJoinResult {})
    }

    async fn handle_leave(&self, rpc_request: ProtoLeaveReq) -> Result<ProtoLeaveResult, Status> {
        let membership = self.membership()?;
        membership
            .leave(&rpc_request.id)
            .await
            .map_err(|e| membership_status(&self.logger, e))?;
        Ok(ProtoLeaveResult {})
    }

    fn membership(&self) -> Result<&Arc<dyn MembershipHandler>, Status> {
        self.membership
            .as_ref()
            .ok_or_else(|| Status::unimplemented("Server is not part of a cluster"))
    }

    fn handle_get_servers(&self) -> Result<ProtoGetServersResult, Status> {
        let get_serverer = self
            .get_serverer
            .as_ref()
            .ok_or_else(|| Status::unimplemented("Server is not part of a cluster"))?;
        Ok(Self::convert_get_servers_result(get_serverer.servers()))
    }

    fn convert_get_servers_result(servers: Vec<ServerInfo>) -> ProtoGetServersResult {
        ProtoGetServersResult {
            servers: servers
                .into_iter()
                .map(|server| ProtoServer {
                    id: server.id,
                    rpc_addr: server.rpc_addr,
                    is_leader: server.is_leader,
                })
                .collect(),
        }
    }
}

#[tonic::async_trait]
impl GrpcLog for RpcServer {
    async fn produce(&self, request: Request<ProtoProduceReq>) -> Result<Response<ProtoProduceResult>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let subject = subject_of(&request);
        let result = self.handle_produce(&subject, request.into_inner()).await;
        slog::debug!(self.logger, "ServerWire - {:?}", result);
        result.map(Response::new)
    }

    async fn consume(&self, request: Request<ProtoConsumeReq>) -> Result<Response<ProtoConsumeResult>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let subject = subject_of(&request);
        let result = self.handle_consume(&subject, request.into_inner());
        slog::debug!(self.logger, "ServerWire - {:?}", result);
        result.map(Response::new)
    }

    type ConsumeStreamStream = ResultStream<ProtoConsumeResult>;

    async fn consume_stream(
        &self,
        request: Request<ProtoConsumeReq>,
    ) -> Result<Response<Self::ConsumeStreamStream>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        self.authorize(&subject_of(&request), CONSUME_ACTION)?;
        let start_offset = request.into_inner().offset;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let tail = Tail::new(
            self.logger.new(slog::o!("ConsumeStream" => start_offset)),
            self.commit_log.clone(),
            start_offset,
        );
        tokio::spawn(tail.run(tx, self.shutdown.clone()));

        let stream: Self::ConsumeStreamStream =
            Box::pin(ReceiverStream::new(rx).map(|result| result.map(Self::convert_consume_result)));
        Ok(Response::new(stream))
    }

    type ProduceStreamStream = ResultStream<ProtoProduceResult>;

    async fn produce_stream(
        &self,
        request: Request<Streaming<ProtoProduceReq>>,
    ) -> Result<Response<Self::ProduceStreamStream>, Status> {
        let subject = subject_of(&request);
        self.authorize(&subject, PRODUCE_ACTION)?;
        let mut requests = request.into_inner();

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let logger = self.logger.clone();
        let commit_log = self.commit_log.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                let rpc_request = tokio::select! {
                    _ = shutdown.cancelled() => return,
                    message = requests.message() => message,
                };
                let rpc_request = match rpc_request {
                    Ok(Some(rpc_request)) => rpc_request,
                    Ok(None) => return,
                    Err(status) => {
                        slog::debug!(logger, "ProduceStream client failed: {}", status);
                        return;
                    }
                };

                // One offset per record, in request order. The first failure ends the stream.
                let result = match Self::convert_produce_input(rpc_request) {
                    Ok(record) => commit_log
                        .append(record)
                        .await
                        .map(|offset| ProtoProduceResult { offset })
                        .map_err(|e| append_status(&logger, e)),
                    Err(status) => Err(status),
                };
                let failed = result.is_err();
                if tx.send(result).await.is_err() || failed {
                    return;
                }
            }
        });

        let stream: Self::ProduceStreamStream = Box::pin(ReceiverStream::new(rx));
        Ok(Response::new(stream))
    }

    async fn join(&self, request: Request<ProtoJoinReq>) -> Result<Response<ProtoJoinResult>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let result = self.handle_join(request.into_inner()).await;
        slog::debug!(self.logger, "ServerWire - {:?}", result);
        result.map(Response::new)
    }

    async fn leave(&self, request: Request<ProtoLeaveReq>) -> Result<Response<ProtoLeaveResult>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let result = self.handle_leave(request.into_inner()).await;
        slog::debug!(self.logger, "ServerWire - {:?}", result);
        result.map(Response::new)
    }

    async fn get_servers(
        &self,
        request: Request<ProtoGetServersReq>,
    ) -> Result<Response<ProtoGetServersResult>, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let result = self.handle_get_servers();
        slog::debug!(self.logger, "ServerWire - {:?}", result);
        result.map(Response::new)
    }
}
