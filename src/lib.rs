mod agent;
mod commitlog;
mod loadbalance;
mod logging;
mod membership;
mod replica;
mod server;
mod grpc {
    pub(crate) mod log {
        include!("../generated/log.rs");
    }
    pub(crate) mod raft {
        include!("../generated/raft.rs");
    }
}

pub use agent::config_file;
pub use agent::Agent;
pub use agent::AgentConfig;
pub use agent::AgentError;
pub use commitlog::AppendListener;
pub use commitlog::Log;
pub use commitlog::LogError;
pub use commitlog::LogReader;
pub use commitlog::Record;
pub use commitlog::SegmentConfig;
pub use grpc::log::grpc_log_client::GrpcLogClient;
pub use grpc::log::{
    ProtoConsumeReq, ProtoConsumeResult, ProtoGetServersReq, ProtoGetServersResult, ProtoJoinReq, ProtoJoinResult,
    ProtoLeaveReq, ProtoLeaveResult, ProtoProduceReq, ProtoProduceResult, ProtoRecord, ProtoServer,
};
pub use loadbalance::Address;
pub use loadbalance::ClientError;
pub use loadbalance::ClusterClient;
pub use loadbalance::MethodClass;
pub use loadbalance::PickError;
pub use loadbalance::Picker;
pub use loadbalance::ResolveError;
pub use loadbalance::ResolvedState;
pub use loadbalance::Resolver;
pub use loadbalance::SCHEME;
pub use logging::file_logger;
pub use logging::terminal_logger;
pub use membership::create as create_membership_coordinator;
pub use membership::MembershipClient;
pub use membership::MembershipCoordinator;
pub use membership::MembershipEvent;
pub use membership::MembershipHandler;
pub use replica::raft_node_id;
pub use replica::AppendError;
pub use replica::MembershipError;
pub use replica::OpenError;
pub use replica::RaftOptions;
pub use replica::ReplicatedLog;
pub use replica::ReplicatedLogConfig;
pub use replica::ServerInfo;
pub use replica::ServerNode;
pub use server::AclAuthorizer;
pub use server::AllowAll;
pub use server::AuthError;
pub use server::Authorizer;
pub use server::CommitLog;
pub use server::GetServerer;
pub use server::RaftRpcServer;
pub use server::RpcServer;
pub use server::RpcServerConfig;
pub use server::Subject;
pub use server::SubjectInterceptor;
pub use server::CONSUME_ACTION;
pub use server::LEADER_ADDR_METADATA;
pub use server::LEADER_ID_METADATA;
pub use server::OBJECT_WILDCARD;
pub use server::OFFSET_METADATA;
pub use server::PRODUCE_ACTION;
pub use server::SUBJECT_HEADER;
