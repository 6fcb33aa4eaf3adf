mod auth;
mod capability;
mod log_server;
mod raft_server;
mod status;
mod tail;

pub use auth::AclAuthorizer;
pub use auth::AllowAll;
pub use auth::AuthError;
pub use auth::Authorizer;
pub use auth::Subject;
pub use auth::SubjectInterceptor;
pub use auth::CONSUME_ACTION;
pub use auth::OBJECT_WILDCARD;
pub use auth::PRODUCE_ACTION;
pub use auth::SUBJECT_HEADER;
pub use capability::CommitLog;
pub use capability::GetServerer;
pub use log_server::RpcServer;
pub use log_server::RpcServerConfig;
pub use raft_server::RaftRpcServer;
pub use status::LEADER_ADDR_METADATA;
pub use status::LEADER_ID_METADATA;
pub use status::OFFSET_METADATA;
