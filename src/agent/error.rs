use crate::commitlog::LogError;
use crate::replica::{MembershipError, OpenError};
use crate::server::AuthError;
use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open replicated log")]
    Open(#[from] OpenError),

    #[error("Failed to load access policy")]
    Auth(#[from] AuthError),

    #[error("Failed to bootstrap cluster")]
    Bootstrap(#[from] MembershipError),

    #[error("Failed to join cluster via {seeds:?}: {reason}")]
    Join { seeds: Vec<String>, reason: String },

    #[error("Failed to close log")]
    Storage(#[from] LogError),
}
