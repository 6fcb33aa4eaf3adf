use crate::commitlog::LogError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error("I'm not leader; leader is {leader_id} at {leader_addr}")]
    NotLeader { leader_id: String, leader_addr: String },

    #[error("No leader is currently known")]
    NoLeader,

    /// The proposal may still commit later.
    #[error("Not committed within {0:?}")]
    ConsensusTimeout(Duration),

    #[error("Local storage failure")]
    Storage(#[from] LogError),

    #[error("Consensus failure: {0}")]
    Consensus(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("I'm not leader; leader is {leader_id} at {leader_addr}")]
    NotLeader { leader_id: String, leader_addr: String },

    #[error("No leader is currently known")]
    NoLeader,

    #[error("Membership change not committed within {0:?}")]
    Timeout(Duration),

    #[error("Consensus failure: {0}")]
    Consensus(String),
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Invalid options: {0}")]
    InvalidOptions(&'static str),

    #[error("Invalid consensus config: {0}")]
    Config(String),

    #[error("Local storage failure")]
    Storage(#[from] LogError),

    #[error("Consensus failed to start: {0}")]
    Consensus(String),
}
