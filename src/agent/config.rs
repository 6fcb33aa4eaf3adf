use crate::commitlog::SegmentConfig;
use crate::replica::RaftOptions;
use std::env;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Everything one server needs to start.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub node_id: String,
    pub data_dir: PathBuf,
    /// Port 0 picks a free port; the bound address is what peers and clients are told.
    pub bind_addr: SocketAddr,
    /// Start a new cluster with this server as its only voter.
    pub bootstrap: bool,
    /// Servers to ask for a join at start. Any member works; non-leaders redirect to the leader.
    pub start_join_addrs: Vec<String>,
    pub segment: SegmentConfig,
    pub raft: RaftOptions,
    /// Access policy for produce and consume. Everything is permitted without one.
    pub acl_policy_file: Option<PathBuf>,
}

impl AgentConfig {
    pub fn new<I: Into<String>, P: Into<PathBuf>>(node_id: I, data_dir: P, bind_addr: SocketAddr) -> Self {
        AgentConfig {
            node_id: node_id.into(),
            data_dir: data_dir.into(),
            bind_addr,
            bootstrap: false,
            start_join_addrs: Vec::new(),
            segment: SegmentConfig::default(),
            raft: RaftOptions::default(),
            acl_policy_file: None,
        }
    }
}

/// Path of `file_name` inside the directory named by `env_var`, or inside the current directory
/// when the variable is unset or empty.
pub fn config_file(env_var: &str, file_name: &str) -> io::Result<PathBuf> {
    match env::var_os(env_var) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir).join(file_name)),
        _ => Ok(env::current_dir()?.join(file_name)),
    }
}
