use clap::Parser;
use replog::{Agent, AgentConfig, RaftOptions, SegmentConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::Duration;

/// Runs one server of a replicated commit log cluster.
#[derive(Debug, Parser)]
#[command(name = "replog-node", version)]
struct Args {
    /// Unique id of this server within the cluster.
    #[arg(long)]
    node_id: String,

    #[arg(long)]
    data_dir: PathBuf,

    /// Address for the client API and peer traffic. Port 0 picks a free port.
    #[arg(long, default_value = "127.0.0.1:8400")]
    bind_addr: SocketAddr,

    /// Start a new cluster with this server as its only voter.
    #[arg(long)]
    bootstrap: bool,

    /// Existing member to join through. Repeatable.
    #[arg(long = "join")]
    start_join_addrs: Vec<String>,

    /// Join other servers as learners only.
    #[arg(long)]
    join_as_learner: bool,

    #[arg(long, default_value_t = 1024)]
    max_store_bytes: u64,

    #[arg(long, default_value_t = 1024)]
    max_index_bytes: u64,

    #[arg(long)]
    heartbeat_ms: Option<u64>,

    #[arg(long)]
    snapshot_threshold: Option<u64>,

    /// Csv access policy (`p, subject, object, action`).
    #[arg(long)]
    acl_policy_file: Option<PathBuf>,

    /// Log to files under this directory instead of the terminal.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> AgentConfig {
        let mut config = AgentConfig::new(self.node_id, self.data_dir, self.bind_addr);
        config.bootstrap = self.bootstrap;
        config.start_join_addrs = self.start_join_addrs;
        config.segment = SegmentConfig {
            max_store_bytes: self.max_store_bytes,
            max_index_bytes: self.max_index_bytes,
            initial_offset: 0,
        };
        config.raft = RaftOptions {
            heartbeat_interval: self.heartbeat_ms.map(Duration::from_millis),
            snapshot_threshold: self.snapshot_threshold,
            join_as_learner: Some(self.join_as_learner),
            ..RaftOptions::default()
        };
        config.acl_policy_file = self.acl_policy_file;
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let logger = match &args.log_dir {
        Some(dir) => match replog::file_logger(dir, &args.node_id) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Failed to create log file in {:?}: {}", dir, e);
                return ExitCode::FAILURE;
            }
        },
        None => replog::terminal_logger(&args.node_id),
    };

    let agent = match Agent::start(logger.clone(), args.into_config()).await {
        Ok(agent) => agent,
        Err(e) => {
            slog::crit!(logger, "Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };
    slog::info!(logger, "Serving on {}", agent.rpc_addr());

    if let Err(e) = tokio::signal::ctrl_c().await {
        slog::error!(logger, "Failed to wait for ctrl-c: {}", e);
    }

    match agent.shutdown().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            slog::error!(logger, "Unclean shutdown: {}", e);
            ExitCode::FAILURE
        }
    }
}
