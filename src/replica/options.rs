use std::convert::TryFrom;
use tokio::time::Duration;

const CLUSTER_NAME: &str = "replog";
/// Snapshot chunks travel as json, which inflates them several times over.
const SNAPSHOT_CHUNK_BYTES: u64 = 512 * 1024;

#[derive(Clone, Debug, Default)]
pub struct RaftOptions {
    pub heartbeat_interval: Option<Duration>,
    pub election_timeout_min: Option<Duration>,
    pub election_timeout_max: Option<Duration>,
    /// How long an append or membership change may wait for the cluster to commit it.
    pub apply_timeout: Option<Duration>,
    /// Number of applied entries since the last snapshot that triggers a new one.
    pub snapshot_threshold: Option<u64>,
    /// Entries already covered by a snapshot that are kept in the journal for lagging followers.
    pub logs_to_keep: Option<u64>,
    /// Joining servers are added as non-voting learners only.
    pub join_as_learner: Option<bool>,
    pub membership_retries: Option<u32>,
}

#[derive(Clone, Debug)]
pub(crate) struct RaftOptionsValidated {
    pub heartbeat_interval: Duration,
    pub election_timeout_min: Duration,
    pub election_timeout_max: Duration,
    pub apply_timeout: Duration,
    pub snapshot_threshold: u64,
    pub logs_to_keep: u64,
    pub join_as_learner: bool,
    pub membership_retries: u32,
}

impl RaftOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.heartbeat_interval >= self.election_timeout_min {
            return Err("Election minimum timeout must be greater than the heartbeat interval");
        }
        if self.election_timeout_min >= self.election_timeout_max {
            return Err("Election minimum timeout must be less than maximum timeout");
        }
        if self.apply_timeout.is_zero() {
            return Err("Apply timeout must be non-zero");
        }
        if self.snapshot_threshold == 0 {
            return Err("Snapshot threshold must be non-zero");
        }
        if self.membership_retries == 0 {
            return Err("Membership changes need at least one attempt");
        }

        Ok(())
    }

    pub(crate) fn to_openraft_config(&self) -> Result<openraft::Config, String> {
        openraft::Config {
            cluster_name: CLUSTER_NAME.to_string(),
            heartbeat_interval: self.heartbeat_interval.as_millis() as u64,
            election_timeout_min: self.election_timeout_min.as_millis() as u64,
            election_timeout_max: self.election_timeout_max.as_millis() as u64,
            snapshot_policy: openraft::SnapshotPolicy::LogsSinceLast(self.snapshot_threshold),
            snapshot_max_chunk_size: SNAPSHOT_CHUNK_BYTES,
            max_in_snapshot_log_to_keep: self.logs_to_keep,
            ..Default::default()
        }
        .validate()
        .map_err(|e| e.to_string())
    }
}

impl TryFrom<RaftOptions> for RaftOptionsValidated {
    type Error = &'static str;

    fn try_from(options: RaftOptions) -> Result<Self, Self::Error> {
        let values = RaftOptionsValidated {
            heartbeat_interval: options.heartbeat_interval.unwrap_or(Duration::from_millis(100)),
            election_timeout_min: options.election_timeout_min.unwrap_or(Duration::from_millis(300)),
            election_timeout_max: options.election_timeout_max.unwrap_or(Duration::from_millis(600)),
            apply_timeout: options.apply_timeout.unwrap_or(Duration::from_secs(10)),
            snapshot_threshold: options.snapshot_threshold.unwrap_or(5000),
            logs_to_keep: options.logs_to_keep.unwrap_or(1000),
            join_as_learner: options.join_as_learner.unwrap_or(false),
            membership_retries: options.membership_retries.unwrap_or(3),
        };

        values.validate()?;
        Ok(values)
    }
}
