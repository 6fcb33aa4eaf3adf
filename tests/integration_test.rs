use chrono::Utc;
use replog::{
    Agent, AgentConfig, ClientError, ClusterClient, GrpcLogClient, ProtoConsumeReq, ProtoGetServersReq,
    ProtoProduceReq, ProtoRecord, RaftOptions,
};
use slog::Drain;
use std::fs::OpenOptions;
use std::future::Future;
use std::net::SocketAddr;
use tokio::time::{self, Duration, Instant};
use tonic::transport::Channel;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_node_cluster_replicates_and_forwards() {
    // -- setup --
    let dirs: Vec<tempfile::TempDir> = (0..3).map(|_| tempfile::tempdir().unwrap()).collect();
    let leader = Agent::start(test_logger(), config(0, &dirs[0], true, Vec::new()))
        .await
        .unwrap();
    leader.replicated_log().wait_for_leader(SETTLE_TIMEOUT).await.unwrap();
    let seed = leader.rpc_addr().to_string();
    let follower_1 = Agent::start(test_logger(), config(1, &dirs[1], false, vec![seed.clone()]))
        .await
        .unwrap();
    let follower_2 = Agent::start(test_logger(), config(2, &dirs[2], false, vec![seed.clone()]))
        .await
        .unwrap();

    // -- execute & verify --

    // 1. Produce on the leader, read back locally right away.
    let mut leader_client = client(leader.rpc_addr()).await;
    let offset = leader_client
        .produce(produce_req("foo"))
        .await
        .unwrap()
        .into_inner()
        .offset;
    let record = leader_client
        .consume(ProtoConsumeReq { offset })
        .await
        .unwrap()
        .into_inner()
        .record
        .unwrap();
    assert_eq!(offset, 0);
    assert_eq!((record.value.as_slice(), record.offset), (b"foo".as_ref(), 0));

    // 2. The followers apply the same record at the same offset.
    for follower in [&follower_1, &follower_2] {
        let mut follower_client = client(follower.rpc_addr()).await;
        let record = eventually(|| {
            let mut follower_client = follower_client.clone();
            async move { follower_client.consume(ProtoConsumeReq { offset: 0 }).await.ok() }
        })
        .await
        .into_inner()
        .record
        .unwrap();
        assert_eq!((record.value.as_slice(), record.offset), (b"foo".as_ref(), 0));
        follower_client.get_servers(ProtoGetServersReq {}).await.unwrap();
    }

    // 3. Produce on a follower is redirected to the leader, where the retry succeeds.
    let mut follower_client = client(follower_1.rpc_addr()).await;
    let status = follower_client.produce(produce_req("bar")).await.unwrap_err();
    let leader_addr = match ClientError::from(status) {
        ClientError::NotLeader { leader_addr, .. } => leader_addr,
        other => panic!("expected a redirect, got {:?}", other),
    };
    assert_eq!(leader_addr, leader.rpc_addr().to_string());
    let offset = client(leader_addr.parse().unwrap())
        .await
        .produce(produce_req("bar"))
        .await
        .unwrap()
        .into_inner()
        .offset;
    assert_eq!(offset, 1);

    // 4. Every member reports the same cluster.
    let servers = follower_client
        .get_servers(ProtoGetServersReq {})
        .await
        .unwrap()
        .into_inner()
        .servers;
    assert_eq!(servers.len(), 3);
    let leaders: Vec<_> = servers.iter().filter(|s| s.is_leader).collect();
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].id, "node-0");

    // 5. A load-balanced client writes through any seed and reads from followers.
    let cluster_client = ClusterClient::connect(test_logger(), &format!("replog://{}", follower_2.rpc_addr()))
        .await
        .unwrap();
    let offset = cluster_client.produce("baz").await.unwrap();
    assert_eq!(offset, 2);
    let cluster_client = &cluster_client;
    let record = eventually(|| async move { cluster_client.consume(2).await.ok() }).await;
    assert_eq!(record.value.as_ref(), b"baz");

    // 6. Membership changes are idempotent.
    let replicated_log = leader.replicated_log();
    replicated_log
        .join("node-1", &follower_1.rpc_addr().to_string())
        .await
        .unwrap();
    replicated_log.leave("never-joined").await.unwrap();
    replicated_log.leave("node-2").await.unwrap();
    eventually(|| {
        let remaining = replicated_log.servers().len();
        async move { (remaining == 2).then_some(()) }
    })
    .await;
    replicated_log.leave("node-2").await.unwrap();
    assert_eq!(replicated_log.servers().len(), 2);

    // -- teardown --
    follower_2.shutdown().await.unwrap();
    follower_1.shutdown().await.unwrap();
    leader.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_joiner_catches_up_from_snapshot() {
    // -- setup --
    let dirs: Vec<tempfile::TempDir> = (0..2).map(|_| tempfile::tempdir().unwrap()).collect();
    let mut leader_config = config(0, &dirs[0], true, Vec::new());
    leader_config.raft.snapshot_threshold = Some(5);
    leader_config.raft.logs_to_keep = Some(0);
    let leader = Agent::start(test_logger(), leader_config).await.unwrap();
    leader.replicated_log().wait_for_leader(SETTLE_TIMEOUT).await.unwrap();

    let mut leader_client = client(leader.rpc_addr()).await;
    for i in 0..12 {
        let offset = leader_client
            .produce(produce_req(&format!("record-{}", i)))
            .await
            .unwrap()
            .into_inner()
            .offset;
        assert_eq!(offset, i);
    }
    leader.replicated_log().trigger_snapshot().await.unwrap();

    // -- execute --
    let joiner = Agent::start(
        test_logger(),
        config(1, &dirs[1], false, vec![leader.rpc_addr().to_string()]),
    )
    .await
    .unwrap();

    // -- verify --
    let mut joiner_client = client(joiner.rpc_addr()).await;
    for i in 0..12u64 {
        let record = eventually(|| {
            let mut joiner_client = joiner_client.clone();
            async move { joiner_client.consume(ProtoConsumeReq { offset: i }).await.ok() }
        })
        .await
        .into_inner()
        .record
        .unwrap();
        assert_eq!(record.offset, i);
        assert_eq!(record.value, format!("record-{}", i).into_bytes());
    }
    let offset = leader_client
        .produce(produce_req("after-join"))
        .await
        .unwrap()
        .into_inner()
        .offset;
    assert_eq!(offset, 12);
    let record = eventually(|| {
        let mut joiner_client = joiner_client.clone();
        async move { joiner_client.consume(ProtoConsumeReq { offset: 12 }).await.ok() }
    })
    .await;
    assert_eq!(record.into_inner().record.unwrap().value, b"after-join".to_vec());
    joiner_client.get_servers(ProtoGetServersReq {}).await.unwrap();

    // -- teardown --
    joiner.shutdown().await.unwrap();
    leader.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn learner_joins_replicate_without_voting() {
    // -- setup --
    let dirs: Vec<tempfile::TempDir> = (0..2).map(|_| tempfile::tempdir().unwrap()).collect();
    let mut leader_config = config(0, &dirs[0], true, Vec::new());
    leader_config.raft.join_as_learner = Some(true);
    let leader = Agent::start(test_logger(), leader_config).await.unwrap();
    leader.replicated_log().wait_for_leader(SETTLE_TIMEOUT).await.unwrap();

    // -- execute --
    let learner = Agent::start(
        test_logger(),
        config(1, &dirs[1], false, vec![leader.rpc_addr().to_string()]),
    )
    .await
    .unwrap();

    // -- verify --
    let replicated_log = leader.replicated_log();
    assert!(replicated_log.is_leader());
    eventually(|| {
        let members = replicated_log.servers().len();
        async move { (members == 2).then_some(()) }
    })
    .await;
    assert!(replicated_log.servers().iter().any(|s| s.id == "node-1" && !s.is_leader));
    assert!(replicated_log.is_voter("node-0"));
    assert!(!replicated_log.is_voter("node-1"));

    // Joining again at the same address leaves the learner as it is.
    replicated_log
        .join("node-1", &learner.rpc_addr().to_string())
        .await
        .unwrap();
    assert_eq!(replicated_log.servers().len(), 2);
    assert!(!replicated_log.is_voter("node-1"));

    // The learner follows the leader and applies its writes.
    let learner_log = learner.replicated_log();
    assert!(!learner_log.is_leader());
    let leader_id = eventually(|| {
        let leader = learner_log.leader();
        async move { leader.map(|node| node.id) }
    })
    .await;
    assert_eq!(leader_id, "node-0");

    let offset = client(leader.rpc_addr())
        .await
        .produce(produce_req("observed"))
        .await
        .unwrap()
        .into_inner()
        .offset;
    let learner_client = client(learner.rpc_addr()).await;
    let record = eventually(|| {
        let mut learner_client = learner_client.clone();
        async move { learner_client.consume(ProtoConsumeReq { offset }).await.ok() }
    })
    .await
    .into_inner()
    .record
    .unwrap();
    assert_eq!(record.value, b"observed".to_vec());

    // -- teardown --
    learner.shutdown().await.unwrap();
    leader.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn restarted_node_recovers_its_log() {
    // -- setup --
    let dir = tempfile::tempdir().unwrap();
    let agent = Agent::start(test_logger(), config(0, &dir, true, Vec::new()))
        .await
        .unwrap();
    agent.replicated_log().wait_for_leader(SETTLE_TIMEOUT).await.unwrap();
    let mut agent_client = client(agent.rpc_addr()).await;
    for value in ["a", "b", "c"] {
        agent_client.produce(produce_req(value)).await.unwrap();
    }
    drop(agent_client);
    agent.shutdown().await.unwrap();

    // -- execute --
    let agent = Agent::start(test_logger(), config(0, &dir, true, Vec::new()))
        .await
        .unwrap();
    agent.replicated_log().wait_for_leader(SETTLE_TIMEOUT).await.unwrap();

    // -- verify --
    let agent_client = client(agent.rpc_addr()).await;
    for (offset, value) in ["a", "b", "c"].iter().enumerate() {
        let record = eventually(|| {
            let mut agent_client = agent_client.clone();
            async move {
                agent_client
                    .consume(ProtoConsumeReq { offset: offset as u64 })
                    .await
                    .ok()
            }
        })
        .await
        .into_inner()
        .record
        .unwrap();
        assert_eq!(record.value, value.as_bytes().to_vec());
    }
    let offset = eventually(|| {
        let mut agent_client = agent_client.clone();
        async move { agent_client.produce(produce_req("d")).await.ok() }
    })
    .await
    .into_inner()
    .offset;
    assert_eq!(offset, 3);

    agent.shutdown().await.unwrap();
}

fn config(i: usize, dir: &tempfile::TempDir, bootstrap: bool, start_join_addrs: Vec<String>) -> AgentConfig {
    let mut config = AgentConfig::new(
        format!("node-{}", i),
        dir.path(),
        "127.0.0.1:0".parse().unwrap(),
    );
    config.bootstrap = bootstrap;
    config.start_join_addrs = start_join_addrs;
    config.raft = RaftOptions {
        heartbeat_interval: Some(Duration::from_millis(50)),
        election_timeout_min: Some(Duration::from_millis(150)),
        election_timeout_max: Some(Duration::from_millis(300)),
        ..RaftOptions::default()
    };
    config
}

async fn client(addr: SocketAddr) -> GrpcLogClient<Channel> {
    GrpcLogClient::connect(format!("http://{}", addr)).await.unwrap()
}

fn produce_req(value: &str) -> ProtoProduceReq {
    ProtoProduceReq {
        record: Some(ProtoRecord {
            value: value.as_bytes().to_vec(),
            offset: 0,
        }),
    }
}

/// Retries `attempt` until it yields a value or [`SETTLE_TIMEOUT`] passes.
async fn eventually<T, F, Fut>(mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        if let Some(value) = attempt().await {
            return value;
        }
        if Instant::now() > deadline {
            panic!("condition not met within {:?}", SETTLE_TIMEOUT);
        }
        time::sleep(Duration::from_millis(50)).await;
    }
}

fn test_logger() -> slog::Logger {
    match std::env::var("REPLOG_TEST_LOG_DIR") {
        Ok(dir) => create_root_logger_for_file(dir),
        Err(_) => slog::Logger::root(slog::Discard, slog::o!()),
    }
}

fn create_root_logger_for_file(directory_prefix: String) -> slog::Logger {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.fZ");
    let log_path = format!("{}/{}_info.log", directory_prefix, now);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)
        .unwrap();

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
