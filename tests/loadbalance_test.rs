use replog::{
    Address, AllowAll, ClientError, ClusterClient, GetServerer, Log, Picker, ResolveError, Resolver, RpcServer,
    RpcServerConfig, SegmentConfig, ServerInfo,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Reports whatever server list the test sets.
#[derive(Default)]
struct FakeServers {
    servers: Mutex<Vec<ServerInfo>>,
}

impl FakeServers {
    fn set(&self, servers: Vec<ServerInfo>) {
        *self.servers.lock().unwrap() = servers;
    }
}

impl GetServerer for FakeServers {
    fn servers(&self) -> Vec<ServerInfo> {
        self.servers.lock().unwrap().clone()
    }
}

struct TestServer {
    addr: SocketAddr,
    servers: Arc<FakeServers>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Log::open(test_logger(), dir.path(), SegmentConfig::default()).unwrap());
        let servers = Arc::new(FakeServers::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();

        let server = RpcServer::new(
            test_logger(),
            RpcServerConfig {
                commit_log: log,
                authorizer: Arc::new(AllowAll),
                get_serverer: Some(servers.clone()),
                membership: None,
            },
            shutdown.clone(),
        );
        let task = tokio::spawn(server.run(listener, None));

        TestServer {
            addr,
            servers,
            shutdown,
            task,
            _dir: dir,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

fn server_info(id: &str, rpc_addr: &str, is_leader: bool) -> ServerInfo {
    ServerInfo {
        id: id.to_string(),
        rpc_addr: rpc_addr.to_string(),
        is_leader,
    }
}

fn address(addr: &str, is_leader: bool) -> Address {
    Address {
        addr: addr.to_string(),
        is_leader,
    }
}

#[tokio::test]
async fn resolver_tags_addresses_and_is_idempotent() {
    // -- setup --
    let server = TestServer::start().await;
    server.servers.set(vec![
        server_info_leader("localhost:9001"),
        server_info("follower", "localhost:9002", false),
    ]);

    // -- execute --
    let resolver = Resolver::connect(test_logger(), &format!("replog://{}", server.addr))
        .await
        .unwrap();
    let first = resolver.state();
    let watcher = resolver.subscribe();
    let second = resolver.resolve_now().await.unwrap();

    // -- verify --
    assert_eq!(
        first.addresses,
        vec![address("localhost:9001", true), address("localhost:9002", false)]
    );
    assert_eq!(first, second);
    assert!(!watcher.has_changed().unwrap());

    server.stop().await;
}

#[tokio::test]
async fn resolver_publishes_topology_changes() {
    // -- setup --
    let server = TestServer::start().await;
    server.servers.set(vec![server_info_leader("localhost:9001")]);
    let resolver = Resolver::connect(test_logger(), &server.addr.to_string()).await.unwrap();
    let mut watcher = resolver.subscribe();

    // -- execute --
    server.servers.set(vec![
        server_info("leader", "localhost:9001", false),
        server_info("follower", "localhost:9002", true),
    ]);
    resolver.resolve_now().await.unwrap();

    // -- verify --
    assert!(watcher.has_changed().unwrap());
    let picker = Picker::new(
        watcher
            .borrow_and_update()
            .addresses
            .iter()
            .map(|a| (a.clone(), a.addr.clone())),
    );
    assert_eq!(picker.pick("Produce").unwrap(), "localhost:9002");
    assert_eq!(picker.pick("Consume").unwrap(), "localhost:9001");

    server.stop().await;
}

#[tokio::test]
async fn unreachable_seed_is_a_resolution_error() {
    // -- setup --
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    // -- execute --
    let result = Resolver::connect(test_logger(), &addr.to_string()).await;

    // -- verify --
    assert!(matches!(result, Err(ResolveError::Unreachable { .. })));
}

#[tokio::test]
async fn cluster_client_routes_produce_and_consume() {
    // -- setup --
    let server = TestServer::start().await;
    let addr = server.addr.to_string();
    // The same server plays leader and follower, so both routes reach its log.
    server
        .servers
        .set(vec![server_info("leader", &addr, true), server_info("follower", &addr, false)]);
    let client = ClusterClient::connect(test_logger(), &addr).await.unwrap();

    // -- execute --
    let offset = client.produce("hello").await.unwrap();
    let record = client.consume(offset).await.unwrap();
    let missing = client.consume(offset + 1).await;

    // -- verify --
    assert_eq!(offset, 0);
    assert_eq!(record.value.as_ref(), b"hello");
    assert_eq!(record.offset, 0);
    assert!(matches!(missing, Err(ClientError::OffsetOutOfRange { offset: 1 })));
    assert_eq!(client.addresses().len(), 2);

    server.stop().await;
}

#[tokio::test]
async fn cluster_client_without_leader_is_not_ready() {
    // -- setup --
    let server = TestServer::start().await;
    let client = ClusterClient::connect(test_logger(), &server.addr.to_string())
        .await
        .unwrap();

    // -- execute --
    let result = client.produce("nobody home").await;

    // -- verify --
    assert!(matches!(result, Err(ClientError::NotReady(_))));

    server.stop().await;
}

fn server_info_leader(rpc_addr: &str) -> ServerInfo {
    server_info("leader", rpc_addr, true)
}

fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
