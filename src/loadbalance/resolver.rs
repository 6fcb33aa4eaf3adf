use crate::grpc::log::grpc_log_client::GrpcLogClient;
use crate::grpc::log::ProtoGetServersReq;
use crate::loadbalance::Address;
use tokio::sync::watch;
use tonic::transport::{Channel, Endpoint};

/// Target scheme accepted by [`Resolver::connect`], as in `replog://127.0.0.1:8400`.
pub const SCHEME: &str = "replog";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid target '{0}'")]
    InvalidTarget(String),

    #[error("Seed {addr} is unreachable")]
    Unreachable {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("GetServers failed: {0}")]
    Rpc(#[from] tonic::Status),
}

/// The routable address set from the latest resolution, in the order the seed listed them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedState {
    pub addresses: Vec<Address>,
}

/// Resolver discovers the cluster's members through one seed server and republishes them.
/// Watchers are only notified when a resolution changes the address set.
pub struct Resolver {
    logger: slog::Logger,
    seed: String,
    client: GrpcLogClient<Channel>,
    state: watch::Sender<ResolvedState>,
}

impl Resolver {
    /// Connects to the seed named by `target` (`replog://host:port` or `host:port`) and resolves
    /// once.
    pub async fn connect(logger: slog::Logger, target: &str) -> Result<Self, ResolveError> {
        let seed = parse_target(target)?;
        let endpoint = Endpoint::from_shared(format!("http://{}", seed))
            .map_err(|_| ResolveError::InvalidTarget(target.to_string()))?;
        let channel = endpoint.connect().await.map_err(|source| ResolveError::Unreachable {
            addr: seed.clone(),
            source,
        })?;

        let (state, _) = watch::channel(ResolvedState::default());
        let resolver = Resolver {
            logger,
            seed,
            client: GrpcLogClient::new(channel),
            state,
        };
        resolver.resolve_now().await?;
        Ok(resolver)
    }

    /// Asks the seed for the current servers and publishes the result.
    pub async fn resolve_now(&self) -> Result<ResolvedState, ResolveError> {
        let reply = self
            .client
            .clone()
            .get_servers(ProtoGetServersReq {})
            .await?
            .into_inner();

        let resolved = ResolvedState {
            addresses: reply
                .servers
                .into_iter()
                .map(|server| Address {
                    addr: server.rpc_addr,
                    is_leader: server.is_leader,
                })
                .collect(),
        };

        let changed = self.state.send_if_modified(|current| {
            if *current == resolved {
                return false;
            }
            *current = resolved.clone();
            true
        });
        if changed {
            slog::info!(self.logger, "Resolved {} servers via {}: {:?}", resolved.addresses.len(), self.seed, resolved);
        }

        Ok(resolved)
    }

    pub fn state(&self) -> ResolvedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolvedState> {
        self.state.subscribe()
    }
}

fn parse_target(target: &str) -> Result<String, ResolveError> {
    let addr = match target.split_once("://") {
        Some((scheme, addr)) if scheme == SCHEME => addr,
        Some(_) => return Err(ResolveError::InvalidTarget(target.to_string())),
        None => target,
    };
    let addr = addr.trim_end_matches('/');
    if addr.is_empty() || addr.contains('/') {
        return Err(ResolveError::InvalidTarget(target.to_string()));
    }
    Ok(addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targets() {
        assert_eq!(parse_target("replog://127.0.0.1:8400").unwrap(), "127.0.0.1:8400");
        assert_eq!(parse_target("localhost:8400/").unwrap(), "localhost:8400");
        assert!(matches!(parse_target("http://localhost:8400"), Err(ResolveError::InvalidTarget(_))));
        assert!(matches!(parse_target("replog://"), Err(ResolveError::InvalidTarget(_))));
    }
}
