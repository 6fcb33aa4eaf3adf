use crate::replica::{MembershipError, ReplicatedLog};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A discovery event about another server. Delivery may repeat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipEvent {
    Joined { id: String, rpc_addr: String },
    Left { id: String },
}

/// The cluster reconfiguration a [`MembershipCoordinator`] drives. Both calls must treat an
/// already-applied change as success.
#[async_trait::async_trait]
pub trait MembershipHandler: Send + Sync + 'static {
    async fn join(&self, id: &str, rpc_addr: &str) -> Result<(), MembershipError>;
    async fn leave(&self, id: &str) -> Result<(), MembershipError>;
}

#[async_trait::async_trait]
impl MembershipHandler for ReplicatedLog {
    async fn join(&self, id: &str, rpc_addr: &str) -> Result<(), MembershipError> {
        ReplicatedLog::join(self, id, rpc_addr).await
    }

    async fn leave(&self, id: &str) -> Result<(), MembershipError> {
        ReplicatedLog::leave(self, id).await
    }
}

#[async_trait::async_trait]
impl<H: MembershipHandler> MembershipHandler for Arc<H> {
    async fn join(&self, id: &str, rpc_addr: &str) -> Result<(), MembershipError> {
        self.as_ref().join(id, rpc_addr).await
    }

    async fn leave(&self, id: &str) -> Result<(), MembershipError> {
        self.as_ref().leave(id).await
    }
}

pub fn create<H: MembershipHandler>(
    logger: slog::Logger,
    buffer_size: usize,
    local_id: String,
    handler: H,
) -> (MembershipClient, MembershipCoordinator<H>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let client = MembershipClient { sender: tx };
    let coordinator = MembershipCoordinator {
        logger,
        receiver: rx,
        local_id,
        handler,
    };

    (client, coordinator)
}

/// Feeds discovery events to the coordinator. The coordinator stops once every client is dropped.
#[derive(Clone)]
pub struct MembershipClient {
    sender: mpsc::Sender<MembershipEvent>,
}

impl MembershipClient {
    pub async fn joined<I: Into<String>, A: Into<String>>(&self, id: I, rpc_addr: A) {
        self.send(MembershipEvent::Joined {
            id: id.into(),
            rpc_addr: rpc_addr.into(),
        })
        .await;
    }

    pub async fn left<I: Into<String>>(&self, id: I) {
        self.send(MembershipEvent::Left { id: id.into() }).await;
    }

    pub async fn send(&self, event: MembershipEvent) {
        // Coordinator is gone only during shutdown; the event no longer matters then.
        let _ = self.sender.send(event).await;
    }
}

/// MembershipCoordinator applies discovery events to the cluster configuration one at a time, in
/// arrival order.
pub struct MembershipCoordinator<H: MembershipHandler> {
    logger: slog::Logger,
    receiver: mpsc::Receiver<MembershipEvent>,
    local_id: String,
    handler: H,
}

impl<H: MembershipHandler> MembershipCoordinator<H> {
    pub async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event).await;
        }
        slog::info!(self.logger, "Membership event loop stopped");
    }

    async fn handle_event(&mut self, event: MembershipEvent) {
        let (id, result) = match event {
            MembershipEvent::Joined { id, rpc_addr } => {
                if id == self.local_id {
                    return;
                }
                slog::debug!(self.logger, "Handling join of {} at {}", id, rpc_addr);
                let result = self.handler.join(&id, &rpc_addr).await;
                (id, result)
            }
            MembershipEvent::Left { id } => {
                if id == self.local_id {
                    return;
                }
                slog::debug!(self.logger, "Handling leave of {}", id);
                let result = self.handler.leave(&id).await;
                (id, result)
            }
        };

        match result {
            Ok(()) => {}
            // Only the leader reconfigures; it receives the same events.
            Err(e @ MembershipError::NotLeader { .. }) | Err(e @ MembershipError::NoLeader) => {
                slog::debug!(self.logger, "Skipping membership change for {}: {}", id, e);
            }
            Err(e) => {
                slog::error!(self.logger, "Membership change for {} failed: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<MembershipEvent>>,
        members: Mutex<Vec<String>>,
        not_leader: bool,
    }

    impl RecordingHandler {
        fn calls(&self) -> Vec<MembershipEvent> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl MembershipHandler for RecordingHandler {
        async fn join(&self, id: &str, rpc_addr: &str) -> Result<(), MembershipError> {
            self.calls.lock().unwrap().push(MembershipEvent::Joined {
                id: id.to_string(),
                rpc_addr: rpc_addr.to_string(),
            });
            if self.not_leader {
                return Err(MembershipError::NotLeader {
                    leader_id: "leader".to_string(),
                    leader_addr: "127.0.0.1:1".to_string(),
                });
            }
            let mut members = self.members.lock().unwrap();
            if !members.iter().any(|m| m == id) {
                members.push(id.to_string());
            }
            Ok(())
        }

        async fn leave(&self, id: &str) -> Result<(), MembershipError> {
            self.calls
                .lock()
                .unwrap()
                .push(MembershipEvent::Left { id: id.to_string() });
            self.members.lock().unwrap().retain(|m| m != id);
            Ok(())
        }
    }

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    async fn run_events(handler: Arc<RecordingHandler>, events: Vec<MembershipEvent>) {
        let (client, coordinator) = create(test_logger(), 8, "self".to_string(), handler);
        let task = tokio::spawn(coordinator.run_event_loop());
        for event in events {
            client.send(event).await;
        }
        drop(client);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn ignores_events_about_itself() {
        // -- setup --
        let handler = Arc::new(RecordingHandler::default());

        // -- execute --
        run_events(
            handler.clone(),
            vec![
                MembershipEvent::Joined {
                    id: "self".to_string(),
                    rpc_addr: "127.0.0.1:1".to_string(),
                },
                MembershipEvent::Left { id: "self".to_string() },
            ],
        )
        .await;

        // -- verify --
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_events_are_no_ops() {
        // -- setup --
        let handler = Arc::new(RecordingHandler::default());
        let join = MembershipEvent::Joined {
            id: "other".to_string(),
            rpc_addr: "127.0.0.1:2".to_string(),
        };
        let leave = MembershipEvent::Left { id: "other".to_string() };

        // -- execute --
        run_events(
            handler.clone(),
            vec![join.clone(), join.clone(), leave.clone(), leave.clone()],
        )
        .await;

        // -- verify --
        assert_eq!(handler.calls(), vec![join.clone(), join, leave.clone(), leave]);
        assert!(handler.members.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_running_when_not_leader() {
        // -- setup --
        let handler = Arc::new(RecordingHandler {
            not_leader: true,
            ..RecordingHandler::default()
        });

        // -- execute --
        let (client, coordinator) = create(test_logger(), 8, "self".to_string(), handler.clone());
        let task = tokio::spawn(coordinator.run_event_loop());
        client.joined("a", "127.0.0.1:3").await;
        client.joined("b", "127.0.0.1:4").await;
        drop(client);
        task.await.unwrap();

        // -- verify --
        assert_eq!(handler.calls().len(), 2);
    }
}
