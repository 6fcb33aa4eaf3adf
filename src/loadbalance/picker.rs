use std::sync::atomic::{AtomicUsize, Ordering};

/// A routable cluster member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub addr: String,
    pub is_leader: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PickError {
    /// Nothing resolved yet; retry after the next resolution.
    #[error("No connection available yet")]
    NoConnectionAvailable,
}

/// Which members may serve a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodClass {
    /// Must run on the leader.
    Write,
    /// Any member; followers preferred.
    Read,
}

impl MethodClass {
    /// Classifies a method by name, either bare (`Consume`) or as a gRPC path
    /// (`/log.GrpcLog/Consume`). Only the consume methods are reads.
    pub fn of(method: &str) -> Self {
        let name = method.rsplit('/').next().unwrap_or(method);
        if name.starts_with("Consume") {
            MethodClass::Read
        } else {
            MethodClass::Write
        }
    }
}

/// Picker routes calls over one snapshot of the address set. Build a new one whenever the set
/// changes; the follower rotation starts over with it.
#[derive(Debug)]
pub struct Picker<T> {
    leader: Option<T>,
    followers: Vec<T>,
    cursor: AtomicUsize,
}

impl<T: Clone> Picker<T> {
    /// `connections` pairs each resolved address with its connection. Followers rotate in the
    /// order given.
    pub fn new<I: IntoIterator<Item = (Address, T)>>(connections: I) -> Self {
        let mut leader = None;
        let mut followers = Vec::new();
        for (address, connection) in connections {
            if address.is_leader {
                leader = Some(connection);
            } else {
                followers.push(connection);
            }
        }

        Picker {
            leader,
            followers,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn pick(&self, method: &str) -> Result<T, PickError> {
        match MethodClass::of(method) {
            MethodClass::Write => self.leader.clone().ok_or(PickError::NoConnectionAvailable),
            MethodClass::Read if self.followers.is_empty() => {
                self.leader.clone().ok_or(PickError::NoConnectionAvailable)
            }
            MethodClass::Read => {
                let next = self.cursor.fetch_add(1, Ordering::Relaxed);
                Ok(self.followers[next % self.followers.len()].clone())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leader.is_none() && self.followers.is_empty()
    }
}
