use crate::commitlog::LogError;
use crate::replica::{AppendError, MembershipError};
use crate::server::AuthError;
use tonic::metadata::{Ascii, MetadataMap, MetadataValue};
use tonic::{Code, Status};

pub const OFFSET_METADATA: &str = "x-offset";
pub const LEADER_ID_METADATA: &str = "x-leader-id";
pub const LEADER_ADDR_METADATA: &str = "x-leader-addr";

pub(crate) fn log_status(logger: &slog::Logger, e: LogError) -> Status {
    match e {
        LogError::OffsetOutOfRange { offset } => {
            let mut metadata = MetadataMap::new();
            insert(&mut metadata, OFFSET_METADATA, &offset.to_string());
            Status::with_metadata(Code::OutOfRange, format!("offset out of range: {}", offset), metadata)
        }
        e => {
            slog::error!(logger, "Local log failure: {:?}", e);
            Status::internal(e.to_string())
        }
    }
}

pub(crate) fn append_status(logger: &slog::Logger, e: AppendError) -> Status {
    match e {
        AppendError::NotLeader { leader_id, leader_addr } => not_leader(&leader_id, &leader_addr),
        AppendError::NoLeader => Status::unavailable(AppendError::NoLeader.to_string()),
        e @ AppendError::ConsensusTimeout(_) => Status::deadline_exceeded(e.to_string()),
        AppendError::Storage(e) => log_status(logger, e),
        AppendError::Consensus(message) => {
            slog::error!(logger, "Consensus failure on append: {}", message);
            Status::internal(message)
        }
    }
}

pub(crate) fn membership_status(logger: &slog::Logger, e: MembershipError) -> Status {
    match e {
        MembershipError::NotLeader { leader_id, leader_addr } => not_leader(&leader_id, &leader_addr),
        MembershipError::NoLeader => Status::unavailable(MembershipError::NoLeader.to_string()),
        e @ MembershipError::Timeout(_) => Status::deadline_exceeded(e.to_string()),
        MembershipError::Consensus(message) => {
            slog::error!(logger, "Consensus failure on membership change: {}", message);
            Status::internal(message)
        }
    }
}

pub(crate) fn auth_status(e: AuthError) -> Status {
    match e {
        e @ AuthError::PermissionDenied { .. } => Status::permission_denied(e.to_string()),
        e => Status::internal(e.to_string()),
    }
}

fn not_leader(leader_id: &str, leader_addr: &str) -> Status {
    let mut metadata = MetadataMap::new();
    insert(&mut metadata, LEADER_ID_METADATA, leader_id);
    insert(&mut metadata, LEADER_ADDR_METADATA, leader_addr);
    Status::with_metadata(
        Code::FailedPrecondition,
        format!("I'm not leader; leader is {} at {}", leader_id, leader_addr),
        metadata,
    )
}

fn insert(metadata: &mut MetadataMap, key: &'static str, value: &str) {
    if let Ok(value) = value.parse::<MetadataValue<Ascii>>() {
        metadata.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn out_of_range_carries_offset() {
        let status = log_status(&test_logger(), LogError::OffsetOutOfRange { offset: 7 });

        assert_eq!(status.code(), Code::OutOfRange);
        assert_eq!(status.metadata().get(OFFSET_METADATA).unwrap(), "7");
    }

    #[test]
    fn not_leader_carries_leader_address() {
        let status = append_status(
            &test_logger(),
            AppendError::NotLeader {
                leader_id: "node-0".to_string(),
                leader_addr: "127.0.0.1:9000".to_string(),
            },
        );

        assert_eq!(status.code(), Code::FailedPrecondition);
        assert_eq!(status.metadata().get(LEADER_ID_METADATA).unwrap(), "node-0");
        assert_eq!(status.metadata().get(LEADER_ADDR_METADATA).unwrap(), "127.0.0.1:9000");
    }

    #[test]
    fn maps_remaining_kinds() {
        let logger = test_logger();

        assert_eq!(append_status(&logger, AppendError::NoLeader).code(), Code::Unavailable);
        assert_eq!(
            membership_status(&logger, MembershipError::Timeout(std::time::Duration::from_secs(1))).code(),
            Code::DeadlineExceeded
        );
        assert_eq!(
            append_status(&logger, AppendError::Storage(LogError::SegmentFull)).code(),
            Code::Internal
        );
        let denied = AuthError::PermissionDenied {
            subject: "a".to_string(),
            object: "*".to_string(),
            action: "produce".to_string(),
        };
        assert_eq!(auth_status(denied).code(), Code::PermissionDenied);
    }
}
