use std::io;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("offset out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    /// Internal bound violation. The owning [`Log`](super::Log) rotates before this can happen.
    #[error("segment is full")]
    SegmentFull,

    #[error("corrupt log data: {0}")]
    Corrupt(String),

    #[error("log io failure")]
    Io(#[from] io::Error),
}

impl LogError {
    pub(crate) fn is_out_of_range(&self) -> bool {
        matches!(self, LogError::OffsetOutOfRange { .. })
    }
}
