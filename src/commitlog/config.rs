const DEFAULT_MAX_STORE_BYTES: u64 = 1024;
const DEFAULT_MAX_INDEX_BYTES: u64 = 1024;

/// Byte bounds for each segment of a [`Log`](super::Log), plus the offset the first segment starts at
/// when the log directory is empty.
///
/// A zero bound means "use the default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentConfig {
    pub max_store_bytes: u64,
    pub max_index_bytes: u64,
    pub initial_offset: u64,
}

impl SegmentConfig {
    pub(super) fn with_defaults(self) -> Self {
        SegmentConfig {
            max_store_bytes: non_zero_or(self.max_store_bytes, DEFAULT_MAX_STORE_BYTES),
            max_index_bytes: non_zero_or(self.max_index_bytes, DEFAULT_MAX_INDEX_BYTES),
            initial_offset: self.initial_offset,
        }
    }
}

fn non_zero_or(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}
