use crate::commitlog::LogError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

const OFFSET_WIDTH: usize = 8;

/// Record is a single entry of the log. The offset is assigned by the log on append; any offset
/// set by the caller before appending is overwritten.
///
/// Byte representation (as persisted in a segment's store):
///
/// ```text
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | ... |
/// +---+---+---+---+---+---+---+---+---+---+-...-+
/// |      Offset (8 bytes, BE)     |  Value  ... |
/// +-------------------------------+---------...-+
/// ```
///
/// * `Offset` - absolute offset assigned when the record was appended
/// * `Value` - opaque caller payload
///
/// Length of `Value` is not stored; the store's length prefix frames the whole record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub value: Bytes,
    pub offset: u64,
}

impl Record {
    pub fn new<B: Into<Bytes>>(value: B) -> Self {
        Record {
            value: value.into(),
            offset: 0,
        }
    }

    pub(crate) fn encode(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(OFFSET_WIDTH + self.value.len());
        bytes.put_u64(self.offset);
        bytes.put_slice(&self.value);
        bytes.freeze()
    }

    pub(crate) fn decode(mut bytes: Bytes) -> Result<Self, LogError> {
        if bytes.len() < OFFSET_WIDTH {
            return Err(LogError::Corrupt(format!(
                "stored record is {} bytes, shorter than its offset header",
                bytes.len()
            )));
        }
        let offset = bytes.get_u64();
        Ok(Record { value: bytes, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_offset_header() {
        let record = Record {
            value: Bytes::from_static(b"hello world"),
            offset: 513,
        };

        let decoded = Record::decode(record.encode()).unwrap();

        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let result = Record::decode(Bytes::from_static(&[0, 0, 1]));

        assert!(matches!(result, Err(LogError::Corrupt(_))));
    }
}
