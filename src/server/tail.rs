use crate::commitlog::{AppendListener, LogError, Record};
use crate::server::status::log_status;
use crate::server::CommitLog;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// How long a waiting tail sleeps when no append notification arrives. Covers notifications lost
/// to a log being replaced underneath the listener.
pub(crate) const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(250);

enum TailState {
    /// Next offset is not readable yet.
    Waiting,
    Emitting(Record),
    Cancelled,
}

/// Tail follows a log from a start offset and sends every record, in offset order, until the
/// receiver goes away or the server shuts down.
///
/// An offset past the end of the log is waited for. An offset below the log's lowest offset has
/// been truncated and can never be read again, so the tail sends one `OUT_OF_RANGE` status and
/// stops instead of waiting forever.
pub(crate) struct Tail {
    logger: slog::Logger,
    log: Arc<dyn CommitLog>,
    listener: AppendListener,
    next_offset: u64,
    poll_interval: Duration,
}

impl Tail {
    pub(crate) fn new(logger: slog::Logger, log: Arc<dyn CommitLog>, start_offset: u64) -> Self {
        let listener = log.subscribe();
        Tail {
            logger,
            log,
            listener,
            next_offset: start_offset,
            poll_interval: TAIL_POLL_INTERVAL,
        }
    }

    pub(crate) async fn run(mut self, tx: mpsc::Sender<Result<Record, Status>>, shutdown: CancellationToken) {
        let mut state = TailState::Waiting;
        loop {
            state = match state {
                TailState::Waiting => self.poll(&tx, &shutdown).await,
                TailState::Emitting(record) => {
                    if tx.send(Ok(record)).await.is_err() {
                        TailState::Cancelled
                    } else {
                        self.next_offset += 1;
                        TailState::Waiting
                    }
                }
                TailState::Cancelled => {
                    slog::debug!(self.logger, "Tail stopped at offset {}", self.next_offset);
                    return;
                }
            }
        }
    }

    async fn poll(&mut self, tx: &mpsc::Sender<Result<Record, Status>>, shutdown: &CancellationToken) -> TailState {
        match self.log.read(self.next_offset) {
            Ok(record) => TailState::Emitting(record),
            Err(LogError::OffsetOutOfRange { offset }) if offset < self.log.lowest_offset() => {
                // Truncated away; it will never become readable.
                let _ = tx.send(Err(log_status(&self.logger, LogError::OffsetOutOfRange { offset }))).await;
                TailState::Cancelled
            }
            Err(LogError::OffsetOutOfRange { .. }) => {
                tokio::select! {
                    _ = tx.closed() => TailState::Cancelled,
                    _ = shutdown.cancelled() => TailState::Cancelled,
                    _ = self.listener.next() => TailState::Waiting,
                    _ = time::sleep(self.poll_interval) => TailState::Waiting,
                }
            }
            Err(e) => {
                let _ = tx.send(Err(log_status(&self.logger, e))).await;
                TailState::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::{Log, SegmentConfig};
    use tonic::Code;

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn open_log(dir: &tempfile::TempDir) -> Arc<Log> {
        Arc::new(Log::open(test_logger(), dir.path(), SegmentConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn emits_existing_then_new_records_in_order() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let log = open_log(&dir);
        log.append(Record::new("a")).unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let tail = Tail::new(test_logger(), log.clone(), 0);
        let task = tokio::spawn(tail.run(tx, shutdown.clone()));

        // -- execute --
        let first = rx.recv().await.unwrap().unwrap();
        log.append(Record::new("b")).unwrap();
        let second = rx.recv().await.unwrap().unwrap();
        shutdown.cancel();
        task.await.unwrap();

        // -- verify --
        assert_eq!((first.offset, first.value.as_ref()), (0, b"a".as_ref()));
        assert_eq!((second.offset, second.value.as_ref()), (1, b"b".as_ref()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let log = open_log(&dir);
        let (tx, rx) = mpsc::channel(1);
        let tail = Tail::new(test_logger(), log, 5);
        let task = tokio::spawn(tail.run(tx, CancellationToken::new()));

        // -- execute --
        drop(rx);

        // -- verify --
        time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn truncated_start_offset_ends_with_out_of_range() {
        // -- setup --
        let dir = tempfile::tempdir().unwrap();
        let config = SegmentConfig {
            initial_offset: 10,
            ..SegmentConfig::default()
        };
        let log = Arc::new(Log::open(test_logger(), dir.path(), config).unwrap());
        let (tx, mut rx) = mpsc::channel(1);
        let tail = Tail::new(test_logger(), log, 3);

        // -- execute --
        tail.run(tx, CancellationToken::new()).await;

        // -- verify --
        let status = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::OutOfRange);
        assert!(rx.recv().await.is_none());
    }
}
