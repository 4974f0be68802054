//! SessionWorker - per-connection state machine
//!
//! ```text
//! Receiving ──► Committing ──► Responding ──┐
//!     ▲                                     │
//!     └─────────────────────────────────────┘
//!     │ EOF / I/O error / cancel
//!     ▼
//!   Closed
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::cursor::SessionCursor;
use crate::assembler::RecordAssembler;
use crate::config::ServerConfig;
use crate::protocol::SessionMessage;
use crate::ring_log::SharedLog;
use crate::types::{Record, RingLogError, RingResult};

/// Per-session knobs taken from the server configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub terminator: u8,
    pub seek_prefix: String,
    pub read_chunk_size: usize,
}

impl From<&ServerConfig> for SessionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            terminator: config.terminator,
            seek_prefix: config.seek_prefix.clone(),
            read_chunk_size: config.read_chunk_size.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Where a session is in its read/commit/respond cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Receiving,
    Committing,
    Responding,
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Zero-length read
    PeerClosed,
    /// Dispatcher shutdown
    Cancelled,
    ReadError,
    WriteError,
    /// Record buffer could not grow
    OutOfMemory,
}

/// Counters reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub peer: String,
    pub reason: CloseReason,
    pub bytes_received: u64,
    pub records_committed: u64,
    /// Size of the unterminated record dropped at close
    pub discarded_bytes: usize,
}

/// Drives one client byte stream against the shared log
pub struct SessionWorker<S> {
    stream: S,
    peer: String,
    log: SharedLog,
    settings: SessionSettings,
    assembler: RecordAssembler,
    cursor: SessionCursor,
    state: SessionState,
    cancel: CancellationToken,
    bytes_received: u64,
    records_committed: u64,
}

impl<S> SessionWorker<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        log: SharedLog,
        settings: SessionSettings,
        cancel: CancellationToken,
    ) -> Self {
        let assembler = RecordAssembler::new(settings.terminator);
        Self {
            stream,
            peer: peer.into(),
            log,
            settings,
            assembler,
            cursor: SessionCursor::new(),
            state: SessionState::Receiving,
            cancel,
            bytes_received: 0,
            records_committed: 0,
        }
    }

    /// Run until the stream ends, fails, or the session is cancelled.
    ///
    /// Per-session failures end in `Ok` with the close reason; only a
    /// ring invariant violation is returned as an error.
    pub async fn run(mut self) -> RingResult<SessionSummary> {
        tracing::info!(peer = %self.peer, "session opened");
        let mut buf = vec![0u8; self.settings.read_chunk_size];

        let reason = loop {
            self.state = SessionState::Receiving;

            let n = match self.read_chunk(&mut buf).await {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => n,
                Err(RingLogError::Cancelled) => break CloseReason::Cancelled,
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "read failed");
                    break CloseReason::ReadError;
                }
            };
            self.bytes_received += n as u64;
            tracing::debug!(peer = %self.peer, bytes = n, "received chunk");

            if let Some(reason) = self.handle_chunk(&buf[..n]).await? {
                break reason;
            }
        };

        Ok(self.close(reason))
    }

    /// Wait for the next chunk; `Cancelled` if shutdown arrives first
    async fn read_chunk(&mut self, buf: &mut [u8]) -> RingResult<usize> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RingLogError::Cancelled),
            read = self.stream.read(buf) => Ok(read?),
        }
    }

    /// Feed one chunk to the assembler and act on every line it completes.
    ///
    /// Seek directive lines move the cursor; all other lines are committed.
    /// The client gets one response per chunk that completed anything.
    async fn handle_chunk(&mut self, chunk: &[u8]) -> RingResult<Option<CloseReason>> {
        let mut next = match self.assembler.feed(chunk) {
            Ok(line) => line,
            Err(RingLogError::OutOfMemory { requested }) => {
                tracing::warn!(peer = %self.peer, requested, "record too large, closing session");
                return Ok(Some(CloseReason::OutOfMemory));
            }
            Err(e) => return Err(e),
        };

        let mut should_respond = false;
        while let Some(line) = next {
            let content = line
                .as_bytes()
                .strip_suffix(&[self.settings.terminator])
                .unwrap_or(line.as_bytes());
            let directive = SessionMessage::parse(content, &self.settings.seek_prefix)
                .map(|message| match message {
                    SessionMessage::Seek {
                        record_index,
                        offset,
                    } => Some((record_index, offset)),
                    SessionMessage::Data(_) => None,
                });

            match directive {
                Ok(None) => {
                    self.commit(line)?;
                    should_respond = true;
                }
                Ok(Some((record_index, offset))) => match self.seek(record_index, offset) {
                    Ok(_) => should_respond = true,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => tracing::warn!(peer = %self.peer, error = %e, "seek rejected"),
                },
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "ignoring malformed seek directive")
                }
            }
            next = self.assembler.next_record();
        }

        if should_respond {
            self.respond().await
        } else {
            Ok(None)
        }
    }

    fn commit(&mut self, record: Record) -> RingResult<()> {
        self.state = SessionState::Committing;
        self.log.append(record)?;
        self.records_committed += 1;
        Ok(())
    }

    /// Reposition the read cursor to `(record_index, offset)`.
    ///
    /// An out-of-range request leaves the cursor untouched.
    pub fn seek(&mut self, record_index: usize, offset: usize) -> RingResult<u64> {
        let position = self.log.seek_offset(record_index, offset)?;
        self.cursor.seek_to(position);
        tracing::debug!(peer = %self.peer, record_index, offset, position, "cursor moved");
        Ok(position)
    }

    /// Copy the readable content under the lock, then write it out
    async fn respond(&mut self) -> RingResult<Option<CloseReason>> {
        self.state = SessionState::Responding;
        let payload = match self.cursor.position() {
            Some(offset) => self.log.read_from(offset),
            None => self.log.snapshot(),
        };

        let written = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RingLogError::Cancelled),
            written = write_all_flush(&mut self.stream, &payload) => written.map_err(RingLogError::from),
        };

        match written {
            Ok(()) => {
                tracing::debug!(peer = %self.peer, bytes = payload.len(), "sent log content");
                Ok(None)
            }
            Err(RingLogError::Cancelled) => Ok(Some(CloseReason::Cancelled)),
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "write failed");
                Ok(Some(CloseReason::WriteError))
            }
        }
    }

    fn close(mut self, reason: CloseReason) -> SessionSummary {
        let last_state = std::mem::replace(&mut self.state, SessionState::Closed);
        let discarded_bytes = self.assembler.pending_len();
        if discarded_bytes > 0 {
            tracing::debug!(peer = %self.peer, bytes = discarded_bytes, "discarding unterminated record");
        }
        self.assembler.reset();

        tracing::info!(
            peer = %self.peer,
            reason = ?reason,
            last_state = ?last_state,
            records = self.records_committed,
            "session closed"
        );

        SessionSummary {
            peer: self.peer,
            reason,
            bytes_received: self.bytes_received,
            records_committed: self.records_committed,
            discarded_bytes,
        }
    }
}

async fn write_all_flush<S>(stream: &mut S, payload: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(payload).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;

    fn spawn_worker(
        log: &SharedLog,
        cancel: &CancellationToken,
    ) -> (DuplexStream, JoinHandle<RingResult<SessionSummary>>) {
        let (client, server) = duplex(4096);
        let worker = SessionWorker::new(
            server,
            "test-peer",
            log.clone(),
            SessionSettings::default(),
            cancel.child_token(),
        );
        (client, tokio::spawn(worker.run()))
    }

    async fn read_n(client: &mut DuplexStream, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        client.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_echoes_full_log_after_each_record() {
        let log = SharedLog::new(10).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"ab\n").await.unwrap();
        assert_eq!(read_n(&mut client, 3).await, b"ab\n");

        client.write_all(b"cd").await.unwrap();
        client.write_all(b"ef\n").await.unwrap();
        assert_eq!(read_n(&mut client, 8).await, b"ab\ncdef\n");

        drop(client);
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.reason, CloseReason::PeerClosed);
        assert_eq!(summary.records_committed, 2);
        assert_eq!(summary.bytes_received, 8);
    }

    #[tokio::test]
    async fn test_seek_then_read() {
        let log = SharedLog::new(10).unwrap();
        log.append(Record::from("ab\n")).unwrap();
        log.append(Record::from("cdef\n")).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"AESDCHAR_IOCSEEKTO:1,2\n").await.unwrap();
        assert_eq!(read_n(&mut client, 4).await, b"def\n");

        drop(client);
        let summary = handle.await.unwrap().unwrap();
        // directives are never committed
        assert_eq!(summary.records_committed, 0);
        assert_eq!(log.record_count(), 2);
    }

    #[tokio::test]
    async fn test_seek_with_custom_terminator() {
        let log = SharedLog::new(10).unwrap();
        log.append(Record::from("ab;")).unwrap();
        log.append(Record::from("cdef;")).unwrap();
        let cancel = CancellationToken::new();
        let settings = SessionSettings {
            terminator: b';',
            ..SessionSettings::default()
        };
        let (mut client, server) = duplex(4096);
        let worker = SessionWorker::new(
            server,
            "semicolon-peer",
            log.clone(),
            settings,
            cancel.child_token(),
        );
        let handle = tokio::spawn(worker.run());

        let seek = SessionMessage::seek_line(crate::protocol::DEFAULT_SEEK_PREFIX, 1, 2, b';');
        client.write_all(&seek).await.unwrap();
        let reply = tokio::time::timeout(std::time::Duration::from_secs(5), read_n(&mut client, 4))
            .await
            .expect("seek answered");
        assert_eq!(reply, b"def;");

        client.write_all(b"g;").await.unwrap();
        assert_eq!(read_n(&mut client, 6).await, b"def;g;");

        drop(client);
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.records_committed, 1);
        assert_eq!(log.snapshot(), b"ab;cdef;g;");
    }

    #[tokio::test]
    async fn test_invalid_seek_keeps_session_open() {
        let log = SharedLog::new(10).unwrap();
        log.append(Record::from("ab\n")).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"AESDCHAR_IOCSEEKTO:5,0\n").await.unwrap();
        client.write_all(b"AESDCHAR_IOCSEEKTO:x\n").await.unwrap();
        client.write_all(b"z\n").await.unwrap();

        // cursor unchanged, so the reply is the whole log
        assert_eq!(read_n(&mut client, 5).await, b"ab\nz\n");

        drop(client);
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_cancel_discards_partial_record() {
        let log = SharedLog::new(10).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"never terminated").await.unwrap();
        // give the worker a chance to buffer the chunk
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.reason, CloseReason::Cancelled);
        assert_eq!(summary.discarded_bytes, 16);
        assert_eq!(log.record_count(), 0);
    }

    #[tokio::test]
    async fn test_peer_close_mid_record_commits_nothing() {
        let log = SharedLog::new(10).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"done\nhalf").await.unwrap();
        assert_eq!(read_n(&mut client, 5).await, b"done\n");
        drop(client);

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.discarded_bytes, 4);
        assert_eq!(log.snapshot(), b"done\n");
    }

    #[tokio::test]
    async fn test_several_records_in_one_chunk() {
        let log = SharedLog::new(10).unwrap();
        let cancel = CancellationToken::new();
        let (mut client, handle) = spawn_worker(&log, &cancel);

        client.write_all(b"a\nb\nc\n").await.unwrap();
        assert_eq!(read_n(&mut client, 6).await, b"a\nb\nc\n");
        assert_eq!(log.record_count(), 3);

        drop(client);
        handle.await.unwrap().unwrap();
    }
}
