//! Server Dispatcher
//!
//! Accepts sessions from an [`AcceptSource`], runs one `SessionWorker`
//! task per session, reaps workers as they finish, and tears everything
//! down in order on shutdown.

mod accept;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::producer::{first_tick, PeriodicProducer, TimestampSource};
use crate::ring_log::SharedLog;
use crate::session::{SessionSettings, SessionSummary, SessionWorker};
use crate::types::{RingLogError, RingResult};

pub use accept::{AcceptSource, ChannelAcceptor};

/// Pause after a failed accept (e.g. descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Totals reported by the accept loop when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub accepted: u64,
    pub completed: u64,
    /// Workers that panicked or returned an error
    pub failed: u64,
    pub records_committed: u64,
}

/// Owns the accept loop, the session workers and the producer task
pub struct ServerDispatcher {
    log: SharedLog,
    settings: SessionSettings,
    cancel: CancellationToken,
    live: Arc<AtomicUsize>,
    accept_task: Option<JoinHandle<RingResult<DispatchStats>>>,
    producer_task: Option<JoinHandle<RingResult<u64>>>,
}

impl ServerDispatcher {
    pub fn new(log: SharedLog, settings: SessionSettings) -> Self {
        Self {
            log,
            settings,
            cancel: CancellationToken::new(),
            live: Arc::new(AtomicUsize::new(0)),
            accept_task: None,
            producer_task: None,
        }
    }

    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Number of session workers currently tracked
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has begun or a fatal error stopped the loop
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    /// Start accepting sessions from `source`
    pub fn start<A: AcceptSource>(&mut self, source: A) -> RingResult<()> {
        if self.accept_task.is_some() {
            return Err(RingLogError::InvalidArgument(
                "dispatcher already started".to_string(),
            ));
        }

        let accept_loop = AcceptLoop {
            log: self.log.clone(),
            settings: self.settings.clone(),
            cancel: self.cancel.clone(),
            live: Arc::clone(&self.live),
        };
        self.accept_task = Some(tokio::spawn(accept_loop.run(source)));
        Ok(())
    }

    /// Start a timestamp producer that stops with the dispatcher.
    ///
    /// Fails with `InvalidArgument` for a zero or unrepresentable interval.
    pub fn spawn_producer<C: TimestampSource>(
        &mut self,
        interval: Duration,
        clock: C,
    ) -> RingResult<()> {
        first_tick(interval)?;
        let producer =
            PeriodicProducer::with_clock(self.log.clone(), interval, self.settings.terminator, clock);
        self.producer_task = Some(tokio::spawn(producer.run(self.cancel.child_token())));
        Ok(())
    }

    /// Stop accepting, cancel every session, wait for them, release the log
    pub async fn shutdown(&mut self) -> RingResult<DispatchStats> {
        tracing::info!(live = self.live_sessions(), "dispatcher shutting down");
        self.cancel.cancel();

        let outcome = match self.accept_task.take() {
            Some(task) => task.await.unwrap_or_else(|e| Err(task_failure("accept loop", e))),
            None => Ok(DispatchStats::default()),
        };

        if let Some(task) = self.producer_task.take() {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "timestamp producer failed"),
                Err(e) => tracing::error!(error = %e, "timestamp producer panicked"),
            }
        }

        let stats = self.log.stats();
        match serde_json::to_string(&stats) {
            Ok(json) => tracing::info!(stats = %json, "releasing log"),
            Err(_) => tracing::info!(?stats, "releasing log"),
        }
        self.log.release()?;

        outcome
    }
}

fn task_failure(what: &str, e: JoinError) -> RingLogError {
    RingLogError::InvariantViolation(format!("{} task failed: {}", what, e))
}

struct AcceptLoop {
    log: SharedLog,
    settings: SessionSettings,
    cancel: CancellationToken,
    live: Arc<AtomicUsize>,
}

impl AcceptLoop {
    async fn run<A: AcceptSource>(self, mut source: A) -> RingResult<DispatchStats> {
        let mut workers: JoinSet<RingResult<SessionSummary>> = JoinSet::new();
        let mut stats = DispatchStats::default();
        let mut fatal: Option<RingLogError> = None;
        let mut accepting = true;

        tracing::info!("accepting sessions");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    self.reap(joined, &mut stats, &mut fatal);
                    self.live.store(workers.len(), Ordering::SeqCst);
                    if fatal.is_some() {
                        break;
                    }
                }
                accepted = source.accept(), if accepting => match accepted {
                    Ok(Some((stream, peer))) => {
                        tracing::info!(peer = %peer, "accepted session");
                        let worker = SessionWorker::new(
                            stream,
                            peer,
                            self.log.clone(),
                            self.settings.clone(),
                            self.cancel.child_token(),
                        );
                        workers.spawn(worker.run());
                        stats.accepted += 1;
                        self.live.store(workers.len(), Ordering::SeqCst);
                    }
                    Ok(None) => {
                        tracing::info!("accept source closed");
                        accepting = false;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        tokio::select! {
                            _ = self.cancel.cancelled() => {}
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                        }
                    }
                },
            }
        }

        // Unblocks every worker still waiting on I/O
        self.cancel.cancel();
        while let Some(joined) = workers.join_next().await {
            self.reap(joined, &mut stats, &mut fatal);
        }
        self.live.store(0, Ordering::SeqCst);
        tracing::info!(
            accepted = stats.accepted,
            completed = stats.completed,
            failed = stats.failed,
            "all sessions closed"
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    fn reap(
        &self,
        joined: Result<RingResult<SessionSummary>, JoinError>,
        stats: &mut DispatchStats,
        fatal: &mut Option<RingLogError>,
    ) {
        match joined {
            Ok(Ok(summary)) => {
                stats.completed += 1;
                stats.records_committed += summary.records_committed;
            }
            Ok(Err(e)) if e.is_fatal() => {
                tracing::error!(error = %e, "fatal error in session, stopping dispatcher");
                stats.failed += 1;
                self.cancel.cancel();
                fatal.get_or_insert(e);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session ended with error");
                stats.failed += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "session task panicked");
                stats.failed += 1;
            }
        }
    }
}
