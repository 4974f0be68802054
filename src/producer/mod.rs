//! Periodic Producer - a second kind of writer
//!
//! Appends a timestamp record on a fixed interval through the same
//! `SharedLog` the sessions use.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ring_log::SharedLog;
use crate::types::{Record, RingLogError, RingResult};
use crate::utils::time::local_timestamp_record;

/// Source of the record content written on every tick
pub trait TimestampSource: Send + 'static {
    fn timestamp_record(&self, terminator: u8) -> Vec<u8>;
}

/// Wall clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimestampSource for LocalClock {
    fn timestamp_record(&self, terminator: u8) -> Vec<u8> {
        local_timestamp_record(terminator)
    }
}

/// Writes one timestamp record per interval until cancelled
pub struct PeriodicProducer<C = LocalClock> {
    log: SharedLog,
    interval: Duration,
    terminator: u8,
    clock: C,
}

impl PeriodicProducer<LocalClock> {
    pub fn new(log: SharedLog, interval: Duration, terminator: u8) -> Self {
        Self::with_clock(log, interval, terminator, LocalClock)
    }
}

impl<C: TimestampSource> PeriodicProducer<C> {
    pub fn with_clock(log: SharedLog, interval: Duration, terminator: u8, clock: C) -> Self {
        Self {
            log,
            interval,
            terminator,
            clock,
        }
    }

    /// Run until `cancel` fires; returns the number of records written.
    ///
    /// The first record is written one full interval after start.
    pub async fn run(self, cancel: CancellationToken) -> RingResult<u64> {
        let start = first_tick(self.interval)?;
        let mut timer = interval_at(start, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut produced = 0u64;

        tracing::info!(interval_secs = self.interval.as_secs_f64(), "timestamp producer started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    let record = Record::new(self.clock.timestamp_record(self.terminator));
                    self.log.append(record)?;
                    produced += 1;
                }
            }
        }

        tracing::info!(records = produced, "timestamp producer stopped");
        Ok(produced)
    }
}

/// Instant of the first tick for `interval`, rejecting periods the timer
/// cannot represent
pub fn first_tick(interval: Duration) -> RingResult<Instant> {
    if interval.is_zero() {
        return Err(RingLogError::InvalidArgument(
            "timestamp interval must be non-zero".to_string(),
        ));
    }
    Instant::now().checked_add(interval).ok_or_else(|| {
        RingLogError::InvalidArgument(format!("timestamp interval {:?} is too large", interval))
    })
}
