//! SharedLog - the lock-guarded ring handed to every writer and reader
//!
//! Every method takes the lock for exactly one ring operation and copies
//! anything it returns, so callers never hold the lock across I/O.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::backing::BackingFile;
use super::reader::LogReader;
use super::ring::RingLog;
use crate::types::{LogStats, Record, RingResult};

struct LogState {
    ring: RingLog,
    backing: Option<BackingFile>,
}

/// Cloneable handle to the process-wide ring log
#[derive(Clone)]
pub struct SharedLog {
    state: Arc<Mutex<LogState>>,
}

impl SharedLog {
    /// Create an in-memory log
    pub fn new(capacity: usize) -> RingResult<Self> {
        Ok(Self::from_parts(RingLog::new(capacity)?, None))
    }

    /// Create a log mirrored to `path`
    pub fn with_backing_file<P: AsRef<Path>>(capacity: usize, path: P) -> RingResult<Self> {
        let ring = RingLog::new(capacity)?;
        let backing = BackingFile::create(path)?;
        Ok(Self::from_parts(ring, Some(backing)))
    }

    fn from_parts(ring: RingLog, backing: Option<BackingFile>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LogState { ring, backing })),
        }
    }

    /// Commit one record; returns the record evicted to make room, if any
    pub fn append(&self, record: Record) -> RingResult<Option<Record>> {
        let mut state = self.state.lock();
        let size = record.len();
        let evicted = state.ring.append(record)?;

        if let Some(old) = &evicted {
            tracing::debug!(bytes = old.len(), "evicted oldest record");
        }
        tracing::debug!(
            bytes = size,
            records = state.ring.record_count(),
            total = state.ring.total_bytes(),
            "record committed"
        );

        if let Some(backing) = &state.backing {
            let snapshot = state.ring.snapshot();
            if let Err(e) = backing.persist(&snapshot) {
                tracing::warn!(path = %backing.path().display(), error = %e, "failed to mirror log");
            }
        }

        Ok(evicted)
    }

    /// Full log content, oldest record first
    pub fn snapshot(&self) -> Vec<u8> {
        self.state.lock().ring.snapshot()
    }

    /// Log content starting at a virtual offset
    pub fn read_from(&self, offset: u64) -> Vec<u8> {
        self.state.lock().ring.read_from(offset)
    }

    /// Resolve a `(record_index, intra_offset)` seek to a virtual offset
    pub fn seek_offset(&self, record_index: usize, intra_offset: usize) -> RingResult<u64> {
        self.state.lock().ring.seek_offset(record_index, intra_offset)
    }

    /// Resolve a byte seek against the current log size
    pub fn seek_bytes(&self, current: u64, pos: SeekFrom) -> RingResult<u64> {
        self.state.lock().ring.seek_bytes(current, pos)
    }

    /// Byte reader over the live log, starting at offset 0
    pub fn reader(&self) -> LogReader {
        LogReader::new(self.clone())
    }

    /// Copy of the record holding byte `offset`, plus the local offset
    pub fn find_by_offset(&self, offset: u64) -> RingResult<(Record, usize)> {
        let state = self.state.lock();
        let (record, local) = state.ring.find_by_offset(offset)?;
        Ok((record.clone(), local))
    }

    /// Copies of every live record, oldest first
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().ring.iter().cloned().collect()
    }

    /// Run `f` against the ring under the lock
    pub fn with_ring<T>(&self, f: impl FnOnce(&RingLog) -> T) -> T {
        f(&self.state.lock().ring)
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().ring.record_count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.state.lock().ring.total_bytes()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    /// Consistent view of all counters
    pub fn stats(&self) -> LogStats {
        let state = self.state.lock();
        LogStats {
            capacity: state.ring.capacity(),
            record_count: state.ring.record_count(),
            total_bytes: state.ring.total_bytes(),
            evictions: state.ring.evictions(),
        }
    }

    /// Drop every record and delete the backing file
    pub fn release(&self) -> RingResult<()> {
        let mut state = self.state.lock();
        state.ring.clear();
        if let Some(backing) = state.backing.take() {
            backing.remove()?;
            tracing::info!(path = %backing.path().display(), "removed backing file");
        }
        Ok(())
    }
}
