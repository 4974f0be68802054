//! Positioned byte reader over the shared log
//!
//! Behaves like a file opened on the log: every read copies from the
//! record holding the current position and advances it, and `seek`
//! moves it relative to the start, the current position or the end.

use std::io::{self, Read, Seek, SeekFrom};

use super::shared::SharedLog;
use crate::types::RingLogError;

/// Independent read position into a [`SharedLog`]
#[derive(Clone)]
pub struct LogReader {
    log: SharedLog,
    position: u64,
}

impl LogReader {
    pub fn new(log: SharedLog) -> Self {
        Self { log, position: 0 }
    }

    /// Current virtual offset
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Read for LogReader {
    /// Copies at most the rest of one record; 0 once the position is past
    /// the end of the log.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let position = self.position;
        let copied = self.log.with_ring(|ring| match ring.find_by_offset(position) {
            Ok((record, local)) => {
                let available = &record.as_bytes()[local..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                Ok(n)
            }
            Err(RingLogError::NotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        });

        let n = copied.map_err(io::Error::other)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for LogReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self
            .log
            .seek_bytes(self.position, pos)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        tracing::debug!(position = self.position, "reader repositioned");
        Ok(self.position)
    }
}
