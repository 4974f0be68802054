//! Record Assembler - per-session accumulation of fragmented writes
//!
//! A producer may deliver one logical record over any number of reads.
//! The assembler buffers bytes until the terminator arrives and then
//! hands back exactly one completed record.

use crate::types::{Record, RingLogError, RingResult, DEFAULT_TERMINATOR};

/// Accumulates raw chunks into terminator-delimited records
#[derive(Debug)]
pub struct RecordAssembler {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no terminator
    scanned: usize,
    terminator: u8,
}

impl RecordAssembler {
    /// Create an assembler splitting on `terminator`
    pub fn new(terminator: u8) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            terminator,
        }
    }

    /// Append a chunk and return the first record it completes.
    ///
    /// Bytes after the terminator stay buffered as the start of the next
    /// record. At most one record is returned per call; use
    /// [`next_record`](Self::next_record) to drain further complete ones.
    pub fn feed(&mut self, chunk: &[u8]) -> RingResult<Option<Record>> {
        if !chunk.is_empty() {
            let requested = self.buffer.len() + chunk.len();
            self.buffer
                .try_reserve(chunk.len())
                .map_err(|_| RingLogError::OutOfMemory { requested })?;
            self.buffer.extend_from_slice(chunk);
        }
        Ok(self.next_record())
    }

    /// Emit the next record already complete in the buffer, if any
    pub fn next_record(&mut self) -> Option<Record> {
        let found = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == self.terminator);

        match found {
            Some(pos) => {
                let end = self.scanned + pos + 1;
                let rest = self.buffer.split_off(end);
                let record = std::mem::replace(&mut self.buffer, rest);
                self.scanned = 0;
                Some(Record::new(record))
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Discard any partial record
    pub fn reset(&mut self) {
        self.buffer = Vec::new();
        self.scanned = 0;
    }

    /// Bytes buffered without a terminator yet
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATOR)
    }
}
