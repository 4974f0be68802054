//! RingLog - fixed-capacity circular record store
//!
//! Capacity is a count of records, not bytes. Records are addressed either
//! by their index from the oldest live record or by a virtual byte offset
//! into the concatenation of all live records.

use std::io::SeekFrom;

use crate::types::{Record, RingLogError, RingResult};

/// Default number of records kept by the log
pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded circular store of records with byte-offset addressing.
///
/// Any necessary locking is the caller's job; see [`super::SharedLog`].
#[derive(Debug)]
pub struct RingLog {
    slots: Vec<Option<Record>>,
    /// Next slot to write
    head: usize,
    /// Oldest live slot
    tail: usize,
    full: bool,
    total_bytes: u64,
    evictions: u64,
}

impl RingLog {
    /// Create an empty log holding at most `capacity` records
    pub fn new(capacity: usize) -> RingResult<Self> {
        if capacity == 0 {
            return Err(RingLogError::InvalidArgument(
                "ring capacity must be at least one record".to_string(),
            ));
        }

        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            full: false,
            total_bytes: 0,
            evictions: 0,
        })
    }

    /// Maximum number of live records
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.head + self.capacity() - self.tail) % self.capacity()
        }
    }

    /// Sum of the sizes of all live records
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Records evicted since creation
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append a record, evicting the oldest one when the ring is full.
    ///
    /// The evicted record is handed back to the caller.
    pub fn append(&mut self, record: Record) -> RingResult<Option<Record>> {
        self.check_cursors()?;

        let evicted = if self.full {
            let oldest = self.slots[self.head].take().ok_or_else(|| {
                RingLogError::InvariantViolation(format!(
                    "full ring has an empty slot at head {}",
                    self.head
                ))
            })?;
            self.total_bytes -= oldest.len() as u64;
            self.tail = (self.tail + 1) % self.capacity();
            self.evictions += 1;
            Some(oldest)
        } else {
            None
        };

        self.total_bytes += record.len() as u64;
        self.slots[self.head] = Some(record);
        self.head = (self.head + 1) % self.capacity();
        if self.head == self.tail {
            self.full = true;
        }

        Ok(evicted)
    }

    /// Iterate live records oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        let capacity = self.capacity();
        (0..self.record_count())
            .filter_map(move |k| self.slots[(self.tail + k) % capacity].as_ref())
    }

    /// Locate the record holding byte `offset` of the concatenated log.
    ///
    /// Returns the record and the offset of that byte inside it.
    pub fn find_by_offset(&self, offset: u64) -> RingResult<(&Record, usize)> {
        if offset >= self.total_bytes {
            return Err(RingLogError::NotFound {
                offset,
                total: self.total_bytes,
            });
        }

        let mut accumulated = 0u64;
        for record in self.iter() {
            let end = accumulated + record.len() as u64;
            if offset < end {
                return Ok((record, (offset - accumulated) as usize));
            }
            accumulated = end;
        }

        // offset < total_bytes yet no record covers it
        Err(RingLogError::InvariantViolation(format!(
            "total_bytes is {} but live records only cover {} bytes",
            self.total_bytes, accumulated
        )))
    }

    /// Concatenation of every live record, oldest first
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes as usize);
        for record in self.iter() {
            out.extend_from_slice(record.as_bytes());
        }
        out
    }

    /// Concatenated content starting at virtual offset `offset`.
    ///
    /// Empty when the offset lies at or past the end of the log.
    pub fn read_from(&self, offset: u64) -> Vec<u8> {
        if offset >= self.total_bytes {
            return Vec::new();
        }

        let mut out = Vec::with_capacity((self.total_bytes - offset) as usize);
        let mut accumulated = 0u64;
        for record in self.iter() {
            let start = accumulated;
            accumulated += record.len() as u64;
            if accumulated <= offset {
                continue;
            }
            let local = offset.saturating_sub(start) as usize;
            out.extend_from_slice(&record.as_bytes()[local..]);
        }
        out
    }

    /// Convert `(record_index, intra_offset)` into a virtual offset.
    ///
    /// `intra_offset` may equal the record length, which addresses the
    /// first byte after that record.
    pub fn seek_offset(&self, record_index: usize, intra_offset: usize) -> RingResult<u64> {
        let count = self.record_count();
        if record_index >= count {
            return Err(RingLogError::InvalidArgument(format!(
                "record index {} out of range ({} records stored)",
                record_index, count
            )));
        }

        let mut offset = 0u64;
        for (index, record) in self.iter().enumerate() {
            if index == record_index {
                if intra_offset > record.len() {
                    return Err(RingLogError::InvalidArgument(format!(
                        "offset {} exceeds record {} of {} bytes",
                        intra_offset,
                        record_index,
                        record.len()
                    )));
                }
                return Ok(offset + intra_offset as u64);
            }
            offset += record.len() as u64;
        }

        Err(RingLogError::InvariantViolation(format!(
            "record {} counted but not reachable from tail {}",
            record_index, self.tail
        )))
    }

    /// Resolve a byte seek relative to the start, `current`, or the end.
    ///
    /// The result must lie in `0..=total_bytes`.
    pub fn seek_bytes(&self, current: u64, pos: SeekFrom) -> RingResult<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => (0, i128::from(offset)),
            SeekFrom::Current(delta) => (current, i128::from(delta)),
            SeekFrom::End(delta) => (self.total_bytes, i128::from(delta)),
        };

        let target = i128::from(base) + delta;
        if target < 0 || target > i128::from(self.total_bytes) {
            return Err(RingLogError::InvalidArgument(format!(
                "seek to {} outside 0..={}",
                target, self.total_bytes
            )));
        }
        Ok(target as u64)
    }

    /// Drop every record and return to the empty state
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.full = false;
        self.total_bytes = 0;
    }

    fn check_cursors(&self) -> RingResult<()> {
        let capacity = self.capacity();
        if self.head >= capacity || self.tail >= capacity {
            return Err(RingLogError::InvariantViolation(format!(
                "cursor out of range: head {}, tail {}, capacity {}",
                self.head, self.tail, capacity
            )));
        }
        if self.full && self.head != self.tail {
            return Err(RingLogError::InvariantViolation(format!(
                "full ring with head {} != tail {}",
                self.head, self.tail
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(capacity: usize, records: &[&str]) -> RingLog {
        let mut ring = RingLog::new(capacity).unwrap();
        for r in records {
            ring.append(Record::from(*r)).unwrap();
        }
        ring
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RingLog::new(0),
            Err(RingLogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_append_until_full() {
        let ring = ring_with(3, &["a\n", "bb\n", "ccc\n"]);
        assert!(ring.is_full());
        assert_eq!(ring.record_count(), 3);
        assert_eq!(ring.total_bytes(), 9);
        assert_eq!(ring.snapshot(), b"a\nbb\nccc\n");
    }

    #[test]
    fn test_append_returns_evicted_record() {
        let mut ring = ring_with(2, &["one\n", "two\n"]);
        let evicted = ring.append(Record::from("three\n")).unwrap();

        assert_eq!(evicted, Some(Record::from("one\n")));
        assert_eq!(ring.total_bytes(), 10);
        assert_eq!(ring.evictions(), 1);
        assert_eq!(ring.snapshot(), b"two\nthree\n");
    }

    #[test]
    fn test_keeps_last_n_records_in_order() {
        let mut ring = RingLog::new(DEFAULT_CAPACITY).unwrap();
        for i in 1..=12 {
            ring.append(Record::from(format!("r{}\n", i).as_str())).unwrap();
        }

        let kept: Vec<&[u8]> = ring.iter().map(|r| r.as_bytes()).collect();
        let expected: Vec<String> = (3..=12).map(|i| format!("r{}\n", i)).collect();
        assert_eq!(kept.len(), 10);
        for (got, want) in kept.iter().zip(expected.iter()) {
            assert_eq!(*got, want.as_bytes());
        }
    }

    #[test]
    fn test_find_by_offset_empty_log() {
        let ring = RingLog::new(4).unwrap();
        assert!(matches!(
            ring.find_by_offset(0),
            Err(RingLogError::NotFound { offset: 0, total: 0 })
        ));
    }

    #[test]
    fn test_find_by_offset_across_wraparound() {
        let ring = ring_with(3, &["ab\n", "cdef\n", "g\n", "hij\n"]);
        // live: "cdef\n", "g\n", "hij\n"
        let (record, local) = ring.find_by_offset(0).unwrap();
        assert_eq!(record.as_bytes(), b"cdef\n");
        assert_eq!(local, 0);

        let (record, local) = ring.find_by_offset(6).unwrap();
        assert_eq!(record.as_bytes(), b"g\n");
        assert_eq!(local, 1);

        let (record, local) = ring.find_by_offset(10).unwrap();
        assert_eq!(record.as_bytes(), b"hij\n");
        assert_eq!(local, 3);

        assert!(ring.find_by_offset(11).is_err());
    }

    #[test]
    fn test_find_by_offset_rebuilds_snapshot() {
        let ring = ring_with(4, &["x\n", "", "yz\n", "long line\n", "q\n"]);
        let rebuilt: Vec<u8> = (0..ring.total_bytes())
            .map(|v| {
                let (record, local) = ring.find_by_offset(v).unwrap();
                record.as_bytes()[local]
            })
            .collect();
        assert_eq!(rebuilt, ring.snapshot());
    }

    #[test]
    fn test_seek_offset() {
        let ring = ring_with(10, &["ab\n", "cdef\n"]);
        assert_eq!(ring.seek_offset(1, 2).unwrap(), 5);
        assert_eq!(ring.read_from(5), b"def\n");
        // one past the end of a record is allowed
        assert_eq!(ring.seek_offset(0, 3).unwrap(), 3);
    }

    #[test]
    fn test_seek_offset_rejects_out_of_range() {
        let ring = ring_with(10, &["ab\n", "cdef\n"]);
        assert!(matches!(
            ring.seek_offset(2, 0),
            Err(RingLogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ring.seek_offset(0, 4),
            Err(RingLogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_seek_bytes_whence() {
        let ring = ring_with(10, &["ab\n", "cdef\n"]);
        assert_eq!(ring.seek_bytes(0, SeekFrom::Start(5)).unwrap(), 5);
        assert_eq!(ring.seek_bytes(5, SeekFrom::Current(-2)).unwrap(), 3);
        assert_eq!(ring.seek_bytes(0, SeekFrom::End(0)).unwrap(), 8);
        assert_eq!(ring.seek_bytes(0, SeekFrom::End(-4)).unwrap(), 4);
    }

    #[test]
    fn test_seek_bytes_out_of_range() {
        let ring = ring_with(10, &["ab\n", "cdef\n"]);
        for pos in [
            SeekFrom::Start(9),
            SeekFrom::Current(-1),
            SeekFrom::End(1),
            SeekFrom::End(-9),
        ] {
            assert!(
                matches!(ring.seek_bytes(0, pos), Err(RingLogError::InvalidArgument(_))),
                "{:?}",
                pos
            );
        }
    }

    #[test]
    fn test_read_from_past_end_is_empty() {
        let ring = ring_with(10, &["ab\n"]);
        assert!(ring.read_from(3).is_empty());
        assert!(ring.read_from(100).is_empty());
        assert_eq!(ring.read_from(0), b"ab\n");
    }

    #[test]
    fn test_clear_resets_state() {
        let mut ring = ring_with(2, &["a\n", "b\n", "c\n"]);
        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.record_count(), 0);
        assert_eq!(ring.total_bytes(), 0);
        assert!(ring.snapshot().is_empty());

        ring.append(Record::from("d\n")).unwrap();
        assert_eq!(ring.snapshot(), b"d\n");
    }

    #[test]
    fn test_capacity_one() {
        let mut ring = RingLog::new(1).unwrap();
        assert_eq!(ring.append(Record::from("a\n")).unwrap(), None);
        assert!(ring.is_full());
        assert_eq!(
            ring.append(Record::from("b\n")).unwrap(),
            Some(Record::from("a\n"))
        );
        assert_eq!(ring.record_count(), 1);
        assert_eq!(ring.snapshot(), b"b\n");
    }
}
