//! Ring Log - bounded circular record store
//!
//! - `RingLog`: the fixed-capacity ring with offset addressing
//! - `SharedLog`: lock-guarded handle shared by sessions and producers
//! - `LogReader`: file-like reader with its own position and whence seeks
//! - `BackingFile`: optional on-disk mirror of the live content
//!
//! # Layout
//!
//! ```text
//! index:   0    1    2    3    4    5
//! slots: [ r9 | -- | r5 | r6 | r7 | r8 ]
//!               ^    ^
//!             head  tail        capacity 6, 5 live records
//!
//! virtual offset 0 is the first byte of r5, total_bytes - 1 the last of r9
//! ```

mod backing;
mod reader;
mod ring;
mod shared;

pub use backing::BackingFile;
pub use reader::LogReader;
pub use ring::{RingLog, DEFAULT_CAPACITY};
pub use shared::SharedLog;
