//! Data types for the Ring Log Server
//!
//! This module contains the record type, log statistics and the error
//! type shared by every layer of the crate.

mod error;
mod record;
mod stats;

pub use error::RingLogError;
pub use record::Record;
pub use stats::LogStats;

/// Result type for ring log operations
pub type RingResult<T> = Result<T, RingLogError>;

/// Default record terminator (line feed)
pub const DEFAULT_TERMINATOR: u8 = b'\n';
