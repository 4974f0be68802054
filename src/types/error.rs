//! Error kinds for ring log operations

use thiserror::Error;

/// Errors that can occur while appending, addressing or serving the log
#[derive(Debug, Error)]
pub enum RingLogError {
    /// Offset or record index has no corresponding record
    #[error("offset {offset} is out of range (log holds {total} bytes)")]
    NotFound { offset: u64, total: u64 },

    /// Malformed or out-of-range argument (seek directives, config)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Record buffer could not be grown
    #[error("out of memory while growing a record to {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Shutdown arrived while the session was blocked on I/O
    #[error("session cancelled")]
    Cancelled,

    /// Internal cursor inconsistency; indicates a bug
    #[error("ring invariant violated: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RingLogError {
    /// Whether this error must take the whole process down
    pub fn is_fatal(&self) -> bool {
        matches!(self, RingLogError::InvariantViolation(_))
    }
}
