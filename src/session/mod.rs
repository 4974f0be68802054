//! Session handling
//!
//! One `SessionWorker` drives one client byte stream: it assembles
//! records, commits them to the shared log, and writes read-back copies
//! to the client.

mod cursor;
mod worker;

pub use cursor::SessionCursor;
pub use worker::{CloseReason, SessionSettings, SessionState, SessionSummary, SessionWorker};
