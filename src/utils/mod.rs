//! Utility functions and helpers
//!
//! This module contains file helpers and timestamp formatting.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write, remove_if_exists};
pub use time::{format_timestamp_record, TIMESTAMP_FORMAT};
