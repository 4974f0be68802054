//! Session wire protocol
//!
//! This module contains the message type every completed input line is
//! classified into before it is committed or handled as a seek.

mod message;

pub use message::{SessionMessage, DEFAULT_SEEK_PREFIX};
