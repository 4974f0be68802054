//! Ring Log Server
//!
//! A bounded, append-only log of terminator-delimited records shared by
//! many concurrent sessions. Once the log holds its fixed number of
//! records, every append evicts the oldest one.
//!
//! # Features
//!
//! - **Bounded**: keeps the last N records, N counted in records
//! - **Offset addressing**: read from any byte of the concatenated log
//! - **Fragment tolerant**: records may arrive over any number of reads
//! - **Seek directives**: in-band `AESDCHAR_IOCSEEKTO:<record>,<offset>`
//! - **Byte readers**: `std::io::Read + Seek` over the live log
//! - **Orderly shutdown**: cancels sessions, never commits partial records
//!
//! # Modules
//!
//! - `types`: Record, statistics and error types
//! - `ring_log`: RingLog ring buffer and the lock-guarded SharedLog
//! - `assembler`: per-session record assembly
//! - `protocol`: session message classification
//! - `session`: SessionWorker state machine and read cursor
//! - `server`: ServerDispatcher and accept sources
//! - `producer`: periodic timestamp writer
//! - `config`: layered server configuration
//! - `utils`: file and time helpers
//!
//! # Example
//!
//! ```no_run
//! use ring_log::{ServerConfig, ServerDispatcher, SessionSettings, SharedLog};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let log = SharedLog::new(config.capacity)?;
//!     let mut dispatcher = ServerDispatcher::new(log, SessionSettings::from(&config));
//!     dispatcher.start(TcpListener::bind(&config.bind_addr).await?)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod config;
pub mod producer;
pub mod protocol;
pub mod ring_log;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use assembler::RecordAssembler;
pub use config::ServerConfig;
pub use producer::{LocalClock, PeriodicProducer, TimestampSource};
pub use protocol::SessionMessage;
pub use ring_log::{LogReader, RingLog, SharedLog};
pub use server::{AcceptSource, ChannelAcceptor, DispatchStats, ServerDispatcher};
pub use session::{CloseReason, SessionCursor, SessionSettings, SessionSummary, SessionWorker};
pub use types::{LogStats, Record, RingLogError, RingResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
