//! Byte-stream sources for SWO trace data.
//!
//! Provides a unified "next chunk" interface over the places a raw trace
//! stream can come from:
//! - A TCP connection to a trace server (e.g. orbuculum on port 3443)
//! - A file, either read to exhaustion or polled for further input
//!
//! This is the lowest layer of swotrace. Everything else consumes the
//! [`Chunk`]s produced by a [`TraceSource`].

pub mod error;
pub mod file;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use file::{ExhaustionPolicy, FileSource, POLL_INTERVAL};
pub use tcp::{parse_server, TcpSource, DEFAULT_HOST, DEFAULT_PORT};
pub use traits::{Chunk, TraceSource, TRANSFER_SIZE};
