//! ARM Instrumentation Trace Macrocell (ITM) packet decoding.
//!
//! The ITM stream carries software stimulus writes, DWT hardware events,
//! exception trace and local timestamps. [`ItmDecoder`] reassembles packets
//! one byte at a time and yields one typed [`Message`] per packet.

pub mod decoder;
pub mod encode;
pub mod error;
pub mod message;

pub use decoder::{ItmDecoder, ItmEvent, ItmStats};
pub use encode::{encode_message, encode_overflow, encode_sync};
pub use error::{ItmError, Result};
pub use message::{kind_of, ExceptionDirection, Message, MessageKind, TimestampStatus};
