//! The swotrace decoding pipeline.
//!
//! Bytes flow strictly downward through four stages:
//! - demux: optional TPIU outer framing, forwarding one channel
//! - pump: ITM message decoding
//! - dispatch: routing each decoded message to its formatter
//! - [`format`]: mask filtering, timestamp tracking and text output
//!
//! The decoders are reached only through the [`OuterDecoder`] and
//! [`InnerDecoder`] traits; [`Pipeline::new`] wires in the standard TPIU and
//! ITM implementations.

pub mod config;
pub mod decoder;
mod demux;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod format;
pub mod pipeline;
mod pump;
#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use decoder::{InnerDecoder, InnerEvent, OuterDecoder, OuterEvent};
pub use dispatch::dispatch;
pub use error::{ConfigError, PipelineError, Result};
pub use event::{HwEvent, HwEventMask};
pub use format::{TimestampState, TraceFormatter, LOG_CHANNEL, OVERFLOW_MARKER};
pub use pipeline::{Pipeline, PipelineStats};
