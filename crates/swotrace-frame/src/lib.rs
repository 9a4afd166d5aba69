//! TPIU formatter frame decoding with channel demultiplexing.
//!
//! The TPIU interleaves several trace sources onto one physical stream using
//! fixed 16-byte frames:
//! - A full sync pattern (`FF FF FF 7F`) marks frame alignment
//! - Even bytes either carry data or switch the active channel id
//! - Byte 15 holds the low bits of the even data bytes
//!
//! [`TpiuDecoder`] is fed one byte at a time and hands back the
//! `(channel, byte)` pairs of every completed frame.

pub mod channel;
pub mod codec;
pub mod encoder;
pub mod error;

pub use channel::{channel_name, IDLE, ITM, RESERVED};
pub use codec::{
    Frame, SubPacket, TpiuDecoder, TpiuEvent, TpiuStats, FRAME_LEN, FRAME_SLOTS, HALF_SYNC,
    SYNC_PATTERN,
};
pub use encoder::FrameEncoder;
pub use error::{FrameError, Result};
