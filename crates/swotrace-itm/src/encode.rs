//! ITM packet encoding, the inverse of [`crate::ItmDecoder`].
//!
//! Used to build replay files and test streams.

use bytes::{BufMut, BytesMut};

use crate::decoder::OVERFLOW;
use crate::error::{ItmError, Result};
use crate::message::{Message, TimestampStatus};

/// Append a sync packet (47 zero bits and a one).
pub fn encode_sync(dst: &mut BytesMut) {
    dst.put_slice(&[0, 0, 0, 0, 0, 0x80]);
}

/// Append an overflow packet.
pub fn encode_overflow(dst: &mut BytesMut) {
    dst.put_u8(OVERFLOW);
}

/// Append the packet(s) carrying `message`.
///
/// Software channels above 31 are wrapped in stimulus page extensions, and
/// the page is switched back to 0 afterwards.
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<()> {
    match *message {
        Message::Software { channel, value } => {
            let page = channel / 32;
            if page != 0 {
                dst.put_u8(page_extension(page));
            }
            source(dst, (channel % 32) << 3, value);
            if page != 0 {
                dst.put_u8(page_extension(0));
            }
        }
        Message::DwtEvent { events } => hardware(dst, 0, 1, u32::from(events & 0x3F)),
        Message::Exception { direction, number } => {
            let value = u32::from(number & 0x1FF) | (u32::from(direction.function()) << 12);
            hardware(dst, 1, 2, value);
        }
        Message::PcSample { pc } => hardware(dst, 2, 4, pc),
        Message::DataAccessWatch { comparator, data } => {
            hardware(dst, 8 | ((comparator & 0x3) << 1), 4, data)
        }
        Message::DataOffsetWatch { comparator, offset } => {
            hardware(dst, 8 | ((comparator & 0x3) << 1) | 1, 2, u32::from(offset))
        }
        Message::DataReadWrite {
            comparator,
            is_write,
            data,
        } => {
            let discriminator = 16 | ((comparator & 0x3) << 1) | u8::from(is_write);
            hardware(dst, discriminator, smallest_size(data), data)
        }
        Message::Timestamp { delta, status } => timestamp(dst, delta, status),
        Message::Reserved { header } => dst.put_u8(header),
        other => return Err(ItmError::Unencodable(other.kind())),
    }
    Ok(())
}

fn page_extension(page: u8) -> u8 {
    ((page & 0x7) << 4) | 0x08
}

fn smallest_size(value: u32) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        _ => 4,
    }
}

fn size_code(size: usize) -> u8 {
    match size {
        1 => 1,
        2 => 2,
        _ => 3,
    }
}

fn source(dst: &mut BytesMut, header_bits: u8, value: u32) {
    let size = smallest_size(value);
    dst.put_u8(header_bits | size_code(size));
    dst.put_slice(&value.to_le_bytes()[..size]);
}

fn hardware(dst: &mut BytesMut, discriminator: u8, size: usize, value: u32) {
    dst.put_u8((discriminator << 3) | 0x04 | size_code(size));
    dst.put_slice(&value.to_le_bytes()[..size]);
}

fn timestamp(dst: &mut BytesMut, delta: u64, status: TimestampStatus) {
    if status.is_exact() && (1..=6).contains(&delta) {
        dst.put_u8((delta as u8) << 4);
        return;
    }

    dst.put_u8(0xC0 | (status.code() << 4));
    // Four 7-bit groups at most.
    let mut remaining = delta & 0x0FFF_FFFF;
    for i in 0..4 {
        let group = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining == 0 || i == 3 {
            dst.put_u8(group);
            break;
        }
        dst.put_u8(group | 0x80);
    }
}
