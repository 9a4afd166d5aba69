use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::{is_valid, IDLE};
use crate::codec::{SubPacket, FRAME_LEN, HALF_SYNC, SYNC_PATTERN};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Packs channel-tagged bytes into TPIU frames.
///
/// Mostly useful for producing test streams and replay files. Partial frames
/// are padded with idle-channel data when flushed.
///
/// Wire format of one frame:
/// ```text
/// ┌────┬────┬────┬────┬─── ─ ─ ───┬─────┬─────┐
/// │ b0 │ b1 │ b2 │ b3 │    ...    │ b14 │ aux │
/// └────┴────┴────┴────┴─── ─ ─ ───┴─────┴─────┘
///  even bytes: data (bit0 = 0) or id change (id << 1 | 1)
///  aux bit n:  low bit of b(2n) data, or "delay id change past b(2n+1)"
/// ```
#[derive(Debug)]
pub struct FrameEncoder {
    dst: BytesMut,
    queue: VecDeque<SubPacket>,
    channel: Option<u8>,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            dst: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            queue: VecDeque::new(),
            channel: None,
        }
    }

    /// Queue one byte for `channel`.
    pub fn push(&mut self, channel: u8, data: u8) -> Result<()> {
        if !is_valid(channel) {
            return Err(FrameError::InvalidChannel(channel));
        }
        self.queue.push_back(SubPacket { channel, data });
        Ok(())
    }

    /// Queue a run of bytes for `channel`.
    pub fn extend(&mut self, channel: u8, data: &[u8]) -> Result<()> {
        for byte in data {
            self.push(channel, *byte)?;
        }
        Ok(())
    }

    /// Flush queued bytes and emit a full sync pattern.
    pub fn sync(&mut self) {
        self.flush_frames();
        self.dst.put_u32(SYNC_PATTERN);
    }

    /// Flush queued bytes and emit a halfword sync.
    pub fn half_sync(&mut self) {
        self.flush_frames();
        self.dst.put_slice(&HALF_SYNC);
    }

    /// Pack everything queued into complete frames.
    pub fn flush_frames(&mut self) {
        while !self.queue.is_empty() {
            self.encode_frame();
        }
    }

    /// Flush and return the encoded stream.
    pub fn finish(mut self) -> Bytes {
        self.flush_frames();
        self.dst.freeze()
    }

    fn encode_frame(&mut self) {
        let mut raw = [0u8; FRAME_LEN];
        let mut aux = 0u8;

        for pair in 0..FRAME_LEN / 2 {
            let i = pair * 2;
            let has_odd = i + 1 < FRAME_LEN - 1;
            let first = self.queue.front().copied();
            let second = self.queue.get(1).copied();

            match first {
                Some(a) if self.channel != Some(a.channel) => {
                    raw[i] = id_change(a.channel);
                    self.channel = Some(a.channel);
                    if has_odd {
                        raw[i + 1] = a.data;
                        self.queue.pop_front();
                    }
                }
                Some(a) if !has_odd => {
                    raw[i] = a.data & 0xFE;
                    aux |= (a.data & 1) << pair;
                    self.queue.pop_front();
                }
                Some(a) => match second {
                    Some(b) if b.channel == a.channel => {
                        raw[i] = a.data & 0xFE;
                        aux |= (a.data & 1) << pair;
                        raw[i + 1] = b.data;
                        self.queue.pop_front();
                        self.queue.pop_front();
                    }
                    _ => {
                        // Carry `a` in the odd slot, switching afterwards.
                        let next = second.map_or(IDLE, |b| b.channel);
                        raw[i] = id_change(next);
                        aux |= 1 << pair;
                        raw[i + 1] = a.data;
                        self.channel = Some(next);
                        self.queue.pop_front();
                    }
                },
                None if self.channel != Some(IDLE) => {
                    raw[i] = id_change(IDLE);
                    self.channel = Some(IDLE);
                }
                None => {}
            }
        }

        raw[FRAME_LEN - 1] = aux;
        self.dst.put_slice(&raw);
    }
}

fn id_change(channel: u8) -> u8 {
    (channel << 1) | 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{TpiuDecoder, TpiuEvent};

    fn decode(wire: &[u8]) -> Vec<SubPacket> {
        let mut decoder = TpiuDecoder::new();
        let mut out = Vec::new();
        for b in wire {
            if decoder.feed(*b) == TpiuEvent::RxedFrame {
                out.extend(decoder.take_frame().unwrap().iter().copied());
            }
        }
        out
    }

    fn non_idle(packets: &[SubPacket]) -> Vec<(u8, u8)> {
        packets
            .iter()
            .filter(|p| p.channel != IDLE)
            .map(|p| (p.channel, p.data))
            .collect()
    }

    #[test]
    fn frames_are_sixteen_bytes() {
        let mut encoder = FrameEncoder::new();
        encoder.sync();
        encoder.extend(1, &[1, 2, 3]).unwrap();
        let wire = encoder.finish();
        assert_eq!(wire.len(), 4 + FRAME_LEN);
        assert_eq!(&wire[..4], &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn interleaved_channels_decode_in_order() {
        let input = [
            (1, 0x01),
            (2, 0x02),
            (1, 0x03),
            (1, 0x04),
            (3, 0xFF),
            (3, 0x7F),
            (1, 0x80),
            (2, 0x81),
        ];
        let mut encoder = FrameEncoder::new();
        encoder.sync();
        for (channel, data) in input {
            encoder.push(channel, data).unwrap();
        }
        let wire = encoder.finish();

        assert_eq!(non_idle(&decode(&wire)), input.to_vec());
    }

    #[test]
    fn odd_low_bits_survive() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut encoder = FrameEncoder::new();
        encoder.sync();
        encoder.extend(1, &data).unwrap();
        let wire = encoder.finish();

        let decoded: Vec<u8> = non_idle(&decode(&wire)).iter().map(|(_, d)| *d).collect();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_reserved_channel() {
        let mut encoder = FrameEncoder::new();
        assert_eq!(
            encoder.push(0x7F, 0).unwrap_err(),
            FrameError::InvalidChannel(0x7F)
        );
    }

    #[test]
    fn syncs_between_frames_keep_alignment() {
        let mut encoder = FrameEncoder::new();
        encoder.sync();
        encoder.extend(1, &[0x10, 0x11]).unwrap();
        encoder.sync();
        encoder.half_sync();
        encoder.extend(1, &[0x12]).unwrap();
        let wire = encoder.finish();

        let decoded: Vec<u8> = non_idle(&decode(&wire)).iter().map(|(_, d)| *d).collect();
        assert_eq!(decoded, vec![0x10, 0x11, 0x12]);
    }
}
