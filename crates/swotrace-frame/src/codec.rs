use tracing::{debug, trace};

use crate::channel::{IDLE, RESERVED};
use crate::error::{FrameError, Result};

/// Frame size on the wire.
pub const FRAME_LEN: usize = 16;

/// Maximum number of data bytes a frame can carry.
pub const FRAME_SLOTS: usize = 15;

/// Full synchronization pattern, as it appears in a big-endian shift register.
pub const SYNC_PATTERN: u32 = 0xFFFF_FF7F;

/// Halfword synchronization (padding) inserted at even offsets.
pub const HALF_SYNC: [u8; 2] = [0xFF, 0x7F];

/// Consecutive malformed frames tolerated before sync is dropped.
const MAX_MALFORMED_FRAMES: u32 = 4;

/// One byte of a frame, tagged with the channel it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubPacket {
    pub channel: u8,
    pub data: u8,
}

/// The demultiplexed contents of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    packets: [SubPacket; FRAME_SLOTS],
    len: usize,
}

impl Frame {
    fn push(&mut self, channel: u8, data: u8) {
        self.packets[self.len] = SubPacket { channel, data };
        self.len += 1;
    }

    /// The channel-tagged bytes in wire order.
    pub fn as_slice(&self) -> &[SubPacket] {
        &self.packets[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubPacket> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl TryFrom<&[SubPacket]> for Frame {
    type Error = FrameError;

    fn try_from(packets: &[SubPacket]) -> Result<Self> {
        if packets.len() > FRAME_SLOTS {
            return Err(FrameError::Overfull { len: packets.len() });
        }
        let mut frame = Frame::default();
        for packet in packets {
            frame.push(packet.channel, packet.data);
        }
        Ok(frame)
    }
}

impl<'a> IntoIterator for &'a Frame {
    type Item = &'a SubPacket;
    type IntoIter = std::slice::Iter<'a, SubPacket>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// What a single fed byte did to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpiuEvent {
    /// Not synchronized; the byte was discarded.
    None,
    /// Synchronization acquired from the unsynced state.
    NewSync,
    /// Sync pattern seen at a frame boundary while already synchronized.
    Synced,
    /// Byte stored, frame still accumulating.
    Rxing,
    /// Synchronization dropped after repeated malformed frames.
    Unsynced,
    /// A frame completed; collect it with [`TpiuDecoder::take_frame`].
    RxedFrame,
    /// Sync pattern arrived mid-frame; the partial frame was discarded.
    Error,
}

/// Running counters for a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TpiuStats {
    pub frames: u64,
    pub syncs: u64,
    pub lost_syncs: u64,
    pub malformed: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unsynced,
    Rxing,
}

/// Byte-at-a-time TPIU frame decoder.
#[derive(Debug)]
pub struct TpiuDecoder {
    state: State,
    sync_monitor: u32,
    raw: [u8; FRAME_LEN],
    count: usize,
    channel: u8,
    decoded: Option<Result<Frame>>,
    malformed_run: u32,
    stats: TpiuStats,
}

impl Default for TpiuDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TpiuDecoder {
    /// Create an unsynchronized decoder.
    pub fn new() -> Self {
        Self {
            state: State::Unsynced,
            sync_monitor: 0,
            raw: [0; FRAME_LEN],
            count: 0,
            channel: IDLE,
            decoded: None,
            malformed_run: 0,
            stats: TpiuStats::default(),
        }
    }

    /// Feed one byte from the physical stream.
    pub fn feed(&mut self, byte: u8) -> TpiuEvent {
        self.sync_monitor = (self.sync_monitor << 8) | u32::from(byte);

        if self.sync_monitor == SYNC_PATTERN {
            return self.on_sync();
        }

        if self.state == State::Unsynced {
            return TpiuEvent::None;
        }

        self.raw[self.count] = byte;
        self.count += 1;

        if self.count % 2 == 0 && self.raw[self.count - 2..self.count] == HALF_SYNC {
            trace!(offset = self.count - 2, "discarding halfword sync");
            self.count -= 2;
            return TpiuEvent::Rxing;
        }

        if self.count < FRAME_LEN {
            return TpiuEvent::Rxing;
        }

        self.count = 0;
        self.on_frame()
    }

    /// Collect the frame announced by [`TpiuEvent::RxedFrame`].
    ///
    /// Fails if there is no pending frame (including a second call for the
    /// same frame) or if the frame was malformed.
    pub fn take_frame(&mut self) -> Result<Frame> {
        self.decoded.take().unwrap_or(Err(FrameError::NoFrame))
    }

    /// Whether frame alignment is currently established.
    pub fn is_synced(&self) -> bool {
        self.state == State::Rxing
    }

    /// The channel id subsequent data will be attributed to.
    pub fn current_channel(&self) -> u8 {
        self.channel
    }

    pub fn stats(&self) -> TpiuStats {
        self.stats
    }

    fn on_sync(&mut self) -> TpiuEvent {
        self.stats.syncs += 1;
        self.malformed_run = 0;
        self.decoded = None;

        let previous = self.state;
        // The three leading 0xFF bytes were stored as frame data.
        let aligned = self.count == 3;
        self.state = State::Rxing;
        self.count = 0;

        match previous {
            State::Unsynced => {
                debug!("TPIU sync acquired");
                TpiuEvent::NewSync
            }
            State::Rxing if aligned => TpiuEvent::Synced,
            State::Rxing => {
                self.stats.errors += 1;
                debug!("TPIU sync inside a frame, realigning");
                TpiuEvent::Error
            }
        }
    }

    fn on_frame(&mut self) -> TpiuEvent {
        match decode_frame(&self.raw, self.channel) {
            Ok((frame, channel)) => {
                self.stats.frames += 1;
                self.malformed_run = 0;
                self.channel = channel;
                self.decoded = Some(Ok(frame));
                TpiuEvent::RxedFrame
            }
            Err(err) => {
                self.stats.malformed += 1;
                self.malformed_run += 1;
                if self.malformed_run >= MAX_MALFORMED_FRAMES {
                    debug!(run = self.malformed_run, "too many malformed frames, dropping sync");
                    self.stats.lost_syncs += 1;
                    self.state = State::Unsynced;
                    self.malformed_run = 0;
                    self.decoded = None;
                    return TpiuEvent::Unsynced;
                }
                self.decoded = Some(Err(err));
                TpiuEvent::RxedFrame
            }
        }
    }
}

/// Demultiplex one raw frame starting on `channel`.
///
/// Returns the frame contents and the channel that is active afterwards.
fn decode_frame(raw: &[u8; FRAME_LEN], mut channel: u8) -> Result<(Frame, u8)> {
    let aux = raw[FRAME_LEN - 1];
    let mut frame = Frame::default();

    for pair in 0..FRAME_LEN / 2 {
        let i = pair * 2;
        let has_odd = i + 1 < FRAME_LEN - 1;
        let low_bit = (aux >> pair) & 1;
        let mut delayed = None;

        if raw[i] & 1 == 1 {
            let id = raw[i] >> 1;
            if id == RESERVED {
                return Err(FrameError::Malformed { offset: i });
            }
            // Aux bit set: the following byte still belongs to the old id.
            if low_bit == 1 && has_odd {
                delayed = Some(id);
            } else {
                channel = id;
            }
        } else {
            frame.push(channel, raw[i] | low_bit);
        }

        if has_odd {
            frame.push(channel, raw[i + 1]);
        }

        if let Some(id) = delayed {
            channel = id;
        }
    }

    Ok((frame, channel))
}
