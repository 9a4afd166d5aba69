use tracing::{debug, trace};

use crate::error::ItmError;
use crate::message::{ExceptionDirection, Message, TimestampStatus};

/// Zero bits that must precede the terminating 1 of a sync packet.
const SYNC_ZERO_BITS: u32 = 47;

/// Overflow packet header.
pub const OVERFLOW: u8 = 0x70;

/// Global timestamp headers.
const GTS1: u8 = 0x94;
const GTS2: u8 = 0xB4;

const MAX_LOCAL_TS_BYTES: usize = 4;
const MAX_GTS1_BYTES: usize = 4;
const MAX_GTS2_BYTES: usize = 6;
const MAX_EXTENSION_BYTES: usize = 4;

/// What a single fed byte did to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItmEvent {
    /// Nothing of note; more bytes needed.
    None,
    /// Synchronization was lost.
    Unsynced,
    /// Synchronization acquired.
    Synced,
    /// The target reported an ITM FIFO overflow.
    Overflow,
    /// A packet could not be decoded; see [`ItmDecoder::last_error`].
    Error,
    /// A message is ready; collect it with [`ItmDecoder::take_message`].
    PacketRxed,
}

/// Running counters for a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItmStats {
    pub packets: u64,
    pub syncs: u64,
    pub lost_syncs: u64,
    pub overflows: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Fixed-size source packet payload.
    Source { size: usize },
    LocalTimestamp { status: TimestampStatus },
    GlobalTimestamp { max: usize },
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unsynced,
    Idle,
    Payload { header: u8, pending: Pending },
}

/// Byte-at-a-time ITM packet decoder.
#[derive(Debug)]
pub struct ItmDecoder {
    state: State,
    zero_bits: u32,
    payload: [u8; MAX_GTS2_BYTES],
    got: usize,
    page: u8,
    message: Option<Message>,
    last_error: Option<ItmError>,
    unsync_pending: bool,
    stats: ItmStats,
}

impl ItmDecoder {
    /// Create a decoder.
    ///
    /// With `start_synced` the stream is trusted from the first byte;
    /// otherwise everything is discarded until a sync packet is seen.
    pub fn new(start_synced: bool) -> Self {
        Self {
            state: if start_synced {
                State::Idle
            } else {
                State::Unsynced
            },
            zero_bits: 0,
            payload: [0; MAX_GTS2_BYTES],
            got: 0,
            page: 0,
            message: None,
            last_error: None,
            unsync_pending: false,
            stats: ItmStats::default(),
        }
    }

    /// Feed one byte of the ITM stream.
    pub fn feed(&mut self, byte: u8) -> ItmEvent {
        if self.detect_sync(byte) {
            return self.on_sync();
        }

        if std::mem::take(&mut self.unsync_pending) {
            return ItmEvent::Unsynced;
        }

        match self.state {
            State::Unsynced => ItmEvent::None,
            State::Idle => self.on_header(byte),
            State::Payload { header, pending } => self.on_payload(header, pending, byte),
        }
    }

    /// Align the decoder with an external framing layer.
    ///
    /// `true` synchronizes an unsynced decoder without disturbing a packet in
    /// flight; `false` drops sync and the next byte reports
    /// [`ItmEvent::Unsynced`].
    pub fn force_sync(&mut self, synced: bool) {
        if synced {
            self.unsync_pending = false;
            if self.state == State::Unsynced {
                self.stats.syncs += 1;
                self.state = State::Idle;
            }
        } else if self.state != State::Unsynced {
            self.stats.lost_syncs += 1;
            self.state = State::Unsynced;
            self.unsync_pending = true;
        }
    }

    /// Collect the message announced by [`ItmEvent::PacketRxed`].
    pub fn take_message(&mut self) -> Option<Message> {
        self.message.take()
    }

    /// The cause of the most recent [`ItmEvent::Error`].
    pub fn last_error(&self) -> Option<ItmError> {
        self.last_error
    }

    pub fn is_synced(&self) -> bool {
        self.state != State::Unsynced
    }

    /// Current stimulus port page (software channel base is `page * 32`).
    pub fn page(&self) -> u8 {
        self.page
    }

    pub fn stats(&self) -> ItmStats {
        self.stats
    }

    fn detect_sync(&mut self, byte: u8) -> bool {
        if byte == 0 {
            self.zero_bits = self.zero_bits.saturating_add(8);
            return false;
        }

        // Bits go out LSB first: count the zeros leading into this byte's
        // first set bit, then restart from its trailing zeros.
        let run = self.zero_bits.saturating_add(byte.trailing_zeros());
        self.zero_bits = byte.leading_zeros();
        byte == 0x80 && run >= SYNC_ZERO_BITS
    }

    fn on_sync(&mut self) -> ItmEvent {
        let was_synced = self.state != State::Unsynced;
        self.state = State::Idle;
        self.unsync_pending = false;
        self.got = 0;

        if was_synced {
            trace!("ITM sync");
            ItmEvent::None
        } else {
            self.stats.syncs += 1;
            debug!("ITM sync acquired");
            ItmEvent::Synced
        }
    }

    fn on_header(&mut self, header: u8) -> ItmEvent {
        self.got = 0;
        match header {
            0x00 => ItmEvent::None,
            OVERFLOW => {
                self.stats.overflows += 1;
                ItmEvent::Overflow
            }
            GTS1 => self.expect(header, Pending::GlobalTimestamp { max: MAX_GTS1_BYTES }),
            GTS2 => self.expect(header, Pending::GlobalTimestamp { max: MAX_GTS2_BYTES }),
            h if h & 0x0F == 0 => {
                if h & 0x80 == 0 {
                    // Single-byte local timestamp, value in bits 6:4.
                    self.ready(Message::Timestamp {
                        delta: u64::from((h >> 4) & 0x7),
                        status: TimestampStatus::Exact,
                    })
                } else if h & 0x40 != 0 {
                    let status = TimestampStatus::from_bits(h >> 4);
                    self.expect(h, Pending::LocalTimestamp { status })
                } else {
                    self.ready(Message::Reserved { header: h })
                }
            }
            h if h & 0x0B == 0x08 => {
                if h & 0x80 != 0 {
                    self.expect(h, Pending::Extension)
                } else {
                    self.on_extension(h, 0)
                }
            }
            h if h & 0x03 == 0 => self.ready(Message::Reserved { header: h }),
            h => {
                let size = match h & 0x03 {
                    1 => 1,
                    2 => 2,
                    _ => 4,
                };
                self.expect(h, Pending::Source { size })
            }
        }
    }

    fn on_payload(&mut self, header: u8, pending: Pending, byte: u8) -> ItmEvent {
        self.payload[self.got] = byte;
        self.got += 1;

        match pending {
            Pending::Source { size } => {
                if self.got < size {
                    return ItmEvent::None;
                }
                self.state = State::Idle;
                let value = little_endian(&self.payload[..size]);
                let message = if header & 0x04 == 0 {
                    Message::Software {
                        channel: self.page.wrapping_mul(32).wrapping_add(header >> 3),
                        value,
                    }
                } else {
                    decode_hardware(header, size, value)
                };
                self.ready(message)
            }
            Pending::LocalTimestamp { status } => {
                match self.continuation(header, byte, MAX_LOCAL_TS_BYTES) {
                    Some(Ok(delta)) => self.ready(Message::Timestamp {
                        delta: u64::from(delta),
                        status,
                    }),
                    Some(Err(err)) => self.fail(err),
                    None => ItmEvent::None,
                }
            }
            Pending::GlobalTimestamp { max } => match self.continuation(header, byte, max) {
                Some(Ok(value)) => {
                    trace!(header, value, "global timestamp");
                    ItmEvent::None
                }
                Some(Err(err)) => self.fail(err),
                None => ItmEvent::None,
            },
            Pending::Extension => match self.continuation(header, byte, MAX_EXTENSION_BYTES) {
                Some(Ok(value)) => self.on_extension(header, value),
                Some(Err(err)) => self.fail(err),
                None => ItmEvent::None,
            },
        }
    }

    /// Advance a continuation-encoded payload.
    ///
    /// `None` while more bytes are expected, otherwise the assembled 7-bit
    /// groups or an overrun error. Returns the decoder to idle when done.
    fn continuation(
        &mut self,
        header: u8,
        byte: u8,
        max: usize,
    ) -> Option<Result<u32, ItmError>> {
        if byte & 0x80 != 0 {
            if self.got < max {
                return None;
            }
            self.state = State::Idle;
            return Some(Err(ItmError::ContinuationOverrun { header }));
        }

        self.state = State::Idle;
        let value = self.payload[..self.got]
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, b)| {
                acc | (u32::from(b & 0x7F).checked_shl(7 * i as u32).unwrap_or(0))
            });
        Some(Ok(value))
    }

    fn on_extension(&mut self, header: u8, payload: u32) -> ItmEvent {
        let info = (header >> 4) & 0x7;
        if header & 0x04 == 0 {
            trace!(page = info, "stimulus port page");
            self.page = info;
            self.state = State::Idle;
            ItmEvent::None
        } else {
            self.ready(Message::NiSync { info, payload })
        }
    }

    fn expect(&mut self, header: u8, pending: Pending) -> ItmEvent {
        self.state = State::Payload { header, pending };
        ItmEvent::None
    }

    fn ready(&mut self, message: Message) -> ItmEvent {
        self.state = State::Idle;
        self.stats.packets += 1;
        self.message = Some(message);
        ItmEvent::PacketRxed
    }

    fn fail(&mut self, err: ItmError) -> ItmEvent {
        self.state = State::Idle;
        self.stats.errors += 1;
        self.last_error = Some(err);
        ItmEvent::Error
    }
}

fn little_endian(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .rev()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn decode_hardware(header: u8, size: usize, value: u32) -> Message {
    let discriminator = header >> 3;
    match discriminator {
        0 => Message::DwtEvent {
            events: (value & 0x3F) as u8,
        },
        1 if size == 2 => {
            let number = (value & 0x1FF) as u16;
            match ExceptionDirection::from_function((value >> 12) as u8) {
                Some(direction) => Message::Exception { direction, number },
                None => Message::Error { header },
            }
        }
        1 => Message::Error { header },
        2 if size == 4 => Message::PcSample { pc: value },
        2 => Message::PcSample { pc: 0 },
        8..=23 => {
            let comparator = (discriminator >> 1) & 0x3;
            let flag = discriminator & 1 == 1;
            match discriminator >> 3 {
                1 if !flag => Message::DataAccessWatch {
                    comparator,
                    data: value,
                },
                1 => Message::DataOffsetWatch {
                    comparator,
                    offset: value as u16,
                },
                _ => Message::DataReadWrite {
                    comparator,
                    is_write: flag,
                    data: value,
                },
            }
        }
        _ => Message::Unknown { header },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut ItmDecoder, bytes: &[u8]) -> Vec<ItmEvent> {
        bytes.iter().map(|b| decoder.feed(*b)).collect()
    }

    fn messages(decoder: &mut ItmDecoder, bytes: &[u8]) -> Vec<Message> {
        let mut out = Vec::new();
        for b in bytes {
            if decoder.feed(*b) == ItmEvent::PacketRxed {
                out.push(decoder.take_message().unwrap());
            }
        }
        out
    }

    #[test]
    fn unsynced_decoder_waits_for_sync() {
        let mut decoder = ItmDecoder::new(false);
        assert!(messages(&mut decoder, &[0x19, 0x2A]).is_empty());

        let events = feed_all(&mut decoder, &[0, 0, 0, 0, 0, 0x80]);
        assert_eq!(events.last(), Some(&ItmEvent::Synced));
        assert!(decoder.is_synced());

        assert_eq!(
            messages(&mut decoder, &[0x19, 0x2A]),
            vec![Message::Software {
                channel: 3,
                value: 0x2A
            }]
        );
    }

    #[test]
    fn short_zero_run_is_not_sync() {
        let mut decoder = ItmDecoder::new(false);
        let events = feed_all(&mut decoder, &[0, 0, 0, 0, 0x80]);
        assert!(events.iter().all(|e| *e == ItmEvent::None));
        assert!(!decoder.is_synced());
    }

    #[test]
    fn overflow() {
        let mut decoder = ItmDecoder::new(true);
        assert_eq!(decoder.feed(0x70), ItmEvent::Overflow);
        assert_eq!(decoder.stats().overflows, 1);
    }

    #[test]
    fn software_sizes() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(
            &mut decoder,
            &[0x0A, 0x34, 0x12, 0x53, 0x78, 0x56, 0x34, 0x12],
        );
        assert_eq!(
            got,
            vec![
                Message::Software {
                    channel: 1,
                    value: 0x1234
                },
                Message::Software {
                    channel: 10,
                    value: 0x1234_5678
                },
            ]
        );
    }

    #[test]
    fn stimulus_page_offsets_channel() {
        let mut decoder = ItmDecoder::new(true);
        // Page 2 extension, then port 1.
        let got = messages(&mut decoder, &[0x28, 0x09, 0x41]);
        assert_eq!(decoder.page(), 2);
        assert_eq!(
            got,
            vec![Message::Software {
                channel: 65,
                value: 0x41
            }]
        );
    }

    #[test]
    fn exception_trace() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(&mut decoder, &[0x0E, 0x0F, 0x10, 0x0E, 0x0B, 0x20]);
        assert_eq!(
            got,
            vec![
                Message::Exception {
                    direction: ExceptionDirection::Enter,
                    number: 15
                },
                Message::Exception {
                    direction: ExceptionDirection::Exit,
                    number: 11
                },
            ]
        );
    }

    #[test]
    fn exception_with_reserved_function_is_error_message() {
        let mut decoder = ItmDecoder::new(true);
        assert_eq!(
            messages(&mut decoder, &[0x0E, 0x03, 0x00]),
            vec![Message::Error { header: 0x0E }]
        );
    }

    #[test]
    fn dwt_event_and_pc_sample() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(
            &mut decoder,
            &[0x05, 0x21, 0x17, 0x78, 0x56, 0x34, 0x12, 0x15, 0x00],
        );
        assert_eq!(
            got,
            vec![
                Message::DwtEvent { events: 0x21 },
                Message::PcSample { pc: 0x1234_5678 },
                Message::PcSample { pc: 0 },
            ]
        );
    }

    #[test]
    fn data_trace_packets() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(
            &mut decoder,
            &[
                // comparator 1 PC value
                0x57, 0x00, 0x10, 0x00, 0x08,
                // comparator 2 address offset
                0x6E, 0x34, 0x12,
                // comparator 3 data write, 1 byte
                0xBD, 0x7F,
                // comparator 0 data read, 4 bytes
                0x87, 0xEF, 0xBE, 0xAD, 0xDE,
            ],
        );
        assert_eq!(
            got,
            vec![
                Message::DataAccessWatch {
                    comparator: 1,
                    data: 0x0800_1000
                },
                Message::DataOffsetWatch {
                    comparator: 2,
                    offset: 0x1234
                },
                Message::DataReadWrite {
                    comparator: 3,
                    is_write: true,
                    data: 0x7F
                },
                Message::DataReadWrite {
                    comparator: 0,
                    is_write: false,
                    data: 0xDEAD_BEEF
                },
            ]
        );
    }

    #[test]
    fn local_timestamps() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(&mut decoder, &[0x30, 0xD0, 0x81, 0x01, 0xC0, 0x05]);
        assert_eq!(
            got,
            vec![
                Message::Timestamp {
                    delta: 3,
                    status: TimestampStatus::Exact
                },
                Message::Timestamp {
                    delta: 0x81,
                    status: TimestampStatus::TimestampDelayed
                },
                Message::Timestamp {
                    delta: 5,
                    status: TimestampStatus::Exact
                },
            ]
        );
    }

    #[test]
    fn timestamp_continuation_overrun() {
        let mut decoder = ItmDecoder::new(true);
        let events = feed_all(&mut decoder, &[0xC0, 0x81, 0x82, 0x83, 0x84]);
        assert_eq!(events.last(), Some(&ItmEvent::Error));
        assert_eq!(
            decoder.last_error(),
            Some(ItmError::ContinuationOverrun { header: 0xC0 })
        );

        // Decoding resumes with the next header.
        assert_eq!(
            messages(&mut decoder, &[0x09, 0x01]),
            vec![Message::Software {
                channel: 1,
                value: 1
            }]
        );
    }

    #[test]
    fn global_timestamps_are_consumed() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(&mut decoder, &[0x94, 0x81, 0x01, 0xB4, 0x80, 0x80, 0x80, 0x00, 0x09, 0x07]);
        assert_eq!(
            got,
            vec![Message::Software {
                channel: 1,
                value: 7
            }]
        );
    }

    #[test]
    fn reserved_and_unknown_headers() {
        let mut decoder = ItmDecoder::new(true);
        let got = messages(&mut decoder, &[0x04, 0x1D, 0x00]);
        assert_eq!(
            got,
            vec![
                Message::Reserved { header: 0x04 },
                Message::Unknown { header: 0x1D },
            ]
        );
    }

    #[test]
    fn hardware_extension_is_nisync() {
        let mut decoder = ItmDecoder::new(true);
        assert_eq!(
            messages(&mut decoder, &[0x9C, 0x05]),
            vec![Message::NiSync {
                info: 1,
                payload: 5
            }]
        );
    }

    #[test]
    fn force_sync_false_reports_unsynced_once() {
        let mut decoder = ItmDecoder::new(true);
        decoder.force_sync(false);
        assert!(!decoder.is_synced());
        assert_eq!(decoder.feed(0x09), ItmEvent::Unsynced);
        assert_eq!(decoder.feed(0x09), ItmEvent::None);
        assert_eq!(decoder.stats().lost_syncs, 1);
    }

    #[test]
    fn force_sync_true_keeps_packet_in_flight() {
        let mut decoder = ItmDecoder::new(true);
        assert_eq!(decoder.feed(0x0A), ItmEvent::None);
        assert_eq!(decoder.feed(0x34), ItmEvent::None);
        decoder.force_sync(true);
        assert_eq!(decoder.feed(0x12), ItmEvent::PacketRxed);
        assert_eq!(
            decoder.take_message(),
            Some(Message::Software {
                channel: 1,
                value: 0x1234
            })
        );
        assert_eq!(decoder.take_message(), None);
    }

    #[test]
    fn force_sync_true_synchronizes() {
        let mut decoder = ItmDecoder::new(false);
        decoder.force_sync(true);
        assert!(decoder.is_synced());
        assert_eq!(
            messages(&mut decoder, &[0x09, 0x41]),
            vec![Message::Software {
                channel: 1,
                value: 0x41
            }]
        );
    }
}
