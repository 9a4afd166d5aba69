//! Text rendering of decoded messages.
//!
//! One formatter per message kind. Each checks the output mask, updates any
//! derived state and writes a single line. The line formats are consumed by
//! other tools and must stay byte-exact:
//!
//! ```text
//! 0,<status>,<cumulative>        timestamp
//! 1,<Enter|Exit|Resume>,<name>   exception
//! 2,0x<pc:08x>                   pc sample
//! 3,<event>                      dwt event, one line per flag
//! d,<comp>,<w|r>,<data:x>        data read/write
//! 5,<comp>,0x<data:08x>          data access watch
//! 6,<comp>,0x<offset:04x>        data offset watch
//! f,<1-4>,<value:x>              software channels 1-4
//! m,<1|2>,<value:x>              software channels 5 and 6
//! ```

use std::io::{self, Write};

use swotrace_itm::{ExceptionDirection, TimestampStatus};
use tracing::trace;

use crate::event::{HwEvent, HwEventMask};

/// Stimulus channel whose bytes are passed through in log-only mode.
pub const LOG_CHANNEL: u8 = 10;

/// Marker line written when the target reports an ITM overflow.
pub const OVERFLOW_MARKER: &str = "ITM_OVERFLOW";

const EXCEPTION_NAMES: [&str; 16] = [
    "Thread",
    "Reset",
    "NMI",
    "HardFault",
    "MemManage",
    "BusFault",
    "UsageFault",
    "UNKNOWN_7",
    "UNKNOWN_8",
    "UNKNOWN_9",
    "UNKNOWN_10",
    "SVCall",
    "Debug Monitor",
    "UNKNOWN_13",
    "PendSV",
    "SysTick",
];

/// DWT event flags, by bit position.
const DWT_EVENT_NAMES: [&str; 6] = ["CPI", "Exc", "Sleep", "LSU", "Fold", "Cyc"];

/// Timestamp state derived from the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampState {
    /// Status of the most recent timestamp.
    pub status: TimestampStatus,
    /// Sum of every delta seen so far.
    pub cumulative: u64,
}

/// Writes decoded messages as text lines to `W`.
#[derive(Debug)]
pub struct TraceFormatter<W> {
    out: W,
    mask: HwEventMask,
    log_only: bool,
    timestamp: TimestampState,
}

impl<W: Write> TraceFormatter<W> {
    pub fn new(out: W, mask: HwEventMask, log_only: bool) -> Self {
        Self {
            out,
            mask,
            log_only,
            timestamp: TimestampState::default(),
        }
    }

    pub fn timestamp_state(&self) -> TimestampState {
        self.timestamp
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn enabled(&self, event: HwEvent) -> bool {
        let enabled = self.mask.contains(event);
        if !enabled {
            trace!(%event, "masked");
        }
        enabled
    }

    pub fn exception(&mut self, direction: ExceptionDirection, number: u16) -> io::Result<()> {
        if !self.enabled(HwEvent::Exception) {
            return Ok(());
        }
        let code = HwEvent::Exception.code();
        let direction = direction.name();
        match EXCEPTION_NAMES.get(usize::from(number)) {
            Some(name) => writeln!(self.out, "{code},{direction},{name}"),
            None => writeln!(self.out, "{code},{direction},UNKNOWN_{number}"),
        }
    }

    pub fn dwt_event(&mut self, events: u8) -> io::Result<()> {
        if !self.enabled(HwEvent::Dwt) {
            return Ok(());
        }
        let code = HwEvent::Dwt.code();
        for (bit, name) in DWT_EVENT_NAMES.iter().enumerate() {
            if events & (1 << bit) != 0 {
                writeln!(self.out, "{code},{name}")?;
            }
        }
        Ok(())
    }

    pub fn pc_sample(&mut self, pc: u32) -> io::Result<()> {
        if !self.enabled(HwEvent::PcSample) {
            return Ok(());
        }
        writeln!(self.out, "{},0x{pc:08x}", HwEvent::PcSample.code())
    }

    pub fn read_write(&mut self, comparator: u8, is_write: bool, data: u32) -> io::Result<()> {
        if !self.enabled(HwEvent::ReadWrite) {
            return Ok(());
        }
        let access = if is_write { 'w' } else { 'r' };
        writeln!(self.out, "d,{comparator},{access},{data:x}")
    }

    pub fn access_watch(&mut self, comparator: u8, data: u32) -> io::Result<()> {
        if !self.enabled(HwEvent::AccessWatch) {
            return Ok(());
        }
        writeln!(
            self.out,
            "{},{comparator},0x{data:08x}",
            HwEvent::AccessWatch.code()
        )
    }

    pub fn offset_watch(&mut self, comparator: u8, offset: u16) -> io::Result<()> {
        if !self.enabled(HwEvent::OffsetWatch) {
            return Ok(());
        }
        writeln!(
            self.out,
            "{},{comparator},0x{offset:04x}",
            HwEvent::OffsetWatch.code()
        )
    }

    /// Software writes ignore the mask; log-only mode decides what is shown.
    pub fn software(&mut self, channel: u8, value: u32) -> io::Result<()> {
        if self.log_only {
            if channel == LOG_CHANNEL {
                // Raw character, no line terminator.
                self.out.write_all(&[value as u8])?;
            }
            return Ok(());
        }
        match channel {
            1..=4 => writeln!(self.out, "f,{channel},{value:x}"),
            5 => writeln!(self.out, "m,1,{value:x}"),
            6 => writeln!(self.out, "m,2,{value:x}"),
            _ => Ok(()),
        }
    }

    /// Accumulates every delta, then prints the running total if enabled.
    pub fn timestamp(&mut self, delta: u64, status: TimestampStatus) -> io::Result<()> {
        self.timestamp.status = status;
        self.timestamp.cumulative = self.timestamp.cumulative.saturating_add(delta);
        if !self.enabled(HwEvent::Timestamp) {
            return Ok(());
        }
        writeln!(
            self.out,
            "{},{},{}",
            HwEvent::Timestamp.code(),
            status.code(),
            self.timestamp.cumulative
        )
    }

    pub fn overflow(&mut self) -> io::Result<()> {
        writeln!(self.out, "{OVERFLOW_MARKER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> TraceFormatter<Vec<u8>> {
        TraceFormatter::new(Vec::new(), HwEventMask::all(), false)
    }

    fn text(formatter: TraceFormatter<Vec<u8>>) -> String {
        String::from_utf8(formatter.into_inner()).unwrap()
    }

    #[test]
    fn exception_names() {
        let mut f = formatter();
        f.exception(ExceptionDirection::Enter, 15).unwrap();
        f.exception(ExceptionDirection::Exit, 12).unwrap();
        f.exception(ExceptionDirection::Resume, 0).unwrap();
        f.exception(ExceptionDirection::Enter, 9).unwrap();
        f.exception(ExceptionDirection::Enter, 42).unwrap();
        assert_eq!(
            text(f),
            "1,Enter,SysTick\n\
             1,Exit,Debug Monitor\n\
             1,Resume,Thread\n\
             1,Enter,UNKNOWN_9\n\
             1,Enter,UNKNOWN_42\n"
        );
    }

    #[test]
    fn dwt_names_follow_bit_position() {
        let mut f = formatter();
        f.dwt_event(0b10_0101).unwrap();
        assert_eq!(text(f), "3,CPI\n3,Sleep\n3,Cyc\n");
    }

    #[test]
    fn dwt_without_flags_prints_nothing() {
        let mut f = formatter();
        f.dwt_event(0).unwrap();
        assert_eq!(text(f), "");
    }

    #[test]
    fn data_trace_lines() {
        let mut f = formatter();
        f.pc_sample(0x0800_01a4).unwrap();
        f.read_write(1, true, 0xBEEF).unwrap();
        f.read_write(0, false, 0).unwrap();
        f.access_watch(2, 0x2000_0010).unwrap();
        f.offset_watch(3, 0x1c).unwrap();
        assert_eq!(
            text(f),
            "2,0x080001a4\n\
             d,1,w,beef\n\
             d,0,r,0\n\
             5,2,0x20000010\n\
             6,3,0x001c\n"
        );
    }

    #[test]
    fn software_channels() {
        let mut f = formatter();
        for channel in 0..=11u8 {
            f.software(channel, 0x2A).unwrap();
        }
        assert_eq!(text(f), "f,1,2a\nf,2,2a\nf,3,2a\nf,4,2a\nm,1,2a\nm,2,2a\n");
    }

    #[test]
    fn log_only_passes_raw_bytes() {
        let mut f = TraceFormatter::new(Vec::new(), HwEventMask::empty(), true);
        f.software(LOG_CHANNEL, 0x41).unwrap();
        f.software(1, 0x42).unwrap();
        f.software(LOG_CHANNEL, 0x0A).unwrap();
        f.exception(ExceptionDirection::Enter, 15).unwrap();
        assert_eq!(f.into_inner(), b"A\n");
    }

    #[test]
    fn timestamps_accumulate() {
        let mut f = formatter();
        f.timestamp(5, TimestampStatus::Exact).unwrap();
        f.timestamp(0, TimestampStatus::Exact).unwrap();
        f.timestamp(1000, TimestampStatus::EventDelayed).unwrap();
        assert_eq!(
            f.timestamp_state(),
            TimestampState {
                status: TimestampStatus::EventDelayed,
                cumulative: 1005
            }
        );
        assert_eq!(text(f), "0,0,5\n0,0,5\n0,2,1005\n");
    }

    #[test]
    fn masked_timestamps_still_accumulate() {
        let mut f = TraceFormatter::new(Vec::new(), HwEventMask::empty(), false);
        f.timestamp(7, TimestampStatus::Exact).unwrap();
        f.timestamp(3, TimestampStatus::TimestampDelayed).unwrap();
        assert_eq!(f.timestamp_state().cumulative, 10);
        assert!(f.into_inner().is_empty());
    }

    #[test]
    fn cumulative_saturates() {
        let mut f = formatter();
        f.timestamp(u64::MAX, TimestampStatus::Exact).unwrap();
        f.timestamp(1, TimestampStatus::Exact).unwrap();
        assert_eq!(f.timestamp_state().cumulative, u64::MAX);
    }

    #[test]
    fn mask_filters_each_kind() {
        let mut mask = HwEventMask::all();
        mask.remove(HwEvent::Exception);
        mask.remove(HwEvent::PcSample);
        let mut f = TraceFormatter::new(Vec::new(), mask, false);
        f.exception(ExceptionDirection::Enter, 15).unwrap();
        f.pc_sample(4).unwrap();
        f.dwt_event(1).unwrap();
        f.software(1, 1).unwrap();
        assert_eq!(text(f), "3,CPI\nf,1,1\n");
    }

    #[test]
    fn overflow_marker() {
        let mut f = TraceFormatter::new(Vec::new(), HwEventMask::empty(), true);
        f.overflow().unwrap();
        assert_eq!(f.into_inner(), b"ITM_OVERFLOW\n");
    }
}
