use std::io::{self, Write};

use swotrace_itm::Message;
use tracing::debug;

use crate::format::TraceFormatter;

/// Route one decoded message to its formatter.
///
/// Returns `false` for message kinds that have no text form (unknown,
/// reserved, error and NISYNC packets), which are dropped.
pub fn dispatch<W: Write>(formatter: &mut TraceFormatter<W>, message: &Message) -> io::Result<bool> {
    match *message {
        Message::Software { channel, value } => formatter.software(channel, value)?,
        Message::Exception { direction, number } => formatter.exception(direction, number)?,
        Message::DwtEvent { events } => formatter.dwt_event(events)?,
        Message::PcSample { pc } => formatter.pc_sample(pc)?,
        Message::DataReadWrite {
            comparator,
            is_write,
            data,
        } => formatter.read_write(comparator, is_write, data)?,
        Message::DataAccessWatch { comparator, data } => formatter.access_watch(comparator, data)?,
        Message::DataOffsetWatch { comparator, offset } => {
            formatter.offset_watch(comparator, offset)?
        }
        Message::Timestamp { delta, status } => formatter.timestamp(delta, status)?,
        Message::Unknown { .. }
        | Message::Reserved { .. }
        | Message::Error { .. }
        | Message::NiSync { .. } => {
            debug!(kind = ?message.kind(), "dropping message");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use swotrace_itm::{ExceptionDirection, TimestampStatus};

    use super::*;
    use crate::event::HwEventMask;

    fn render(messages: &[Message]) -> (String, usize) {
        let mut formatter = TraceFormatter::new(Vec::new(), HwEventMask::all(), false);
        let mut handled = 0;
        for message in messages {
            if dispatch(&mut formatter, message).unwrap() {
                handled += 1;
            }
        }
        (String::from_utf8(formatter.into_inner()).unwrap(), handled)
    }

    #[test]
    fn each_kind_reaches_its_formatter() {
        let (text, handled) = render(&[
            Message::Timestamp {
                delta: 3,
                status: TimestampStatus::Exact,
            },
            Message::Exception {
                direction: ExceptionDirection::Enter,
                number: 15,
            },
            Message::PcSample { pc: 0 },
            Message::DwtEvent { events: 0x02 },
            Message::DataReadWrite {
                comparator: 0,
                is_write: false,
                data: 0x12,
            },
            Message::DataAccessWatch {
                comparator: 1,
                data: 0x100,
            },
            Message::DataOffsetWatch {
                comparator: 2,
                offset: 0x40,
            },
            Message::Software {
                channel: 5,
                value: 0xFF,
            },
        ]);
        assert_eq!(handled, 8);
        assert_eq!(
            text,
            "0,0,3\n\
             1,Enter,SysTick\n\
             2,0x00000000\n\
             3,Exc\n\
             d,0,r,12\n\
             5,1,0x00000100\n\
             6,2,0x0040\n\
             m,1,ff\n"
        );
    }

    #[test]
    fn undisplayable_kinds_are_dropped() {
        let (text, handled) = render(&[
            Message::Unknown { header: 0x1D },
            Message::Reserved { header: 0x04 },
            Message::Error { header: 0x0E },
            Message::NiSync {
                info: 1,
                payload: 0,
            },
        ]);
        assert_eq!(handled, 0);
        assert!(text.is_empty());
    }
}
