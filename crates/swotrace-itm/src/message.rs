//! Decoded ITM messages.

/// What an exception trace packet reports about the exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionDirection {
    Enter,
    Exit,
    Resume,
}

impl ExceptionDirection {
    /// Decode the 2-bit function field; 0 is reserved.
    pub fn from_function(function: u8) -> Option<Self> {
        match function & 0x3 {
            1 => Some(Self::Enter),
            2 => Some(Self::Exit),
            3 => Some(Self::Resume),
            _ => None,
        }
    }

    pub fn function(self) -> u8 {
        match self {
            Self::Enter => 1,
            Self::Exit => 2,
            Self::Resume => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Exit => "Exit",
            Self::Resume => "Resume",
        }
    }
}

/// Relationship between a local timestamp and the packets around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampStatus {
    /// Timestamp is synchronous to the data.
    #[default]
    Exact,
    /// Timestamp emission was delayed relative to the data.
    TimestampDelayed,
    /// Data emission was delayed relative to the event.
    EventDelayed,
    /// Both were delayed.
    BothDelayed,
}

impl TimestampStatus {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Exact,
            1 => Self::TimestampDelayed,
            2 => Self::EventDelayed,
            _ => Self::BothDelayed,
        }
    }

    /// Numeric code, identical to the TC field of the packet.
    pub fn code(self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::TimestampDelayed => 1,
            Self::EventDelayed => 2,
            Self::BothDelayed => 3,
        }
    }

    pub fn is_exact(self) -> bool {
        self == Self::Exact
    }
}

/// Every kind of message the decoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Unknown,
    Reserved,
    Error,
    None,
    Software,
    NiSync,
    OffsetWatch,
    AccessWatch,
    ReadWrite,
    PcSample,
    DwtEvent,
    Exception,
    Timestamp,
}

/// One fully decoded ITM packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Write to a stimulus port.
    Software { channel: u8, value: u32 },
    /// Exception entry, exit or return.
    Exception {
        direction: ExceptionDirection,
        number: u16,
    },
    /// DWT event counter wrap flags (CPI, Exc, Sleep, LSU, Fold, Cyc).
    DwtEvent { events: u8 },
    /// Periodic PC sample; sleeping samples carry pc 0.
    PcSample { pc: u32 },
    /// Data value read or written at a watched address.
    DataReadWrite {
        comparator: u8,
        is_write: bool,
        data: u32,
    },
    /// PC of an instruction that hit a data watchpoint.
    DataAccessWatch { comparator: u8, data: u32 },
    /// Low address bits of a data watchpoint hit.
    DataOffsetWatch { comparator: u8, offset: u16 },
    /// Local timestamp delta since the previous one.
    Timestamp { delta: u64, status: TimestampStatus },
    /// Hardware source packet with an unrecognized discriminator.
    Unknown { header: u8 },
    /// Reserved header encoding.
    Reserved { header: u8 },
    /// Recognized packet with invalid contents.
    Error { header: u8 },
    /// Hardware-source extension packet.
    NiSync { info: u8, payload: u32 },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Software { .. } => MessageKind::Software,
            Self::Exception { .. } => MessageKind::Exception,
            Self::DwtEvent { .. } => MessageKind::DwtEvent,
            Self::PcSample { .. } => MessageKind::PcSample,
            Self::DataReadWrite { .. } => MessageKind::ReadWrite,
            Self::DataAccessWatch { .. } => MessageKind::AccessWatch,
            Self::DataOffsetWatch { .. } => MessageKind::OffsetWatch,
            Self::Timestamp { .. } => MessageKind::Timestamp,
            Self::Unknown { .. } => MessageKind::Unknown,
            Self::Reserved { .. } => MessageKind::Reserved,
            Self::Error { .. } => MessageKind::Error,
            Self::NiSync { .. } => MessageKind::NiSync,
        }
    }
}

/// Kind of an optional message; no message maps to [`MessageKind::None`].
pub fn kind_of(message: Option<&Message>) -> MessageKind {
    message.map_or(MessageKind::None, Message::kind)
}
