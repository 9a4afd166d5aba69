/// Errors that can occur while decoding or encoding TPIU frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// No completed frame is waiting to be taken.
    #[error("no frame available")]
    NoFrame,

    /// The frame switched to the reserved channel id.
    #[error("malformed frame (reserved channel id at byte {offset})")]
    Malformed { offset: usize },

    /// More bytes than a frame can carry.
    #[error("frame overfull ({len} bytes, max 15)")]
    Overfull { len: usize },

    /// The channel id cannot be represented in a frame.
    #[error("invalid channel id {0} (must be below 0x7f)")]
    InvalidChannel(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
