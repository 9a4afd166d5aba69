/// Errors raised while decoding or encoding ITM packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ItmError {
    /// A continuation-encoded packet ran past its maximum length.
    #[error("packet 0x{header:02x} exceeded its maximum length")]
    ContinuationOverrun { header: u8 },

    /// The message has no wire representation.
    #[error("cannot encode {0:?} message")]
    Unencodable(crate::message::MessageKind),
}

pub type Result<T> = std::result::Result<T, ItmError>;
