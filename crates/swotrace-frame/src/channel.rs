//! Well-known TPIU channel ids.
//!
//! Ids are 7 bits wide. Id 0 carries idle padding and id 0x7F is reserved;
//! every other id is assigned by the trace hardware configuration.

/// Idle / null channel, silently discarded.
pub const IDLE: u8 = 0;

/// Conventional channel of the ITM stream.
pub const ITM: u8 = 1;

/// Reserved id, never valid in a frame.
pub const RESERVED: u8 = 0x7F;

/// Returns a human-readable name for a channel id.
pub fn channel_name(id: u8) -> &'static str {
    match id {
        IDLE => "IDLE",
        ITM => "ITM",
        2 => "ETM",
        RESERVED => "RESERVED",
        _ => "OTHER",
    }
}

/// Returns true if the channel id can appear in a frame.
pub fn is_valid(id: u8) -> bool {
    id < RESERVED
}
