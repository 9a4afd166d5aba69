//! Hardware event kinds and the output mask built from them.

use std::fmt;

/// Kinds of hardware trace output that can be enabled individually.
///
/// The numeric codes appear verbatim in the output lines, so they are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HwEvent {
    Timestamp = 0,
    Exception = 1,
    PcSample = 2,
    Dwt = 3,
    ReadWrite = 4,
    AccessWatch = 5,
    OffsetWatch = 6,
    Unused = 7,
    NiSync = 8,
}

impl HwEvent {
    pub const ALL: [HwEvent; 9] = [
        HwEvent::Timestamp,
        HwEvent::Exception,
        HwEvent::PcSample,
        HwEvent::Dwt,
        HwEvent::ReadWrite,
        HwEvent::AccessWatch,
        HwEvent::OffsetWatch,
        HwEvent::Unused,
        HwEvent::NiSync,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Exception => "exception",
            Self::PcSample => "pc-sample",
            Self::Dwt => "dwt",
            Self::ReadWrite => "read-write",
            Self::AccessWatch => "access-watch",
            Self::OffsetWatch => "offset-watch",
            Self::Unused => "unused",
            Self::NiSync => "nisync",
        }
    }

    fn bit(self) -> u32 {
        1 << self.code()
    }
}

impl fmt::Display for HwEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of [`HwEvent`] kinds that produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwEventMask(u32);

impl HwEventMask {
    /// Every kind enabled.
    pub const fn all() -> Self {
        Self(0xFFFF)
    }

    /// Nothing enabled.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, event: HwEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn insert(&mut self, event: HwEvent) {
        self.0 |= event.bit();
    }

    pub fn remove(&mut self, event: HwEvent) {
        self.0 &= !event.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for HwEventMask {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<HwEvent> for HwEventMask {
    fn from_iter<T: IntoIterator<Item = HwEvent>>(iter: T) -> Self {
        let mut mask = Self::empty();
        for event in iter {
            mask.insert(event);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let codes: Vec<u8> = HwEvent::ALL.iter().map(|e| e.code()).collect();
        assert_eq!(codes, (0..=8).collect::<Vec<u8>>());
        assert_eq!(HwEvent::from_code(3), Some(HwEvent::Dwt));
        assert_eq!(HwEvent::from_code(9), None);
    }

    #[test]
    fn default_mask_enables_everything() {
        let mask = HwEventMask::default();
        assert!(HwEvent::ALL.iter().all(|e| mask.contains(*e)));
    }

    #[test]
    fn insert_and_remove() {
        let mut mask: HwEventMask = [HwEvent::Exception, HwEvent::Dwt].into_iter().collect();
        assert_eq!(mask.bits(), 0b1010);
        assert!(!mask.contains(HwEvent::Timestamp));

        mask.remove(HwEvent::Dwt);
        mask.insert(HwEvent::Timestamp);
        assert!(mask.contains(HwEvent::Timestamp));
        assert!(!mask.contains(HwEvent::Dwt));
        assert!(HwEventMask::empty().is_empty());
    }
}
