//! The seams between the pipeline and the protocol decoders.
//!
//! The pipeline never looks at bits itself. It feeds bytes to an
//! [`OuterDecoder`] (framing) and an [`InnerDecoder`] (messages) and reacts to
//! the events they return.

use swotrace_frame::{Frame, FrameError, TpiuDecoder, TpiuEvent};
use swotrace_itm::{ItmDecoder, ItmError, ItmEvent, Message};

/// Lifecycle events of the outer framing decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OuterEvent {
    /// Nothing to do (e.g. still hunting for sync).
    None,
    /// Frame alignment found from the unsynced state.
    SyncAcquired,
    /// Alignment confirmed while already synced.
    ReSynced,
    /// A frame is still being accumulated.
    FrameInProgress,
    /// Alignment lost.
    SyncLost,
    /// A frame is ready to be taken.
    FrameComplete,
    /// The stream violated the framing protocol.
    ProtocolError,
}

/// Events of the inner message decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerEvent {
    None,
    Unsynced,
    Synced,
    /// The target dropped trace data.
    Overflow,
    DecodeError,
    /// A message is ready to be taken.
    PacketReady,
}

/// Byte-at-a-time framing decoder.
pub trait OuterDecoder {
    fn feed(&mut self, byte: u8) -> OuterEvent;

    /// The frame announced by [`OuterEvent::FrameComplete`].
    fn take_frame(&mut self) -> Result<Frame, FrameError>;
}

/// Byte-at-a-time message decoder.
pub trait InnerDecoder {
    fn feed(&mut self, byte: u8) -> InnerEvent;

    /// The message announced by [`InnerEvent::PacketReady`].
    fn take_message(&mut self) -> Option<Message>;

    /// Impose the sync state established by the framing layer.
    fn force_sync(&mut self, synced: bool);

    /// Cause of the latest [`InnerEvent::DecodeError`], when known.
    fn last_error(&self) -> Option<ItmError> {
        None
    }
}

impl From<TpiuEvent> for OuterEvent {
    fn from(event: TpiuEvent) -> Self {
        match event {
            TpiuEvent::None => OuterEvent::None,
            TpiuEvent::NewSync => OuterEvent::SyncAcquired,
            TpiuEvent::Synced => OuterEvent::ReSynced,
            TpiuEvent::Rxing => OuterEvent::FrameInProgress,
            TpiuEvent::Unsynced => OuterEvent::SyncLost,
            TpiuEvent::RxedFrame => OuterEvent::FrameComplete,
            TpiuEvent::Error => OuterEvent::ProtocolError,
        }
    }
}

impl From<ItmEvent> for InnerEvent {
    fn from(event: ItmEvent) -> Self {
        match event {
            ItmEvent::None => InnerEvent::None,
            ItmEvent::Unsynced => InnerEvent::Unsynced,
            ItmEvent::Synced => InnerEvent::Synced,
            ItmEvent::Overflow => InnerEvent::Overflow,
            ItmEvent::Error => InnerEvent::DecodeError,
            ItmEvent::PacketRxed => InnerEvent::PacketReady,
        }
    }
}

impl OuterDecoder for TpiuDecoder {
    fn feed(&mut self, byte: u8) -> OuterEvent {
        TpiuDecoder::feed(self, byte).into()
    }

    fn take_frame(&mut self) -> Result<Frame, FrameError> {
        TpiuDecoder::take_frame(self)
    }
}

impl InnerDecoder for ItmDecoder {
    fn feed(&mut self, byte: u8) -> InnerEvent {
        ItmDecoder::feed(self, byte).into()
    }

    fn take_message(&mut self) -> Option<Message> {
        ItmDecoder::take_message(self)
    }

    fn force_sync(&mut self, synced: bool) {
        ItmDecoder::force_sync(self, synced)
    }

    fn last_error(&self) -> Option<ItmError> {
        ItmDecoder::last_error(self)
    }
}

impl<D: OuterDecoder + ?Sized> OuterDecoder for Box<D> {
    fn feed(&mut self, byte: u8) -> OuterEvent {
        (**self).feed(byte)
    }

    fn take_frame(&mut self) -> Result<Frame, FrameError> {
        (**self).take_frame()
    }
}

impl<D: InnerDecoder + ?Sized> InnerDecoder for Box<D> {
    fn feed(&mut self, byte: u8) -> InnerEvent {
        (**self).feed(byte)
    }

    fn take_message(&mut self) -> Option<Message> {
        (**self).take_message()
    }

    fn force_sync(&mut self, synced: bool) {
        (**self).force_sync(synced)
    }

    fn last_error(&self) -> Option<ItmError> {
        (**self).last_error()
    }
}
