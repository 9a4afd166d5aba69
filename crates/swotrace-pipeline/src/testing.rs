//! Scripted decoders for exercising the pipeline without real protocols.

use std::collections::VecDeque;

use swotrace_frame::{Frame, FrameError};
use swotrace_itm::Message;

use crate::decoder::{InnerDecoder, InnerEvent, OuterDecoder, OuterEvent};

/// Returns queued events and frames; `None` once the script runs out.
#[derive(Debug, Default)]
pub(crate) struct ScriptedOuter {
    pub events: VecDeque<OuterEvent>,
    pub frames: VecDeque<Result<Frame, FrameError>>,
}

impl OuterDecoder for ScriptedOuter {
    fn feed(&mut self, _byte: u8) -> OuterEvent {
        self.events.pop_front().unwrap_or(OuterEvent::None)
    }

    fn take_frame(&mut self) -> Result<Frame, FrameError> {
        self.frames.pop_front().unwrap_or(Err(FrameError::NoFrame))
    }
}

/// What a [`RecordingInner`] saw, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Seen {
    Byte(u8),
    ForceSync(bool),
}

/// Records every byte and sync change; returns queued events.
#[derive(Debug, Default)]
pub(crate) struct RecordingInner {
    pub seen: Vec<Seen>,
    pub events: VecDeque<InnerEvent>,
    pub messages: VecDeque<Message>,
}

impl RecordingInner {
    pub fn bytes(&self) -> Vec<u8> {
        self.seen
            .iter()
            .filter_map(|s| match s {
                Seen::Byte(b) => Some(*b),
                Seen::ForceSync(_) => None,
            })
            .collect()
    }
}

impl InnerDecoder for RecordingInner {
    fn feed(&mut self, byte: u8) -> InnerEvent {
        self.seen.push(Seen::Byte(byte));
        self.events.pop_front().unwrap_or(InnerEvent::None)
    }

    fn take_message(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    fn force_sync(&mut self, synced: bool) {
        self.seen.push(Seen::ForceSync(synced));
    }
}
