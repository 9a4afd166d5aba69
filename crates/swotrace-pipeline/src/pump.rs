//! Inner ITM decoding and hand-off to the dispatcher.

use std::io::Write;

use tracing::{info, warn};

use crate::decoder::{InnerDecoder, InnerEvent, OuterDecoder};
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::pipeline::Pipeline;

impl<W: Write, O: OuterDecoder, I: InnerDecoder> Pipeline<W, O, I> {
    /// Feed one ITM byte to the inner decoder.
    pub(crate) fn pump(&mut self, byte: u8) -> Result<()> {
        self.stats.itm_bytes += 1;
        match self.inner.feed(byte) {
            InnerEvent::None => {}
            InnerEvent::Unsynced => info!("ITM lost sync"),
            InnerEvent::Synced => info!("ITM in sync"),
            InnerEvent::Overflow => {
                self.stats.overflows += 1;
                self.formatter.overflow()?;
            }
            InnerEvent::DecodeError => {
                self.stats.decode_errors += 1;
                match self.inner.last_error() {
                    Some(err) => warn!(error = %err, "ITM decode error"),
                    None => warn!("ITM decode error"),
                }
            }
            InnerEvent::PacketReady => {
                if let Some(message) = self.inner.take_message() {
                    self.stats.messages += 1;
                    if !dispatch(&mut self.formatter, &message)? {
                        self.stats.dropped_messages += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
