//! Outer TPIU demultiplexing.

use std::io::Write;

use swotrace_frame::{channel_name, IDLE};
use tracing::{debug, info, trace, warn};

use crate::decoder::{InnerDecoder, OuterDecoder, OuterEvent};
use crate::error::Result;
use crate::pipeline::Pipeline;

impl<W: Write, O: OuterDecoder, I: InnerDecoder> Pipeline<W, O, I> {
    /// Feed one byte to the outer decoder and act on what it reports.
    pub(crate) fn demux(&mut self, byte: u8) -> Result<()> {
        match self.outer.feed(byte) {
            OuterEvent::None | OuterEvent::FrameInProgress => {}
            OuterEvent::SyncAcquired => {
                debug!("TPIU in sync");
                self.inner.force_sync(true);
            }
            OuterEvent::ReSynced => {
                trace!("TPIU sync");
                self.inner.force_sync(true);
            }
            OuterEvent::SyncLost => {
                info!("TPIU lost sync");
                self.stats.sync_losses += 1;
                self.inner.force_sync(false);
            }
            OuterEvent::FrameComplete => return self.forward_frame(),
            OuterEvent::ProtocolError => {
                warn!("TPIU protocol error");
                self.stats.protocol_errors += 1;
            }
        }
        Ok(())
    }

    fn forward_frame(&mut self) -> Result<()> {
        let frame = match self.outer.take_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "dropping TPIU frame");
                self.stats.dropped_frames += 1;
                return Ok(());
            }
        };
        self.stats.frames += 1;

        for packet in &frame {
            if packet.channel == self.config.itm_channel {
                self.pump(packet.data)?;
            } else if packet.channel != IDLE {
                warn!(
                    channel = packet.channel,
                    source = channel_name(packet.channel),
                    data = packet.data,
                    "unknown TPIU channel"
                );
                self.stats.unknown_channel_bytes += 1;
            }
        }
        Ok(())
    }
}
