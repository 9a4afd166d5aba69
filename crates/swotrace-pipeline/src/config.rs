use swotrace_frame::{IDLE, ITM, RESERVED};

use crate::error::ConfigError;
use crate::event::HwEventMask;

/// Pipeline settings, fixed once decoding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Expect TPIU framing around the ITM stream.
    pub use_tpiu: bool,
    /// TPIU channel carrying ITM data. Default: 1.
    pub itm_channel: u8,
    /// Require an explicit ITM sync packet before decoding anything.
    pub force_sync: bool,
    /// Hardware event kinds that produce output. Default: all.
    pub output_mask: HwEventMask,
    /// Emit only the raw bytes of the logging stimulus channel.
    pub log_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_tpiu: false,
            itm_channel: ITM,
            force_sync: false,
            output_mask: HwEventMask::all(),
            log_only: false,
        }
    }
}

impl PipelineConfig {
    /// Reject combinations that cannot decode anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.use_tpiu {
            return Ok(());
        }
        match self.itm_channel {
            IDLE => Err(ConfigError::MissingItmChannel),
            channel if channel >= RESERVED => Err(ConfigError::InvalidItmChannel(channel)),
            _ => Ok(()),
        }
    }

    /// The mask formatters actually apply; log-only mode silences hardware
    /// events entirely.
    pub fn effective_mask(&self) -> HwEventMask {
        if self.log_only {
            HwEventMask::empty()
        } else {
            self.output_mask
        }
    }
}
