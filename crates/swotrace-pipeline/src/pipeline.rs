use std::io::Write;

use swotrace_frame::TpiuDecoder;
use swotrace_itm::ItmDecoder;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::decoder::{InnerDecoder, OuterDecoder};
use crate::error::{ConfigError, Result};
use crate::format::{TimestampState, TraceFormatter};

/// Counters kept while bytes move through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Raw bytes fed in.
    pub bytes: u64,
    /// Frames taken from the outer decoder.
    pub frames: u64,
    /// Frames the outer decoder announced but could not deliver.
    pub dropped_frames: u64,
    /// Bytes on TPIU channels other than the ITM and idle channels.
    pub unknown_channel_bytes: u64,
    pub protocol_errors: u64,
    pub sync_losses: u64,
    /// Bytes handed to the inner decoder.
    pub itm_bytes: u64,
    pub messages: u64,
    /// Messages with no text form.
    pub dropped_messages: u64,
    pub overflows: u64,
    pub decode_errors: u64,
}

/// Owns every piece of decoding state for one trace stream.
///
/// Bytes go in through [`Pipeline::process`]; text comes out on `W`.
pub struct Pipeline<W, O = TpiuDecoder, I = ItmDecoder> {
    pub(crate) config: PipelineConfig,
    pub(crate) outer: O,
    pub(crate) inner: I,
    pub(crate) formatter: TraceFormatter<W>,
    pub(crate) stats: PipelineStats,
}

impl<W: Write> Pipeline<W> {
    /// Build a pipeline with the TPIU and ITM decoders.
    pub fn new(config: PipelineConfig, out: W) -> std::result::Result<Self, ConfigError> {
        let inner = ItmDecoder::new(!config.force_sync);
        Self::with_decoders(config, TpiuDecoder::new(), inner, out)
    }
}

impl<W: Write, O: OuterDecoder, I: InnerDecoder> Pipeline<W, O, I> {
    /// Build a pipeline around caller-supplied decoders.
    pub fn with_decoders(
        config: PipelineConfig,
        outer: O,
        inner: I,
        out: W,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            use_tpiu = config.use_tpiu,
            itm_channel = config.itm_channel,
            force_sync = config.force_sync,
            log_only = config.log_only,
            mask = config.effective_mask().bits(),
            "pipeline configured"
        );
        Ok(Self {
            formatter: TraceFormatter::new(out, config.effective_mask(), config.log_only),
            config,
            outer,
            inner,
            stats: PipelineStats::default(),
        })
    }

    /// Push a chunk of raw trace bytes through, then flush the output.
    pub fn process(&mut self, chunk: &[u8]) -> Result<()> {
        for byte in chunk {
            self.pump_byte(*byte)?;
        }
        self.flush()
    }

    /// Push a single raw byte through without flushing.
    pub fn pump_byte(&mut self, byte: u8) -> Result<()> {
        self.stats.bytes += 1;
        if self.config.use_tpiu {
            self.demux(byte)
        } else {
            self.pump(byte)
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.formatter.flush()?;
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn timestamp(&self) -> TimestampState {
        self.formatter.timestamp_state()
    }

    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn output(&self) -> &W {
        self.formatter.get_ref()
    }

    pub fn into_output(self) -> W {
        self.formatter.into_inner()
    }
}
