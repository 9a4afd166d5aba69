/// Configuration rejected before any trace byte is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// TPIU framing needs a channel to forward.
    #[error("TPIU decoding requires a non-zero ITM channel")]
    MissingItmChannel,

    /// The channel id can never appear in a TPIU frame.
    #[error("ITM channel {0} is out of range (1-126)")]
    InvalidItmChannel(u8),
}

/// Errors that stop the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing decoded output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
