use std::fmt;
use std::io;

use swotrace_pipeline::{ConfigError, PipelineError};
use swotrace_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
/// The trace server closed the connection or a socket read failed.
pub const CONNECTION_LOST: i32 = 2;
pub const CONNECT_FAILED: i32 = 3;
pub const OPEN_FAILED: i32 = 4;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

/// Failures while opening a source; reading failures are mapped by the caller.
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::Open { .. } => OPEN_FAILED,
        TransportError::Resolve { .. } | TransportError::Connect { .. } => CONNECT_FAILED,
        TransportError::InvalidAddress(_) => USAGE,
        TransportError::Io(_) => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn config_error(err: ConfigError) -> CliError {
    CliError::new(USAGE, format!("invalid configuration: {err}"))
}

pub fn pipeline_error(context: &str, err: PipelineError) -> CliError {
    match err {
        PipelineError::Config(err) => config_error(err),
        PipelineError::Output(source) => io_error(context, source),
    }
}
