use std::path::PathBuf;

/// Errors that can occur while opening or reading a trace source.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the input file.
    #[error("can't open file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The server name did not resolve to any address.
    #[error("cannot find host {host}")]
    Resolve { host: String },

    /// Failed to connect to the trace server.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The server specification could not be parsed.
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    /// An I/O error occurred on a live source.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
