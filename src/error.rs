use std::net::SocketAddr;

use thiserror::Error;

/// Reasons a datagram is not a usable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),

    /// Address missing, unterminated, or not starting with `/`.
    #[error("invalid address pattern {0:?}")]
    BadAddress(String),

    /// Type tag missing, unterminated, or not starting with `,`.
    #[error("invalid type tag string {0:?}")]
    BadTypeTag(String),

    /// Only raised when decoding with [`TagPolicy::Strict`](crate::TagPolicy::Strict).
    #[error("unsupported argument type tag '{0}'")]
    UnsupportedTag(char),
}

/// Encoding failure on the sending side.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("address must start with '/': {0:?}")]
    BadAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    /// Socket could not be bound; the monitor never enters `running`.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(std::io::Error),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
