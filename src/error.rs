use thiserror::Error;

use crate::protocol::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A line could not be decoded or parsed. `line` is 1-based and counts
    /// every line received, including blank ones.
    #[error("line {line}: {source}")]
    Parse { line: usize, source: ParseError },

    /// The port reached end-of-stream before enough samples arrived.
    #[error("connection closed after {collected} of {expected} samples")]
    ConnectionClosed { collected: usize, expected: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
