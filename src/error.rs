//! Error types
//!
//! Transport failures, protocol violations and misuse of an unconnected
//! socket all surface through [`Error`].

use std::fmt;
use std::io;

use bytes::Bytes;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Underlying socket I/O failed
    Io(io::Error),
    /// Peer sent something that does not follow the protocol
    Protocol(ProtocolError),
    /// Send or receive attempted before `connect`/`bind`
    NotConnected,
    /// Peer closed the connection
    ConnectionClosed,
}

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Pop or body access on an envelope with no frames
    EmptyEnvelope,
    /// A required frame was absent
    MissingFrame(&'static str),
    /// Header tag was neither the client nor the worker tag
    InvalidHeader(Bytes),
    /// Command frame did not hold a known command code
    UnknownCommand(u8),
    /// Frame length exceeds the configured limit
    FrameTooLarge { size: usize, max: usize },
    /// Address display form could not be decoded
    InvalidAddress(String),
    /// Worker tried to reply without having received a request
    NoPendingRequest,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::NotConnected => write!(f, "Socket not connected"),
            Error::ConnectionClosed => write!(f, "Connection closed by peer"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::EmptyEnvelope => write!(f, "Envelope has no frames"),
            ProtocolError::MissingFrame(name) => write!(f, "Missing {} frame", name),
            ProtocolError::InvalidHeader(header) => {
                write!(f, "Invalid header: {}", String::from_utf8_lossy(header))
            }
            ProtocolError::UnknownCommand(code) => write!(f, "Unknown command: 0x{:02x}", code),
            ProtocolError::FrameTooLarge { size, max } => {
                write!(f, "Frame of {} bytes exceeds limit of {}", size, max)
            }
            ProtocolError::InvalidAddress(addr) => write!(f, "Invalid address: {}", addr),
            ProtocolError::NoPendingRequest => write!(f, "No pending request to reply to"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}
