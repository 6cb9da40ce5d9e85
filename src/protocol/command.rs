//! Worker command codes
//!
//! Each worker-protocol message carries a single-byte command frame right
//! after the `MDPW01` header.

use bytes::Bytes;

use crate::error::ProtocolError;

/// Worker protocol command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Worker announces itself for a service
    Ready = 0x01,
    /// Broker hands a client request to a worker
    Request = 0x02,
    /// Worker returns the result of a request
    Reply = 0x03,
    /// Liveness probe, sent both ways
    Heartbeat = 0x04,
    /// Either side drops the session
    Disconnect = 0x05,
}

impl Command {
    /// Wire code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Encode as a command frame
    pub fn to_frame(self) -> Bytes {
        Bytes::copy_from_slice(&[self.code()])
    }

    /// Parse a command frame
    ///
    /// The frame must be exactly one byte.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        match frame {
            [code] => Command::try_from(*code),
            [] => Err(ProtocolError::MissingFrame("command")),
            [code, ..] => Err(ProtocolError::UnknownCommand(*code)),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Command::Ready),
            0x02 => Ok(Command::Request),
            0x03 => Ok(Command::Reply),
            0x04 => Ok(Command::Heartbeat),
            0x05 => Ok(Command::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Ready => "READY",
            Command::Request => "REQUEST",
            Command::Reply => "REPLY",
            Command::Heartbeat => "HEARTBEAT",
            Command::Disconnect => "DISCONNECT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::Ready.code(), 1);
        assert_eq!(Command::Request.code(), 2);
        assert_eq!(Command::Reply.code(), 3);
        assert_eq!(Command::Heartbeat.code(), 4);
        assert_eq!(Command::Disconnect.code(), 5);
    }

    #[test]
    fn test_from_frame() {
        assert_eq!(Command::from_frame(&[0x03]), Ok(Command::Reply));
        assert_eq!(
            Command::from_frame(&[0x09]),
            Err(ProtocolError::UnknownCommand(0x09))
        );
        assert_eq!(
            Command::from_frame(&[]),
            Err(ProtocolError::MissingFrame("command"))
        );
        // Multi-byte command frames are rejected
        assert!(Command::from_frame(&[0x01, 0x00]).is_err());
    }

    #[test]
    fn test_to_frame() {
        assert_eq!(&Command::Heartbeat.to_frame()[..], &[0x04]);
    }
}
