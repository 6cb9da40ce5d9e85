//! Peer addresses
//!
//! An address is the opaque identity frame a router attaches to every
//! inbound message. It is compared as raw bytes; only logging renders it.
//! Transport-generated identities (17 bytes, first byte zero) are shown as
//! `@` followed by lowercase hex, everything else as lossy UTF-8.

use std::fmt;

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::protocol::constants::IDENTITY_LEN;

/// Routing address of a peer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Bytes);

impl Address {
    /// Wrap raw identity bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw identity bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Clone out the identity frame
    pub fn to_frame(&self) -> Bytes {
        self.0.clone()
    }

    /// Whether this is a transport-native identity
    pub fn is_native(&self) -> bool {
        is_native_identity(&self.0)
    }

    /// Whether the address lives in the reserved `mmi.` namespace
    pub fn is_internal(&self) -> bool {
        crate::protocol::constants::is_internal(&self.0)
    }
}

impl From<Bytes> for Address {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static str> for Address {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Address> for Bytes {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str(&encode(&self.0))
        } else {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        }
    }
}

/// 17 bytes with a leading zero byte
pub fn is_native_identity(frame: &[u8]) -> bool {
    frame.len() == IDENTITY_LEN && frame[0] == 0
}

/// Render raw bytes as `@<lowercase hex>`
pub fn encode(data: &[u8]) -> String {
    format!("@{}", hex::encode(data))
}

/// Reverse of [`encode`]
pub fn decode(text: &str) -> Result<Bytes, ProtocolError> {
    let invalid = || ProtocolError::InvalidAddress(text.to_string());

    let digits = text.strip_prefix('@').ok_or_else(invalid)?;
    let bytes = hex::decode(digits).map_err(|_| invalid())?;
    Ok(Bytes::from(bytes))
}
