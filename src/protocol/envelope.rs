//! Multi-frame message envelope
//!
//! An envelope is an ordered list of opaque frames. The front of the list
//! doubles as a stack of routing addresses:
//!
//! ```text
//!  wrap(addr, true)           unwrap() -> addr
//! ┌──────┬───┬──────┐        ┌──────┐
//! │ addr │ ""│ body │  ───►  │ body │
//! └──────┴───┴──────┘        └──────┘
//! ```
//!
//! A raw router identity needs no delimiter; an application-level reply
//! address is followed by an empty delimiter frame. `unwrap` handles both.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::protocol::address::{self, Address};

/// Ordered sequence of binary frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    frames: VecDeque<Bytes>,
}

impl Envelope {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an envelope holding a single body frame
    pub fn with_body(body: impl Into<Bytes>) -> Self {
        let mut envelope = Self::new();
        envelope.push_back(body);
        envelope
    }

    /// Create an envelope from frames in front-to-back order
    pub fn from_frames<I, F>(frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
        }
    }

    /// Prepend a frame
    pub fn push_front(&mut self, frame: impl Into<Bytes>) {
        self.frames.push_front(frame.into());
    }

    /// Append a frame
    pub fn push_back(&mut self, frame: impl Into<Bytes>) {
        self.frames.push_back(frame.into());
    }

    /// Remove and return the front frame
    pub fn pop_front(&mut self) -> Result<Bytes> {
        self.frames
            .pop_front()
            .ok_or_else(|| ProtocolError::EmptyEnvelope.into())
    }

    /// Front frame, if any
    pub fn front(&self) -> Option<&Bytes> {
        self.frames.front()
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the envelope holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Final frame
    pub fn last(&self) -> Result<&Bytes> {
        self.frames
            .back()
            .ok_or_else(|| ProtocolError::EmptyEnvelope.into())
    }

    /// Replace the final frame
    pub fn set_last(&mut self, frame: impl Into<Bytes>) -> Result<()> {
        let last = self
            .frames
            .back_mut()
            .ok_or(ProtocolError::EmptyEnvelope)?;
        *last = frame.into();
        Ok(())
    }

    /// Body frame (the final frame)
    pub fn body(&self) -> Result<&Bytes> {
        self.last()
    }

    /// Set the body, appending it when the envelope is empty
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        match self.frames.back_mut() {
            Some(last) => *last = body.into(),
            None => self.frames.push_back(body.into()),
        }
    }

    /// Push a routing address, optionally followed by an empty delimiter
    pub fn wrap(&mut self, address: impl Into<Bytes>, delimited: bool) {
        if delimited {
            self.frames.push_front(Bytes::new());
        }
        self.frames.push_front(address.into());
    }

    /// Pop a routing address and the delimiter behind it, if present
    pub fn unwrap(&mut self) -> Result<Address> {
        let address = self.pop_front()?;
        if self.frames.front().is_some_and(|f| f.is_empty()) {
            self.frames.pop_front();
        }
        Ok(Address::new(address))
    }

    /// Display form of the front frame
    ///
    /// Transport-native identities render as `@hex`, anything else as text.
    pub fn first_frame_as_address(&self) -> Option<String> {
        self.frames.front().map(|frame| {
            if address::is_native_identity(frame) {
                address::encode(frame)
            } else {
                String::from_utf8_lossy(frame).into_owned()
            }
        })
    }

    /// Iterate frames front to back
    pub fn frames(&self) -> impl Iterator<Item = &Bytes> {
        self.frames.iter()
    }

    /// Consume into frames front to back
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames.into()
    }
}

impl From<Vec<Bytes>> for Envelope {
    fn from(frames: Vec<Bytes>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::constants::IDENTITY_LEN;

    #[test]
    fn test_push_pop_order() {
        let mut env = Envelope::with_body("body");
        env.push_front("service");
        env.push_front("header");

        assert_eq!(env.frame_count(), 3);
        assert_eq!(env.pop_front().unwrap(), "header");
        assert_eq!(env.pop_front().unwrap(), "service");
        assert_eq!(env.pop_front().unwrap(), "body");
        assert!(env.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut env = Envelope::new();
        assert!(matches!(
            env.pop_front(),
            Err(Error::Protocol(ProtocolError::EmptyEnvelope))
        ));
        assert!(env.last().is_err());
        assert!(env.set_last("x").is_err());
    }

    #[test]
    fn test_last_accessors() {
        let mut env = Envelope::from_frames(["a", "b", "c"]);
        assert_eq!(env.last().unwrap(), "c");

        env.set_last("200").unwrap();
        assert_eq!(env.into_frames(), vec!["a", "b", "200"]);
    }

    #[test]
    fn test_set_body_on_empty() {
        let mut env = Envelope::new();
        env.set_body("hello");
        assert_eq!(env.body().unwrap(), "hello");
        assert_eq!(env.frame_count(), 1);
    }

    #[test]
    fn test_wrap_with_delimiter() {
        let mut env = Envelope::with_body("Hello World");
        env.wrap("client-1", true);

        let frames = env.clone().into_frames();
        assert_eq!(frames, vec!["client-1", "", "Hello World"]);

        let addr = env.unwrap().unwrap();
        assert_eq!(addr.as_bytes(), b"client-1");
        assert_eq!(env.into_frames(), vec!["Hello World"]);
    }

    #[test]
    fn test_wrap_without_delimiter() {
        let mut env = Envelope::with_body("payload");
        env.wrap("peer", false);
        assert_eq!(env.frame_count(), 2);

        let addr = env.unwrap().unwrap();
        assert_eq!(addr.as_bytes(), b"peer");
        // Nothing but the body is left, and the body is not mistaken for a delimiter
        assert_eq!(env.into_frames(), vec!["payload"]);
    }

    #[test]
    fn test_nested_wrap() {
        let mut env = Envelope::with_body("x");
        env.wrap("client", true);
        env.wrap("worker", true);

        assert_eq!(env.unwrap().unwrap().as_bytes(), b"worker");
        assert_eq!(env.unwrap().unwrap().as_bytes(), b"client");
        assert_eq!(env.into_frames(), vec!["x"]);
    }

    #[test]
    fn test_unwrap_empty() {
        let mut env = Envelope::new();
        assert!(env.unwrap().is_err());
    }

    #[test]
    fn test_first_frame_as_address() {
        let mut id = vec![0u8; IDENTITY_LEN];
        id[16] = 0xff;
        let env = Envelope::from_frames(vec![Bytes::from(id), Bytes::from_static(b"body")]);

        let display = env.first_frame_as_address().unwrap();
        assert_eq!(display, format!("@{}ff", "00".repeat(16)));

        let plain = Envelope::from_frames(["worker-7"]);
        assert_eq!(plain.first_frame_as_address().unwrap(), "worker-7");

        assert!(Envelope::new().first_frame_as_address().is_none());
    }
}
