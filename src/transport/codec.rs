//! Multi-frame wire codec
//!
//! Each frame travels as:
//!
//! ```text
//! +-------+----------------+-----------------+
//! | flags | length (u32 BE)| payload         |
//! +-------+----------------+-----------------+
//!   1 byte     4 bytes        length bytes
//! ```
//!
//! Bit 0 of `flags` (MORE) is set on every frame except the last one of a
//! message. Frames of a message are buffered until the final frame arrives.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::DEFAULT_MAX_FRAME_SIZE;

/// Another frame of the same message follows
pub const FLAG_MORE: u8 = 0x01;

/// Bytes before each frame payload
pub const FRAME_HEADER_SIZE: usize = 5;

/// Incremental decoder for multi-frame messages
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_size: usize,
    /// Frames of the message currently being assembled
    pending: Vec<Bytes>,
    /// Payload bytes of a rejected frame not yet skipped
    skip_bytes: usize,
    /// Drop the remaining frames of a message with a rejected frame
    discarding: bool,
}

impl FrameCodec {
    /// Create a codec with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a codec with a custom frame size limit
    ///
    /// The limit never exceeds what the 32-bit length field can carry.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(u32::MAX as usize),
            pending: Vec::new(),
            skip_bytes: 0,
            discarding: false,
        }
    }

    /// Largest frame this codec reads or writes
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Try to decode one complete message from `buf`
    ///
    /// Consumes whole frames only. Returns `Ok(None)` when more data is
    /// needed; partially assembled messages are kept across calls.
    ///
    /// An oversized frame is reported once as `FrameTooLarge`; its payload
    /// and the rest of its message are then skipped, so the stream stays
    /// usable for the messages that follow.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
        loop {
            if self.skip_bytes > 0 {
                let n = self.skip_bytes.min(buf.len());
                buf.advance(n);
                self.skip_bytes -= n;
                if self.skip_bytes > 0 {
                    return Ok(None);
                }
                continue;
            }

            if buf.len() < FRAME_HEADER_SIZE {
                return Ok(None);
            }

            let more = buf[0] & FLAG_MORE != 0;
            let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
            if len > self.max_frame_size {
                buf.advance(FRAME_HEADER_SIZE);
                self.skip_bytes = len;
                self.pending.clear();
                self.discarding = more;
                return Err(ProtocolError::FrameTooLarge {
                    size: len,
                    max: self.max_frame_size,
                }
                .into());
            }

            if buf.len() < FRAME_HEADER_SIZE + len {
                buf.reserve(FRAME_HEADER_SIZE + len - buf.len());
                return Ok(None);
            }

            buf.advance(FRAME_HEADER_SIZE);
            let frame = buf.split_to(len).freeze();

            if self.discarding {
                self.discarding = more;
                continue;
            }

            self.pending.push(frame);
            if !more {
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
        }
    }

    /// Append an encoded message to `dst`
    ///
    /// Fails without writing anything if a frame exceeds the limit.
    pub fn encode(&self, frames: &[Bytes], dst: &mut BytesMut) -> Result<()> {
        check_frame_sizes(frames, self.max_frame_size)?;

        let total: usize = frames.iter().map(|f| FRAME_HEADER_SIZE + f.len()).sum();
        dst.reserve(total);

        let last = frames.len().saturating_sub(1);
        for (i, frame) in frames.iter().enumerate() {
            dst.put_u8(if i < last { FLAG_MORE } else { 0 });
            dst.put_u32(frame.len() as u32);
            dst.put_slice(frame);
        }
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject a message holding a frame larger than `max_frame_size`
pub fn check_frame_sizes(frames: &[Bytes], max_frame_size: usize) -> Result<()> {
    let max = max_frame_size.min(u32::MAX as usize);
    match frames.iter().find(|f| f.len() > max) {
        Some(frame) => Err(ProtocolError::FrameTooLarge {
            size: frame.len(),
            max,
        }
        .into()),
        None => Ok(()),
    }
}

/// Read until one complete message is decoded
///
/// Cancel-safe: bytes already read stay in `buf`, assembled frames stay in
/// the codec. A `FrameTooLarge` error leaves the stream readable.
pub async fn read_message<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    codec: &mut FrameCodec,
) -> Result<Vec<Bytes>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        if let Some(frames) = codec.decode(buf)? {
            return Ok(frames);
        }

        let n = reader.read_buf(buf).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
    }
}

/// Encode and write one message
pub async fn write_message<W>(writer: &mut W, codec: &FrameCodec, frames: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    // An empty message still carries one empty frame
    let mut buf = BytesMut::new();
    if frames.is_empty() {
        codec.encode(&[Bytes::new()], &mut buf)?;
    } else {
        codec.encode(frames, &mut buf)?;
    }

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
