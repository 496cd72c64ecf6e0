//! Length-prefixed transport codec for event frames.
//!
//! Each [`Frame`] is serialized to JSON and prefixed with its 4-byte
//! big-endian length so frames can be delimited on a stream socket.
//!
//! Frame format:
//! ```text
//! +----------------+------------------+
//! |  4 bytes       |  N bytes         |
//! |  (length BE)   |  (JSON frame)    |
//! +----------------+------------------+
//! ```

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::Frame;

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size in bytes
const LENGTH_PREFIX_SIZE: usize = 4;

/// Codec for length-prefixed JSON event frames
///
/// Stateless: a frame is only consumed once its prefix and body are both
/// buffered, so a partial frame stays in the buffer untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventCodec;

impl EventCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for EventCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let body_len = u32::from_be_bytes(prefix) as usize;
        if body_len > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(body_len));
        }

        let frame_len = LENGTH_PREFIX_SIZE + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let body = src.split_to(body_len);
        let text = std::str::from_utf8(&body)?;
        Ok(Some(serde_json::from_str(text)?))
    }
}

impl Encoder<Frame> for EventCodec {
    type Error = CodecError;

    // Frame size is checked against MAX_FRAME_SIZE (fits in u32)
    #[allow(clippy::cast_possible_truncation)]
    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&frame)?;
        if body.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(body.len()));
        }

        dst.reserve(LENGTH_PREFIX_SIZE + body.len());
        dst.put_u32(body.len() as u32);
        dst.extend_from_slice(&body);
        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),
}
