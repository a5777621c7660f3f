//! Framed-mode wire codec for the capture stream.
//!
//! Splits the socket byte stream into [`WireFrame`]s using the 12-byte
//! [`FrameHeader`] ([`pts`][FrameHeader::pts] + payload length). Used
//! through `tokio_util::codec::FramedRead` by the socket→decoder pump.
//!
//! The `Encoder` direction is not part of the relay (receive-only wire)
//! but is implemented so tests and mock capture sources can produce
//! well-formed streams.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RelayError;
use crate::header::{FrameHeader, HEADER_SIZE};

/// Largest payload length a frame may declare (64 MiB).
///
/// A length beyond this is rejected before any allocation happens —
/// an elementary-stream access unit is orders of magnitude smaller.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

// ── WireFrame ────────────────────────────────────────────────────

/// One framed unit from the capture socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// Presentation timestamp from the frame header. Observed for
    /// diagnostics only — never scheduled against.
    pub pts: u64,
    /// Elementary-stream payload. Empty for keep-alive frames.
    pub payload: Bytes,
}

impl WireFrame {
    /// Whether this is a keep-alive frame carrying no payload.
    pub fn is_keepalive(&self) -> bool {
        self.payload.is_empty()
    }
}

// ── StreamCodec ──────────────────────────────────────────────────

/// Header-prefixed frame codec for the capture wire protocol.
#[derive(Debug, Default)]
pub struct StreamCodec {}

impl Decoder for StreamCodec {
    type Item = WireFrame;
    type Error = RelayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireFrame>, RelayError> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(&src[..HEADER_SIZE]);
        let header = FrameHeader::decode(header_bytes);

        let len = header.len as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(RelayError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < HEADER_SIZE + len {
            src.reserve(HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(len).freeze();

        Ok(Some(WireFrame {
            pts: header.pts,
            payload,
        }))
    }

    /// At EOF, leftover bytes mean the source died inside a frame.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<WireFrame>, RelayError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(RelayError::ConnectionLost("short read inside frame")),
        }
    }
}

impl Encoder<WireFrame> for StreamCodec {
    type Error = RelayError;

    fn encode(&mut self, item: WireFrame, dst: &mut BytesMut) -> Result<(), RelayError> {
        if item.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RelayError::PayloadTooLarge {
                size: item.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = FrameHeader {
            pts: item.pts,
            len: item.payload.len() as u32,
        };
        dst.extend_from_slice(&header.encode());
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
