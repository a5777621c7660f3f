//! Per-frame wire header.
//!
//! Every framed-mode payload is preceded by a fixed 12-byte header:
//!
//! ```text
//! pts:  u64  (8)   presentation timestamp, big-endian
//! len:  u32  (4)   payload length in bytes, big-endian
//! ```
//!
//! The relay is receive-only for this header; the encode direction
//! exists for tests and mock capture sources.

/// Per-frame metadata preceding each framed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Presentation timestamp. Monotonically non-decreasing on a sane
    /// source, but not assumed strictly increasing.
    pub pts: u64,
    /// Payload length in bytes. Zero marks a keep-alive frame.
    pub len: u32,
}

/// Encoded size on the wire.
pub const HEADER_SIZE: usize = 12;

impl FrameHeader {
    /// Serialize to bytes (big-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.pts.to_be_bytes());
        buf[8..12].copy_from_slice(&self.len.to_be_bytes());
        buf
    }

    /// Deserialize from exactly [`HEADER_SIZE`] bytes.
    ///
    /// Pure and infallible — supplying exactly 12 bytes is the caller's
    /// responsibility, enforced by the array type. A short read upstream
    /// is the caller's error, not this codec's.
    pub fn decode(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            pts: u64::from_be_bytes(bytes[0..8].try_into().expect("8-byte slice")),
            len: u32::from_be_bytes(bytes[8..12].try_into().expect("4-byte slice")),
        }
    }

    /// Whether this header marks a keep-alive frame (no payload follows).
    pub fn is_keepalive(&self) -> bool {
        self.len == 0
    }
}

// ── Tests ────────────────────────────────────────────────────────
