//! One-shot connection handshake with the capture source.
//!
//! A freshly accepted capture connection opens with:
//!
//! ```text
//! 1  byte   liveness byte (value ignored; absence ⇒ rejected)
//! 64 bytes  device identifier, UTF-8, NUL/space padded
//! 2  bytes  frame width  (u16 BE)
//! 2  bytes  frame height (u16 BE)
//! ```
//!
//! A short read at any step is a fatal protocol violation — the channel
//! is brand new, so there is nothing transient to retry.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RelayError;

/// Wire width of the padded device identifier field.
pub const DEVICE_ID_SIZE: usize = 64;

// ── ConnectionParams ─────────────────────────────────────────────

/// Session parameters negotiated at handshake time.
///
/// Immutable once read; owned by the pipeline controller and shared
/// read-only with the pumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Device identifier reported by the capture source.
    pub device_name: String,
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
}

impl ConnectionParams {
    /// Size in bytes of one decoded RGB24 frame (`width × height × 3`).
    ///
    /// This fixes the decoder-output read size for the whole session.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

// ── Handshake ────────────────────────────────────────────────────

/// Perform the one-time handshake on a just-connected capture channel.
///
/// Reads the liveness byte, device identifier and resolution in order,
/// failing with [`RelayError::HandshakeFailed`] on any truncation or
/// malformed field. Must be called exactly once per session — the
/// pipeline state machine rejects a second attempt.
pub async fn read_handshake<R>(reader: &mut R) -> Result<ConnectionParams, RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut liveness = [0u8; 1];
    read_field(reader, &mut liveness, "no liveness byte").await?;

    let mut id_bytes = [0u8; DEVICE_ID_SIZE];
    read_field(reader, &mut id_bytes, "truncated device identifier").await?;

    let device_name = std::str::from_utf8(&id_bytes)
        .map_err(|_| RelayError::HandshakeFailed("device identifier is not valid utf-8"))?
        .trim_end_matches(['\0', ' '])
        .to_string();
    if device_name.is_empty() {
        return Err(RelayError::HandshakeFailed("no device identifier"));
    }

    let mut res = [0u8; 4];
    read_field(reader, &mut res, "truncated resolution").await?;

    let width = u16::from_be_bytes([res[0], res[1]]);
    let height = u16::from_be_bytes([res[2], res[3]]);

    Ok(ConnectionParams {
        device_name,
        width,
        height,
    })
}

/// Read an exact field, mapping EOF to a handshake failure.
async fn read_field<R>(
    reader: &mut R,
    buf: &mut [u8],
    on_eof: &'static str,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            RelayError::HandshakeFailed(on_eof)
        } else {
            RelayError::Io(e)
        }
    })?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
