//! Domain-specific error types for the frame relay pipeline.
//!
//! All fallible operations return `Result<T, RelayError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the relay pipeline.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Handshake / protocol errors ──────────────────────────────
    /// The capture source's handshake was malformed or truncated.
    ///
    /// Fatal — the session is unusable and there is no retry: the
    /// channel is a fresh, just-accepted connection, so a short read
    /// here is a protocol violation rather than a transient condition.
    #[error("handshake failed: {0}")]
    HandshakeFailed(&'static str),

    /// The capture socket returned fewer bytes than a frame requires,
    /// or closed mid-stream.
    #[error("connection lost: {0}")]
    ConnectionLost(&'static str),

    /// A frame declared a payload length beyond the configured maximum.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Decoder process errors ───────────────────────────────────
    /// The decoder executable could not be found or launched.
    ///
    /// Distinct from runtime failures so operators can tell a
    /// misconfigured environment apart from a misbehaving device.
    #[error("failed to launch decoder `{command}`: {source}")]
    ResourceLaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoder process exited, closed a pipe, or rejected a write.
    #[error("decoder unavailable: {0}")]
    DecoderUnavailable(String),

    /// The readiness marker never appeared in the decoder's diagnostics
    /// within the polling budget. Carries everything the decoder said
    /// so the operator can see why.
    #[error("decoder not ready after {attempts} polls; diagnostics:\n{diagnostics}")]
    DecoderStartupTimeout { attempts: u32, diagnostics: String },

    // ── Lifecycle errors ─────────────────────────────────────────
    /// An operation was invoked in a pipeline state that does not
    /// permit it (e.g. a second `connect` on a live session).
    #[error("invalid pipeline state: {0}")]
    InvalidState(&'static str),

    /// The frame queue's consumer side was dropped.
    #[error("frame channel closed")]
    ChannelClosed,

    // ── I/O ──────────────────────────────────────────────────────
    /// The TCP/pipe layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RelayError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RelayError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RelayError::HandshakeFailed("no liveness byte");
        assert!(e.to_string().contains("liveness"));

        let e = RelayError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn startup_timeout_carries_diagnostics() {
        let e = RelayError::DecoderStartupTimeout {
            attempts: 3,
            diagnostics: "Stream mapping:\nnothing useful".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 polls"));
        assert!(msg.contains("Stream mapping"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: RelayError = io_err.into();
        assert!(matches!(e, RelayError::Io(_)));
    }

    #[test]
    fn from_send_error() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
        drop(rx);
        let e: RelayError = tx.send(vec![1u8]).unwrap_err().into();
        assert!(matches!(e, RelayError::ChannelClosed));
    }
}
