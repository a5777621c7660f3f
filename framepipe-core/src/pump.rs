//! Stream pumps — the concurrent byte-moving loops of the pipeline.
//!
//! Three independently-paced flows run for the pipeline's active
//! lifetime:
//!
//! ```text
//! capture socket ──► pump_framed_input / pump_unframed_input ──► decoder stdin
//! decoder stdout ──► pump_decoder_output ──► FrameBuffer
//! decoder stderr ──► scan_diagnostics ──► DiagnosticLog
//! ```
//!
//! Each pump blocks only on its own channel's I/O, never on another
//! pump. All of them observe one shared [`CancellationToken`] at every
//! blocking point, so clearing it stops the pipeline promptly even
//! while a read is in flight. The pumps are generic over
//! `AsyncRead`/`AsyncWrite` so tests drive them with in-memory duplex
//! streams.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::buffer::FrameProducer;
use crate::codec::StreamCodec;
use crate::diagnostics::DiagnosticLog;
use crate::error::RelayError;
use crate::stats::TransferCounters;

// ── Socket → decoder (framed) ────────────────────────────────────

/// Relay framed payloads from the capture socket into the decoder's
/// input channel.
///
/// Zero-length frames are keep-alives and are not forwarded. A short
/// read or socket closure while active is [`RelayError::ConnectionLost`];
/// a failed write into the decoder is [`RelayError::DecoderUnavailable`].
/// Either is fatal to this pump only — shared state stays intact and the
/// other pumps detect shutdown through the cancellation signal.
pub async fn pump_framed_input<R, W>(
    source: R,
    mut decoder_in: W,
    counters: Arc<TransferCounters>,
    cancel: CancellationToken,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(source, StreamCodec::default());

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                if frame.is_keepalive() {
                    tracing::trace!(pts = frame.pts, "keep-alive frame");
                    continue;
                }
                tracing::trace!(pts = frame.pts, len = frame.payload.len(), "forwarding frame");
                if let Err(e) = decoder_in.write_all(&frame.payload).await {
                    if cancel.is_cancelled() {
                        return Ok(());
                    }
                    return Err(RelayError::DecoderUnavailable(format!(
                        "input channel write failed: {e}"
                    )));
                }
                counters.add_sent(frame.payload.len() as u64);
            }
            Some(Err(e)) => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(e);
            }
            None => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(RelayError::ConnectionLost("capture socket closed"));
            }
        }
    }
}

// ── Socket → decoder (unframed, legacy) ──────────────────────────

/// Relay raw elementary-stream bytes with no framing (legacy sources).
///
/// Forwards whatever each read returns, up to `chunk_size` bytes at a
/// time. A read of zero bytes means the peer closed the socket — the
/// only terminal condition in this mode.
pub async fn pump_unframed_input<R, W>(
    mut source: R,
    mut decoder_in: W,
    chunk_size: usize,
    counters: Arc<TransferCounters>,
    cancel: CancellationToken,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size];

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = source.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(RelayError::ConnectionLost("capture socket closed"));
            }
            Ok(n) => {
                if let Err(e) = decoder_in.write_all(&buf[..n]).await {
                    if cancel.is_cancelled() {
                        return Ok(());
                    }
                    return Err(RelayError::DecoderUnavailable(format!(
                        "input channel write failed: {e}"
                    )));
                }
                counters.add_sent(n as u64);
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(RelayError::Io(e));
            }
        }
    }
}

// ── Decoder → buffer ─────────────────────────────────────────────

/// Read fixed-size decoded frames from the decoder's output channel
/// and enqueue them.
///
/// The read size is fixed once per session from the connection
/// parameters (`width × height × 3`). If the decoder's actual output
/// framing ever disagrees with it, frames silently misalign — a known
/// limitation of the fixed-size protocol; there is no resynchronization.
/// End-of-stream while active means the decoder went away and is
/// reported as [`RelayError::DecoderUnavailable`], never a panic.
pub async fn pump_decoder_output<R>(
    mut decoder_out: R,
    frame_size: usize,
    producer: FrameProducer,
    counters: Arc<TransferCounters>,
    cancel: CancellationToken,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut frame = vec![0u8; frame_size];

        let read = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = decoder_out.read_exact(&mut frame) => read,
        };

        match read {
            Ok(_) => {
                counters.add_received(frame_size as u64);
                counters.inc_frames();
                producer.push(frame)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(RelayError::DecoderUnavailable(
                    "output channel closed".into(),
                ));
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                return Err(RelayError::Io(e));
            }
        }
    }
}

// ── Decoder diagnostics → log ────────────────────────────────────

/// Accumulate the decoder's line-oriented diagnostic output.
///
/// Verbatim accumulation only — no parsing. A closed channel stops the
/// scanner silently; diagnostics simply stop accumulating.
pub async fn scan_diagnostics<R>(source: R, log: Arc<DiagnosticLog>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(source).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                if !line.is_empty() {
                    tracing::debug!(target: "framepipe::decoder", "{line}");
                    log.append(line);
                }
            }
            Ok(None) | Err(_) => return,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
