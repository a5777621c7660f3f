//! Pull-based queue of decoded raw frames.
//!
//! Single producer (the decoder-output pump), single consumer (the
//! caller). The queue is unbounded so the producer never blocks on a
//! slow consumer; if the consumer falls behind, memory grows — that is
//! the explicit latency/memory trade-off. [`FrameBuffer::take_latest`]
//! bounds *observed latency* by discarding backlog, not memory.
//!
//! Frames are undifferentiated byte buffers here; the caller reshapes
//! them as `height × width × 3` pixel data.

use tokio::sync::mpsc;

use crate::error::RelayError;

/// Create a connected producer/consumer pair.
pub fn frame_queue() -> (FrameProducer, FrameBuffer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FrameProducer { tx }, FrameBuffer { rx })
}

// ── FrameProducer ────────────────────────────────────────────────

/// Producer half — owned by the decoder-output pump.
#[derive(Debug, Clone)]
pub struct FrameProducer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl FrameProducer {
    /// Enqueue a decoded frame. Never blocks.
    pub fn push(&self, frame: Vec<u8>) -> Result<(), RelayError> {
        self.tx.send(frame)?;
        Ok(())
    }
}

// ── FrameBuffer ──────────────────────────────────────────────────

/// Consumer half — drained by the caller at its own rate.
#[derive(Debug)]
pub struct FrameBuffer {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl FrameBuffer {
    /// Take the oldest unconsumed frame, or `None` if the queue is
    /// empty. Non-blocking.
    pub fn take_next(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    /// Take the newest unconsumed frame, discarding everything older,
    /// or `None` if the queue is empty. Non-blocking.
    ///
    /// Returns the frame and the number of frames discarded to reach
    /// it, for instrumentation.
    pub fn take_latest(&mut self) -> Option<(Vec<u8>, u64)> {
        let mut latest = self.rx.try_recv().ok()?;
        let mut discarded: u64 = 0;

        while let Ok(frame) = self.rx.try_recv() {
            latest = frame;
            discarded += 1;
        }

        Some((latest, discarded))
    }
}

// ── Tests ────────────────────────────────────────────────────────
