//! Transfer counters and caller-facing stats snapshots.
//!
//! Counters are written only by their owning pump and read for
//! diagnostics; reads are advisory (Relaxed) and never drive control
//! decisions. All counters are monotonically increasing for the
//! session.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::state::PipelineState;

// ── TransferCounters ─────────────────────────────────────────────

/// Cumulative byte/frame counters shared between pumps and the caller.
#[derive(Debug, Default)]
pub struct TransferCounters {
    /// Bytes forwarded from the capture socket into the decoder.
    bytes_sent: AtomicU64,
    /// Decoded bytes read back out of the decoder.
    bytes_received: AtomicU64,
    /// Complete decoded frames enqueued.
    frames_received: AtomicU64,
}

impl TransferCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }
}

// ── PipelineStats ────────────────────────────────────────────────

/// Point-in-time view of the pipeline for callers and status output.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Lifecycle state at snapshot time.
    pub state: PipelineState,
    /// Negotiated frame width, if the handshake has completed.
    pub width: Option<u16>,
    /// Negotiated frame height, if the handshake has completed.
    pub height: Option<u16>,
    /// Bytes forwarded socket → decoder.
    pub bytes_sent: u64,
    /// Decoded bytes decoder → buffer.
    pub bytes_received: u64,
    /// Complete decoded frames enqueued.
    pub frames_received: u64,
}

// ── Tests ────────────────────────────────────────────────────────
