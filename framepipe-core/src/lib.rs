//! # framepipe-core
//!
//! Low-latency relay from a live H.264 capture socket to a pull-based
//! raw-frame queue, for real-time control/vision consumers that poll at
//! their own (possibly lower) rate.
//!
//! ## Architecture
//!
//! ```text
//! CAPTURE SOURCE              THIS CRATE                        CALLER
//! ┌──────────────┐   ┌──────────────────────────────────┐   ┌───────────┐
//! │ handshake +  │   │ read_handshake                   │   │           │
//! │ framed H.264 ├──►│ input pump  ──► decoder stdin    │   │ take_next │
//! │ over TCP     │   │ output pump ◄── decoder stdout   │   │ take_     │
//! └──────────────┘   │    └──► FrameBuffer ─────────────┼──►│ latest    │
//!                    │ scanner ◄── decoder stderr       │   │           │
//!                    │    └──► readiness gate (marker)  │   └───────────┘
//!                    └──────────────────────────────────┘
//! ```
//!
//! This crate contains:
//! - **Wire protocol**: [`FrameHeader`], [`StreamCodec`], [`read_handshake`]
//! - **Pumps**: socket→decoder, decoder→buffer, diagnostics scanner
//! - **Buffering**: [`FrameBuffer`] with FIFO and most-recent-wins takes
//! - **Readiness**: [`await_ready`] marker polling over the [`DiagnosticLog`]
//! - **Lifecycle**: [`RelayPipeline`] controller over [`PipelineState`]
//! - **Error**: [`RelayError`] — typed, `thiserror`-based hierarchy
//!
//! Video decoding itself is an external collaborator: a child process
//! consuming an elementary stream on stdin and emitting fixed-size raw
//! RGB24 frames on stdout.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod handshake;
pub mod header;
pub mod pipeline;
pub mod pump;
pub mod readiness;
pub mod state;
pub mod stats;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use buffer::{frame_queue, FrameBuffer, FrameProducer};
pub use codec::{StreamCodec, WireFrame, MAX_PAYLOAD_SIZE};
pub use config::{DecoderConfig, FramingMode, RelayConfig};
pub use decoder::{DecoderIo, DecoderProcess};
pub use diagnostics::DiagnosticLog;
pub use error::RelayError;
pub use handshake::{read_handshake, ConnectionParams, DEVICE_ID_SIZE};
pub use header::{FrameHeader, HEADER_SIZE};
pub use pipeline::RelayPipeline;
pub use readiness::await_ready;
pub use state::PipelineState;
pub use stats::{PipelineStats, TransferCounters};
