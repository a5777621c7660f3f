//! Pipeline configuration.
//!
//! Everything the controller needs is passed in explicitly at
//! construction — there are no process-wide mutable singletons. The
//! defaults reproduce the stock capture-source/ffmpeg deployment; every
//! field, including the readiness marker, is expected to be overridden
//! from the outer config file when the environment differs.

use serde::{Deserialize, Serialize};

// ── FramingMode ──────────────────────────────────────────────────

/// How payloads are delimited on the capture socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Every payload is preceded by a 12-byte header (pts + length).
    #[default]
    Framed,
    /// Legacy mode: the socket carries raw elementary-stream bytes with
    /// no framing; the pump relays whatever arrives.
    Unframed,
}

// ── DecoderConfig ────────────────────────────────────────────────

/// Launch and readiness parameters for the external decoder process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Decoder executable.
    pub command: String,
    /// Arguments. Must leave the decoder reading an elementary stream
    /// on stdin and writing raw RGB24 frames to stdout.
    pub args: Vec<String>,
    /// Substring whose appearance on the decoder's diagnostic channel
    /// is taken as proof it has detected the stream. A heuristic against
    /// third-party log output — configuration, not a constant.
    pub readiness_marker: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            command: "ffmpeg".into(),
            args: [
                "-y", "-r", "20", "-i", "pipe:0", "-vcodec", "rawvideo", "-pix_fmt", "rgb24",
                "-f", "image2pipe", "pipe:1",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            readiness_marker: "Output #0, image2pipe".into(),
        }
    }
}

// ── RelayConfig ──────────────────────────────────────────────────

/// Configuration for [`RelayPipeline`](crate::pipeline::RelayPipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capture source address (`ip:port`).
    pub source_address: String,
    /// Wire framing mode. Fixed for the session.
    pub framing: FramingMode,
    /// Read chunk size for unframed mode.
    pub recv_chunk_size: usize,
    /// Delay between starting each pump (diagnostics, then input, then
    /// output) so output is never awaited before input flows.
    pub startup_stagger_ms: u64,
    /// Decoder process settings.
    pub decoder: DecoderConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source_address: "127.0.0.1:8080".into(),
            framing: FramingMode::Framed,
            recv_chunk_size: 0x10000,
            startup_stagger_ms: 250,
            decoder: DecoderConfig::default(),
        }
    }
}

impl RelayConfig {
    /// The inter-pump startup stagger as a `Duration`.
    pub fn startup_stagger(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.startup_stagger_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────
