//! Pipeline lifecycle state machine.
//!
//! Models the relay's full session lifecycle with validated transitions
//! that return `Result` instead of panicking:
//!
//! ```text
//!  Idle ──► Connected ──► Starting ──► Ready ──► Active
//!                             │          │          │
//!                             ▼          ▼          ▼
//!                           Failed ◄── (any) ── Stopping ──► Stopped
//! ```
//!
//! Pumps may only run in {Starting, Ready, Active}; frame takes are
//! only served from {Ready, Active}.

use crate::error::RelayError;

// ── PipelineState ────────────────────────────────────────────────

/// The current phase of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// No connection yet. Initial state.
    #[default]
    Idle,

    /// Handshake complete; connection parameters are known.
    Connected,

    /// Decoder launched, pumps spinning up, readiness not yet observed.
    Starting,

    /// Readiness marker observed; the decoder is producing output.
    Ready,

    /// Caller is polling the frame buffer.
    Active,

    /// Shutdown requested; pumps are being cancelled and joined.
    Stopping,

    /// Clean shutdown complete. Terminal.
    Stopped,

    /// A fatal pump or startup error occurred. Terminal — restart is an
    /// explicit external action (reconnect from Idle).
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connected => "Connected",
            Self::Starting => "Starting",
            Self::Ready => "Ready",
            Self::Active => "Active",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
        };
        write!(f, "{name}")
    }
}

impl PipelineState {
    /// Whether pumps are permitted to run in this state.
    pub fn allows_pumps(&self) -> bool {
        matches!(self, Self::Starting | Self::Ready | Self::Active)
    }

    /// Whether callers may drain the frame buffer in this state.
    ///
    /// Pre-Ready takes observe "no frame available" rather than
    /// blocking or failing.
    pub fn allows_take(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connected` after a successful handshake.
    ///
    /// Valid from: `Idle`. A second connect on a live session is a
    /// programming error and is rejected rather than silently re-run.
    pub fn connected(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Idle => {
                *self = Self::Connected;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("connect: session is not Idle")),
        }
    }

    /// Transition to `Starting`.
    ///
    /// Valid from: `Connected`.
    pub fn begin_start(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Connected => {
                *self = Self::Starting;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("start: session is not Connected")),
        }
    }

    /// Transition to `Ready` once the readiness marker is observed.
    ///
    /// Valid from: `Starting`.
    pub fn ready(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Starting => {
                *self = Self::Ready;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("ready: session is not Starting")),
        }
    }

    /// Transition to `Active` — the caller is now expected to poll.
    ///
    /// Valid from: `Ready`.
    pub fn activate(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Ready => {
                *self = Self::Active;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("activate: session is not Ready")),
        }
    }

    /// Transition to `Stopping`.
    ///
    /// Valid from: `Connected`, `Starting`, `Ready`, `Active`.
    pub fn begin_stop(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Connected | Self::Starting | Self::Ready | Self::Active => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("stop: session is not running")),
        }
    }

    /// Transition to `Stopped` after pumps are joined and the decoder
    /// is terminated.
    ///
    /// Valid from: `Stopping`.
    pub fn stopped(&mut self) -> Result<(), RelayError> {
        match self {
            Self::Stopping => {
                *self = Self::Stopped;
                Ok(())
            }
            _ => Err(RelayError::InvalidState("stopped: session is not Stopping")),
        }
    }

    /// Force-transition to `Failed` regardless of current state.
    ///
    /// Used for unrecoverable pump and startup errors.
    pub fn fail(&mut self) {
        *self = Self::Failed;
    }
}

// ── Tests ────────────────────────────────────────────────────────
