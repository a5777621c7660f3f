//! Decoder readiness detection.
//!
//! The decoder announces stream detection only as free text on its
//! diagnostic channel, so readiness is established by polling the
//! accumulated [`DiagnosticLog`] for a marker substring. This is a
//! heuristic boundary with a third-party process, not a precise API:
//! the marker, attempt budget and interval are all configuration so the
//! protocol can be adapted when the decoder's output format changes.

use std::time::Duration;

use crate::diagnostics::DiagnosticLog;
use crate::error::RelayError;

/// Poll the diagnostic log until the readiness marker appears.
///
/// Checks up to `max_attempts` times, sleeping `poll_interval` between
/// checks. Returns as soon as a check matches; if the budget is
/// exhausted, fails with [`RelayError::DecoderStartupTimeout`] carrying
/// everything the decoder said so far.
pub async fn await_ready(
    log: &DiagnosticLog,
    marker: &str,
    max_attempts: u32,
    poll_interval: Duration,
) -> Result<(), RelayError> {
    for attempt in 1..=max_attempts {
        if log.contains(marker) {
            tracing::debug!(attempt, "decoder readiness marker observed");
            return Ok(());
        }
        if attempt < max_attempts {
            tokio::time::sleep(poll_interval).await;
        }
    }

    Err(RelayError::DecoderStartupTimeout {
        attempts: max_attempts,
        diagnostics: log.joined(),
    })
}

// ── Tests ────────────────────────────────────────────────────────
