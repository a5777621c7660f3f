//! External decoder process management.
//!
//! The decoder is a black box launched as a child process: it consumes
//! an elementary video stream on stdin, emits fixed-size raw RGB24
//! frames on stdout, and prints line-oriented diagnostics on stderr.
//! This module only launches and terminates it — the pumps own the
//! pipes.

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::config::DecoderConfig;
use crate::error::RelayError;

// ── DecoderIo ────────────────────────────────────────────────────

/// The three pipes of a launched decoder, handed to the pumps.
#[derive(Debug)]
pub struct DecoderIo {
    /// Elementary-stream input channel (socket→decoder pump writes here).
    pub stdin: ChildStdin,
    /// Raw-frame output channel (decoder→buffer pump reads here).
    pub stdout: ChildStdout,
    /// Diagnostic text channel (scanner reads here).
    pub stderr: ChildStderr,
}

// ── DecoderProcess ───────────────────────────────────────────────

/// Handle to the running decoder process.
#[derive(Debug)]
pub struct DecoderProcess {
    child: Child,
}

impl DecoderProcess {
    /// Launch the decoder with all three channels piped.
    ///
    /// A spawn failure is [`RelayError::ResourceLaunchFailed`] — a
    /// misconfigured environment, distinct from the runtime
    /// [`RelayError::DecoderUnavailable`] failures the pumps report.
    pub fn launch(config: &DecoderConfig) -> Result<(Self, DecoderIo), RelayError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|source| RelayError::ResourceLaunchFailed {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::DecoderUnavailable("missing stdin pipe".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::DecoderUnavailable("missing stdout pipe".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RelayError::DecoderUnavailable("missing stderr pipe".into()))?;

        tracing::info!(command = %config.command, pid = ?child.id(), "decoder launched");

        Ok((Self { child }, DecoderIo {
            stdin,
            stdout,
            stderr,
        }))
    }

    /// OS process id, while the child is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the decoder and reap it.
    ///
    /// Closing the process also closes its pipes, which is what forces
    /// pumps blocked on pipe I/O to return during teardown.
    pub async fn terminate(&mut self) {
        if let Err(e) = self.child.kill().await {
            // Already exited — nothing to reap.
            tracing::debug!(error = %e, "decoder kill returned an error");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
