//! Pipeline controller — owns the relay session lifecycle.
//!
//! ```text
//! Idle ──connect()──► Connected ──start()──► Starting ─► Ready ─► Active
//!                                                                   │
//!                                            Stopped ◄──stop()──────┘
//! ```
//!
//! `connect` performs the one-time handshake; `start` launches the
//! decoder, spins up the three pumps with a brief staggered startup
//! (diagnostics first, then input, then output) and blocks until the
//! readiness gate passes; the caller then polls the frame buffer at its
//! own rate. Any pump's fatal failure forces the whole pipeline to
//! `Failed` — there is no automatic retry or restart; recovery is an
//! explicit new session from `Idle`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer::{frame_queue, FrameBuffer};
use crate::config::{FramingMode, RelayConfig};
use crate::decoder::DecoderProcess;
use crate::diagnostics::DiagnosticLog;
use crate::error::RelayError;
use crate::handshake::{read_handshake, ConnectionParams};
use crate::pump;
use crate::readiness::await_ready;
use crate::state::PipelineState;
use crate::stats::{PipelineStats, TransferCounters};

// ── RelayPipeline ────────────────────────────────────────────────

/// A single capture→decoder→buffer relay session.
pub struct RelayPipeline {
    config: RelayConfig,
    state: Arc<Mutex<PipelineState>>,
    counters: Arc<TransferCounters>,
    diagnostics: Arc<DiagnosticLog>,
    cancel: CancellationToken,
    last_error: Arc<Mutex<Option<String>>>,
    params: Option<ConnectionParams>,
    socket: Option<TcpStream>,
    frames: Option<FrameBuffer>,
    decoder: Option<DecoderProcess>,
    pumps: Vec<JoinHandle<()>>,
}

impl RelayPipeline {
    /// Create an idle pipeline with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            counters: Arc::new(TransferCounters::new()),
            diagnostics: Arc::new(DiagnosticLog::new()),
            cancel: CancellationToken::new(),
            last_error: Arc::new(Mutex::new(None)),
            params: None,
            socket: None,
            frames: None,
            decoder: None,
            pumps: Vec::new(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Connect to the capture source and perform the handshake.
    ///
    /// On success the session is `Connected` and the returned
    /// parameters are fixed for its lifetime. Calling `connect` again
    /// on a live session is rejected with [`RelayError::InvalidState`].
    /// On failure the session remains `Idle` (nothing was started).
    pub async fn connect(&mut self) -> Result<ConnectionParams, RelayError> {
        if *self.state_guard() != PipelineState::Idle {
            return Err(RelayError::InvalidState("connect: session is not Idle"));
        }

        tracing::info!(address = %self.config.source_address, "connecting to capture source");
        let mut socket = TcpStream::connect(&self.config.source_address).await?;
        socket.set_nodelay(true)?;

        let params = read_handshake(&mut socket).await.inspect_err(|e| {
            tracing::error!(error = %e, "handshake failed");
        })?;

        tracing::info!(
            device = %params.device_name,
            width = params.width,
            height = params.height,
            "capture source connected"
        );

        self.state_guard().connected()?;
        self.socket = Some(socket);
        self.params = Some(params.clone());
        Ok(params)
    }

    /// Launch the decoder, start the pumps and wait for readiness.
    ///
    /// Blocks until the readiness marker appears in the decoder's
    /// diagnostics (polling up to `max_ready_attempts` times with
    /// `poll_interval` between checks), then leaves the session
    /// `Active`. On any failure the session is `Failed` and already
    /// torn down.
    pub async fn start(
        &mut self,
        max_ready_attempts: u32,
        poll_interval: Duration,
    ) -> Result<(), RelayError> {
        self.state_guard().begin_start()?;

        let params = self
            .params
            .clone()
            .ok_or(RelayError::InvalidState("start: no connection parameters"))
            .map_err(|e| self.fail_with(e))?;
        let socket = self
            .socket
            .take()
            .ok_or(RelayError::InvalidState("start: no capture socket"))
            .map_err(|e| self.fail_with(e))?;

        let (decoder, io) = match DecoderProcess::launch(&self.config.decoder) {
            Ok(launched) => launched,
            Err(e) => return Err(self.fail_with(e)),
        };
        self.decoder = Some(decoder);

        let (producer, buffer) = frame_queue();
        self.frames = Some(buffer);

        // Staggered startup: diagnostics first so nothing the decoder
        // says is missed, then input, then output, so output is never
        // awaited before input has begun flowing.
        let stagger = self.config.startup_stagger();

        self.pumps.push(tokio::spawn(pump::scan_diagnostics(
            io.stderr,
            Arc::clone(&self.diagnostics),
            self.cancel.clone(),
        )));
        tokio::time::sleep(stagger).await;

        match self.config.framing {
            FramingMode::Framed => {
                self.supervise(
                    "input",
                    pump::pump_framed_input(
                        socket,
                        io.stdin,
                        Arc::clone(&self.counters),
                        self.cancel.clone(),
                    ),
                );
            }
            FramingMode::Unframed => {
                self.supervise(
                    "input",
                    pump::pump_unframed_input(
                        socket,
                        io.stdin,
                        self.config.recv_chunk_size,
                        Arc::clone(&self.counters),
                        self.cancel.clone(),
                    ),
                );
            }
        }
        tokio::time::sleep(stagger).await;

        self.supervise(
            "output",
            pump::pump_decoder_output(
                io.stdout,
                params.frame_size(),
                producer,
                Arc::clone(&self.counters),
                self.cancel.clone(),
            ),
        );

        tracing::info!("waiting for decoder readiness");
        let ready = tokio::select! {
            ready = await_ready(
                &self.diagnostics,
                &self.config.decoder.readiness_marker,
                max_ready_attempts,
                poll_interval,
            ) => ready,
            // A pump died during startup and cancelled the pipeline.
            _ = self.cancel.cancelled() => Err(RelayError::DecoderUnavailable(format!(
                "pipeline failed during startup: {}",
                self.last_error().unwrap_or_else(|| "unknown pump failure".into())
            ))),
        };

        match ready {
            Ok(()) => {
                let activated = {
                    let mut state = self.state_guard();
                    state.ready().and_then(|_| state.activate())
                };
                match activated {
                    Ok(()) => {
                        tracing::info!("decoder ready; pipeline active");
                        Ok(())
                    }
                    // A pump forced Failed between readiness and activation.
                    Err(_) => {
                        let e = RelayError::DecoderUnavailable(format!(
                            "pipeline failed during startup: {}",
                            self.last_error()
                                .unwrap_or_else(|| "unknown pump failure".into())
                        ));
                        self.teardown().await;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                let e = self.fail_with(e);
                self.teardown().await;
                Err(e)
            }
        }
    }

    /// Stop the pipeline: cancel the pumps, terminate the decoder and
    /// join everything.
    ///
    /// Safe to call in any state. A cleanly running session ends up
    /// `Stopped`; a session that already failed keeps `Failed` as the
    /// record of why.
    pub async fn stop(&mut self) {
        let _ = self.state_guard().begin_stop();
        self.teardown().await;

        let mut state = self.state_guard();
        if *state == PipelineState::Stopping {
            let _ = state.stopped();
        }
        tracing::info!(state = %*state, "pipeline stopped");
    }

    /// Cancel, kill and join everything. Idempotent.
    async fn teardown(&mut self) {
        self.cancel.cancel();

        // Terminating the decoder closes its pipes, which unblocks any
        // pump still parked in a pipe read.
        if let Some(mut decoder) = self.decoder.take() {
            decoder.terminate().await;
        }
        self.socket = None;

        for handle in self.pumps.drain(..) {
            let _ = handle.await;
        }
    }

    /// Spawn a pump under failure supervision: a pump error is recorded
    /// as the last error, forces `Failed` and cancels the shared token
    /// so the other pumps stop too.
    fn supervise<F>(&mut self, name: &'static str, pump: F)
    where
        F: std::future::Future<Output = Result<(), RelayError>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let last_error = Arc::clone(&self.last_error);
        let cancel = self.cancel.clone();

        self.pumps.push(tokio::spawn(async move {
            match pump.await {
                Ok(()) => tracing::debug!(pump = name, "pump finished"),
                Err(e) => {
                    tracing::error!(pump = name, error = %e, "pump failed");
                    *lock_ignoring_poison(&last_error) = Some(e.to_string());
                    lock_ignoring_poison(&state).fail();
                    cancel.cancel();
                }
            }
        }));
    }

    /// Record a failure and force the `Failed` state.
    fn fail_with(&self, e: RelayError) -> RelayError {
        *lock_ignoring_poison(&self.last_error) = Some(e.to_string());
        self.state_guard().fail();
        e
    }

    // ── Frame consumption ────────────────────────────────────────

    /// Take the oldest buffered frame, or `None` if the buffer is
    /// empty or the session is not yet `Ready`. Non-blocking.
    pub fn take_next_frame(&mut self) -> Option<Vec<u8>> {
        if !self.state().allows_take() {
            return None;
        }
        self.frames.as_mut()?.take_next()
    }

    /// Take the newest buffered frame, discarding older ones, or
    /// `None` if the buffer is empty or the session is not yet
    /// `Ready`. Non-blocking. Also returns how many frames were
    /// discarded.
    pub fn take_latest_frame(&mut self) -> Option<(Vec<u8>, u64)> {
        if !self.state().allows_take() {
            return None;
        }
        self.frames.as_mut()?.take_latest()
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state_guard()
    }

    /// Connection parameters, once the handshake has completed.
    pub fn params(&self) -> Option<&ConnectionParams> {
        self.params.as_ref()
    }

    /// Negotiated frame width.
    pub fn width(&self) -> Option<u16> {
        self.params.as_ref().map(|p| p.width)
    }

    /// Negotiated frame height.
    pub fn height(&self) -> Option<u16> {
        self.params.as_ref().map(|p| p.height)
    }

    /// Bytes forwarded from the capture socket into the decoder.
    pub fn bytes_sent(&self) -> u64 {
        self.counters.bytes_sent()
    }

    /// Decoded bytes read back from the decoder.
    pub fn bytes_received(&self) -> u64 {
        self.counters.bytes_received()
    }

    /// Complete decoded frames enqueued so far.
    pub fn frames_received(&self) -> u64 {
        self.counters.frames_received()
    }

    /// The most recent fatal error, if any.
    pub fn last_error(&self) -> Option<String> {
        lock_ignoring_poison(&self.last_error).clone()
    }

    /// Everything the decoder has said on its diagnostic channel.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.snapshot()
    }

    /// Point-in-time stats snapshot.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            state: self.state(),
            width: self.width(),
            height: self.height(),
            bytes_sent: self.bytes_sent(),
            bytes_received: self.bytes_received(),
            frames_received: self.frames_received(),
        }
    }

    fn state_guard(&self) -> MutexGuard<'_, PipelineState> {
        lock_ignoring_poison(&self.state)
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Tests ────────────────────────────────────────────────────────
