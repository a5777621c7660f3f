//! Integration tests — full relay lifecycle against a mock capture
//! source on localhost and a scripted stand-in decoder process
//! (`sh` printing the readiness marker on stderr, then copying
//! stdin→stdout like a 1:1 "decoder").

use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::codec::FramedWrite;

use framepipe_core::{
    DecoderConfig, FramingMode, PipelineState, RelayConfig, RelayError, RelayPipeline,
    StreamCodec, WireFrame, DEVICE_ID_SIZE,
};

// ── Helpers ──────────────────────────────────────────────────────

const MARKER: &str = "Output #0, image2pipe";
const WIDTH: u16 = 4;
const HEIGHT: u16 = 2;
const FRAME_SIZE: usize = WIDTH as usize * HEIGHT as usize * 3;

/// Stand-in decoder: announces readiness on stderr, then relays
/// stdin→stdout unchanged.
fn passthrough_decoder() -> DecoderConfig {
    DecoderConfig {
        command: "sh".into(),
        args: vec![
            "-c".into(),
            format!("echo \"{MARKER}, to 'pipe:1':\" >&2; exec cat"),
        ],
        readiness_marker: MARKER.into(),
    }
}

/// Stand-in decoder that never prints the readiness marker.
fn silent_decoder() -> DecoderConfig {
    DecoderConfig {
        command: "sh".into(),
        args: vec!["-c".into(), "exec cat >/dev/null".into()],
        readiness_marker: MARKER.into(),
    }
}

fn test_config(address: String, decoder: DecoderConfig) -> RelayConfig {
    RelayConfig {
        source_address: address,
        framing: FramingMode::Framed,
        startup_stagger_ms: 10,
        decoder,
        ..Default::default()
    }
}

fn handshake_bytes(device: &str) -> Vec<u8> {
    let mut bytes = vec![0x01];
    let mut id = [0u8; DEVICE_ID_SIZE];
    id[..device.len()].copy_from_slice(device.as_bytes());
    bytes.extend_from_slice(&id);
    bytes.extend_from_slice(&WIDTH.to_be_bytes());
    bytes.extend_from_slice(&HEIGHT.to_be_bytes());
    bytes
}

/// Spin up a mock capture source that performs the handshake, sends
/// the given framed payloads, then holds the socket open until the
/// returned sender is dropped or signalled.
async fn spawn_framed_source(frames: Vec<Vec<u8>>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (hold_tx, hold_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&handshake_bytes("mock-device")).await.unwrap();

        let mut sink = FramedWrite::new(stream, StreamCodec::default());
        // A keep-alive first, which the relay must skip.
        sink.send(WireFrame {
            pts: 0,
            payload: bytes::Bytes::new(),
        })
        .await
        .unwrap();

        for (i, frame) in frames.into_iter().enumerate() {
            sink.send(WireFrame {
                pts: (i as u64 + 1) * 1_000,
                payload: frame.into(),
            })
            .await
            .unwrap();
        }

        // Keep the connection open until the test is done.
        let _ = hold_rx.await;
    });

    (address, hold_tx)
}

fn rgb_frames(count: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| vec![i as u8; FRAME_SIZE]).collect()
}

// ── Full lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_framed_mode() {
    let (address, hold) = spawn_framed_source(rgb_frames(5)).await;
    let mut pipeline = RelayPipeline::new(test_config(address, passthrough_decoder()));

    let params = pipeline.connect().await.unwrap();
    assert_eq!(params.device_name, "mock-device");
    assert_eq!((params.width, params.height), (WIDTH, HEIGHT));
    assert_eq!(params.frame_size(), FRAME_SIZE);
    assert_eq!(pipeline.state(), PipelineState::Connected);

    pipeline
        .start(100, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(pipeline.state(), PipelineState::Active);

    // Poll at our own rate until the replayed session has flowed through.
    let mut collected = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while collected.len() < 5 && tokio::time::Instant::now() < deadline {
        match pipeline.take_next_frame() {
            Some(frame) => collected.push(frame),
            None => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }

    assert_eq!(collected.len(), 5, "timed out collecting frames");
    for (i, frame) in collected.iter().enumerate() {
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame[0], i as u8, "frames out of order");
    }

    assert_eq!(pipeline.frames_received(), 5);
    assert_eq!(pipeline.bytes_received(), 5 * FRAME_SIZE as u64);
    // Keep-alive contributed nothing.
    assert_eq!(pipeline.bytes_sent(), 5 * FRAME_SIZE as u64);

    pipeline.stop().await;
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    drop(hold);
}

#[tokio::test]
async fn take_latest_discards_backlog_under_slow_polling() {
    let (address, hold) = spawn_framed_source(rgb_frames(5)).await;
    let mut pipeline = RelayPipeline::new(test_config(address, passthrough_decoder()));

    pipeline.connect().await.unwrap();
    pipeline
        .start(100, Duration::from_millis(50))
        .await
        .unwrap();

    // Let the whole replay accumulate before the first poll.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while pipeline.frames_received() < 5 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(pipeline.frames_received(), 5, "timed out waiting for frames");

    let (frame, discarded) = pipeline.take_latest_frame().unwrap();
    assert_eq!(frame[0], 4, "expected the newest frame");
    assert_eq!(discarded, 4);
    assert!(pipeline.take_next_frame().is_none());

    pipeline.stop().await;
    drop(hold);
}

#[tokio::test]
async fn unframed_mode_relays_raw_bytes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (hold_tx, hold_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&handshake_bytes("legacy-device")).await.unwrap();
        // Raw elementary-stream bytes, no headers: 5 frames' worth.
        for i in 0..5u8 {
            stream.write_all(&vec![i; FRAME_SIZE]).await.unwrap();
        }
        let _ = hold_rx.await;
    });

    let mut config = test_config(address, passthrough_decoder());
    config.framing = FramingMode::Unframed;
    let mut pipeline = RelayPipeline::new(config);

    pipeline.connect().await.unwrap();
    pipeline
        .start(100, Duration::from_millis(50))
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while pipeline.frames_received() < 5 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(pipeline.frames_received(), 5);
    assert_eq!(pipeline.bytes_sent(), 5 * FRAME_SIZE as u64);
    let frame = pipeline.take_next_frame().unwrap();
    assert_eq!(frame, vec![0u8; FRAME_SIZE]);

    pipeline.stop().await;
    drop(hold_tx);
}

// ── Failure paths ────────────────────────────────────────────────

#[tokio::test]
async fn handshake_rejected_when_source_closes_immediately() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        // Accept and drop without sending a single byte.
        let _ = listener.accept().await;
    });

    let mut pipeline = RelayPipeline::new(test_config(address, passthrough_decoder()));
    let err = pipeline.connect().await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::HandshakeFailed("no liveness byte")
    ));
}

#[tokio::test]
async fn readiness_timeout_fails_the_pipeline() {
    let (address, hold) = spawn_framed_source(Vec::new()).await;
    let mut pipeline = RelayPipeline::new(test_config(address, silent_decoder()));

    pipeline.connect().await.unwrap();
    let err = pipeline
        .start(3, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::DecoderStartupTimeout { attempts: 3, .. }
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.last_error().is_some());

    // stop() after a failure cleans up but keeps Failed as the record.
    pipeline.stop().await;
    assert_eq!(pipeline.state(), PipelineState::Failed);
    drop(hold);
}

#[tokio::test]
async fn missing_decoder_executable_is_a_launch_failure() {
    let (address, hold) = spawn_framed_source(Vec::new()).await;
    let decoder = DecoderConfig {
        command: "definitely-not-a-real-decoder".into(),
        args: vec![],
        readiness_marker: MARKER.into(),
    };
    let mut pipeline = RelayPipeline::new(test_config(address, decoder));

    pipeline.connect().await.unwrap();
    let err = pipeline
        .start(3, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::ResourceLaunchFailed { .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    drop(hold);
}

#[tokio::test]
async fn stop_terminates_blocked_pumps_within_grace_period() {
    // A source that sends a continuous stream so pumps are mid-flight
    // when stop() lands.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (hold_tx, mut hold_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&handshake_bytes("busy-device")).await.unwrap();

        let mut sink = FramedWrite::new(stream, StreamCodec::default());
        let mut pts = 0u64;
        loop {
            pts += 1_000;
            let frame = WireFrame {
                pts,
                payload: vec![0xEE; FRAME_SIZE].into(),
            };
            tokio::select! {
                _ = &mut hold_rx => break,
                sent = sink.send(frame) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let mut pipeline = RelayPipeline::new(test_config(address, passthrough_decoder()));
    pipeline.connect().await.unwrap();
    pipeline
        .start(100, Duration::from_millis(50))
        .await
        .unwrap();

    // Let some traffic flow.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while pipeline.frames_received() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(pipeline.frames_received() >= 3);

    // Teardown must finish promptly even with pumps parked in reads.
    tokio::time::timeout(Duration::from_secs(5), pipeline.stop())
        .await
        .expect("stop() did not complete within the grace period");
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    drop(hold_tx);
}
