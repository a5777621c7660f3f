//! framepipe driver — entry point.
//!
//! ```text
//! framepipe                       Connect with framepipe.toml / defaults
//! framepipe --address <ip:port>   Override the capture source address
//! framepipe --unframed            Legacy unframed wire mode
//! framepipe --config <path>       Load a custom config TOML
//! framepipe --gen-config          Write default config to stdout
//! ```
//!
//! Connects to the capture source, starts the relay pipeline and polls
//! the newest frame at a fixed rate until Ctrl-C, logging periodic
//! transfer stats.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;

use framepipe_core::{FramingMode, PipelineState, RelayPipeline};

mod config;

use config::CliConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framepipe", about = "Relay a capture stream through a decoder")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framepipe.toml")]
    config: PathBuf,

    /// Capture source address, overriding the config file.
    #[arg(short, long)]
    address: Option<String>,

    /// Use legacy unframed wire mode.
    #[arg(long)]
    unframed: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config);
    if let Some(address) = cli.address {
        config.relay.source_address = address;
    }
    if cli.unframed {
        config.relay.framing = FramingMode::Unframed;
    }

    // Init tracing. RUST_LOG wins over the config file.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut pipeline = RelayPipeline::new(config.relay.clone());

    let params = pipeline.connect().await?;
    info!(
        device = %params.device_name,
        width = params.width,
        height = params.height,
        frame_size = params.frame_size(),
        "connected"
    );

    pipeline
        .start(
            config.readiness.max_attempts,
            Duration::from_millis(config.readiness.poll_interval_ms),
        )
        .await?;

    let poll_interval = Duration::from_secs(1) / config.consumer.poll_hz.max(1);
    let mut poll = tokio::time::interval(poll_interval);
    let mut stats_tick =
        tokio::time::interval(Duration::from_secs(config.consumer.stats_interval_secs.max(1)));
    let mut discarded_total: u64 = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted; shutting down");
                break;
            }
            _ = poll.tick() => {
                match pipeline.take_latest_frame() {
                    Some((frame, discarded)) => {
                        discarded_total += discarded;
                        trace!(len = frame.len(), discarded, "frame");
                    }
                    None => {
                        if pipeline.state() == PipelineState::Failed {
                            error!(
                                error = pipeline.last_error().as_deref().unwrap_or("unknown"),
                                "pipeline failed"
                            );
                            break;
                        }
                    }
                }
            }
            _ = stats_tick.tick() => {
                let stats = pipeline.stats();
                info!(
                    state = %stats.state,
                    frames = stats.frames_received,
                    bytes_in = stats.bytes_sent,
                    bytes_out = stats.bytes_received,
                    discarded = discarded_total,
                    "relay stats"
                );
            }
        }
    }

    pipeline.stop().await;

    let stats = pipeline.stats();
    info!(
        frames = stats.frames_received,
        bytes_in = stats.bytes_sent,
        bytes_out = stats.bytes_received,
        discarded = discarded_total,
        "session finished"
    );

    Ok(())
}
