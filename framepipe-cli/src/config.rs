//! Driver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use framepipe_core::RelayConfig;

/// Top-level configuration for the framepipe driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Pipeline settings (source address, framing, decoder launch).
    pub relay: RelayConfig,
    /// Decoder readiness polling budget.
    pub readiness: ReadinessConfig,
    /// Frame consumption settings.
    pub consumer: ConsumerConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Readiness polling budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum marker polls before giving up.
    pub max_attempts: u32,
    /// Sleep between polls in milliseconds.
    pub poll_interval_ms: u64,
}

/// Frame consumption settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// How often to poll the frame buffer, per second.
    pub poll_hz: u32,
    /// Seconds between stats log lines.
    pub stats_interval_secs: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (overridden by `RUST_LOG`).
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            readiness: ReadinessConfig::default(),
            consumer: ConsumerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 200,
            poll_interval_ms: 500,
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_hz: 60,
            stats_interval_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl CliConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = CliConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("source_address"));
        assert!(text.contains("readiness_marker"));
        assert!(text.contains("max_attempts"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = CliConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.relay.source_address, "127.0.0.1:8080");
        assert_eq!(parsed.readiness.max_attempts, 200);
        assert_eq!(parsed.consumer.poll_hz, 60);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: CliConfig = toml::from_str(
            r#"
            [relay]
            source_address = "10.0.0.5:9000"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.relay.source_address, "10.0.0.5:9000");
        assert_eq!(parsed.readiness.poll_interval_ms, 500);
    }
}
