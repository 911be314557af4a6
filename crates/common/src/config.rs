//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default activity-scan tuning.
    pub scan: ScanDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default activity-scan parameters.
///
/// These mirror the tuning knobs of the scan core. The values here are
/// deliberate magic numbers carried over from long use, not principled
/// percentiles; change them only with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefaults {
    /// Divisor applied to the frame count to size coalescing runs.
    pub granularity_divisor: u32,

    /// Scale factor applied to `(peak - average)` amplitude for the audio
    /// loudness threshold.
    pub audio_threshold_scale: f64,

    /// Per-channel absolute difference (0-255) above which two frames are
    /// considered different.
    pub video_diff_threshold: u8,

    /// How many frames between cooperative stop-flag checks.
    pub stop_poll_interval: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scrubmark=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan: ScanDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            granularity_divisor: 50,
            audio_threshold_scale: 0.001,
            video_diff_threshold: 30,
            stop_poll_interval: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("scrubmark").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_defaults_are_preserved() {
        let defaults = ScanDefaults::default();
        assert_eq!(defaults.granularity_divisor, 50);
        assert_eq!(defaults.audio_threshold_scale, 0.001);
        assert_eq!(defaults.video_diff_threshold, 30);
        assert_eq!(defaults.stop_poll_interval, 200);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scan.granularity_divisor, 50);
        assert_eq!(parsed.logging.level, "info");
    }
}
