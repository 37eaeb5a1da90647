//! Configuration management for the telemetry logger.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Default configuration (embedded in the binary)
//! 2. User-specified configuration file
//! 3. Environment variables (prefixed with `BLACKBOX_`)
//! 4. Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Command-line arguments
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Path of the durable telemetry store
    #[clap(long)]
    pub store_path: Option<PathBuf>,

    /// Device identity recorded with every sample
    #[clap(long)]
    pub device_id: Option<String>,

    /// Rollup reporting interval in seconds
    #[clap(long)]
    pub interval: Option<f64>,

    /// Replay sensor samples from a JSON-lines file
    #[clap(long)]
    pub replay: Option<PathBuf>,

    /// Duration of the synthetic drive in seconds
    #[clap(long, default_value_t = 30)]
    pub duration_secs: u64,

    /// Log filter directive (e.g. "blackbox_core=debug")
    #[clap(long)]
    pub log_filter: Option<String>,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Store file path
    pub path: PathBuf,
    /// Device identity, supplied once at initialization
    pub device_id: String,
}

/// Rollup reporting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingSettings {
    /// Publication cadence in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
    /// Event bus channel buffer depth
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_interval_secs() -> f64 {
    10.0
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Complete logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub storage: StorageSettings,
    #[serde(default)]
    pub reporting: ReportingSettings,
}

impl TelemetryConfig {
    /// Load configuration from all sources.
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.clone()));
        }

        // Double underscore separates nesting levels so keys like
        // `device_id` stay addressable (BLACKBOX_STORAGE__DEVICE_ID).
        builder = builder.add_source(config::Environment::with_prefix("BLACKBOX").separator("__"));

        let mut cfg: TelemetryConfig = builder.build()?.try_deserialize()?;

        // CLI arguments take highest precedence.
        if let Some(path) = &args.store_path {
            cfg.storage.path = path.clone();
        }
        if let Some(device_id) = &args.device_id {
            cfg.storage.device_id = device_id.clone();
        }
        if let Some(interval) = args.interval {
            cfg.reporting.interval_secs = interval;
        }

        Ok(cfg)
    }
}
