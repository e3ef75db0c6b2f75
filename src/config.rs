//! Engine configuration persistence
//!
//! Stores engine tunables in `~/.config/inkpad/config.yaml`. Every field
//! has a default so a missing or partial file never fails.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Engine tunables that persist across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Debounce for user-driven content-change notifications (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Settle delay before revealing a freshly attached surface (ms)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Bounded wait for one paint cycle during capture (ms)
    #[serde(default = "default_frame_wait_ms")]
    pub frame_wait_ms: u64,
    /// Bounded wait for a pixel snapshot (ms)
    #[serde(default = "default_snapshot_wait_ms")]
    pub snapshot_wait_ms: u64,
    /// Event-loop pump increment inside bounded waits (ms)
    #[serde(default = "default_pump_slice_ms")]
    pub pump_slice_ms: u64,
    /// Floor for reconciled overlay line heights (surface pixels)
    #[serde(default = "default_min_line_height")]
    pub min_line_height: f32,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_settle_ms() -> u64 {
    150
}

fn default_frame_wait_ms() -> u64 {
    100
}

fn default_snapshot_wait_ms() -> u64 {
    100
}

fn default_pump_slice_ms() -> u64 {
    5
}

fn default_min_line_height() -> f32 {
    4.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            settle_ms: default_settle_ms(),
            frame_wait_ms: default_frame_wait_ms(),
            snapshot_wait_ms: default_snapshot_wait_ms(),
            pump_slice_ms: default_pump_slice_ms(),
            min_line_height: default_min_line_height(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn frame_wait(&self) -> Duration {
        Duration::from_millis(self.frame_wait_ms)
    }

    pub fn snapshot_wait(&self) -> Duration {
        Duration::from_millis(self.snapshot_wait_ms)
    }

    pub fn pump_slice(&self) -> Duration {
        Duration::from_millis(self.pump_slice_ms)
    }

    /// Default config file location (`~/.config/inkpad/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inkpad").join("config.yaml"))
    }

    /// Load config from disk, or return defaults if not found or invalid
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config at {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Save config to disk, creating the config directory if needed
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path().context("no config directory available")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self).context("serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}
