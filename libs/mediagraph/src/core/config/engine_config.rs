// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine-level configuration via `mediagraph.yaml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{PipelineError, Result};
use crate::core::media::SECOND;

/// Limits applied to every buffering link node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferingConfig {
    pub max_size_buffers: u32,
    pub max_size_bytes: u64,
    pub max_size_time_ns: i64,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            max_size_buffers: 200,
            max_size_bytes: 10 * 1024 * 1024,
            max_size_time_ns: SECOND,
        }
    }
}

/// Engine configuration from `mediagraph.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between position notifications while Paused or Playing.
    pub position_poll_interval_ms: u64,

    pub buffering: BufferingConfig,

    /// Clamp TIME seeks into `[0, duration]` when the duration is known.
    pub seek_clamp_to_duration: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            buffering: BufferingConfig::default(),
            seek_clamp_to_duration: true,
        }
    }
}

impl EngineConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "mediagraph.yaml";

    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| PipelineError::new(format!("Failed to parse engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory. Returns error if the file is
    /// missing or cannot be parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            PipelineError::new(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::new(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("[EngineConfig] Loaded {}", config_path.display());
        Ok(config)
    }

    /// Load configuration from a directory, returning defaults if the file is
    /// missing or unusable.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "[EngineConfig] No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[EngineConfig] {}, using defaults", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.position_poll_interval_ms == 0 {
            return Err(PipelineError::new(
                "position_poll_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}
