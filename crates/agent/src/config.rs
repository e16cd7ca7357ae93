// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid port range {lo}..={hi}")]
    PortRange { lo: u16, hi: u16 },
}

/// Agent configuration.
///
/// Loadable from a TOML file; missing sections and keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub reactor: ReactorConfig,
    pub ports: PortsConfig,
    pub executions: ExecutionsConfig,
}

/// `[reactor]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Timed-refresh period in milliseconds
    pub interval_ms: u64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self { interval_ms: 30_000 }
    }
}

/// `[ports]` section: dynamic host port allocation range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub lo: u16,
    pub hi: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self { lo: 20_000, hi: 32_767 }
    }
}

/// `[executions]` section: location of the persistent executions cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionsConfig {
    pub path: PathBuf,
}

impl Default for ExecutionsConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("executions.json") }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: AgentConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ports.lo > self.ports.hi {
            return Err(ConfigError::PortRange { lo: self.ports.lo, hi: self.ports.hi });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.reactor.interval_ms)
    }

    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.ports.lo..=self.ports.hi
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
