//! Configuration types for the session manager
//!
//! This module provides the session configuration including the scan
//! window, scan mode hint, and late-discovery policy, plus a builder.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default discovery window for a scan
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(15);

/// Upper bound for the configurable scan window
pub const MAX_SCAN_WINDOW: Duration = Duration::from_secs(300);

/// Default command queue size for the session task
pub const DEFAULT_COMMAND_QUEUE_SIZE: usize = 32;

/// Platform scan-mode hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Favor discovery latency over power (default for interactive scans)
    #[default]
    LowLatency,
    /// Balance latency and power
    Balanced,
    /// Favor power over latency
    LowPower,
}

/// What to do with discovery events that arrive after the scan window
/// has closed but before the next scan clears the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateDiscoveryPolicy {
    /// Accept late events into the registry (default)
    #[default]
    Accept,
    /// Drop late events
    Drop,
}

/// Configuration for a scan/connect session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Duration of the discovery window
    #[serde(with = "humantime_serde", default = "default_scan_window")]
    pub scan_window: Duration,

    /// Report repeated advertisements for already-seen devices
    #[serde(default = "default_allow_duplicates")]
    pub allow_duplicates: bool,

    /// Platform scan-mode hint
    #[serde(default)]
    pub scan_mode: ScanMode,

    /// Policy for discovery events after the scan window closes
    #[serde(default)]
    pub late_discovery: LateDiscoveryPolicy,

    /// Queue size for user intents sent to the session task
    #[serde(default = "default_command_queue_size")]
    pub command_queue_size: usize,
}

fn default_scan_window() -> Duration {
    DEFAULT_SCAN_WINDOW
}

fn default_allow_duplicates() -> bool {
    true
}

fn default_command_queue_size() -> usize {
    DEFAULT_COMMAND_QUEUE_SIZE
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_window: DEFAULT_SCAN_WINDOW,
            allow_duplicates: true,
            scan_mode: ScanMode::default(),
            late_discovery: LateDiscoveryPolicy::default(),
            command_queue_size: DEFAULT_COMMAND_QUEUE_SIZE,
        }
    }
}

/// Builder for [`SessionConfig`]
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery window, clamped to [`MAX_SCAN_WINDOW`]
    pub fn scan_window(mut self, window: Duration) -> Self {
        self.config.scan_window = window.min(MAX_SCAN_WINDOW);
        self
    }

    /// Enable or disable duplicate advertisement reporting
    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.config.allow_duplicates = allow;
        self
    }

    /// Set the platform scan-mode hint
    pub fn scan_mode(mut self, mode: ScanMode) -> Self {
        self.config.scan_mode = mode;
        self
    }

    /// Set the late-discovery policy
    pub fn late_discovery(mut self, policy: LateDiscoveryPolicy) -> Self {
        self.config.late_discovery = policy;
        self
    }

    /// Set the command queue size
    pub fn command_queue_size(mut self, size: usize) -> Self {
        self.config.command_queue_size = size.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

// Custom serde module for Duration with humantime
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
