//! Adapter implementations for platform BLE stacks
//!
//! This module defines the capability contract the session manager
//! consumes, plus platform implementations:
//!
//! - [`btleplug::BtleplugAdapter`] - cross-platform BLE via btleplug
//!   (requires the `btleplug` feature)
//!
//! # Feature Requirements
//!
//! - `btleplug`: Requires BlueZ development files on Linux
//!   ```bash
//!   apt install libdbus-1-dev
//!   ```

#[cfg(feature = "btleplug")]
mod btleplug;

#[cfg(feature = "btleplug")]
pub use self::btleplug::BtleplugAdapter;

use async_trait::async_trait;
use scout_core::{AdapterEvent, DeviceId};
use tokio::sync::mpsc;

use crate::config::{ScanMode, SessionConfig};
use crate::error::Result;

/// Capacity of the adapter event subscription channel
pub const EVENT_CHANNEL_SIZE: usize = 64;

/// Power/availability state of the local BLE adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Radio is on and ready to scan
    PoweredOn,
    /// Radio is off; the user must enable it
    PoweredOff,
    /// The application is not authorized to use the radio
    Unauthorized,
    /// This host has no usable BLE stack
    Unsupported,
    /// State could not be determined
    Unknown,
}

impl AdapterState {
    /// Whether a scan may be issued in this state
    pub fn is_powered_on(&self) -> bool {
        matches!(self, AdapterState::PoweredOn)
    }
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterState::PoweredOn => write!(f, "on"),
            AdapterState::PoweredOff => write!(f, "off"),
            AdapterState::Unauthorized => write!(f, "unauthorized"),
            AdapterState::Unsupported => write!(f, "unsupported"),
            AdapterState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parameters for a single scan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    /// Requested discovery window
    pub window: std::time::Duration,
    /// Report repeated advertisements for already-seen devices
    pub allow_duplicates: bool,
    /// Platform scan-mode hint
    pub mode: ScanMode,
}

impl ScanParams {
    /// Derive scan parameters from a session configuration
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            window: config.scan_window,
            allow_duplicates: config.allow_duplicates,
            mode: config.scan_mode,
        }
    }
}

/// Trait for platform BLE adapters
///
/// This trait abstracts over platform BLE stacks, providing the scan,
/// connect, and event-subscription surface the session manager relies on.
/// Implementations must not be trusted to stop a scan after the requested
/// window; the session manager enforces its own deadline.
#[async_trait]
pub trait BleAdapter: Send + Sync {
    /// Power on the platform adapter, prompting the user where required
    async fn enable(&mut self) -> Result<()>;

    /// Initialize the adapter after it has been enabled
    async fn initialize(&mut self) -> Result<()>;

    /// Query the adapter power state
    async fn state(&self) -> Result<AdapterState>;

    /// Begin scanning for advertising peripherals
    async fn start_scan(&mut self, params: &ScanParams) -> Result<()>;

    /// Stop an in-progress scan
    async fn stop_scan(&mut self) -> Result<()>;

    /// Connect to a peripheral by device id
    async fn connect(&mut self, id: &DeviceId) -> Result<()>;

    /// Disconnect from a peripheral by device id
    async fn disconnect(&mut self, id: &DeviceId) -> Result<()>;

    /// Subscribe to discovery/connect/disconnect events.
    ///
    /// Dropping the receiver releases the subscription.
    fn subscribe(&mut self) -> mpsc::Receiver<AdapterEvent>;

    /// Get the adapter name (for logging)
    fn name(&self) -> &str;
}
