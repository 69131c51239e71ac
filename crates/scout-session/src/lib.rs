//! BLE discovery-and-connection session manager
//!
//! This crate turns the noisy stream of platform BLE adapter events into a
//! consistent, observable device registry and connection state, with a
//! correct scan lifecycle and cleanup on teardown. The presentation layer
//! is an external collaborator: it renders [`SessionSnapshot`]s and
//! forwards user intents through a [`SessionHandle`].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       SessionManager                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌─────────────┐    ┌──────────────┐    ┌────────────────┐    │
//! │  │ BleAdapter  │───►│ Session Core │───►│ watch snapshot │    │
//! │  │ (platform)  │    │              │    │ (presentation) │    │
//! │  └─────────────┘    │ ScanState    │    └────────────────┘    │
//! │                     │ Registry     │    ┌────────────────┐    │
//! │  ┌─────────────┐    │ Connection   │◄───│ command mpsc   │    │
//! │  │ Permission  │───►│              │    │ (user intents) │    │
//! │  │ Gate        │    └──────────────┘    └────────────────┘    │
//! │  └─────────────┘                                              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_session::{SessionConfigBuilder, SessionManager, StaticPermission};
//! use scout_session::adapter::BtleplugAdapter;
//!
//! # async fn run() -> scout_session::Result<()> {
//! let config = SessionConfigBuilder::new().build();
//! let adapter = BtleplugAdapter::new();
//! let (manager, handle) = SessionManager::new(
//!     adapter,
//!     StaticPermission::granted(),
//!     config,
//! );
//!
//! tokio::spawn(manager.run());
//!
//! handle.start_scan().await?;
//! let snapshot = handle.snapshot().await?;
//! println!("{} device(s), status: {}", snapshot.devices.len(), snapshot.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `btleplug` - cross-platform adapter via btleplug (requires
//!   `libdbus-1-dev` on Linux)
//!
//! # Scan lifecycle
//!
//! 1. `start_scan` intent arrives; rejected as a no-op while scanning
//! 2. Adapter power state gate, then scan-permission gate
//! 3. Registry cleared, scan issued with the configured window
//! 4. The session arms its own deadline; the platform is never trusted to
//!    stop on time
//! 5. Deadline fires: scan closed out, status reflects whether anything
//!    was found

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod permission;
pub mod session;
pub mod test_utils;

// Re-exports for convenience
pub use adapter::{AdapterState, BleAdapter, ScanParams};
pub use config::{
    LateDiscoveryPolicy, ScanMode, SessionConfig, SessionConfigBuilder, DEFAULT_SCAN_WINDOW,
    MAX_SCAN_WINDOW,
};
pub use error::{Result, SessionError};
pub use permission::{PermissionGate, StaticPermission};
pub use session::{
    SessionCommand, SessionHandle, SessionManager, SessionSnapshot, ViewMode,
};

#[cfg(feature = "btleplug")]
pub use adapter::BtleplugAdapter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
