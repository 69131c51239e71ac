//! Scout Core - Foundational types for the BLE session manager
//!
//! This crate provides the domain types shared across the scout system:
//! device identity, discovered peripheral records, the device registry,
//! and the adapter event variants checked at the bridge boundary.
//!
//! # Modules
//!
//! - [`device`] - Device identity and peripheral records
//! - [`registry`] - Discovered-device registry with stable iteration order
//! - [`event`] - Adapter event types

pub mod device;
pub mod event;
pub mod registry;

// Re-exports for convenience
pub use device::{DeviceId, Peripheral, UNKNOWN_DEVICE_NAME};
pub use event::AdapterEvent;
pub use registry::DeviceRegistry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
