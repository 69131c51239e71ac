//! Scan permission gate
//!
//! Some platforms require a runtime location permission before a BLE scan
//! may be issued. The gate is pure request/response and fails closed: any
//! error while checking or requesting counts as "not granted" and must be
//! logged by the implementation rather than raised to the caller.

use async_trait::async_trait;

/// Trait for platform scan-permission checks
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Check, and if needed request, the permission required for scanning.
    ///
    /// Returns whether scanning is permitted. May surface a platform
    /// permission dialog. Must never fail: errors are treated as denial.
    async fn ensure_scan_permission(&self) -> bool;
}

/// Permission gate with a fixed answer.
///
/// Use [`StaticPermission::granted`] on platforms without runtime
/// permission enforcement.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    /// Gate that always grants
    pub fn granted() -> Self {
        Self { granted: true }
    }

    /// Gate that always denies
    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl PermissionGate for StaticPermission {
    async fn ensure_scan_permission(&self) -> bool {
        self.granted
    }
}
