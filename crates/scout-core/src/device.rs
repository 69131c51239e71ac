//! Device identity and peripheral records
//!
//! A [`Peripheral`] is the session-level view of a remote BLE device built
//! from its advertising data. Display names are resolved with a fixed
//! precedence: the platform name field, then the advertised local name,
//! then the [`UNKNOWN_DEVICE_NAME`] sentinel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel display name for peripherals whose name cannot be resolved
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Opaque platform identifier for a BLE device.
///
/// Stable for a given physical device within one session. The underlying
/// representation (MAC address, platform UUID, ...) is platform-specific
/// and never interpreted by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Get the device ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A discovered BLE peripheral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peripheral {
    /// Opaque platform device identifier
    pub id: DeviceId,
    /// Platform-resolved device name, if any
    pub name: Option<String>,
    /// Local name carried in the advertising payload, if any
    pub local_name: Option<String>,
    /// Raw advertising/metadata payload, retained opaque for later use
    pub advertisement: Vec<u8>,
    /// Signal strength at last sighting, if reported
    pub rssi: Option<i16>,
    /// When this peripheral was last seen
    pub last_seen: DateTime<Utc>,
}

impl Peripheral {
    /// Create a peripheral record with no advertising metadata
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            local_name: None,
            advertisement: Vec::new(),
            rssi: None,
            last_seen: Utc::now(),
        }
    }

    /// Set the platform name field
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the advertised local name
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Set the raw advertising payload
    pub fn with_advertisement(mut self, payload: Vec<u8>) -> Self {
        self.advertisement = payload;
        self
    }

    /// Set the received signal strength
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Whether this peripheral carries a usable name.
    ///
    /// Peripherals without one are dropped at the registry boundary rather
    /// than stored under the sentinel name.
    pub fn has_resolvable_name(&self) -> bool {
        fn non_empty(s: &Option<String>) -> bool {
            s.as_deref().is_some_and(|s| !s.is_empty())
        }
        non_empty(&self.name) || non_empty(&self.local_name)
    }

    /// Resolve the display name: name field, else advertised local name,
    /// else [`UNKNOWN_DEVICE_NAME`].
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.local_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_DEVICE_NAME)
    }

    /// Display name if resolvable, otherwise the device id
    pub fn display_name_or_id(&self) -> &str {
        if self.has_resolvable_name() {
            self.display_name()
        } else {
            self.id.as_str()
        }
    }
}
