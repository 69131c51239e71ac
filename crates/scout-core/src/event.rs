//! Adapter event types
//!
//! Events emitted by a platform BLE adapter. Payloads are converted into
//! these tagged variants at the adapter boundary; nothing downstream
//! handles raw platform payloads.

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, Peripheral};

/// An event from the platform BLE adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AdapterEvent {
    /// A peripheral advertisement was received
    Discovered(Peripheral),
    /// A connection to a peripheral completed
    Connected(Peripheral),
    /// A peripheral connection ended
    Disconnected {
        /// Identifier of the device that disconnected
        id: DeviceId,
    },
}

impl AdapterEvent {
    /// The device id this event refers to
    pub fn device_id(&self) -> &DeviceId {
        match self {
            AdapterEvent::Discovered(p) | AdapterEvent::Connected(p) => &p.id,
            AdapterEvent::Disconnected { id } => id,
        }
    }

    /// Short event kind label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterEvent::Discovered(_) => "discovered",
            AdapterEvent::Connected(_) => "connected",
            AdapterEvent::Disconnected { .. } => "disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_accessor() {
        let event = AdapterEvent::Disconnected { id: "x".into() };
        assert_eq!(event.device_id().as_str(), "x");

        let event = AdapterEvent::Discovered(Peripheral::new("y"));
        assert_eq!(event.device_id().as_str(), "y");
        assert_eq!(event.kind(), "discovered");
    }
}
