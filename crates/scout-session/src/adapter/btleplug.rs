//! btleplug-backed platform adapter
//!
//! Maps btleplug `CentralEvent`s into [`AdapterEvent`]s at the boundary,
//! resolving peripheral properties (local name, RSSI, manufacturer data)
//! before anything downstream sees the event.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use scout_core::{AdapterEvent, DeviceId, Peripheral};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{AdapterState, BleAdapter, ScanParams, EVENT_CHANNEL_SIZE};
use crate::error::{Result, SessionError};

/// Platform BLE adapter backed by btleplug
pub struct BtleplugAdapter {
    manager: Option<Manager>,
    adapter: Option<Adapter>,
}

impl BtleplugAdapter {
    /// Create an adapter that has not yet been enabled
    pub fn new() -> Self {
        Self {
            manager: None,
            adapter: None,
        }
    }

    fn central(&self) -> Result<&Adapter> {
        self.adapter
            .as_ref()
            .ok_or(SessionError::AdapterUnavailable)
    }

    /// Find the platform peripheral for a session device id.
    ///
    /// btleplug addresses peripherals by `PeripheralId`; the session layer
    /// only carries its string form, so we match on the rendered id.
    async fn find_peripheral(
        &self,
        id: &DeviceId,
    ) -> Result<btleplug::platform::Peripheral> {
        let central = self.central()?;
        let peripherals = central
            .peripherals()
            .await
            .map_err(|e| SessionError::Platform(e.to_string()))?;
        peripherals
            .into_iter()
            .find(|p| p.id().to_string() == id.as_str())
            .ok_or_else(|| SessionError::Platform(format!("device {id} not known to adapter")))
    }
}

impl Default for BtleplugAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a `CentralEvent` into a session [`AdapterEvent`]
async fn resolve_event(central: &Adapter, event: CentralEvent) -> Option<AdapterEvent> {
    match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
            Some(AdapterEvent::Discovered(resolve_peripheral(central, &id).await))
        }
        CentralEvent::DeviceConnected(id) => {
            Some(AdapterEvent::Connected(resolve_peripheral(central, &id).await))
        }
        CentralEvent::DeviceDisconnected(id) => Some(AdapterEvent::Disconnected {
            id: DeviceId(id.to_string()),
        }),
        // Advertisement detail events are folded into DeviceUpdated by btleplug
        _ => None,
    }
}

/// Build a session peripheral record from platform properties
async fn resolve_peripheral(central: &Adapter, id: &PeripheralId) -> Peripheral {
    let mut record = Peripheral::new(id.to_string());

    let props = match central.peripheral(id).await {
        Ok(p) => p.properties().await.ok().flatten(),
        Err(e) => {
            debug!("Could not resolve properties for {}: {}", id, e);
            None
        }
    };

    if let Some(props) = props {
        if let Some(name) = props.local_name {
            record = record.with_local_name(name);
        }
        if let Some(rssi) = props.rssi {
            record = record.with_rssi(rssi);
        }
        // Keep manufacturer data as an opaque blob: company id (LE) then bytes
        let mut payload = Vec::new();
        for (company, data) in &props.manufacturer_data {
            payload.extend_from_slice(&company.to_le_bytes());
            payload.extend_from_slice(data);
        }
        record = record.with_advertisement(payload);
    }

    record
}

#[async_trait]
impl BleAdapter for BtleplugAdapter {
    async fn enable(&mut self) -> Result<()> {
        let manager = Manager::new()
            .await
            .map_err(|_| SessionError::AdapterUnavailable)?;
        let adapters = manager
            .adapters()
            .await
            .map_err(|_| SessionError::AdapterUnavailable)?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(SessionError::AdapterUnavailable)?;

        let state = adapter
            .adapter_state()
            .await
            .map_err(|e| SessionError::Platform(e.to_string()))?;
        if state == CentralState::PoweredOff {
            // btleplug cannot power the radio on; the user has to
            return Err(SessionError::AdapterDisabled);
        }

        info!("BLE adapter enabled");
        self.manager = Some(manager);
        self.adapter = Some(adapter);
        Ok(())
    }

    async fn initialize(&mut self) -> Result<()> {
        // Enabling already acquired the platform handle; just verify it
        self.central().map(|_| ())
    }

    async fn state(&self) -> Result<AdapterState> {
        let central = self.central()?;
        let state = central
            .adapter_state()
            .await
            .map_err(|e| SessionError::Platform(e.to_string()))?;
        Ok(match state {
            CentralState::PoweredOn => AdapterState::PoweredOn,
            CentralState::PoweredOff => AdapterState::PoweredOff,
            _ => AdapterState::Unknown,
        })
    }

    async fn start_scan(&mut self, params: &ScanParams) -> Result<()> {
        // btleplug exposes no duplicate/scan-mode knobs; the hints in
        // `params` apply on platforms that honor them
        debug!(
            "Starting scan: window={:?}, mode={:?}",
            params.window, params.mode
        );
        self.central()?
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| SessionError::ScanFailed(e.to_string()))
    }

    async fn stop_scan(&mut self) -> Result<()> {
        self.central()?
            .stop_scan()
            .await
            .map_err(|e| SessionError::Platform(e.to_string()))
    }

    async fn connect(&mut self, id: &DeviceId) -> Result<()> {
        let peripheral = self.find_peripheral(id).await?;
        peripheral
            .connect()
            .await
            .map_err(|e| SessionError::ConnectFailed {
                id: id.clone(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&mut self, id: &DeviceId) -> Result<()> {
        let peripheral = self.find_peripheral(id).await?;
        peripheral
            .disconnect()
            .await
            .map_err(|e| SessionError::DisconnectFailed {
                id: id.clone(),
                reason: e.to_string(),
            })
    }

    fn subscribe(&mut self) -> mpsc::Receiver<AdapterEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        let Some(central) = self.adapter.clone() else {
            // No platform handle; hand back a channel that ends immediately
            return rx;
        };

        tokio::spawn(async move {
            let mut events = match central.events().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to subscribe to adapter events: {}", e);
                    return;
                }
            };

            while let Some(event) = events.next().await {
                if let Some(mapped) = resolve_event(&central, event).await {
                    if tx.send(mapped).await.is_err() {
                        // Subscriber released the handle
                        break;
                    }
                }
            }
            debug!("Adapter event pump stopped");
        });

        rx
    }

    fn name(&self) -> &str {
        "btleplug"
    }
}
