//! Session manager - the discovery-and-connection state machine
//!
//! The [`SessionManager`] owns the scan state, the registry of discovered
//! devices, the current connection, and the latest status message. It runs
//! a single event loop over adapter events, user intents, and the scan
//! deadline; every mutating path funnels through the loop so the registry
//! and connection id always reflect the last adapter event rather than an
//! optimistic guess by the presentation layer.
//!
//! The presentation layer holds a [`SessionHandle`]: intents go in on a
//! command channel, state comes back as immutable [`SessionSnapshot`]s on
//! a watch channel, republished after every state transition.

use scout_core::{AdapterEvent, DeviceId, DeviceRegistry, Peripheral};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::{BleAdapter, ScanParams};
use crate::config::{LateDiscoveryPolicy, SessionConfig};
use crate::error::{Result, SessionError};
use crate::permission::PermissionGate;

/// Status messages surfaced to the presentation layer.
///
/// The literal strings are part of the observable contract.
pub mod status {
    /// Session is up, nothing in flight
    pub const READY: &str = "Ready";
    /// The BLE capability is missing entirely; fatal for the session
    pub const MODULE_UNAVAILABLE: &str = "BLE module not available";
    /// Adapter is powered off; the user must enable it and retry
    pub const ENABLE_BLUETOOTH: &str = "Please enable Bluetooth";
    /// Scan permission was denied; the user must grant it and retry
    pub const PERMISSION_REQUIRED: &str = "Location permission required";
    /// A scan is in progress
    pub const SCANNING: &str = "Scanning for devices...";
    /// The scan window closed with at least one device discovered
    pub const SCAN_COMPLETED: &str = "Scan completed";
    /// The scan window closed with an empty registry
    pub const NO_DEVICES_FOUND: &str = "No devices found";
    /// A disconnect call is in flight
    pub const DISCONNECTING: &str = "Disconnecting...";
}

/// Which presentation the device list is rendered with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Plain device list (default)
    #[default]
    List,
    /// Radar chart
    Radar,
}

impl ViewMode {
    fn toggled(self) -> Self {
        match self {
            ViewMode::List => ViewMode::Radar,
            ViewMode::Radar => ViewMode::List,
        }
    }
}

/// Immutable view of the session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Whether a scan is in progress
    pub scanning: bool,
    /// Latest human-readable status message
    pub status: String,
    /// Discovered devices in first-seen order
    pub devices: Vec<Peripheral>,
    /// Currently connected device, if any
    pub connected: Option<DeviceId>,
    /// Current presentation mode
    pub view_mode: ViewMode,
}

/// User intents sent to the session task
#[derive(Debug)]
pub enum SessionCommand {
    /// Begin a discovery scan
    StartScan,
    /// Connect to a discovered peripheral
    Connect(Peripheral),
    /// Disconnect from a device
    DisconnectFrom(DeviceId),
    /// Toggle between list and radar presentation
    ToggleView,
    /// Request a point-in-time snapshot
    GetSnapshot(oneshot::Sender<SessionSnapshot>),
    /// End the session
    Shutdown,
}

/// Handle for driving a running [`SessionManager`]
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Request a discovery scan
    pub async fn start_scan(&self) -> Result<()> {
        self.send(SessionCommand::StartScan).await
    }

    /// Request a connection to a peripheral
    pub async fn connect(&self, peripheral: Peripheral) -> Result<()> {
        self.send(SessionCommand::Connect(peripheral)).await
    }

    /// Request a disconnect from a device
    pub async fn disconnect_from(&self, id: DeviceId) -> Result<()> {
        self.send(SessionCommand::DisconnectFrom(id)).await
    }

    /// Toggle the presentation mode
    pub async fn toggle_view(&self) -> Result<()> {
        self.send(SessionCommand::ToggleView).await
    }

    /// Fetch a point-in-time snapshot from the session task
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot(tx)).await?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Watch snapshots as they are republished
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// End the session, tearing down subscriptions and connections
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

/// The discovery-and-connection session manager
pub struct SessionManager<A: BleAdapter, P: PermissionGate> {
    adapter: A,
    permission: P,
    config: SessionConfig,
    registry: DeviceRegistry,
    connected: Option<DeviceId>,
    scanning: bool,
    status: String,
    view_mode: ViewMode,
    /// False once the BLE capability turned out to be missing entirely
    capability_available: bool,
    /// Deadline of the scan in progress, if any
    scan_deadline: Option<Instant>,
    events: mpsc::Receiver<AdapterEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<A, P> SessionManager<A, P>
where
    A: BleAdapter + Send + 'static,
    P: PermissionGate + Send + 'static,
{
    /// Create a session manager and its handle
    pub fn new(adapter: A, permission: P, config: SessionConfig) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_queue_size);

        let initial = SessionSnapshot {
            scanning: false,
            status: status::READY.to_string(),
            devices: Vec::new(),
            connected: None,
            view_mode: ViewMode::default(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let manager = Self {
            adapter,
            permission,
            config,
            registry: DeviceRegistry::new(),
            connected: None,
            scanning: false,
            status: status::READY.to_string(),
            view_mode: ViewMode::default(),
            capability_available: true,
            scan_deadline: None,
            events: closed_event_channel(),
            command_rx,
            snapshot_tx,
        };
        let handle = SessionHandle {
            command_tx,
            snapshot_rx,
        };

        (manager, handle)
    }

    /// Run the session until shutdown.
    ///
    /// Initializes the adapter, then loops over adapter events, user
    /// intents, and the scan deadline. On exit the event subscription is
    /// released and any active connection gets one best-effort disconnect.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting BLE session ({})", self.adapter.name());
        self.initialize().await;

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::StartScan) => self.start_scan().await,
                        Some(SessionCommand::Connect(p)) => self.connect(p).await,
                        Some(SessionCommand::DisconnectFrom(id)) => {
                            self.disconnect_from(id).await;
                        }
                        Some(SessionCommand::ToggleView) => {
                            self.view_mode = self.view_mode.toggled();
                            self.publish();
                        }
                        Some(SessionCommand::GetSnapshot(tx)) => {
                            let _ = tx.send(self.snapshot());
                        }
                        Some(SessionCommand::Shutdown) => {
                            info!("Session shutdown requested");
                            break;
                        }
                        None => break,
                    }
                }

                _ = scan_timer(self.scan_deadline), if self.scan_deadline.is_some() => {
                    self.finish_scan().await;
                }
            }
        }

        self.teardown().await;
        info!("BLE session stopped");
        Ok(())
    }

    /// Enable and initialize the adapter, then take the event subscription.
    ///
    /// A missing capability is fatal for the session: every later scan or
    /// connect intent answers with the same status. A failed enable is
    /// recoverable; the user retries manually via `start_scan`.
    async fn initialize(&mut self) {
        match self.adapter.enable().await {
            Ok(()) => match self.adapter.initialize().await {
                Ok(()) => {}
                Err(SessionError::AdapterUnavailable) => {
                    warn!("BLE capability missing, session disabled");
                    self.capability_available = false;
                    self.set_status(status::MODULE_UNAVAILABLE);
                    return;
                }
                Err(e) => {
                    warn!("Adapter initialization failed [{}]: {}", e.error_code(), e);
                    self.set_status(status::ENABLE_BLUETOOTH);
                }
            },
            Err(SessionError::AdapterUnavailable) => {
                warn!("BLE capability missing, session disabled");
                self.capability_available = false;
                self.set_status(status::MODULE_UNAVAILABLE);
                return;
            }
            Err(e) => {
                warn!("Could not enable adapter [{}]: {}", e.error_code(), e);
                self.set_status(status::ENABLE_BLUETOOTH);
            }
        }

        self.events = self.adapter.subscribe();
        self.publish();
    }

    /// Release the event subscription and close any active connection.
    ///
    /// The disconnect targets the connection id as it is *now*, not a
    /// snapshot from subscription time. Errors are logged, not surfaced.
    async fn teardown(&mut self) {
        self.events = closed_event_channel();

        if let Some(id) = self.connected.clone() {
            debug!("Closing connection to {} on teardown", id);
            if let Err(e) = self.adapter.disconnect(&id).await {
                warn!("Teardown disconnect for {} failed: {}", id, e);
            }
        }

        self.scanning = false;
        self.scan_deadline = None;
        self.publish();
    }

    /// Start a discovery scan.
    ///
    /// No-op while a scan is active. Gates in order: adapter power state,
    /// then scan permission; only then is the registry cleared and the
    /// scan issued. The deadline timer runs independently of whatever the
    /// platform does with the requested window.
    async fn start_scan(&mut self) {
        if !self.capability_available {
            self.set_status(status::MODULE_UNAVAILABLE);
            return;
        }
        if self.scanning {
            debug!("Scan already in progress, ignoring start request");
            return;
        }

        match self.adapter.state().await {
            Ok(state) if state.is_powered_on() => {}
            Ok(state) => {
                debug!("Adapter not ready for scan: state={}", state);
                self.set_status(status::ENABLE_BLUETOOTH);
                return;
            }
            Err(e) => {
                self.fail_scan(e);
                return;
            }
        }

        if !self.permission.ensure_scan_permission().await {
            debug!("Scan permission not granted");
            self.set_status(status::PERMISSION_REQUIRED);
            return;
        }

        self.registry.clear();
        self.scanning = true;
        self.set_status(status::SCANNING);

        let params = ScanParams::from_config(&self.config);
        if let Err(e) = self.adapter.start_scan(&params).await {
            self.scanning = false;
            self.fail_scan(e);
            return;
        }

        info!("Scan started ({:?} window)", self.config.scan_window);
        self.scan_deadline = Some(Instant::now() + self.config.scan_window);
    }

    fn fail_scan(&mut self, e: SessionError) {
        warn!("Scan failed [{}]: {}", e.error_code(), e);
        self.scanning = false;
        self.scan_deadline = None;
        self.set_status(&format!("Scan failed: {}", failure_reason(e)));
    }

    /// The scan window elapsed; close out the scan
    async fn finish_scan(&mut self) {
        self.scan_deadline = None;
        self.scanning = false;

        // The platform is not trusted to honor the requested window
        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Stop-scan after window close failed: {}", e);
        }

        let found = self.registry.len();
        info!("Scan window closed, {} device(s) discovered", found);
        if found > 0 {
            self.set_status(status::SCAN_COMPLETED);
        } else {
            self.set_status(status::NO_DEVICES_FOUND);
        }
    }

    fn handle_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::Discovered(p) => self.on_discovered(p),
            AdapterEvent::Connected(p) => self.on_connected(p),
            AdapterEvent::Disconnected { id } => self.on_disconnected(id),
        }
    }

    /// Record a discovery. Nameless advertisements never enter the
    /// registry; late ones follow the configured policy.
    fn on_discovered(&mut self, peripheral: Peripheral) {
        if !peripheral.has_resolvable_name() {
            debug!("Dropping unnamed advertisement from {}", peripheral.id);
            return;
        }
        if !self.scanning && self.config.late_discovery == LateDiscoveryPolicy::Drop {
            debug!("Dropping late discovery of {}", peripheral.id);
            return;
        }

        let name = peripheral.display_name().to_string();
        let id = peripheral.id.clone();
        if self.registry.upsert(peripheral) {
            debug!("Discovered {} ({})", name, id);
        }
        self.publish();
    }

    fn on_connected(&mut self, peripheral: Peripheral) {
        let label = peripheral.display_name_or_id().to_string();
        info!("Connected to {} ({})", label, peripheral.id);
        self.connected = Some(peripheral.id.clone());
        self.set_status(&format!("Connected to {}", label));
    }

    /// Clear the connection only when the event matches the current id.
    /// A stale disconnect for some other device must not tear down an
    /// unrelated active connection.
    fn on_disconnected(&mut self, id: DeviceId) {
        if self.connected.as_ref() == Some(&id) {
            info!("Disconnected from {}", id);
            self.connected = None;
            self.set_status(&format!("Disconnected from {}", id));
        } else {
            debug!("Ignoring disconnect event for non-current device {}", id);
        }
    }

    /// Issue a connect call. The connection state changes only via the
    /// adapter's connected event, never optimistically here.
    async fn connect(&mut self, peripheral: Peripheral) {
        if !self.capability_available {
            self.set_status(status::MODULE_UNAVAILABLE);
            return;
        }

        let label = peripheral.display_name_or_id().to_string();
        self.set_status(&format!("Connecting to {}...", label));

        if let Err(e) = self.adapter.connect(&peripheral.id).await {
            warn!("Connect to {} failed [{}]: {}", peripheral.id, e.error_code(), e);
            self.set_status(&format!("Connection failed: {}", failure_reason(e)));
        }
    }

    /// Issue a disconnect call. On failure the connection state is left
    /// as-is; the disconnected event stays the single source of truth.
    async fn disconnect_from(&mut self, id: DeviceId) {
        if !self.capability_available {
            self.set_status(status::MODULE_UNAVAILABLE);
            return;
        }

        self.set_status(status::DISCONNECTING);

        if let Err(e) = self.adapter.disconnect(&id).await {
            warn!("Disconnect from {} failed [{}]: {}", id, e.error_code(), e);
            self.set_status(&format!("Disconnection failed: {}", failure_reason(e)));
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            scanning: self.scanning,
            status: self.status.clone(),
            devices: self.registry.devices(),
            connected: self.connected.clone(),
            view_mode: self.view_mode,
        }
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.publish();
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }
}

/// A pre-closed event channel, used before initialization and after
/// teardown; the select branch over it simply stays disabled.
fn closed_event_channel() -> mpsc::Receiver<AdapterEvent> {
    let (_, rx) = mpsc::channel(1);
    rx
}

/// Sleep until the scan deadline, or forever when no scan is active
async fn scan_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Extract the human-readable reason for a status message
fn failure_reason(e: SessionError) -> String {
    match e {
        SessionError::ScanFailed(reason)
        | SessionError::Platform(reason)
        | SessionError::ConnectFailed { reason, .. }
        | SessionError::DisconnectFailed { reason, .. } => reason,
        other => other.to_string(),
    }
}
