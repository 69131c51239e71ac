//! Test utilities for the session manager
//!
//! Provides a scriptable [`MockAdapter`] plus fixtures for driving a full
//! session in tests: failures can be injected per adapter call, adapter
//! events can be emitted from the test body, and every call the session
//! makes is recorded for assertion.

use std::sync::{Arc, Mutex};

use scout_core::{AdapterEvent, DeviceId, Peripheral};
use tokio::sync::{mpsc, watch};

use crate::adapter::{AdapterState, BleAdapter, ScanParams, EVENT_CHANNEL_SIZE};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::permission::StaticPermission;
use crate::session::{SessionHandle, SessionManager, SessionSnapshot};

use async_trait::async_trait;

/// A call the session manager made against the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `enable` was called
    Enable,
    /// `initialize` was called
    Initialize,
    /// `state` was queried
    State,
    /// `start_scan` was issued
    StartScan,
    /// `stop_scan` was issued
    StopScan,
    /// `connect` was issued for this device
    Connect(DeviceId),
    /// `disconnect` was issued for this device
    Disconnect(DeviceId),
    /// The event subscription was taken
    Subscribe,
}

#[derive(Debug)]
struct MockShared {
    state: AdapterState,
    missing: bool,
    enable_error: bool,
    state_error: Option<String>,
    scan_error: Option<String>,
    connect_error: Option<String>,
    disconnect_error: Option<String>,
    calls: Vec<MockCall>,
}

impl Default for MockShared {
    fn default() -> Self {
        Self {
            state: AdapterState::PoweredOn,
            missing: false,
            enable_error: false,
            state_error: None,
            scan_error: None,
            connect_error: None,
            disconnect_error: None,
            calls: Vec::new(),
        }
    }
}

/// Scriptable in-memory adapter for testing
pub struct MockAdapter {
    shared: Arc<Mutex<MockShared>>,
    event_rx: Option<mpsc::Receiver<AdapterEvent>>,
}

/// Test-side handle for scripting a [`MockAdapter`] and emitting events
#[derive(Clone)]
pub struct MockAdapterHandle {
    shared: Arc<Mutex<MockShared>>,
    event_tx: mpsc::Sender<AdapterEvent>,
}

impl MockAdapter {
    /// Create a mock adapter and its scripting handle.
    ///
    /// The event channel exists from construction, so events emitted
    /// before the session subscribes are buffered, not lost.
    pub fn new() -> (Self, MockAdapterHandle) {
        let shared = Arc::new(Mutex::new(MockShared::default()));
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        let adapter = Self {
            shared: shared.clone(),
            event_rx: Some(event_rx),
        };
        let handle = MockAdapterHandle { shared, event_tx };
        (adapter, handle)
    }
}

impl MockAdapterHandle {
    /// Script the adapter power state
    pub fn set_state(&self, state: AdapterState) {
        self.shared.lock().unwrap().state = state;
    }

    /// Make the adapter behave as entirely absent (capability missing)
    pub fn set_missing(&self) {
        self.shared.lock().unwrap().missing = true;
    }

    /// Make `enable` fail as if the radio could not be powered on
    pub fn fail_enable(&self) {
        self.shared.lock().unwrap().enable_error = true;
    }

    /// Make the next state queries fail with this reason
    pub fn fail_state_query(&self, reason: impl Into<String>) {
        self.shared.lock().unwrap().state_error = Some(reason.into());
    }

    /// Make `start_scan` fail with this reason
    pub fn fail_scan(&self, reason: impl Into<String>) {
        self.shared.lock().unwrap().scan_error = Some(reason.into());
    }

    /// Make `connect` fail with this reason
    pub fn fail_connect(&self, reason: impl Into<String>) {
        self.shared.lock().unwrap().connect_error = Some(reason.into());
    }

    /// Make `disconnect` fail with this reason
    pub fn fail_disconnect(&self, reason: impl Into<String>) {
        self.shared.lock().unwrap().disconnect_error = Some(reason.into());
    }

    /// Emit an adapter event to the subscriber.
    ///
    /// Returns false if the subscription has been released.
    pub async fn emit(&self, event: AdapterEvent) -> bool {
        self.event_tx.send(event).await.is_ok()
    }

    /// Emit a discovery event for a peripheral
    pub async fn emit_discovered(&self, peripheral: Peripheral) -> bool {
        self.emit(AdapterEvent::Discovered(peripheral)).await
    }

    /// Emit a connected event for a peripheral
    pub async fn emit_connected(&self, peripheral: Peripheral) -> bool {
        self.emit(AdapterEvent::Connected(peripheral)).await
    }

    /// Emit a disconnected event for a device id
    pub async fn emit_disconnected(&self, id: impl Into<DeviceId>) -> bool {
        self.emit(AdapterEvent::Disconnected { id: id.into() }).await
    }

    /// Snapshot of the calls recorded so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    /// Number of disconnect calls issued for this device
    pub fn disconnect_count(&self, id: &DeviceId) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Disconnect(d) if d == id))
            .count()
    }

    /// Number of scan starts issued
    pub fn scan_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::StartScan))
            .count()
    }
}

#[async_trait]
impl BleAdapter for MockAdapter {
    async fn enable(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::Enable);
        if shared.missing {
            return Err(SessionError::AdapterUnavailable);
        }
        if shared.enable_error {
            return Err(SessionError::AdapterDisabled);
        }
        Ok(())
    }

    async fn initialize(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::Initialize);
        if shared.missing {
            return Err(SessionError::AdapterUnavailable);
        }
        Ok(())
    }

    async fn state(&self) -> Result<AdapterState> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::State);
        if let Some(reason) = &shared.state_error {
            return Err(SessionError::Platform(reason.clone()));
        }
        Ok(shared.state)
    }

    async fn start_scan(&mut self, _params: &ScanParams) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::StartScan);
        if let Some(reason) = &shared.scan_error {
            return Err(SessionError::ScanFailed(reason.clone()));
        }
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::StopScan);
        Ok(())
    }

    async fn connect(&mut self, id: &DeviceId) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::Connect(id.clone()));
        if let Some(reason) = &shared.connect_error {
            return Err(SessionError::ConnectFailed {
                id: id.clone(),
                reason: reason.clone(),
            });
        }
        Ok(())
    }

    async fn disconnect(&mut self, id: &DeviceId) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::Disconnect(id.clone()));
        if let Some(reason) = &shared.disconnect_error {
            return Err(SessionError::DisconnectFailed {
                id: id.clone(),
                reason: reason.clone(),
            });
        }
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::Receiver<AdapterEvent> {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(MockCall::Subscribe);
        drop(shared);
        match self.event_rx.take() {
            Some(rx) => rx,
            None => {
                // A second subscription gets a channel that ends at once
                let (_, rx) = mpsc::channel(1);
                rx
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A full session running against a [`MockAdapter`]
pub struct TestSession {
    /// Handle into the running session
    pub session: SessionHandle,
    /// Scripting handle for the mock adapter
    pub adapter: MockAdapterHandle,
    /// The spawned session task
    pub task: tokio::task::JoinHandle<Result<()>>,
}

impl TestSession {
    /// Spawn a session with scan permission granted
    pub fn spawn(config: SessionConfig) -> Self {
        Self::spawn_with_permission(config, true)
    }

    /// Spawn a session with the given scan-permission answer
    pub fn spawn_with_permission(config: SessionConfig, granted: bool) -> Self {
        let (adapter, handle) = MockAdapter::new();
        let permission = if granted {
            StaticPermission::granted()
        } else {
            StaticPermission::denied()
        };
        let (manager, session) = SessionManager::new(adapter, permission, config);
        let task = tokio::spawn(manager.run());
        Self {
            session,
            adapter: handle,
            task,
        }
    }
}

/// Wait until a published snapshot satisfies the condition.
///
/// Panics if the session ends first; wrap in `tokio::time::timeout` when a
/// test could otherwise hang.
pub async fn wait_for_snapshot<F>(
    rx: &mut watch::Receiver<SessionSnapshot>,
    mut cond: F,
) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    loop {
        {
            let snapshot = rx.borrow();
            if cond(&snapshot) {
                return snapshot.clone();
            }
        }
        if rx.changed().await.is_err() {
            panic!("session ended before snapshot condition was met");
        }
    }
}

/// Build a named test peripheral
pub fn named_peripheral(id: &str, name: &str) -> Peripheral {
    Peripheral::new(id).with_name(name)
}
