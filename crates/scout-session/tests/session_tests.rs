//! Integration tests for the session manager
//!
//! Each test drives a full session task against the scriptable mock
//! adapter. Timer-driven scenarios run with a paused clock so the scan
//! window elapses deterministically.

use scout_core::Peripheral;
use scout_session::session::status;
use scout_session::test_utils::{named_peripheral, wait_for_snapshot, TestSession};
use scout_session::{
    AdapterState, LateDiscoveryPolicy, SessionConfig, SessionConfigBuilder,
};

fn default_config() -> SessionConfig {
    SessionConfig::default()
}

// ===== Scan gating =====

#[tokio::test]
async fn scan_with_adapter_off_reports_enable_bluetooth() {
    let t = TestSession::spawn(default_config());
    t.adapter.set_state(AdapterState::PoweredOff);

    t.session.start_scan().await.unwrap();

    let mut w = t.session.watch();
    let snap = wait_for_snapshot(&mut w, |s| s.status == status::ENABLE_BLUETOOTH).await;
    assert!(!snap.scanning);
    assert_eq!(t.adapter.scan_count(), 0);
}

#[tokio::test]
async fn scan_without_permission_reports_permission_required() {
    let t = TestSession::spawn_with_permission(default_config(), false);

    t.session.start_scan().await.unwrap();

    let mut w = t.session.watch();
    let snap = wait_for_snapshot(&mut w, |s| s.status == status::PERMISSION_REQUIRED).await;
    assert!(!snap.scanning);
    assert_eq!(t.adapter.scan_count(), 0);
}

#[tokio::test]
async fn scan_start_failure_reports_reason() {
    let t = TestSession::spawn(default_config());
    t.adapter.fail_scan("radio busy");

    t.session.start_scan().await.unwrap();

    let mut w = t.session.watch();
    let snap = wait_for_snapshot(&mut w, |s| s.status == "Scan failed: radio busy").await;
    assert!(!snap.scanning);
}

#[tokio::test]
async fn scan_state_query_failure_reports_reason() {
    let t = TestSession::spawn(default_config());
    t.adapter.fail_state_query("dbus error");

    t.session.start_scan().await.unwrap();

    let mut w = t.session.watch();
    let snap = wait_for_snapshot(&mut w, |s| s.status == "Scan failed: dbus error").await;
    assert!(!snap.scanning);
    assert_eq!(t.adapter.scan_count(), 0);
}

// ===== Scan lifecycle =====

#[tokio::test(start_paused = true)]
async fn scan_timeout_with_no_devices() {
    let t = TestSession::spawn(default_config());

    t.session.start_scan().await.unwrap();

    let mut w = t.session.watch();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    // The paused clock advances to the scan deadline once everything idles
    let snap = wait_for_snapshot(&mut w, |s| s.status == status::NO_DEVICES_FOUND).await;
    assert!(!snap.scanning);
    assert!(snap.devices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn scan_with_discovery_reports_completed() {
    let t = TestSession::spawn(default_config());

    t.session.start_scan().await.unwrap();
    let mut w = t.session.watch();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.devices.len() == 1).await;

    let snap = wait_for_snapshot(&mut w, |s| s.status == status::SCAN_COMPLETED).await;
    assert!(!snap.scanning);
    assert_eq!(snap.devices.len(), 1);
    assert_eq!(snap.devices[0].display_name(), "Alpha");
}

#[tokio::test(start_paused = true)]
async fn second_scan_while_scanning_is_noop() {
    let t = TestSession::spawn(default_config());

    t.session.start_scan().await.unwrap();
    let mut w = t.session.watch();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.devices.len() == 1).await;

    // Second request must not clear the registry or restart the scan
    t.session.start_scan().await.unwrap();
    let snap = t.session.snapshot().await.unwrap();
    assert!(snap.scanning);
    assert_eq!(snap.status, status::SCANNING);
    assert_eq!(snap.devices.len(), 1);
    assert_eq!(t.adapter.scan_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_scan_clears_previous_registry() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.scanning).await;
    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.status == status::SCAN_COMPLETED).await;

    t.session.start_scan().await.unwrap();
    let snap = wait_for_snapshot(&mut w, |s| s.scanning).await;
    assert!(snap.devices.is_empty());
    assert_eq!(snap.status, status::SCANNING);
    assert_eq!(t.adapter.scan_count(), 2);
}

// ===== Discovery filtering =====

#[tokio::test(start_paused = true)]
async fn nameless_discovery_is_dropped() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    // No name field, no advertised local name
    assert!(t.adapter.emit_discovered(Peripheral::new("aa:00")).await);
    // A named device afterwards acts as the ordering barrier
    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha")).await);

    let snap = wait_for_snapshot(&mut w, |s| !s.devices.is_empty()).await;
    assert_eq!(snap.devices.len(), 1);
    assert_eq!(snap.devices[0].id.as_str(), "aa:01");
}

#[tokio::test(start_paused = true)]
async fn repeated_discovery_updates_in_place() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha")).await);
    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Alpha rev2")).await);

    let snap = wait_for_snapshot(&mut w, |s| {
        s.devices.first().is_some_and(|d| d.display_name() == "Alpha rev2")
    })
    .await;
    assert_eq!(snap.devices.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn display_name_prefers_name_field_over_local_name() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.scanning).await;

    let both = Peripheral::new("aa:01")
        .with_name("Named")
        .with_local_name("Advertised");
    let local_only = Peripheral::new("aa:02").with_local_name("Advertised Only");
    assert!(t.adapter.emit_discovered(both).await);
    assert!(t.adapter.emit_discovered(local_only).await);

    let snap = wait_for_snapshot(&mut w, |s| s.devices.len() == 2).await;
    assert_eq!(snap.devices[0].display_name(), "Named");
    assert_eq!(snap.devices[1].display_name(), "Advertised Only");
}

// ===== Late discovery policies =====

#[tokio::test(start_paused = true)]
async fn late_discovery_accepted_by_default() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.status == status::NO_DEVICES_FOUND).await;

    // Arrives after the window closed but before any next scan
    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Latecomer")).await);
    let snap = wait_for_snapshot(&mut w, |s| !s.devices.is_empty()).await;
    assert_eq!(snap.devices[0].display_name(), "Latecomer");
}

#[tokio::test(start_paused = true)]
async fn late_discovery_dropped_when_configured() {
    let config = SessionConfigBuilder::new()
        .late_discovery(LateDiscoveryPolicy::Drop)
        .build();
    let t = TestSession::spawn(config);
    let mut w = t.session.watch();

    t.session.start_scan().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.status == status::NO_DEVICES_FOUND).await;

    assert!(t.adapter.emit_discovered(named_peripheral("aa:01", "Latecomer")).await);
    // A connected event acts as the ordering barrier behind the discovery
    assert!(t.adapter.emit_connected(named_peripheral("bb:01", "Beacon")).await);
    let snap = wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;
    assert!(snap.devices.is_empty());
}

// ===== Connection lifecycle =====

#[tokio::test]
async fn connect_flow_sets_connection_on_event() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();
    let device = named_peripheral("aa:01", "Alpha");

    t.session.connect(device.clone()).await.unwrap();
    wait_for_snapshot(&mut w, |s| s.status == "Connecting to Alpha...").await;

    // The connection state flips only when the adapter reports it
    let snap = t.session.snapshot().await.unwrap();
    assert_eq!(snap.connected, None);

    assert!(t.adapter.emit_connected(device).await);
    let snap = wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;
    assert_eq!(snap.connected.unwrap().as_str(), "aa:01");
    assert_eq!(snap.status, "Connected to Alpha");
}

#[tokio::test]
async fn connect_failure_leaves_state_disconnected() {
    let t = TestSession::spawn(default_config());
    t.adapter.fail_connect("timed out");
    let mut w = t.session.watch();

    t.session.connect(named_peripheral("aa:01", "Alpha")).await.unwrap();

    let snap = wait_for_snapshot(&mut w, |s| s.status == "Connection failed: timed out").await;
    assert_eq!(snap.connected, None);
}

#[tokio::test]
async fn matched_disconnect_clears_connection() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    assert!(t.adapter.emit_connected(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;

    assert!(t.adapter.emit_disconnected("aa:01").await);
    let snap = wait_for_snapshot(&mut w, |s| s.connected.is_none()).await;
    assert_eq!(snap.status, "Disconnected from aa:01");
}

#[tokio::test]
async fn unmatched_disconnect_is_ignored() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    assert!(t.adapter.emit_connected(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;

    // Stale disconnect for some other device
    assert!(t.adapter.emit_disconnected("zz:99").await);
    // A discovery behind it guarantees the disconnect was processed
    assert!(t.adapter.emit_discovered(named_peripheral("bb:01", "Beta")).await);
    let snap = wait_for_snapshot(&mut w, |s| !s.devices.is_empty()).await;

    assert_eq!(snap.connected.unwrap().as_str(), "aa:01");
    assert_eq!(snap.status, "Connected to Alpha");
}

#[tokio::test]
async fn disconnect_failure_does_not_force_clear() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    assert!(t.adapter.emit_connected(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;

    t.adapter.fail_disconnect("busy");
    t.session.disconnect_from("aa:01".into()).await.unwrap();

    let snap = wait_for_snapshot(&mut w, |s| s.status == "Disconnection failed: busy").await;
    assert_eq!(snap.connected.unwrap().as_str(), "aa:01");
}

// ===== Session lifecycle =====

#[tokio::test]
async fn enable_failure_is_recoverable() {
    let t = TestSession::spawn(default_config());
    t.adapter.fail_enable();
    let mut w = t.session.watch();

    wait_for_snapshot(&mut w, |s| s.status == status::ENABLE_BLUETOOTH).await;

    // After the user turns the radio on, a manual retry goes through
    t.session.start_scan().await.unwrap();
    let snap = wait_for_snapshot(&mut w, |s| s.scanning).await;
    assert_eq!(snap.status, status::SCANNING);
}

#[tokio::test]
async fn missing_capability_disables_session() {
    let t = TestSession::spawn(default_config());
    t.adapter.set_missing();
    let mut w = t.session.watch();

    wait_for_snapshot(&mut w, |s| s.status == status::MODULE_UNAVAILABLE).await;

    // Scan and connect intents keep answering with the same status
    t.session.start_scan().await.unwrap();
    let snap = t.session.snapshot().await.unwrap();
    assert_eq!(snap.status, status::MODULE_UNAVAILABLE);
    assert!(!snap.scanning);
    assert_eq!(t.adapter.scan_count(), 0);
}

#[tokio::test]
async fn teardown_disconnects_active_connection_once() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    assert!(t.adapter.emit_connected(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;

    t.session.shutdown().await.unwrap();
    t.task.await.unwrap().unwrap();

    assert_eq!(t.adapter.disconnect_count(&"aa:01".into()), 1);
    // The event subscription is gone with the session
    assert!(!t.adapter.emit_disconnected("aa:01").await);
}

#[tokio::test]
async fn teardown_disconnect_failure_is_swallowed() {
    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    assert!(t.adapter.emit_connected(named_peripheral("aa:01", "Alpha")).await);
    wait_for_snapshot(&mut w, |s| s.connected.is_some()).await;

    t.adapter.fail_disconnect("gone");
    t.session.shutdown().await.unwrap();
    t.task.await.unwrap().unwrap();

    assert_eq!(t.adapter.disconnect_count(&"aa:01".into()), 1);
}

#[tokio::test]
async fn teardown_without_connection_issues_no_disconnect() {
    let t = TestSession::spawn(default_config());

    t.session.shutdown().await.unwrap();
    t.task.await.unwrap().unwrap();

    assert!(t
        .adapter
        .calls()
        .iter()
        .all(|c| !matches!(c, scout_session::test_utils::MockCall::Disconnect(_))));
}

// ===== View toggle =====

#[tokio::test]
async fn toggle_view_flips_mode() {
    use scout_session::ViewMode;

    let t = TestSession::spawn(default_config());
    let mut w = t.session.watch();

    t.session.toggle_view().await.unwrap();
    let snap = wait_for_snapshot(&mut w, |s| s.view_mode == ViewMode::Radar).await;
    assert_eq!(snap.view_mode, ViewMode::Radar);

    t.session.toggle_view().await.unwrap();
    wait_for_snapshot(&mut w, |s| s.view_mode == ViewMode::List).await;
}
