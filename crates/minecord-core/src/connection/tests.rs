use super::*;
use crate::config::ConnectionConfig;
use crate::event_bus::ConnectionEvent;
use crate::transport::memory::{MemoryConnector, MemorySession};
use crate::transport::TransportEvent;
use std::sync::Arc;
use std::time::Duration;

fn config(name: &str) -> ConnectionConfig {
    ConnectionConfig::new(name, "mc.example.net", "fisher")
}

fn spawn_with(connector: &MemoryConnector) -> Arc<ConnectionManager> {
    ConnectionManager::spawn(
        config("Fisher-1"),
        Arc::new(connector.clone()),
        ManagerOptions::default(),
    )
}

async fn wait_for(
    manager: &ConnectionManager,
    check: impl FnMut(&ConnectionStatus) -> bool,
) -> ConnectionStatus {
    let mut rx = manager.subscribe_state();
    let status = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(check))
        .await
        .expect("timed out waiting for status")
        .expect("manager exited");
    status.clone()
}

async fn wait_phase(manager: &ConnectionManager, phase: Phase) -> ConnectionStatus {
    wait_for(manager, |s| s.phase == phase).await
}

async fn wait_session(connector: &MemoryConnector, count: usize) -> MemorySession {
    for _ in 0..1_000 {
        if connector.session_count() >= count {
            if let Some(session) = connector.last_session() {
                return session;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no session {} opened", count);
}

fn assert_connected_at_invariant(status: &ConnectionStatus) {
    assert_eq!(
        status.connected_at.is_some(),
        status.phase == Phase::Connected,
        "connected_at out of sync in {:?}",
        status
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_connects_and_spawns() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    assert_eq!(manager.phase(), Phase::Idle);
    assert!(!manager.is_running());

    assert!(manager.start().await.unwrap());
    let status = wait_phase(&manager, Phase::Connected).await;
    assert_connected_at_invariant(&status);
    assert!(manager.is_running());
    assert_eq!(connector.connect_count(), 1);

    // Already running
    assert!(!manager.start().await.unwrap());
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connected_at_invariant_across_lifecycle() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    let mut rx = manager.subscribe_state();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let status = rx.borrow_and_update().clone();
            assert_connected_at_invariant(&status);
            seen.push(status.phase);
            if status.phase == Phase::Stopped || rx.changed().await.is_err() {
                return seen;
            }
        }
    });

    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
    wait_session(&connector, 1).await.drop_connection();
    wait_phase(&manager, Phase::Disconnected).await;
    wait_phase(&manager, Phase::Connected).await;
    manager.stop().await.unwrap();

    let seen = observer.await.unwrap();
    assert!(seen.contains(&Phase::Connected));
    assert!(seen.contains(&Phase::Disconnected));
    assert_eq!(seen.last(), Some(&Phase::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_sequence_and_reset_on_start() {
    let connector = MemoryConnector::new();
    connector.fail_next_connects(5);
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();

    let mut delays = Vec::new();
    for n in 1..=5u64 {
        let status = wait_for(&manager, |s| s.reconnect_count >= n).await;
        assert_eq!(status.reconnect_count, n);
        assert_eq!(status.phase, Phase::Disconnected);
        assert!(status.next_retry_at.is_some());
        delays.push(status.next_retry_delay_ms.unwrap());
    }
    assert_eq!(delays, vec![2_000, 3_000, 4_500, 6_750, 10_125]);

    // Sixth attempt succeeds
    wait_phase(&manager, Phase::Connected).await;
    assert_eq!(connector.connect_count(), 6);

    // An explicit start resets the policy to the floor
    manager.stop().await.unwrap();
    connector.fail_next_connects(1);
    assert!(manager.start().await.unwrap());
    let status = wait_for(&manager, |s| s.reconnect_count >= 6).await;
    assert_eq!(status.next_retry_delay_ms, Some(2_000));
    assert!(status.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_for_delay() {
    let connector = MemoryConnector::new();
    connector.fail_next_connects(1);
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Disconnected).await;

    tokio::time::sleep(Duration::from_millis(1_900)).await;
    assert_eq!(connector.connect_count(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_send_rejected() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);

    for text in ["", "   ", "\n\t"] {
        let report = manager.send_chat(text).await;
        assert!(!report.ok);
        assert!(!report.queued);
        assert!(report.error.is_some());
    }
    assert_eq!(manager.status().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_while_connected_goes_straight_out() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;

    let report = manager.send_chat("  hello  ").await;
    assert_eq!(report, SendReport::sent());
    assert_eq!(connector.sent_lines(), vec!["hello".to_string()]);

    connector.fail_sends(true);
    let report = manager.send_chat("again").await;
    assert!(!report.ok);
    assert!(!report.queued);
    assert_eq!(manager.status().queued, 0);
}

#[tokio::test]
async fn test_watch_not_woken_by_uptime() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;

    let mut rx = manager.subscribe_state();
    assert_eq!(rx.borrow_and_update().up_for_ms, 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(manager.send_chat("hello").await, SendReport::sent());
    assert!(!rx.has_changed().unwrap());
    assert!(manager.status().up_for_ms >= 20);
}

#[tokio::test(start_paused = true)]
async fn test_queued_sends_delivered_once_in_order() {
    let connector = MemoryConnector::manual();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    let session = wait_session(&connector, 1).await;

    for text in ["one", "two", "three"] {
        assert_eq!(manager.send_chat(text).await, SendReport::queued());
    }
    assert_eq!(manager.status().queued, 3);
    assert!(connector.sent_lines().is_empty());

    session.spawn();
    wait_phase(&manager, Phase::Connected).await;

    // Drain in progress: new text goes behind the queue
    assert_eq!(manager.send_chat("four").await, SendReport::queued());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.sent_lines(), vec!["one", "two", "three", "four"]);
    assert_eq!(manager.status().queued, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.sent_lines().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_queue_capacity_evicts_oldest() {
    let connector = MemoryConnector::manual();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    let session = wait_session(&connector, 1).await;

    for i in 0..51 {
        manager.send_chat(&format!("msg-{}", i)).await;
    }
    assert_eq!(manager.status().queued, 50);

    session.spawn();
    tokio::time::sleep(Duration::from_secs(60)).await;

    let sent = connector.sent_lines();
    assert_eq!(sent.len(), 50);
    assert_eq!(sent.first().map(String::as_str), Some("msg-1"));
    assert_eq!(sent.last().map(String::as_str), Some("msg-50"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_flush_requeues_at_front() {
    let connector = MemoryConnector::manual();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    let session = wait_session(&connector, 1).await;

    manager.send_chat("first").await;
    manager.send_chat("second").await;
    connector.fail_sends(true);
    session.spawn();
    wait_phase(&manager, Phase::Connected).await;

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(connector.sent_lines().is_empty());
    assert_eq!(manager.status().queued, 2);

    connector.fail_sends(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(connector.sent_lines(), vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_cancels_retries() {
    let connector = MemoryConnector::new();
    connector.fail_next_connects(100);
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Disconnected).await;
    manager.send_chat("pending").await;

    manager.stop().await.unwrap();
    manager.stop().await.unwrap();

    let status = manager.status();
    assert_eq!(status.phase, Phase::Stopped);
    assert!(status.next_retry_at.is_none());
    assert_eq!(status.queued, 0);
    assert!(!manager.is_running());

    let attempts = connector.connect_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.connect_count(), attempts);
    assert_eq!(manager.phase(), Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_closes_live_session() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
    let session = wait_session(&connector, 1).await;

    manager.stop().await.unwrap();
    assert!(session.is_closed());
    let status = manager.status();
    assert_eq!(status.phase, Phase::Stopped);
    assert!(status.connected_at.is_none());
    assert!(status.last_disconnect_at.is_some());

    // Stopped until an explicit start
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.connect_count(), 1);
    assert!(manager.start().await.unwrap());
    wait_phase(&manager, Phase::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_spawn_is_terminal() {
    let connector = MemoryConnector::manual();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    let session = wait_session(&connector, 1).await;
    assert_eq!(manager.phase(), Phase::Connecting);

    manager.stop().await.unwrap();
    assert!(session.is_closed());
    assert_eq!(manager.phase(), Phase::Stopped);

    // A spawn arriving after the stop changes nothing
    session.spawn();
    tokio::time::sleep(Duration::from_secs(60)).await;
    let status = manager.status();
    assert_eq!(status.phase, Phase::Stopped);
    assert!(status.connected_at.is_none());
    assert!(status.next_retry_at.is_none());
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_now_replaces_session() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
    let first = wait_session(&connector, 1).await;

    manager.reconnect_now().await.unwrap();
    assert!(first.is_closed());
    wait_session(&connector, 2).await;
    let status = wait_phase(&manager, Phase::Connected).await;

    assert_eq!(connector.connect_count(), 2);
    assert_eq!(status.reconnect_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_now_from_stopped() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.stop().await.unwrap();
    assert_eq!(manager.phase(), Phase::Stopped);

    manager.reconnect_now().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn test_kick_and_error_do_not_change_phase() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    let mut events = manager.events().subscribe();
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
    let session = wait_session(&connector, 1).await;

    session.emit(TransportEvent::ChatLine("<Alex> hi".to_string()));
    session.emit(TransportEvent::Kicked("banned".to_string()));
    session.emit(TransportEvent::Error("bad packet".to_string()));
    let status = wait_for(&manager, |s| s.last_error.is_some()).await;
    assert_eq!(status.phase, Phase::Connected);
    assert_eq!(status.last_kick_reason.as_deref(), Some("banned"));
    assert_eq!(status.last_error.as_deref(), Some("bad packet"));

    let mut received = Vec::new();
    while let Some(event) = events.try_recv() {
        received.push(event);
    }
    assert!(received.contains(&ConnectionEvent::status("✅ Connected to Minecraft.")));
    assert!(received.contains(&ConnectionEvent::status("❌ Kicked from Minecraft: banned")));
    assert!(received.contains(&ConnectionEvent::chat("<Alex> hi")));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_schedules_retry_and_reconnects() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    let mut events = manager.events().subscribe();
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;

    wait_session(&connector, 1).await.drop_connection();
    let status = wait_phase(&manager, Phase::Disconnected).await;
    assert_eq!(status.reconnect_count, 1);
    assert_eq!(status.next_retry_delay_ms, Some(2_000));
    assert!(status.last_disconnect_at.is_some());

    wait_phase(&manager, Phase::Connected).await;
    assert_eq!(connector.session_count(), 2);

    let mut statuses = Vec::new();
    while let Some(event) = events.try_recv() {
        if let ConnectionEvent::Status { text } = event {
            statuses.push(text);
        }
    }
    assert_eq!(
        statuses,
        vec![
            "✅ Connected to Minecraft.",
            "⚠️ Disconnected from Minecraft.",
            "✅ Connected to Minecraft.",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_spawn_ignored() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    let mut events = manager.events().subscribe();
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;

    let session = wait_session(&connector, 1).await;
    session.spawn();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut phase_changes = 0;
    while let Some(event) = events.try_recv() {
        if matches!(event, ConnectionEvent::PhaseChanged { .. }) {
            phase_changes += 1;
        }
    }
    assert_eq!(phase_changes, 2);
    assert_eq!(manager.phase(), Phase::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_closes_transport() {
    let connector = MemoryConnector::new();
    let manager = spawn_with(&connector);
    manager.start().await.unwrap();
    wait_phase(&manager, Phase::Connected).await;
    let session = wait_session(&connector, 1).await;

    drop(manager);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.is_closed());
}

#[test]
fn test_send_report_serialization() {
    let json = serde_json::to_value(SendReport::queued()).unwrap();
    assert_eq!(json, serde_json::json!({"ok": true, "queued": true}));

    let json = serde_json::to_value(SendReport::failed("no route")).unwrap();
    assert_eq!(json["error"], "no route");
}
