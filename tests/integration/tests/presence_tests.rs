//! Presence integration tests
//!
//! Sign-in writes, heartbeat refreshes, roster classification, and the
//! best-effort failure handling.

use std::time::Duration;

use chat_core::{PresenceStatus, PresenceStore, UserId};
use integration_tests::{fixtures::*, wait_for, TestHarness};

// ============================================================================
// Sign-in writes
// ============================================================================

#[tokio::test]
async fn test_sign_in_merge_keeps_unrelated_fields() {
    let harness = TestHarness::new();
    let id = UserId::new("u1");
    let mut stored = presence_document("u1", "old@example.com", start_time() - chrono::Duration::days(1));
    stored["displayName"] = "Ann".into();
    harness.backend.presence().put_document(&id, stored);

    let scope = harness.open(session("u1", "ann@example.com")).await;

    let doc = harness.backend.presence().document(&id).unwrap();
    assert_eq!(doc["displayName"], "Ann");
    assert_eq!(doc["email"], "ann@example.com");
    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert_eq!(record.last_active_at, start_time());
    assert_eq!(record.status, PresenceStatus::Active);

    scope.close().await;
}

#[tokio::test]
async fn test_sign_in_without_avatar_clears_stored_avatar() {
    let harness = TestHarness::new();
    let id = UserId::new("u1");
    let mut stored = presence_document("u1", "a@x", start_time() - chrono::Duration::days(1));
    stored["avatarUrl"] = "https://img/old.png".into();
    harness.backend.presence().put_document(&id, stored);

    let scope = harness.open(session("u1", "a@x")).await;

    let doc = harness.backend.presence().document(&id).unwrap();
    assert!(doc["avatarUrl"].is_null());
    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert!(record.avatar_url.is_none());

    scope.close().await;
}

#[tokio::test]
async fn test_presence_write_failure_does_not_fail_sign_in() {
    let harness = TestHarness::new();
    harness.backend.faults().set_fail_writes(true);

    let client = harness.client(harness.auth(session("u1", "a@x")));
    let signed_in = client.sign_in().await.unwrap();

    assert_eq!(client.current_session(), Some(signed_in));
    assert!(harness.backend.presence().is_empty());
    assert!(harness.backend.faults().presence_writes() >= 1);

    client.sign_out().await.unwrap();
}

#[tokio::test]
async fn test_lookup_failure_still_writes_record() {
    let harness = TestHarness::new();
    harness.backend.faults().set_fail_reads(true);

    let scope = harness.open(session("u1", "a@x")).await;
    let doc = harness.backend.presence().document(&UserId::new("u1")).unwrap();
    assert_eq!(doc["email"], "a@x");

    scope.close().await;
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_heartbeat_refreshes_last_active() {
    let harness = TestHarness::new();
    let scope = harness.open(session("u1", "a@x")).await;
    let id = UserId::new("u1");
    let writes = harness.backend.faults().presence_writes();

    // Nothing before the first full period
    harness.advance(Duration::from_secs(4)).await;
    assert_eq!(harness.backend.faults().presence_writes(), writes);

    harness.advance(Duration::from_secs(2)).await;
    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert_eq!(record.last_active_at, start_time() + chrono::Duration::seconds(6));

    harness.advance(Duration::from_secs(5)).await;
    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert_eq!(record.last_active_at, start_time() + chrono::Duration::seconds(11));
    assert_eq!(harness.backend.faults().presence_writes(), writes + 2);

    scope.close().await;
    harness.advance(Duration::from_secs(20)).await;
    assert_eq!(harness.backend.faults().presence_writes(), writes + 2);
    assert!(harness.backend.presence().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_failures_are_swallowed() {
    let harness = TestHarness::new();
    let scope = harness.open(session("u1", "a@x")).await;
    let writes = harness.backend.faults().presence_writes();

    harness.backend.faults().set_fail_writes(true);
    harness.advance(Duration::from_secs(11)).await;
    assert_eq!(harness.backend.faults().presence_writes(), writes + 2);
    assert!(scope.presence().is_heartbeat_running());

    // Back online: the next beat lands
    harness.backend.faults().set_fail_writes(false);
    harness.advance(Duration::from_secs(5)).await;
    let record = harness
        .backend
        .presence()
        .find(&UserId::new("u1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_active_at, start_time() + chrono::Duration::seconds(16));

    scope.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_last_active_never_goes_backwards() {
    let harness = TestHarness::new();
    let scope = harness.open(session("u1", "a@x")).await;
    let id = UserId::new("u1");

    // Wall clock corrected by a minute while the runtime keeps ticking
    harness.clock.set(start_time() - chrono::Duration::seconds(60));
    tokio::time::sleep(Duration::from_secs(6)).await;

    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert_eq!(record.last_active_at, start_time());

    harness.advance(Duration::from_secs(65)).await;
    let record = harness.backend.presence().find(&id).await.unwrap().unwrap();
    assert_eq!(record.last_active_at, start_time() + chrono::Duration::seconds(5));

    scope.close().await;
}

// ============================================================================
// Roster
// ============================================================================

#[tokio::test]
async fn test_roster_sorts_active_first_then_email() {
    let harness = TestHarness::new();
    let presence = harness.backend.presence();
    presence.put_document(
        &UserId::new("u-b"),
        presence_document("u-b", "b@x", start_time() - chrono::Duration::seconds(5)),
    );
    presence.put_document(
        &UserId::new("u-c"),
        presence_document("u-c", "c@x", start_time() - chrono::Duration::seconds(300)),
    );

    let scope = harness.open(session("u-a", "a@x")).await;
    let mut roster = scope.watch_roster();
    let snapshot = wait_for(&mut roster, |r| r.len() == 3).await.unwrap();

    let emails: Vec<&str> = snapshot.iter().map(|v| v.email.as_str()).collect();
    assert_eq!(emails, vec!["a@x", "b@x", "c@x"]);
    assert_eq!(snapshot[0].status, PresenceStatus::Active);
    assert_eq!(snapshot[1].status, PresenceStatus::Active);
    // Stored "active" does not make a stale record active
    assert_eq!(snapshot[2].status, PresenceStatus::Inactive);

    scope.close().await;
}

#[tokio::test]
async fn test_threshold_boundary_is_inactive() {
    let harness = TestHarness::new();
    harness.backend.presence().put_document(
        &UserId::new("u-edge"),
        presence_document("u-edge", "edge@x", start_time() - chrono::Duration::seconds(30)),
    );
    harness.backend.presence().put_document(
        &UserId::new("u-fresh"),
        presence_document(
            "u-fresh",
            "fresh@x",
            start_time() - chrono::Duration::milliseconds(29_999),
        ),
    );

    let scope = harness.open(session("u-me", "me@x")).await;
    let mut roster = scope.watch_roster();
    let snapshot = wait_for(&mut roster, |r| r.len() == 3).await.unwrap();

    let status_of = |email: &str| {
        snapshot
            .iter()
            .find(|v| v.email == email)
            .map(|v| v.status)
            .unwrap()
    };
    assert_eq!(status_of("edge@x"), PresenceStatus::Inactive);
    assert_eq!(status_of("fresh@x"), PresenceStatus::Active);

    scope.close().await;
}

#[tokio::test]
async fn test_sign_out_removes_only_own_record() {
    let harness = TestHarness::new();
    let other = UserId::new("u-other");
    harness.backend.presence().put_document(
        &other,
        presence_document("u-other", "other@x", start_time() - chrono::Duration::hours(2)),
    );

    let scope = harness.open(session("u-me", "me@x")).await;
    assert_eq!(harness.backend.presence().len(), 2);

    scope.close().await;
    assert_eq!(harness.backend.presence().len(), 1);
    assert!(harness.backend.presence().document(&other).is_some());
}
