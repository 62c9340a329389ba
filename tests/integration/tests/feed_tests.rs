//! Message feed integration tests
//!
//! Pagination, the in-flight guard, and how live pages and loaded history
//! combine.

use std::collections::HashSet;
use std::sync::Arc;

use chat_core::{display_order, Message};
use chat_service::{FeedPhase, ServiceError};
use integration_tests::{fixtures::*, settle, wait_until, TestHarness};

fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.to_string()).collect()
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_sixty_five_messages_page_back_in_thirties() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(65));

    let scope = harness.open_live(unique_session()).await.unwrap();
    let live = scope.messages();
    assert_eq!(live.len(), 30);
    assert_eq!(live.first().unwrap().id.as_str(), "m036");
    assert_eq!(live.last().unwrap().id.as_str(), "m065");

    let page = scope.load_older().await.unwrap();
    assert_eq!(page.messages.len(), 30);
    assert_eq!(page.messages.first().unwrap().id.as_str(), "m035");
    assert_eq!(page.cursor.as_ref().unwrap().id.as_str(), "m006");

    let page = scope.load_older().await.unwrap();
    assert_eq!(ids(&page.messages), vec!["m005", "m004", "m003", "m002", "m001"]);

    let page = scope.load_older().await.unwrap();
    assert!(page.is_empty());
    assert!(page.cursor.is_none());

    // Exhausted history: no cursor, no fetch
    let page = scope.load_older().await.unwrap();
    assert!(page.is_empty());

    let all = scope.messages();
    assert_eq!(all.len(), 65);
    assert_eq!(all, display_order(&history(65)));

    scope.close().await;
}

#[tokio::test]
async fn test_pages_do_not_overlap_on_equal_timestamps() {
    let harness = TestHarness::with_page_size(2);
    let same_instant = start_time();
    harness.backend.messages().seed(["a", "b", "c", "d", "e"].map(|id| Message {
        id: id.into(),
        created_at: same_instant,
        ..message(1)
    }));

    let scope = harness.open_live(unique_session()).await.unwrap();
    let mut seen: Vec<String> = ids(&scope.messages());
    loop {
        let page = scope.load_older().await.unwrap();
        if page.is_empty() {
            break;
        }
        seen.extend(ids(&page.messages));
    }

    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    scope.close().await;
}

#[tokio::test]
async fn test_empty_collection_never_fetches() {
    let harness = TestHarness::new();
    let scope = harness.open_live(unique_session()).await.unwrap();

    // Reads fail, so a fetch would surface as an error
    harness.backend.faults().set_fail_reads(true);
    let page = scope.load_older().await.unwrap();
    assert!(page.is_empty());
    assert!(page.cursor.is_none());

    scope.close().await;
}

// ============================================================================
// In-flight guard
// ============================================================================

#[tokio::test]
async fn test_concurrent_load_older_is_rejected() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(65));
    let scope = Arc::new(harness.open_live(unique_session()).await.unwrap());

    let hold = harness.backend.faults().hold_reads().await;
    let first = tokio::spawn({
        let scope = Arc::clone(&scope);
        async move { scope.load_older().await }
    });
    wait_until(|| scope.feed().phase() == FeedPhase::LoadingOlder)
        .await
        .unwrap();

    let second = scope.load_older().await;
    assert!(matches!(second, Err(ServiceError::LoadInFlight)));

    drop(hold);
    let page = first.await.unwrap().unwrap();
    assert_eq!(page.messages.len(), 30);
    assert_eq!(scope.feed().phase(), FeedPhase::Live);

    let held = scope.messages();
    let unique: HashSet<&str> = held.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(held.len(), 60);
    assert_eq!(unique.len(), 60);

    scope.close().await;
}

#[tokio::test]
async fn test_read_failure_keeps_page_and_phase() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(40));
    let scope = harness.open_live(unique_session()).await.unwrap();
    let before = scope.messages();
    let cursor = scope.feed().cursor();

    harness.backend.faults().set_fail_reads(true);
    let err = scope.load_older().await.unwrap_err();
    assert!(err.is_transient());

    assert_eq!(scope.messages(), before);
    assert_eq!(scope.feed().cursor(), cursor);
    assert_eq!(scope.feed().phase(), FeedPhase::Live);

    harness.backend.faults().set_fail_reads(false);
    assert_eq!(scope.load_older().await.unwrap().messages.len(), 10);

    scope.close().await;
}

#[tokio::test]
async fn test_close_during_fetch_discards_batch() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(65));
    let scope = Arc::new(harness.open_live(unique_session()).await.unwrap());

    let hold = harness.backend.faults().hold_reads().await;
    let pending = tokio::spawn({
        let scope = Arc::clone(&scope);
        async move { scope.load_older().await }
    });
    wait_until(|| scope.feed().phase() == FeedPhase::LoadingOlder)
        .await
        .unwrap();

    scope.close().await;
    drop(hold);
    pending.await.unwrap().unwrap();

    assert_eq!(scope.feed().phase(), FeedPhase::Closed);
    assert!(scope.messages().is_empty());
}

// ============================================================================
// Live updates
// ============================================================================

#[tokio::test]
async fn test_new_message_after_paging_keeps_history() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(35));
    let scope = harness.open_live(unique_session()).await.unwrap();

    assert_eq!(scope.load_older().await.unwrap().messages.len(), 5);
    let cursor = scope.feed().cursor();

    harness.clock.advance(std::time::Duration::from_secs(3_600));
    scope.send_message("hello").await.unwrap().unwrap();
    wait_until(|| scope.messages().len() == 36).await.unwrap();

    let held = scope.messages();
    assert_eq!(held.first().unwrap().id.as_str(), "m001");
    assert_eq!(held.last().unwrap().text, "hello");
    assert_eq!(scope.feed().cursor(), cursor);

    scope.close().await;
}

#[tokio::test]
async fn test_live_page_during_first_fetch_keeps_slid_message() {
    let harness = TestHarness::new();
    harness.backend.messages().seed(history(60));
    let scope = Arc::new(harness.open_live(unique_session()).await.unwrap());
    assert_eq!(scope.messages().first().unwrap().id.as_str(), "m031");

    let hold = harness.backend.faults().hold_reads().await;
    let pending = tokio::spawn({
        let scope = Arc::clone(&scope);
        async move { scope.load_older().await }
    });
    wait_until(|| scope.feed().phase() == FeedPhase::LoadingOlder)
        .await
        .unwrap();

    // m031 slides out of the live window while the fetch is held
    harness.backend.messages().insert(message(61));
    wait_until(|| scope.messages().iter().any(|m| m.id.as_str() == "m061"))
        .await
        .unwrap();
    assert!(scope.messages().iter().any(|m| m.id.as_str() == "m031"));

    drop(hold);
    let page = pending.await.unwrap().unwrap();
    assert_eq!(page.messages.first().unwrap().id.as_str(), "m030");
    assert_eq!(page.cursor.as_ref().unwrap().id.as_str(), "m001");

    assert!(scope.load_older().await.unwrap().is_empty());
    assert_eq!(scope.messages(), display_order(&history(61)));

    scope.close().await;
}

#[tokio::test]
async fn test_sent_message_arrives_only_through_subscription() {
    let harness = TestHarness::new();
    let scope = harness.open_live(unique_session()).await.unwrap();

    harness.backend.faults().set_fail_writes(true);
    assert!(scope.send_message("lost").await.is_err());
    settle().await;
    assert!(scope.messages().is_empty());

    harness.backend.faults().set_fail_writes(false);
    let sent = scope.send_message("kept").await.unwrap().unwrap();
    wait_until(|| scope.messages().len() == 1).await.unwrap();
    assert_eq!(scope.messages()[0].id, sent.id);
    assert_eq!(sent.created_at, start_time());

    scope.close().await;
}

#[tokio::test]
async fn test_blank_send_does_not_write() {
    let harness = TestHarness::new();
    let scope = harness.open_live(unique_session()).await.unwrap();

    assert!(scope.send_message("   ").await.unwrap().is_none());
    assert!(scope.send_message("").await.unwrap().is_none());
    assert_eq!(harness.backend.faults().message_writes(), 0);
    assert!(harness.backend.messages().is_empty());

    scope.close().await;
}
