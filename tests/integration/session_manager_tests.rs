//! Session lifecycle: login, logout, restore, and the device cache.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mina_bridge::remote::AuthState;
use mina_bridge::AppError;

use super::test_helpers::{manager_with, sample_devices};

const TTL: Duration = Duration::from_secs(30);

#[tokio::test]
async fn login_installs_session_and_persists_blob() {
    let (manager, mock, store, _dir) = manager_with(sample_devices(), TTL);

    manager.login("alice", "pw").await.expect("login");

    let service = manager.ensure_session().await.expect("session installed");
    assert_eq!(service.auth().user_id, "alice");
    assert!(store.load().is_some(), "blob persisted by login");
    assert_eq!(mock.login_calls.load(Ordering::SeqCst), 1);
    // One verification fetch happens inside login.
    assert_eq!(mock.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_login_installs_nothing() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), TTL);
    mock.fail_login.store(true, Ordering::SeqCst);

    let err = manager.login("alice", "pw").await.expect_err("rejected");
    assert!(matches!(err, AppError::Auth(_)));
    assert!(matches!(
        manager.ensure_session().await.expect_err("no session"),
        AppError::SessionMissing
    ));
}

#[tokio::test]
async fn failed_verification_fails_the_login() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), TTL);
    mock.fail_fetch.store(true, Ordering::SeqCst);

    let err = manager.login("alice", "pw").await.expect_err("verify fails");
    assert!(matches!(err, AppError::Auth(_)));
    assert!(manager.ensure_session().await.is_err());
}

#[tokio::test]
async fn logout_clears_session_and_file_and_is_idempotent() {
    let (manager, _mock, store, _dir) = manager_with(sample_devices(), TTL);

    manager.login("alice", "pw").await.expect("login");
    manager.logout().await;

    assert!(store.load().is_none(), "credential file deleted");
    assert!(matches!(
        manager.ensure_session().await.expect_err("cleared"),
        AppError::SessionMissing
    ));

    // Logging out again with nothing installed must be a quiet no-op.
    manager.logout().await;
}

#[tokio::test]
async fn restore_succeeds_with_a_valid_blob() {
    let (manager, _mock, store, _dir) = manager_with(sample_devices(), TTL);
    let auth = AuthState {
        user_id: "9001".to_owned(),
        service_token: "tok".to_owned(),
    };
    store.save(&auth.to_blob()).expect("seed blob");

    assert!(manager.restore_from_file().await);
    let service = manager.ensure_session().await.expect("restored");
    assert_eq!(service.auth().user_id, "9001");
}

#[tokio::test]
async fn restore_with_no_file_returns_false() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), TTL);

    assert!(!manager.restore_from_file().await);
    // Absent blob must short-circuit before any network traffic.
    assert_eq!(mock.raw_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn restore_with_corrupt_blob_returns_false() {
    let (manager, mock, store, _dir) = manager_with(sample_devices(), TTL);
    store.save(b"{ definitely not credentials").expect("seed blob");

    assert!(!manager.restore_from_file().await);
    assert_eq!(mock.raw_calls.load(Ordering::SeqCst), 0);
    assert!(manager.ensure_session().await.is_err());
}

#[tokio::test]
async fn rejected_restore_keeps_the_prior_session() {
    let (manager, mock, store, _dir) = manager_with(sample_devices(), TTL);
    manager.login("alice", "pw").await.expect("login");

    let stale = AuthState {
        user_id: "stale".to_owned(),
        service_token: "stale-tok".to_owned(),
    };
    store.save(&stale.to_blob()).expect("seed stale blob");
    mock.raw_code.store(401, Ordering::SeqCst);

    assert!(!manager.restore_from_file().await);
    let service = manager.ensure_session().await.expect("prior session intact");
    assert_eq!(service.auth().user_id, "alice");
}

#[tokio::test]
async fn device_list_is_served_from_cache_until_ttl() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), Duration::from_millis(40));
    manager.login("alice", "pw").await.expect("login");
    let fetches_after_login = mock.fetch_calls.load(Ordering::SeqCst);

    let first = manager.list_devices().await.expect("devices");
    let second = manager.list_devices().await.expect("devices");
    assert_eq!(first, second);
    assert_eq!(
        mock.fetch_calls.load(Ordering::SeqCst),
        fetches_after_login + 1,
        "second read hits the cache"
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    manager.list_devices().await.expect("devices");
    assert_eq!(
        mock.fetch_calls.load(Ordering::SeqCst),
        fetches_after_login + 2,
        "expired entry refetches"
    );
}

#[tokio::test]
async fn list_devices_without_session_fails() {
    let (manager, _mock, _store, _dir) = manager_with(sample_devices(), TTL);

    assert!(matches!(
        manager.list_devices().await.expect_err("no session"),
        AppError::SessionMissing
    ));
}

#[tokio::test]
async fn relogin_invalidates_the_device_cache() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), TTL);
    manager.login("alice", "pw").await.expect("login");
    manager.list_devices().await.expect("devices");
    let fetches = mock.fetch_calls.load(Ordering::SeqCst);

    manager.login("bob", "pw").await.expect("relogin");
    manager.list_devices().await.expect("devices");

    // Relogin adds one verification fetch and one post-invalidation fetch.
    assert_eq!(mock.fetch_calls.load(Ordering::SeqCst), fetches + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_never_overlap() {
    let (manager, mock, _store, _dir) = manager_with(sample_devices(), TTL);
    *mock.login_delay.lock().unwrap() = Some(Duration::from_millis(30));

    let m1 = Arc::clone(&manager);
    let m2 = Arc::clone(&manager);
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { m1.login("alice", "pw").await }),
        tokio::spawn(async move { m2.login("bob", "pw").await }),
    );
    r1.expect("join").expect("login");
    r2.expect("join").expect("login");

    let spans = mock.login_spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 2);
    let (a, b) = (spans[0], spans[1]);
    assert!(
        a.1 <= b.0 || b.1 <= a.0,
        "login network calls must be serialized by the session mutex"
    );

    // Whole-handle swap: whichever login finished last owns the session.
    let service = manager.ensure_session().await.expect("session");
    assert!(service.auth().user_id == "alice" || service.auth().user_id == "bob");
}
