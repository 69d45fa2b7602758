//! Profile view lifecycle tests
//!
//! Results that arrive after a logout or unmount must be dropped.

mod helpers;

use axum::http::Method;
use crush_client::{MountOutcome, ProfileReconciler, ProfileView, UpdateError};
use crush_common::Route;
use helpers::{api_for, empty_store, logged_in_store, MockBackend};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn mount_loads_profile_for_session() {
    let backend = MockBackend::start().await;
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), logged_in_store());

    assert_eq!(view.mount().await.unwrap(), MountOutcome::Ready);
    assert_eq!(view.record().unwrap().name, "Ada");
}

#[tokio::test]
async fn mount_without_session_redirects_without_network() {
    let backend = MockBackend::start().await;
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), empty_store());

    assert_eq!(view.mount().await.unwrap(), MountOutcome::Redirect(Route::Start));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn logout_during_load_discards_late_result() {
    // Given: a slow profile load is in flight
    let backend = MockBackend::start().await;
    backend.configure(|c| c.profile_delay = Some(Duration::from_millis(300)));
    let store = logged_in_store();
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), store.clone());

    // When: the user logs out before it completes
    let (outcome, _) = tokio::join!(view.mount(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.clear();
        // Then: the session is absent immediately
        assert!(!store.get().is_present());
    });

    // Then: the late result is dropped and nothing is repopulated
    assert_eq!(outcome.unwrap(), MountOutcome::Stale);
    assert!(view.record().is_none());
    assert!(!store.get().is_present());
    assert!(matches!(view.save_basic_info().await, Err(UpdateError::NotLoaded)));
}

#[tokio::test]
async fn unmount_during_load_discards_late_result() {
    let backend = MockBackend::start().await;
    backend.configure(|c| c.profile_delay = Some(Duration::from_millis(300)));
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), logged_in_store());
    let lifecycle = view.lifecycle();

    let (outcome, _) = tokio::join!(view.mount(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        lifecycle.unmount();
    });

    assert_eq!(outcome.unwrap(), MountOutcome::Stale);
    assert!(view.record().is_none());
}

#[tokio::test]
async fn stale_load_failure_is_not_reported() {
    let backend = MockBackend::start().await;
    backend.configure(|c| {
        c.profile_delay = Some(Duration::from_millis(300));
        c.profile_status = 500;
        c.profile_body = json!({});
    });
    let store = logged_in_store();
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), store.clone());

    let (outcome, _) = tokio::join!(view.mount(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.clear();
    });

    assert_eq!(outcome.unwrap(), MountOutcome::Stale);
}

#[tokio::test]
async fn record_from_previous_session_is_not_saved() {
    // Given: a loaded view
    let backend = MockBackend::start().await;
    let store = logged_in_store();
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), store.clone());
    view.mount().await.unwrap();

    // When: a different user logs in
    store.set("other-token", "grace@yale.edu").unwrap();

    // Then: the old record is gone and cannot be submitted under the new session
    assert!(view.record().is_none());
    assert!(view.record_mut().is_none());
    assert!(matches!(view.save_answers().await, Err(UpdateError::NotLoaded)));
    assert!(backend.requests_to(Method::PUT, "/v1/user/").is_empty());
}

#[tokio::test]
async fn edits_through_view_are_submitted() {
    let backend = MockBackend::start().await;
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), logged_in_store());
    view.mount().await.unwrap();

    view.record_mut().unwrap().set_field("instagram", "@ada").unwrap();
    view.save_basic_info().await.unwrap();

    let sent = backend.requests_to(Method::PUT, "/v1/user/info/");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].json()["instagram"], json!("@ada"));
}

#[tokio::test]
async fn unmount_through_handle_drops_loaded_record() {
    // Given: a mounted view with its profile loaded
    let backend = MockBackend::start().await;
    let mut view = ProfileView::new(ProfileReconciler::new(api_for(&backend)), logged_in_store());
    assert_eq!(view.mount().await.unwrap(), MountOutcome::Ready);

    // When: the view is torn down from elsewhere
    view.lifecycle().unmount();

    // Then: the record is gone and nothing can be submitted from it
    assert!(view.record().is_none());
    assert!(view.record_mut().is_none());
    assert!(matches!(view.save_basic_info().await, Err(UpdateError::NotLoaded)));
    assert!(matches!(view.save_answers().await, Err(UpdateError::NotLoaded)));
    assert!(backend.requests_to(Method::PUT, "/v1/user/").is_empty());
}
