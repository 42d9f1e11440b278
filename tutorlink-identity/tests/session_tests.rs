//! SessionActor integration tests — login, register, restore, profile, reset

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use common::{init_tracing, seeded_store, test_config, ReadOnlySlot, StalledStore, UnreachableStore};
use tutorlink_identity::allocator::SnapshotIdAllocator;
use tutorlink_identity::session::{
    DurableSlot, FileSlot, MemorySlot, Outcome, ProfilePatch, Registration, Role, SessionActor,
    SessionHandle,
};
use tutorlink_identity::store::{MemoryRecordStore, RecordStore};
use tutorlink_identity::{Capability, IdentityError};

async fn start_with(
    store: Arc<dyn RecordStore>,
    slot: Arc<dyn DurableSlot>,
) -> SessionHandle {
    let config = test_config();
    let allocator = Arc::new(SnapshotIdAllocator::new(store.clone(), config.request_timeout));
    SessionActor::start(store, allocator, slot, &config).await
}

#[tokio::test]
async fn test_login_and_restore_round_trip() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let slot_path = dir.path().join("currentUser.json");
    let store = seeded_store();

    let handle = start_with(store.clone(), Arc::new(FileSlot::new(&slot_path))).await;
    assert!(handle.current_actor().is_none());
    assert!(!handle.is_initializing());

    let actor = handle.login("lan@example.com", "secret1").await.unwrap();
    assert_eq!(actor.id, "2");
    assert_eq!(actor.role(), Some(Role::Tutor));
    assert!(!actor.extra.contains_key("password"));
    assert_eq!(handle.current_actor().as_ref(), Some(&actor));

    // A fresh actor over the same slot, as after a restart
    let restarted = start_with(store, Arc::new(FileSlot::new(&slot_path))).await;
    assert_eq!(restarted.current_actor(), Some(actor));
    assert!(restarted.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_login_invalid_credentials_leaves_state_untouched() {
    let slot = Arc::new(MemorySlot::new());
    let handle = start_with(seeded_store(), slot.clone()).await;

    let err = handle.login("lan@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(handle.current_actor().is_none());
    assert!(slot.peek().is_none());
}

#[tokio::test]
async fn test_login_picks_first_of_several_matches() {
    let store = Arc::new(MemoryRecordStore::new().with_records(
        "users",
        vec![
            common::user("9", "twin@example.com", "same-pass", "student"),
            common::user("4", "twin@example.com", "same-pass", "tutor"),
        ],
    ));
    let handle = start_with(store, Arc::new(MemorySlot::new())).await;

    let actor = handle.login("twin@example.com", "same-pass").await.unwrap();
    assert_eq!(actor.id, "9");
    assert_eq!(actor.role(), Some(Role::Student));
}

#[tokio::test]
async fn test_login_store_failure_is_service_unavailable() {
    let handle = start_with(Arc::new(UnreachableStore), Arc::new(MemorySlot::new())).await;

    let err = handle.login("lan@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, IdentityError::AuthServiceUnavailable(_)));
    assert!(handle.current_actor().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_login_timeout_is_service_unavailable() {
    let handle = start_with(Arc::new(StalledStore), Arc::new(MemorySlot::new())).await;

    let err = handle.login("lan@example.com", "secret1").await.unwrap_err();
    match err {
        IdentityError::AuthServiceUnavailable(message) => {
            assert!(message.contains("timed out"), "unexpected message: {message}");
        }
        other => panic!("expected AuthServiceUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_allocates_next_id_and_signs_in() {
    let store = seeded_store();
    let slot = Arc::new(MemorySlot::new());
    let handle = start_with(store.clone(), slot.clone()).await;

    let actor = handle
        .register(
            Registration::new("an@example.com", "secret3", "An Le", Role::Student)
                .with_phone("0901 234 567"),
        )
        .await
        .unwrap();

    assert_eq!(actor.id, "4");
    assert_eq!(actor.full_name, "An Le");
    assert_eq!(actor.phone.as_deref(), Some("0901 234 567"));
    assert_eq!(actor.extra.get("isActive"), Some(&json!(true)));
    assert!(actor.extra.contains_key("createdAt"));
    assert_eq!(handle.current_actor(), Some(actor.clone()));

    // Stored with the password, persisted without it
    let stored = store.get("users", "4").await.unwrap();
    assert_eq!(stored["password"], json!("secret3"));
    assert!(!slot.peek().unwrap().contains("secret3"));

    // The new account can sign in on its own
    handle.logout().await;
    let again = handle.login("an@example.com", "secret3").await.unwrap();
    assert_eq!(again.id, "4");
}

#[tokio::test]
async fn test_register_validation_runs_before_any_store_call() {
    let store = seeded_store();
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;

    let err = handle
        .register(Registration::new("an@example.com", "123", "An Le", Role::Student))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::RegistrationFailed(_)));
    assert_eq!(store.calls().total(), 0);
}

#[tokio::test]
async fn test_register_without_allocation_submits_nothing() {
    let handle = start_with(Arc::new(UnreachableStore), Arc::new(MemorySlot::new())).await;

    let err = handle
        .register(Registration::new("an@example.com", "secret3", "An Le", Role::Tutor))
        .await
        .unwrap_err();
    match err {
        IdentityError::AllocationUnavailable { entity, .. } => assert_eq!(entity, "users"),
        other => panic!("expected AllocationUnavailable, got {other:?}"),
    }
    assert!(handle.current_actor().is_none());
}

#[tokio::test]
async fn test_logout_clears_memory_and_slot() {
    let slot = Arc::new(MemorySlot::new());
    let handle = start_with(seeded_store(), slot.clone()).await;

    handle.login("admin@tutorlink.io", "admin123").await.unwrap();
    assert!(slot.peek().is_some());

    handle.logout().await;
    assert!(handle.current_actor().is_none());
    assert!(slot.peek().is_none());

    // Logging out twice is harmless
    handle.logout().await;
    assert!(!handle.is_initializing());
}

#[tokio::test]
async fn test_update_profile_without_session_makes_no_network_call() {
    let store = seeded_store();
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;

    let err = handle
        .update_profile(ProfilePatch::new().bio("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::NoActiveSession));
    assert_eq!(store.calls().total(), 0);
}

#[tokio::test]
async fn test_update_profile_replaces_actor_and_persists() {
    let store = seeded_store();
    let slot = Arc::new(MemorySlot::new());
    let handle = start_with(store.clone(), slot.clone()).await;
    handle.login("minh@example.com", "secret2").await.unwrap();

    let updated = handle
        .update_profile(ProfilePatch::new().bio("Grade 9").address("Hue"))
        .await
        .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("Grade 9"));
    assert_eq!(updated.address.as_deref(), Some("Hue"));
    assert_eq!(updated.email, "minh@example.com");
    assert_eq!(handle.current_actor(), Some(updated.clone()));
    assert!(slot.peek().unwrap().contains("Grade 9"));

    let stored = store.get("users", "3").await.unwrap();
    assert_eq!(stored["bio"], json!("Grade 9"));
}

#[tokio::test]
async fn test_update_profile_failure_keeps_previous_actor() {
    let store = Arc::new(MemoryRecordStore::new().with_records(
        "users",
        vec![common::user("5", "x@example.com", "secret5", "tutor")],
    ));
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;
    let before = handle.login("x@example.com", "secret5").await.unwrap();

    // Account removed behind the session's back
    store.delete("users", "5").await.unwrap();

    let err = handle
        .update_profile(ProfilePatch::new().phone("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UpdateFailed(_)));
    assert_eq!(handle.current_actor(), Some(before));
}

#[tokio::test]
async fn test_malformed_slot_restores_as_signed_out() {
    let slot = Arc::new(MemorySlot::with_value("{not json"));
    let handle = start_with(seeded_store(), slot.clone()).await;

    let snapshot = handle.snapshot();
    assert!(snapshot.actor.is_none());
    assert!(!snapshot.initializing);
    assert!(slot.peek().is_none());
}

#[tokio::test]
async fn test_initializing_until_restored() {
    let config = test_config();
    let store = seeded_store();
    let allocator = Arc::new(SnapshotIdAllocator::new(store.clone(), config.request_timeout));
    let handle = SessionActor::spawn(store, allocator, Arc::new(MemorySlot::new()), &config);

    assert!(handle.is_initializing());
    assert!(handle.current_actor().is_none());
    assert!(!handle.can(Capability::ViewSchedules));

    assert!(handle.restore().await.is_none());
    let settled = handle.initialized().await.unwrap();
    assert!(!settled.initializing);
}

#[tokio::test]
async fn test_slot_write_failure_commits_nothing() {
    let handle = start_with(seeded_store(), Arc::new(ReadOnlySlot { value: None })).await;

    let err = handle.login("lan@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, IdentityError::SessionPersistence(_)));
    assert!(handle.current_actor().is_none());
}

#[tokio::test]
async fn test_can_follows_current_actor() {
    let handle = start_with(seeded_store(), Arc::new(MemorySlot::new())).await;

    handle.login("lan@example.com", "secret1").await.unwrap();
    assert!(handle.can(Capability::ManageAttendance));
    assert!(!handle.can(Capability::BookSessions));

    handle.logout().await;
    handle.login("admin@tutorlink.io", "admin123").await.unwrap();
    assert!(handle.can(Capability::BookSessions));

    let info = handle.snapshot().user_info();
    assert!(info.is_admin);
    assert_eq!(info.user_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_subscribers_see_login() {
    let handle = start_with(seeded_store(), Arc::new(MemorySlot::new())).await;
    let mut rx = handle.subscribe();
    rx.borrow_and_update();

    handle.login("minh@example.com", "secret2").await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rx.borrow().actor.as_ref().map(|a| a.id.as_str()), Some("3"));
}

#[tokio::test]
async fn test_request_password_reset() {
    let store = seeded_store();
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;

    let outcome = handle.request_password_reset("lan@example.com").await;
    assert!(outcome.success, "{}", outcome.message);

    let requests = store.records("password_resets").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["id"], json!("1"));
    assert_eq!(requests[0]["email"], json!("lan@example.com"));

    let rejected = handle.request_password_reset("not-an-email").await;
    assert!(!rejected.success);
    assert_eq!(store.records("password_resets").await.len(), 1);
}

#[tokio::test]
async fn test_complete_password_reset() {
    let store = seeded_store();
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;

    let outcome = handle.complete_password_reset("2", "brand-new").await;
    assert!(outcome.success, "{}", outcome.message);
    handle.login("lan@example.com", "brand-new").await.unwrap();

    assert!(!handle.complete_password_reset("2", "123").await.success);
    assert!(!handle.complete_password_reset("", "brand-new").await.success);
    assert!(!handle.complete_password_reset("404", "brand-new").await.success);
}

#[tokio::test]
async fn test_operations_complete_in_issue_order() {
    let handle = start_with(seeded_store(), Arc::new(MemorySlot::new())).await;

    let (first, second) = tokio::join!(
        handle.login("lan@example.com", "secret1"),
        handle.login("minh@example.com", "secret2"),
    );
    assert_eq!(first.unwrap().id, "2");
    assert_eq!(second.unwrap().id, "3");
    assert_eq!(handle.current_actor().map(|a| a.id), Some("3".to_string()));
}

#[tokio::test]
async fn test_register_then_restart_restores_same_actor() {
    let dir = TempDir::new().unwrap();
    let slot_path = dir.path().join("currentUser.json");
    let store = Arc::new(MemoryRecordStore::new());

    let handle = start_with(store.clone(), Arc::new(FileSlot::new(&slot_path))).await;
    let registered = handle
        .register(Registration::new("first@example.com", "secret1", "First User", Role::Admin))
        .await
        .unwrap();
    assert_eq!(registered.id, "1");
    drop(handle);

    let restarted = start_with(store, Arc::new(FileSlot::new(&slot_path))).await;
    assert_eq!(restarted.current_actor(), Some(registered));
}

#[tokio::test]
async fn test_outcome_for_ui() {
    let handle = start_with(seeded_store(), Arc::new(MemorySlot::new())).await;

    let failed = Outcome::from_result(handle.login("nobody@example.com", "x").await, "Welcome back");
    assert!(!failed.success);
    assert_eq!(failed.message, "Invalid email or password");

    let ok = Outcome::from_result(handle.login("lan@example.com", "secret1").await, "Welcome back");
    assert!(ok.success);
    assert_eq!(ok.actor.map(|a| a.id), Some("2".to_string()));
}

#[tokio::test]
async fn test_register_past_u64_ids_keeps_session_alive() {
    let store = Arc::new(MemoryRecordStore::new().with_records(
        "users",
        vec![common::user("18446744073709551615", "old@example.com", "secret9", "tutor")],
    ));
    let handle = start_with(store.clone(), Arc::new(MemorySlot::new())).await;

    let actor = handle
        .register(Registration::new("new@example.com", "secret1", "New User", Role::Student))
        .await
        .unwrap();
    assert_eq!(actor.id, "18446744073709551616");

    handle.logout().await;
    let old = handle.login("old@example.com", "secret9").await.unwrap();
    assert_eq!(old.id, "18446744073709551615");
    assert_eq!(store.records("users").await.len(), 2);
}

#[tokio::test]
async fn test_logout_with_undeletable_slot_stays_signed_out_after_restart() {
    let store = seeded_store();
    let slot = Arc::new(common::UndeletableSlot::default());

    let handle = start_with(store.clone(), slot.clone()).await;
    handle.login("lan@example.com", "secret1").await.unwrap();
    handle.logout().await;
    assert!(handle.current_actor().is_none());
    assert_eq!(slot.value.lock().as_deref(), Some(""));

    let restarted = start_with(store, slot).await;
    let snapshot = restarted.snapshot();
    assert!(snapshot.actor.is_none());
    assert!(!snapshot.initializing);
}
