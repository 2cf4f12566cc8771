//! End-to-end sync behavior across sessions sharing one store.

use std::sync::Arc;
use std::time::Duration;

use impend_core::{
    AuthSession, ImageCandidate, ImpendConfig, MemoryAuthProvider, MemoryBlobStore,
    MemoryTodoStore, Todo, UserId,
};
use impend_sync::SyncSession;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn start_session(
    store: &Arc<MemoryTodoStore>,
    blobs: &Arc<MemoryBlobStore>,
    user: UserId,
) -> SyncSession {
    let auth = MemoryAuthProvider::signed_in(AuthSession {
        user_id: user,
        email: Some("user@example.com".into()),
    });
    SyncSession::start(
        &auth,
        store.clone(),
        blobs.clone(),
        &ImpendConfig::default(),
    )
    .await
    .expect("session should start")
}

/// Poll a session's snapshot until the predicate holds; the feed delivers
/// asynchronously.
async fn wait_for_todos(session: &SyncSession, predicate: impl Fn(&[Todo]) -> bool) {
    for _ in 0..200 {
        if predicate(&session.todos().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn create_lands_at_the_front_with_defaults() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));
    let user = Uuid::new_v4();
    let session = start_session(&store, &blobs, user).await;

    session.create("Water plants", None).await.unwrap();
    session.create("Buy milk", None).await.unwrap();

    let todos = session.todos().await;
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0].text, "Buy milk");
    assert!(!todos[0].completed);
    assert_eq!(todos[0].image_url, None);
}

#[tokio::test]
async fn second_session_receives_the_insert_through_its_feed() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));
    let user = Uuid::new_v4();

    let session_a = start_session(&store, &blobs, user).await;
    let session_b = start_session(&store, &blobs, user).await;

    let created = session_a.create("shared item", None).await.unwrap();

    // Session B made no direct call; the feed alone delivers the row.
    wait_for_todos(&session_b, |todos| {
        todos.iter().any(|t| t.id == created.id && t.text == "shared item")
    })
    .await;
}

#[tokio::test]
async fn deletes_and_edits_converge_across_sessions() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));
    let user = Uuid::new_v4();

    let session_a = start_session(&store, &blobs, user).await;
    let session_b = start_session(&store, &blobs, user).await;

    let row = session_a.create("draft wording", None).await.unwrap();
    wait_for_todos(&session_b, |todos| !todos.is_empty()).await;

    session_b.update_text(row.id, "final wording").await.unwrap();
    wait_for_todos(&session_a, |todos| {
        todos.iter().any(|t| t.id == row.id && t.text == "final wording")
    })
    .await;

    session_a.delete(row.id).await.unwrap();
    wait_for_todos(&session_b, |todos| todos.is_empty()).await;
}

#[tokio::test]
async fn sessions_of_different_users_stay_separate() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));

    let alice = start_session(&store, &blobs, Uuid::new_v4()).await;
    let bob = start_session(&store, &blobs, Uuid::new_v4()).await;

    alice.create("hers", None).await.unwrap();
    bob.create("his", None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    let hers = alice.todos().await;
    let his = bob.todos().await;
    assert_eq!(hers.len(), 1);
    assert_eq!(his.len(), 1);
    assert_eq!(hers[0].text, "hers");
    assert_eq!(his[0].text, "his");
}

#[tokio::test]
async fn toggle_rollback_is_visible_to_the_session() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));
    let user = Uuid::new_v4();
    let session = start_session(&store, &blobs, user).await;

    let row = session.create("call mom", None).await.unwrap();

    store.fail_next_write();
    let err = session.set_completion(row.id, true).await;
    assert!(err.is_err());

    let todos = session.todos().await;
    assert_eq!(todos.len(), 1);
    assert!(!todos[0].completed);
}

#[tokio::test]
async fn attachment_lifecycle_through_the_session() {
    init_tracing();
    let store = Arc::new(MemoryTodoStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("my-todo"));
    let user = Uuid::new_v4();
    let session = start_session(&store, &blobs, user).await;

    let candidate = ImageCandidate::new("receipt.jpg", "image/jpeg", 2048);
    let attachment = session
        .upload_attachment(&candidate, vec![0; 2048])
        .await
        .unwrap();
    assert!(blobs.contains(&attachment.key).await);

    let row = session
        .create("expense report", Some(attachment.url.clone()))
        .await
        .unwrap();
    assert_eq!(row.image_url.as_deref(), Some(attachment.url.as_str()));

    // Blob removal failure blocks the row delete and the item stays.
    blobs.fail_next_delete();
    assert!(session.delete(row.id).await.is_err());
    assert!(session.todos().await.iter().any(|t| t.id == row.id));

    // Next attempt succeeds and cleans up both sides.
    session.delete(row.id).await.unwrap();
    assert!(!blobs.contains(&attachment.key).await);
    wait_for_todos(&session, |todos| todos.is_empty()).await;
}
