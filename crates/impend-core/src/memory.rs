//! In-memory collaborators for tests and examples.
//!
//! These implement the same traits production backends do, so tests wire
//! the full sync path (store, blob store, auth, change feed) without any
//! network. Failure injection flips the next write into an error, which is
//! how rollback paths get exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::{AuthProvider, AuthSession};
use crate::blob::{BlobError, BlobStore};
use crate::event::{ChangeEvent, ChangeFeed};
use crate::store::{StoreError, SubscriptionError, TodoStore};
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch, UserId};

struct Subscriber {
    user: UserId,
    tx: mpsc::Sender<ChangeEvent>,
}

/// In-memory `TodoStore` with a real per-subscriber change feed.
pub struct MemoryTodoStore {
    rows: RwLock<Vec<Todo>>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicI64,
    fail_next_write: AtomicBool,
    fail_next_subscribe: AtomicBool,
    feed_buffer: usize,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::with_feed_buffer(64)
    }

    pub fn with_feed_buffer(feed_buffer: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_next_write: AtomicBool::new(false),
            fail_next_subscribe: AtomicBool::new(false),
            feed_buffer,
        }
    }

    /// Make the next insert/update/delete fail with a rejected write.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Make the next subscribe attempt fail.
    pub fn fail_next_subscribe(&self) {
        self.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    fn take_injected_failure(&self) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            Err(StoreError::Rejected("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    async fn broadcast(&self, user: UserId, event: ChangeEvent) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| !s.tx.is_closed());
        for subscriber in subscribers.iter().filter(|s| s.user == user) {
            // A full or closed feed just drops the event.
            let _ = subscriber.tx.try_send(event.clone());
        }
    }
}

impl Default for MemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list(&self, user: UserId) -> Result<Vec<Todo>, StoreError> {
        let rows = self.rows.read().await;
        let mut owned: Vec<Todo> = rows.iter().filter(|t| t.user_id == user).cloned().collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(owned)
    }

    async fn insert(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        self.take_injected_failure()?;
        let now = Utc::now();
        let row = Todo {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: todo.user_id,
            text: todo.text,
            completed: false,
            image_url: todo.image_url,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.push(row.clone());
        debug!(id = row.id, "memory store inserted row");
        self.broadcast(row.user_id, ChangeEvent::Inserted(Box::new(row.clone())))
            .await;
        Ok(row)
    }

    async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, StoreError> {
        self.take_injected_failure()?;
        let updated = {
            let mut rows = self.rows.write().await;
            let row = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(StoreError::NotFound(id))?;
            patch.apply_to(row);
            row.updated_at = Utc::now();
            row.clone()
        };
        debug!(id, "memory store updated row");
        self.broadcast(
            updated.user_id,
            ChangeEvent::Updated(Box::new(updated.clone())),
        )
        .await;
        Ok(updated)
    }

    async fn delete(&self, id: TodoId) -> Result<(), StoreError> {
        self.take_injected_failure()?;
        let removed = {
            let mut rows = self.rows.write().await;
            let position = rows.iter().position(|t| t.id == id);
            position.map(|i| rows.remove(i))
        };
        // Deleting an absent row is a no-op, matching row stores that
        // filter deletes by id.
        if let Some(row) = removed {
            debug!(id, "memory store deleted row");
            self.broadcast(row.user_id, ChangeEvent::Deleted(id)).await;
        }
        Ok(())
    }

    async fn subscribe(&self, user: UserId) -> Result<ChangeFeed, SubscriptionError> {
        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(SubscriptionError("injected subscribe failure".into()));
        }
        let (tx, rx) = mpsc::channel(self.feed_buffer);
        self.subscribers.write().await.push(Subscriber { user, tx });
        Ok(rx)
    }
}

struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-memory `BlobStore` serving URLs under a fake public host.
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_next_put: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
            fail_next_put: AtomicBool::new(false),
            fail_next_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn object_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|o| o.bytes.clone())
    }

    pub async fn object_content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    fn url_for(&self, key: &str) -> String {
        format!("https://blobs.local/{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(BlobError::Upload("injected upload failure".into()));
        }
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            // No upsert: a key collision is a bug in key generation.
            return Err(BlobError::Upload(format!("object already exists: {key}")));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(BlobError::Delete("injected delete failure".into()));
        }
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// Auth provider returning a fixed session, or none when signed out.
pub struct MemoryAuthProvider {
    session: RwLock<Option<AuthSession>>,
}

impl MemoryAuthProvider {
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    pub async fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().await = session;
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn current_session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }
}
