use std::sync::Arc;

use chrono::Utc;
use impend_core::{
    key_from_url, object_key, validate_image, AttachmentRef, BlobError, BlobStore, ImageCandidate,
    NewTodo, Result, Todo, TodoId, TodoPatch, TodoStore, UserId, ValidationError,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::command::{is_provisional, ProvisionalIds};
use crate::reconcile::Reconciler;

/// Issues mutations against the store and blob store, applying each change
/// optimistically first and rolling it back when the remote write is
/// rejected.
///
/// Collaborator failures are translated into the impend taxonomy here; the
/// reconciler itself never sees an error. Success is deliberately quiet:
/// the committed row comes back through the change feed, so beyond
/// swapping a provisional insert for its confirmed row there is nothing to
/// apply.
pub struct TodoClient {
    store: Arc<dyn TodoStore>,
    blobs: Arc<dyn BlobStore>,
    reconciler: Arc<RwLock<Reconciler>>,
    user: UserId,
    bucket: String,
    provisional_ids: ProvisionalIds,
}

impl TodoClient {
    pub fn new(
        store: Arc<dyn TodoStore>,
        blobs: Arc<dyn BlobStore>,
        reconciler: Arc<RwLock<Reconciler>>,
        user: UserId,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            blobs,
            reconciler,
            user,
            bucket: bucket.into(),
            provisional_ids: ProvisionalIds::new(),
        }
    }

    /// Create a todo. The row appears in the collection immediately under a
    /// provisional id and is swapped for the store row on confirmation.
    pub async fn create(&self, text: &str, image_url: Option<String>) -> Result<Todo> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        let now = Utc::now();
        let draft = Todo {
            id: self.provisional_ids.next(),
            user_id: self.user,
            text: text.to_string(),
            completed: false,
            image_url: image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        let pending = self.reconciler.write().await.insert_local(draft);

        let new_todo = NewTodo {
            user_id: self.user,
            text: text.to_string(),
            image_url,
        };
        match self.store.insert(new_todo).await {
            Ok(row) => {
                debug!(id = row.id, "create confirmed");
                self.reconciler
                    .write()
                    .await
                    .confirm_insert(pending.todo_id(), row.clone());
                Ok(row)
            }
            Err(e) => {
                warn!(error = %e, "create rejected, rolling back");
                self.reconciler.write().await.rollback(pending);
                Err(e.into())
            }
        }
    }

    /// Replace a todo's text.
    pub async fn update_text(&self, id: TodoId, text: &str) -> Result<Todo> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        self.update_row(id, TodoPatch::text(text)).await
    }

    /// Set the completion flag. A partial update: text and attachment are
    /// never touched.
    pub async fn set_completion(&self, id: TodoId, completed: bool) -> Result<Todo> {
        self.update_row(id, TodoPatch::completion(completed)).await
    }

    async fn update_row(&self, id: TodoId, patch: TodoPatch) -> Result<Todo> {
        let pending = self.reconciler.write().await.patch_local(id, &patch);
        match self.store.update(id, patch).await {
            Ok(row) => Ok(row),
            Err(e) => {
                if let Some(pending) = pending {
                    warn!(id, error = %e, "update rejected, rolling back");
                    self.reconciler.write().await.rollback(pending);
                }
                Err(e.into())
            }
        }
    }

    /// Delete a todo. When the row has an attachment, the blob is removed
    /// first and a blob failure blocks the row delete entirely: a row must
    /// never point at a missing blob, while an orphaned blob after a
    /// failed row delete is accepted.
    pub async fn delete(&self, id: TodoId) -> Result<()> {
        if is_provisional(id) {
            // The row is still awaiting confirmation; nothing exists
            // remotely to delete.
            self.reconciler.write().await.remove_local(id);
            return Ok(());
        }

        let existing = self.reconciler.read().await.get(id).cloned();
        if let Some(url) = existing.as_ref().and_then(|t| t.image_url.as_deref()) {
            self.remove_attachment(url).await?;
        }

        let pending = self.reconciler.write().await.remove_local(id);
        match self.store.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(pending) = pending {
                    warn!(id, error = %e, "delete rejected, rolling back");
                    self.reconciler.write().await.rollback(pending);
                }
                Err(e.into())
            }
        }
    }

    /// Validate and upload an image, returning its reference. Runs no I/O
    /// when validation rejects the candidate. An upload failure leaves no
    /// trace: the pending create it belonged to is simply never issued.
    pub async fn upload_attachment(
        &self,
        candidate: &ImageCandidate,
        bytes: Vec<u8>,
    ) -> Result<AttachmentRef> {
        validate_image(candidate)?;
        let key = object_key(self.user, &candidate.file_name);
        let url = self.blobs.put(&key, bytes, &candidate.content_type).await?;
        debug!(key = %key, "attachment uploaded");
        Ok(AttachmentRef { url, key })
    }

    /// Remove an attachment by its public URL. The key is derived from the
    /// URL and checked against the owner namespace.
    pub async fn remove_attachment(&self, url: &str) -> Result<()> {
        let key = key_from_url(url, &self.bucket).ok_or_else(|| {
            BlobError::Delete(format!("unrecognized attachment url: {url}"))
        })?;
        if !key.starts_with(&format!("{}/", self.user)) {
            return Err(BlobError::Delete(format!("attachment not owned by this user: {key}")).into());
        }
        self.blobs.delete(&key).await?;
        Ok(())
    }
}
