use async_trait::async_trait;

use crate::event::ChangeFeed;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch, UserId};

/// The trait all row-storage backends implement.
///
/// The store is authoritative: it assigns ids and timestamps, enforces that
/// a user only ever sees their own rows, and echoes every committed write
/// back through the change feed.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All rows owned by the user, newest-created first.
    async fn list(&self, user: UserId) -> Result<Vec<Todo>, StoreError>;

    /// Insert a new row. Returns the row with store-assigned id and
    /// timestamps.
    async fn insert(&self, todo: NewTodo) -> Result<Todo, StoreError>;

    /// Apply a partial field set to an existing row. Returns the updated
    /// row.
    async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, StoreError>;

    /// Delete a row by id.
    async fn delete(&self, id: TodoId) -> Result<(), StoreError>;

    /// Subscribe to change events for rows owned by the user. Events arrive
    /// in commit order.
    async fn subscribe(&self, user: UserId) -> Result<ChangeFeed, SubscriptionError>;
}

/// Errors from row writes and reads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("row not found: {0}")]
    NotFound(TodoId),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The change feed could not be established.
#[derive(Debug, thiserror::Error)]
#[error("change feed unavailable: {0}")]
pub struct SubscriptionError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        assert!(StoreError::NotFound(4).to_string().contains("not found"));
        assert!(StoreError::Rejected("constraint".into())
            .to_string()
            .contains("constraint"));
        assert!(SubscriptionError("socket closed".into())
            .to_string()
            .contains("socket closed"));
    }
}
