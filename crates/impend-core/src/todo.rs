use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned row identifier, unique within the owning user's collection.
///
/// Real stores only ever issue positive ids; the sync layer reserves the
/// negative range for provisional rows awaiting confirmation.
pub type TodoId = i64;

/// Owning account identifier.
pub type UserId = Uuid;

/// A single todo entry owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub user_id: UserId,
    pub text: String,
    pub completed: bool,
    /// Public URL of the image attachment, if any.
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new row. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub user_id: UserId,
    pub text: String,
    pub image_url: Option<String>,
}

impl NewTodo {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// A partial field set for updates. Only present fields are written;
/// `image_url: Some(None)` clears the attachment reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub image_url: Option<Option<String>>,
}

impl TodoPatch {
    /// A patch that only changes the text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A patch that only changes the completion flag.
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.image_url.is_none()
    }

    /// Write the present fields onto a row. Timestamps are the store's
    /// concern and are left untouched.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(text) = &self.text {
            todo.text = text.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(image_url) = &self.image_url {
            todo.image_url = image_url.clone();
        }
    }
}
