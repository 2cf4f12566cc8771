use serde::{Deserialize, Serialize};

use crate::todo::{Todo, TodoId};

/// Row-level change pushed by the store's feed.
///
/// Insert and update carry the full new row; delete carries only the prior
/// row's identity. Each event is consumed exactly once by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Inserted(Box<Todo>),
    Updated(Box<Todo>),
    Deleted(TodoId),
}

impl ChangeEvent {
    /// The id of the row the event concerns.
    pub fn todo_id(&self) -> TodoId {
        match self {
            ChangeEvent::Inserted(todo) | ChangeEvent::Updated(todo) => todo.id,
            ChangeEvent::Deleted(id) => *id,
        }
    }
}

/// Receiving end of a change-feed subscription, scoped to one user's rows.
pub type ChangeFeed = tokio::sync::mpsc::Receiver<ChangeEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn event_exposes_target_id() {
        let todo = Todo {
            id: 7,
            user_id: Uuid::new_v4(),
            text: "Water plants".into(),
            completed: false,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(ChangeEvent::Inserted(Box::new(todo.clone())).todo_id(), 7);
        assert_eq!(ChangeEvent::Updated(Box::new(todo)).todo_id(), 7);
        assert_eq!(ChangeEvent::Deleted(9).todo_id(), 9);
    }
}
