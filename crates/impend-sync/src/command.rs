use std::sync::atomic::{AtomicI64, Ordering};

use impend_core::{Todo, TodoId, TodoPatch};

/// A local optimistic change not yet confirmed or rejected by the store.
///
/// Each variant carries enough prior state to generate its own inverse, so
/// rollback runs through the reconciler's normal apply paths instead of a
/// parallel undo implementation. Lives only for the duration of one
/// request: consumed by rollback on failure, dropped on success.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingMutation {
    /// An optimistic insert under a provisional id.
    Created { provisional_id: TodoId },
    /// An optimistic field change; `prior` holds the previous values of
    /// exactly the fields that changed.
    Patched { id: TodoId, prior: TodoPatch },
    /// An optimistic removal; `row` is the full removed value.
    Removed { row: Box<Todo> },
}

impl PendingMutation {
    /// The id of the row the mutation targets.
    pub fn todo_id(&self) -> TodoId {
        match self {
            PendingMutation::Created { provisional_id } => *provisional_id,
            PendingMutation::Patched { id, .. } => *id,
            PendingMutation::Removed { row } => row.id,
        }
    }
}

/// Allocator for provisional row ids.
///
/// Stores only issue positive ids, so the negative range marks rows that
/// exist locally but have not been confirmed yet. Ids are handed out
/// downward to stay unique for the lifetime of the session.
#[derive(Debug)]
pub struct ProvisionalIds {
    next: AtomicI64,
}

impl ProvisionalIds {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(-1),
        }
    }

    pub fn next(&self) -> TodoId {
        self.next.fetch_sub(1, Ordering::SeqCst)
    }
}

impl Default for ProvisionalIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an id belongs to the provisional namespace.
pub fn is_provisional(id: TodoId) -> bool {
    id < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_ids_are_negative_and_unique() {
        let ids = ProvisionalIds::new();
        let a = ids.next();
        let b = ids.next();
        assert!(is_provisional(a));
        assert!(is_provisional(b));
        assert_ne!(a, b);
    }

    #[test]
    fn store_ids_are_not_provisional() {
        assert!(!is_provisional(1));
        assert!(!is_provisional(0));
    }
}
