use impend_core::{ChangeEvent, Todo, TodoId, TodoPatch};
use tracing::debug;

use crate::command::PendingMutation;

/// The canonical in-memory collection for one user's session.
///
/// Holds the reconciled view of local optimistic changes and remote feed
/// events. Every operation is a total function over the collection: a
/// missing id is always a safe no-op, never an error. Ordering is
/// newest-created first; inserts are prepended, never re-sorted.
///
/// The store is authoritative. Remote events fully overwrite local field
/// values, and the reconciler makes no attempt to tell its own echoed
/// writes apart from another session's changes; both are applied
/// identically, accepting a brief flicker when an echo lands inside a
/// rollback window.
#[derive(Debug, Default)]
pub struct Reconciler {
    items: Vec<Todo>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    // ==================== Reads ====================

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn snapshot(&self) -> Vec<Todo> {
        self.items.clone()
    }

    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: TodoId) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }

    // ==================== Loading ====================

    /// Replace the whole collection, e.g. from an initial or manual load.
    /// The store already returns rows newest-first.
    pub fn replace_all(&mut self, rows: Vec<Todo>) {
        self.items = rows;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    // ==================== Local optimistic operations ====================

    /// Prepend a row immediately, before remote confirmation.
    pub fn insert_local(&mut self, todo: Todo) -> PendingMutation {
        let pending = PendingMutation::Created {
            provisional_id: todo.id,
        };
        self.insert_row(todo);
        pending
    }

    /// Mutate a row's fields in place immediately, recording the prior
    /// values of exactly the changed fields. Returns `None` when the id is
    /// not present (nothing changed, nothing to roll back).
    pub fn patch_local(&mut self, id: TodoId, patch: &TodoPatch) -> Option<PendingMutation> {
        let item = self.items.iter_mut().find(|t| t.id == id)?;
        let prior = TodoPatch {
            text: patch.text.as_ref().map(|_| item.text.clone()),
            completed: patch.completed.map(|_| item.completed),
            image_url: patch.image_url.as_ref().map(|_| item.image_url.clone()),
        };
        patch.apply_to(item);
        Some(PendingMutation::Patched { id, prior })
    }

    /// Remove a row immediately, recording the full removed value.
    /// Returns `None` when the id is not present.
    pub fn remove_local(&mut self, id: TodoId) -> Option<PendingMutation> {
        let index = self.position(id)?;
        let row = self.items.remove(index);
        Some(PendingMutation::Removed { row: Box::new(row) })
    }

    /// Swap a provisional row for its store-confirmed value.
    ///
    /// If the feed echo already delivered the confirmed row, the
    /// provisional one is simply dropped, keeping exactly one row per id.
    pub fn confirm_insert(&mut self, provisional_id: TodoId, row: Todo) {
        let echoed = self.position(row.id).is_some();
        match self.position(provisional_id) {
            Some(index) if echoed => {
                self.items.remove(index);
            }
            Some(index) => {
                self.items[index] = row;
            }
            None if !echoed => {
                self.items.insert(0, row);
            }
            None => {}
        }
    }

    /// Reverse an optimistic change after the store rejected it. Runs
    /// through the same apply paths as the forward operations.
    pub fn rollback(&mut self, pending: PendingMutation) {
        debug!(id = pending.todo_id(), "rolling back optimistic change");
        match pending {
            PendingMutation::Created { provisional_id } => {
                self.remove_row(provisional_id);
            }
            PendingMutation::Patched { id, prior } => {
                if let Some(item) = self.items.iter_mut().find(|t| t.id == id) {
                    prior.apply_to(item);
                }
            }
            PendingMutation::Removed { row } => {
                self.insert_row(*row);
            }
        }
    }

    // ==================== Remote events ====================

    /// Apply a change event pushed from the feed.
    pub fn apply_remote(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Inserted(row) => {
                // A duplicate means our own optimistic insert was already
                // confirmed; suppress it.
                if self.position(row.id).is_none() {
                    self.items.insert(0, *row);
                } else {
                    debug!(id = row.id, "suppressed duplicate remote insert");
                }
            }
            ChangeEvent::Updated(row) => {
                // Last writer wins by feed arrival order: full-row replace.
                if let Some(index) = self.position(row.id) {
                    self.items[index] = *row;
                }
            }
            ChangeEvent::Deleted(id) => {
                // Absent is fine; the row may already be gone locally.
                self.remove_row(id);
            }
        }
    }

    // ==================== Shared apply paths ====================

    /// Insert keeping newest-created-first order. Fresh local inserts land
    /// at the front; a rollback re-insert of an older row slots back near
    /// where it was. Never duplicates an id.
    fn insert_row(&mut self, row: Todo) {
        if self.position(row.id).is_some() {
            return;
        }
        let index = self
            .items
            .iter()
            .position(|t| t.created_at <= row.created_at)
            .unwrap_or(self.items.len());
        self.items.insert(index, row);
    }

    fn remove_row(&mut self, id: TodoId) {
        self.items.retain(|t| t.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn todo(id: TodoId, text: &str) -> Todo {
        Todo {
            id,
            user_id: Uuid::nil(),
            text: text.into(),
            completed: false,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn optimistic_insert_prepends() {
        let mut engine = Reconciler::new();
        engine.replace_all(vec![todo(1, "old")]);
        engine.insert_local(todo(-1, "new"));
        assert_eq!(engine.items()[0].id, -1);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn same_id_never_duplicates() {
        let mut engine = Reconciler::new();
        let row = todo(5, "once");
        engine.insert_local(row.clone());
        engine.apply_remote(ChangeEvent::Inserted(Box::new(row.clone())));
        engine.apply_remote(ChangeEvent::Inserted(Box::new(row)));
        assert_eq!(engine.items().iter().filter(|t| t.id == 5).count(), 1);
    }

    #[test]
    fn patch_rollback_restores_prior_values() {
        let mut engine = Reconciler::new();
        let mut row = todo(3, "first wording");
        row.image_url = Some("https://blobs.local/my-todo/u/a.png".into());
        engine.replace_all(vec![row.clone()]);

        let patch = TodoPatch {
            text: Some("edited".into()),
            completed: Some(true),
            ..TodoPatch::default()
        };
        let pending = engine.patch_local(3, &patch).unwrap();
        assert_eq!(engine.get(3).unwrap().text, "edited");
        assert!(engine.get(3).unwrap().completed);

        engine.rollback(pending);
        assert_eq!(engine.get(3).unwrap(), &row);
    }

    #[test]
    fn toggle_shows_then_reverts_on_rollback() {
        let mut engine = Reconciler::new();
        engine.replace_all(vec![todo(5, "call mom")]);

        let pending = engine.patch_local(5, &TodoPatch::completion(true)).unwrap();
        assert!(engine.get(5).unwrap().completed);

        engine.rollback(pending);
        assert!(!engine.get(5).unwrap().completed);
    }

    #[test]
    fn delete_rollback_reinserts_the_row() {
        let mut engine = Reconciler::new();
        let row = todo(9, "keep me");
        engine.replace_all(vec![todo(10, "newer"), row.clone(), todo(8, "older")]);

        let pending = engine.remove_local(9).unwrap();
        assert!(engine.get(9).is_none());

        engine.rollback(pending);
        let restored = engine.get(9).unwrap();
        assert_eq!(restored, &row);
    }

    #[test]
    fn patch_and_remove_miss_are_no_ops() {
        let mut engine = Reconciler::new();
        assert!(engine.patch_local(1, &TodoPatch::completion(true)).is_none());
        assert!(engine.remove_local(1).is_none());
    }

    #[test]
    fn remote_delete_is_idempotent() {
        let mut engine = Reconciler::new();
        engine.replace_all(vec![todo(1, "a"), todo(2, "b")]);

        engine.apply_remote(ChangeEvent::Deleted(1));
        let after_first = engine.snapshot();
        engine.apply_remote(ChangeEvent::Deleted(1));
        assert_eq!(engine.snapshot(), after_first);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn remote_update_replaces_the_full_value() {
        let mut engine = Reconciler::new();
        engine.replace_all(vec![todo(4, "local view")]);

        let mut remote = todo(4, "remote view");
        remote.completed = true;
        engine.apply_remote(ChangeEvent::Updated(Box::new(remote.clone())));
        assert_eq!(engine.get(4).unwrap(), &remote);

        // An update for an unknown id changes nothing.
        engine.apply_remote(ChangeEvent::Updated(Box::new(todo(99, "ghost"))));
        assert!(engine.get(99).is_none());
    }

    #[test]
    fn confirm_swaps_provisional_for_store_row() {
        let mut engine = Reconciler::new();
        let provisional = todo(-1, "draft");
        engine.insert_local(provisional);

        let confirmed = todo(7, "draft");
        engine.confirm_insert(-1, confirmed);
        assert!(engine.get(-1).is_none());
        assert_eq!(engine.get(7).unwrap().text, "draft");
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn confirm_after_feed_echo_drops_the_provisional() {
        let mut engine = Reconciler::new();
        engine.insert_local(todo(-1, "draft"));

        // The feed beat the direct response.
        let echoed = todo(7, "draft");
        engine.apply_remote(ChangeEvent::Inserted(Box::new(echoed.clone())));
        assert_eq!(engine.len(), 2);

        engine.confirm_insert(-1, echoed);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.items()[0].id, 7);
    }

    #[test]
    fn remote_insert_prepends_without_sorting() {
        let mut engine = Reconciler::new();
        let mut older = todo(1, "older");
        older.created_at = Utc::now() - Duration::hours(1);
        engine.replace_all(vec![todo(2, "newer")]);

        // Feed order wins over timestamps for remote inserts.
        engine.apply_remote(ChangeEvent::Inserted(Box::new(older)));
        assert_eq!(engine.items()[0].id, 1);
    }
}
