use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use impend_core::{SubscriptionError, TodoStore, UserId};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::reconcile::Reconciler;

/// Lifecycle of one change-feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No user attached
    Detached,
    /// Subscription request in flight
    Subscribing,
    /// Events flowing
    Active,
    /// Torn down; terminal for this subscription instance
    Closed,
}

const DETACHED: u8 = 0;
const SUBSCRIBING: u8 = 1;
const ACTIVE: u8 = 2;
const CLOSED: u8 = 3;

fn state_from(raw: u8) -> FeedState {
    match raw {
        SUBSCRIBING => FeedState::Subscribing,
        ACTIVE => FeedState::Active,
        CLOSED => FeedState::Closed,
        _ => FeedState::Detached,
    }
}

/// Pumps one user's change feed into the reconciler.
///
/// Exactly one subscription is open per active user session; attaching
/// again (e.g. after a user switch) tears the previous one down first.
/// Events are dispatched one at a time in arrival order, with no
/// reordering or buffering. A failed subscribe drops back to `Detached`
/// so the caller may retry; transport reconnects are the store client's
/// concern.
pub struct FeedSubscriber {
    reconciler: Arc<RwLock<Reconciler>>,
    state: Arc<AtomicU8>,
    pump: Option<JoinHandle<()>>,
}

impl FeedSubscriber {
    pub fn new(reconciler: Arc<RwLock<Reconciler>>) -> Self {
        Self {
            reconciler,
            state: Arc::new(AtomicU8::new(DETACHED)),
            pump: None,
        }
    }

    pub fn state(&self) -> FeedState {
        state_from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.state() == FeedState::Active
    }

    /// Open a subscription for the user's rows and start delivering events.
    pub async fn attach(
        &mut self,
        store: &Arc<dyn TodoStore>,
        user: UserId,
    ) -> Result<(), SubscriptionError> {
        self.close();

        // Fresh state cell per subscription instance, so a lingering pump
        // from a previous attach can never clobber the new lifecycle.
        let state = Arc::new(AtomicU8::new(SUBSCRIBING));
        self.state = state.clone();

        let mut feed = match store.subscribe(user).await {
            Ok(feed) => feed,
            Err(e) => {
                state.store(DETACHED, Ordering::SeqCst);
                warn!(%user, error = %e, "change feed subscription failed");
                return Err(e);
            }
        };
        state.store(ACTIVE, Ordering::SeqCst);
        debug!(%user, "change feed active");

        let reconciler = self.reconciler.clone();
        let pump_state = state;
        self.pump = Some(tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                debug!(id = event.todo_id(), "applying remote change event");
                reconciler.write().await.apply_remote(event);
            }
            // The store ended the feed; this subscription instance is done.
            pump_state.store(CLOSED, Ordering::SeqCst);
        }));
        Ok(())
    }

    /// Tear the subscription down. Idempotent; a detached subscriber stays
    /// detached.
    pub fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if matches!(self.state(), FeedState::Subscribing | FeedState::Active) {
            self.state.store(CLOSED, Ordering::SeqCst);
        }
    }
}

impl Drop for FeedSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}
