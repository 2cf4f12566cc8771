use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use impend_core::{
    AttachmentRef, AuthProvider, AuthSession, BlobStore, ImageCandidate, ImpendConfig, ImpendError,
    Result, Todo, TodoId, TodoStore,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::TodoClient;
use crate::feed::FeedSubscriber;
use crate::reconcile::Reconciler;

/// One user's live todo session: the owned state object created on sign-in
/// and torn down on sign-out.
///
/// Owns the reconciled collection, the change-feed subscription, and the
/// mutation client. Consumers read snapshots and call the mutation entry
/// points; nothing else can touch the collection. Switching users means
/// closing this session and starting a new one.
///
/// A session that cannot establish its feed still works: it degrades to
/// no live sync, with `refresh` as the manual fallback.
pub struct SyncSession {
    user: AuthSession,
    store: Arc<dyn TodoStore>,
    reconciler: Arc<RwLock<Reconciler>>,
    client: TodoClient,
    feed: FeedSubscriber,
    loading: AtomicBool,
}

impl SyncSession {
    /// Start a session for the currently signed-in user: initial load,
    /// then the feed subscription. Fails only when nobody is signed in;
    /// load and subscribe problems degrade (empty collection, no live
    /// sync) rather than blocking the session.
    pub async fn start(
        auth: &dyn AuthProvider,
        store: Arc<dyn TodoStore>,
        blobs: Arc<dyn BlobStore>,
        config: &ImpendConfig,
    ) -> Result<Self> {
        let user = auth.current_session().await.ok_or(ImpendError::NoSession)?;
        info!(user = %user.user_id, "starting sync session");

        let reconciler = Arc::new(RwLock::new(Reconciler::new()));
        let feed = FeedSubscriber::new(reconciler.clone());
        let client = TodoClient::new(
            store.clone(),
            blobs,
            reconciler.clone(),
            user.user_id,
            config.storage.bucket.clone(),
        );

        let mut session = Self {
            user,
            store,
            reconciler,
            client,
            feed,
            loading: AtomicBool::new(false),
        };

        if let Err(e) = session.load().await {
            warn!(error = %e, "initial load failed, starting empty");
        }
        let user_id = session.user.user_id;
        if let Err(e) = session.feed.attach(&session.store, user_id).await {
            warn!(error = %e, "live sync unavailable, falling back to manual refresh");
        }
        Ok(session)
    }

    async fn load(&self) -> Result<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.store.list(self.user.user_id).await;
        self.loading.store(false, Ordering::SeqCst);
        let rows = result?;
        self.reconciler.write().await.replace_all(rows);
        Ok(())
    }

    // ==================== Read surface ====================

    /// The reconciled collection, newest first.
    pub async fn todos(&self) -> Vec<Todo> {
        self.reconciler.read().await.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Whether the change feed is delivering events.
    pub fn live(&self) -> bool {
        self.feed.is_active()
    }

    pub fn user(&self) -> &AuthSession {
        &self.user
    }

    /// Manual reload from the store; the fallback when the feed is down.
    pub async fn refresh(&self) -> Result<()> {
        self.load().await
    }

    // ==================== Mutation entry points ====================

    pub async fn create(&self, text: &str, image_url: Option<String>) -> Result<Todo> {
        self.client.create(text, image_url).await
    }

    pub async fn update_text(&self, id: TodoId, text: &str) -> Result<Todo> {
        self.client.update_text(id, text).await
    }

    pub async fn set_completion(&self, id: TodoId, completed: bool) -> Result<Todo> {
        self.client.set_completion(id, completed).await
    }

    pub async fn delete(&self, id: TodoId) -> Result<()> {
        self.client.delete(id).await
    }

    pub async fn upload_attachment(
        &self,
        candidate: &ImageCandidate,
        bytes: Vec<u8>,
    ) -> Result<AttachmentRef> {
        self.client.upload_attachment(candidate, bytes).await
    }

    /// Standalone attachment removal is best-effort: a dangling blob is
    /// less harmful than blocking the user, so the failure is logged and
    /// surfaced but nothing is rolled back.
    pub async fn remove_attachment(&self, url: &str) -> Result<()> {
        let result = self.client.remove_attachment(url).await;
        if let Err(e) = &result {
            warn!(error = %e, "attachment removal failed");
        }
        result
    }

    // ==================== Lifecycle ====================

    /// End the session: the feed goes to Closed and stays there.
    pub fn close(&mut self) {
        info!(user = %self.user.user_id, "closing sync session");
        self.feed.close();
    }
}
