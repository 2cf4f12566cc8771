use async_trait::async_trait;

use crate::todo::UserId;

/// The authenticated account a sync session is scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Session lookup against the external auth collaborator.
///
/// Session issuance and teardown live entirely with the collaborator; the
/// sync layer only ever asks who is currently signed in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    async fn current_session(&self) -> Option<AuthSession>;
}
