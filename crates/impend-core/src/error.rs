//! Error taxonomy for impend

use thiserror::Error;

use crate::blob::BlobError;
use crate::config::ConfigError;
use crate::store::{StoreError, SubscriptionError};
use crate::validate::ValidationError;

/// Result type alias for impend operations
pub type Result<T> = std::result::Result<T, ImpendError>;

/// Umbrella error returned at the session and client boundary.
///
/// Collaborator failures are caught at the mutation-client boundary,
/// converted into this taxonomy, and returned; the reconciler itself never
/// errors.
#[derive(Error, Debug)]
pub enum ImpendError {
    /// Rejected before any I/O; the user must change the input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A row write was rejected; the optimistic change has been rolled back
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A blob upload or removal failed
    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    /// The change feed could not be established
    #[error("subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// No authenticated session is available
    #[error("no authenticated session")]
    NoSession,
}
