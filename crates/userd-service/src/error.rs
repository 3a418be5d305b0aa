//! Domain error taxonomy surfaced by the user service.

use userd_store::StoreError;

/// Error returned by [`UserService`](crate::UserService) operations.
///
/// The service recovers nothing: store failures are classified by kind and
/// surfaced for the RPC adaptor to turn into status codes.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// The email address or nickname is already taken.
    #[error("a user with that email or nickname already exists")]
    AlreadyExists,

    /// Validation of a new or updated user failed.
    #[error("the user is invalid")]
    Invalid,

    /// The presented version is stale.
    #[error("the version is out of date")]
    InvalidVersion,

    /// No live user matches the request.
    #[error("the user cannot be found")]
    NotFound,

    /// Hashing failure or a transport failure in a collaborator.
    #[error("internal: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => UserError::AlreadyExists,
            StoreError::NotFound => UserError::NotFound,
            StoreError::InvalidVersion => UserError::InvalidVersion,
            other => UserError::Internal(Box::new(other)),
        }
    }
}
