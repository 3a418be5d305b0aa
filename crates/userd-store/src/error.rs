//! Store error types.

/// Error returned by [`UserStore`](crate::UserStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint on email or nickname was violated.
    #[error("a user with that email or nickname already exists")]
    AlreadyExists,

    /// The requested record does not exist or is tombstoned.
    #[error("the requested user cannot be found in the store")]
    NotFound,

    /// The optimistic version guard failed: the caller's version is stale
    /// or a concurrent update won the race.
    #[error("the user cannot be updated because the version is out of date")]
    InvalidVersion,

    /// The bounded find window elapsed before both reads completed.
    #[error("the find operation timed out")]
    Timeout,

    /// A record could not be serialized for storage.
    #[error("bson: {0}")]
    Bson(#[from] bson::ser::Error),

    /// Transport or server failure in the underlying document engine.
    #[error("database: {0}")]
    Database(#[from] mongodb::error::Error),
}
