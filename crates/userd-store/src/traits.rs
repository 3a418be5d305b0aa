//! Data-access trait for user record stores.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::EventResult;
use crate::record::{OutboxEntry, RecordPage, RecordQuery, StoredUser};

/// Storage seam for user records with an inline transactional outbox.
///
/// Every mutation couples the payload change with a pending outbox entry in
/// one atomic document update. Implementations must guarantee:
///
/// - email and nickname are unique across non-deleted records;
/// - the version guard in [`update_one`](UserStore::update_one) admits at
///   most one winner per base version;
/// - outbox entries of one record drain in append order (head-only claims).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record (version 1) together with its `Created` entry.
    ///
    /// Returns [`StoreError::AlreadyExists`] when the email or nickname is
    /// already taken by a live record.
    async fn create(&self, user: &StoredUser) -> Result<StoredUser, StoreError>;

    /// Read the current payload. Tombstoned and absent records both return
    /// [`StoreError::NotFound`].
    async fn read_one(&self, id: Uuid) -> Result<StoredUser, StoreError>;

    /// Optimistic update. Replaces the payload and appends an `Updated`
    /// entry atomically, guarded by the caller's version. A stale version
    /// or a lost race returns [`StoreError::InvalidVersion`].
    async fn update_one(&self, update: &StoredUser) -> Result<StoredUser, StoreError>;

    /// Tombstone the payload and append a `Deleted` entry. Deleting an
    /// absent or already tombstoned record returns [`StoreError::NotFound`].
    async fn delete_one(&self, id: Uuid) -> Result<(), StoreError>;

    /// Read a page of live records matching the query, together with the
    /// unpaginated match count.
    async fn find_many(&self, query: &RecordQuery) -> Result<RecordPage, StoreError>;

    /// Atomically claim the next publishable outbox head: either `Pending`,
    /// or `Processing` with an expired lease. Returns the entry as it was
    /// before the claim, or `None` when nothing is claimable.
    async fn claim_next(
        &self,
        retry_interval: Duration,
    ) -> Result<Option<OutboxEntry>, StoreError>;

    /// Long-lived stream of claimed outbox entries, polled with a uniformly
    /// random interval in `[min_interval, max_interval)`. Closes when the
    /// cancellation token fires. "Nothing claimable" is retried silently;
    /// other failures surface as `Err` items.
    fn events(
        &self,
        cancel: CancellationToken,
        min_interval: Duration,
        max_interval: Duration,
        retry_interval: Duration,
    ) -> mpsc::Receiver<EventResult>;

    /// Drop the outbox head of `id`, guarded on the head being `Processing`
    /// with a matching version. A failed guard is a silent no-op so that
    /// duplicate acknowledgements after a retry are harmless.
    async fn process_event(&self, id: Uuid, version: i64) -> Result<(), StoreError>;
}
