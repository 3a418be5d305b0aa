//! MongoDB-backed record store.
//!
//! Every mutation is a single-document conditional write, which is all the
//! outbox needs: the payload change and the queued event land atomically
//! because they live in the same document.

use std::time::Duration;

use bson::{Document, doc};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::{EventResult, spawn_event_stream};
use crate::record::{
    Action, DELETED_VERSION, EntryState, OutboxEntry, RecordPage, RecordQuery, StoredRecord,
    StoredUser, skip_for,
};
use crate::traits::UserStore;
use async_trait::async_trait;

/// Collection holding the user documents.
pub const COLLECTION_NAME: &str = "users";

/// MongoDB implementation of [`UserStore`]. Cloning shares the client pool.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<StoredRecord>,
    find_timeout: Duration,
}

impl MongoStore {
    /// Connect to the given MongoDB URI and bind to `database`.
    ///
    /// The connection is established lazily by the driver; callers that
    /// need to fail fast should follow up with [`ping`](Self::ping) or
    /// [`ensure_indexes`](Self::ensure_indexes) under a deadline.
    pub async fn connect(
        uri: &str,
        database: &str,
        find_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client.database(database).collection(COLLECTION_NAME);
        Ok(Self {
            client,
            collection,
            find_timeout,
        })
    }

    /// Create the index set the store relies on.
    ///
    /// The email and nickname uniqueness constraints are partial, matching
    /// only documents whose payload is an embedded document. Without that
    /// predicate a tombstone would hold its email and nickname forever and
    /// re-creating a user with a recycled nickname would fail.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let live_payload = doc! { "data": { "$type": "object" } };
        let unique_partial = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(live_payload.clone())
                        .build(),
                )
                .build()
        };
        self.collection
            .create_indexes(vec![
                unique_partial(doc! { "data.email": 1 }),
                unique_partial(doc! { "data.nickname": 1 }),
                IndexModel::builder()
                    .keys(doc! { "data.created_at": 1, "data.country": 1 })
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "events.0.state": 1, "events.0.updated_at": 1 })
                    .build(),
            ])
            .await?;
        Ok(())
    }

    /// Round-trip to the server, for health checks.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    /// Claim filter: a `Pending` head, or a `Processing` head whose lease
    /// has been stale for longer than `retry_interval`.
    fn claim_filter(retry_interval: Duration) -> Document {
        let cutoff =
            Utc::now() - chrono::Duration::milliseconds(retry_interval.as_millis() as i64);
        doc! {
            "$or": [
                { "events.0.state": EntryState::Pending.as_str() },
                {
                    "events.0.state": EntryState::Processing.as_str(),
                    "events.0.updated_at": { "$lt": bson::DateTime::from_chrono(cutoff) },
                },
            ],
        }
    }
}

fn filter_for(query: &RecordQuery) -> Document {
    let mut filter = doc! {
        "data.created_at": { "$gte": bson::DateTime::from_chrono(query.created_after) },
    };
    if let Some(country) = &query.country {
        filter.insert("data.country", doc! { "$eq": country });
    }
    filter
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == 11000,
        ErrorKind::Command(command_err) => command_err.code == 11000,
        _ => false,
    }
}

#[async_trait]
impl UserStore for MongoStore {
    #[instrument(skip_all, fields(id = %user.id))]
    async fn create(&self, user: &StoredUser) -> Result<StoredUser, StoreError> {
        let rec = StoredRecord {
            id: user.id,
            data: Some(user.clone()),
            events: vec![OutboxEntry::pending(
                Action::Created,
                user.id,
                user.version,
                Some(user.clone()),
            )],
        };
        match self.collection.insert_one(&rec).await {
            Ok(_) => Ok(user.clone()),
            // Both unique indexes funnel into the same coarse error; a
            // consumer cannot tell email from nickname conflicts.
            Err(err) if is_duplicate_key_error(&err) => Err(StoreError::AlreadyExists),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self))]
    async fn read_one(&self, id: Uuid) -> Result<StoredUser, StoreError> {
        // Tombstoned documents have no data.id and never match.
        let rec = self
            .collection
            .find_one(doc! { "_id": id.to_string(), "data.id": id.to_string() })
            .await?
            .ok_or(StoreError::NotFound)?;
        rec.data.ok_or(StoreError::NotFound)
    }

    #[instrument(skip_all, fields(id = %update.id, version = update.version))]
    async fn update_one(&self, update: &StoredUser) -> Result<StoredUser, StoreError> {
        let mut rec = self.read_one(update.id).await?;
        if rec.version != update.version {
            return Err(StoreError::InvalidVersion);
        }

        rec.first_name = update.first_name.clone();
        rec.last_name = update.last_name.clone();
        rec.password_hash = update.password_hash.clone();
        rec.country = update.country.clone();
        rec.updated_at = update.updated_at;
        rec.version += 1;

        let entry = OutboxEntry::pending(Action::Updated, rec.id, rec.version, Some(rec.clone()));
        let result = self
            .collection
            .update_one(
                doc! {
                    "_id": rec.id.to_string(),
                    "data.id": rec.id.to_string(),
                    "data.version": update.version,
                },
                doc! {
                    "$set": { "data": bson::to_bson(&rec)? },
                    "$push": { "events": bson::to_bson(&entry)? },
                },
            )
            .await?;
        // Zero modifications here means another writer got in between the
        // read and the guarded write.
        if result.modified_count != 1 {
            return Err(StoreError::InvalidVersion);
        }
        Ok(rec)
    }

    #[instrument(skip(self))]
    async fn delete_one(&self, id: Uuid) -> Result<(), StoreError> {
        let entry = OutboxEntry::pending(Action::Deleted, id, DELETED_VERSION, None);
        let result = self
            .collection
            .update_one(
                doc! { "_id": id.to_string(), "data.id": id.to_string() },
                doc! {
                    "$set": { "data": bson::Bson::Null },
                    "$push": { "events": bson::to_bson(&entry)? },
                },
            )
            .await?;
        if result.modified_count != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(page = query.page, length = query.length))]
    async fn find_many(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let filter = filter_for(query);

        let total = async {
            self.collection
                .count_documents(filter.clone())
                .await
                .map_err(StoreError::from)
        };
        let items = async {
            let cursor = self
                .collection
                .find(filter.clone())
                .sort(doc! { "data.created_at": 1 })
                .skip(skip_for(query))
                .limit(i64::from(query.length))
                .await?;
            let records: Vec<StoredRecord> = cursor.try_collect().await?;
            Ok::<_, StoreError>(records.into_iter().filter_map(|rec| rec.data).collect())
        };

        // Count and page read run concurrently; both must finish inside
        // the find window and both must succeed.
        let (total, items) = tokio::time::timeout(self.find_timeout, async {
            tokio::try_join!(total, items)
        })
        .await
        .map_err(|_| StoreError::Timeout)??;

        Ok(RecordPage {
            page: query.page,
            total,
            items,
        })
    }

    async fn claim_next(
        &self,
        retry_interval: Duration,
    ) -> Result<Option<OutboxEntry>, StoreError> {
        let rec = self
            .collection
            .find_one_and_update(
                Self::claim_filter(retry_interval),
                doc! {
                    "$set": {
                        "events.0.state": EntryState::Processing.as_str(),
                        "events.0.updated_at": bson::DateTime::from_chrono(Utc::now()),
                    },
                },
            )
            .sort(doc! { "events.0.updated_at": 1 })
            .return_document(ReturnDocument::Before)
            .await?;
        Ok(rec.and_then(|rec| rec.events.into_iter().next()))
    }

    fn events(
        &self,
        cancel: CancellationToken,
        min_interval: Duration,
        max_interval: Duration,
        retry_interval: Duration,
    ) -> mpsc::Receiver<EventResult> {
        spawn_event_stream(self.clone(), cancel, min_interval, max_interval, retry_interval)
    }

    #[instrument(skip(self))]
    async fn process_event(&self, id: Uuid, version: i64) -> Result<(), StoreError> {
        // $pop from the front; the guard makes duplicate acks no-ops.
        self.collection
            .update_one(
                doc! {
                    "_id": id.to_string(),
                    "events.0.state": EntryState::Processing.as_str(),
                    "events.0.version": version,
                },
                doc! { "$pop": { "events": -1 } },
            )
            .await?;
        Ok(())
    }
}
