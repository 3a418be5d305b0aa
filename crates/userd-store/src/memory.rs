//! In-memory record store.
//!
//! Implements the full outbox semantics of [`MongoStore`](crate::MongoStore)
//! over a process-local map. Suitable for tests and local development; for
//! anything durable use the MongoDB backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::{EventResult, spawn_event_stream};
use crate::record::{
    Action, DELETED_VERSION, EntryState, OutboxEntry, RecordPage, RecordQuery, StoredRecord,
    StoredUser, skip_for,
};
use crate::traits::UserStore;

/// Process-local [`UserStore`] with the same atomicity and lease behavior
/// as the MongoDB backend. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<Uuid, StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held, tombstones included.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Outbox length for one record; `None` when the document is gone.
    pub fn outbox_len(&self, id: Uuid) -> Option<usize> {
        self.records.lock().get(&id).map(|rec| rec.events.len())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &StoredUser) -> Result<StoredUser, StoreError> {
        let mut records = self.records.lock();
        let taken = records.values().any(|rec| {
            rec.data
                .as_ref()
                .is_some_and(|data| data.email == user.email || data.nickname == user.nickname)
        });
        if taken || records.contains_key(&user.id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(
            user.id,
            StoredRecord {
                id: user.id,
                data: Some(user.clone()),
                events: vec![OutboxEntry::pending(
                    Action::Created,
                    user.id,
                    user.version,
                    Some(user.clone()),
                )],
            },
        );
        Ok(user.clone())
    }

    async fn read_one(&self, id: Uuid) -> Result<StoredUser, StoreError> {
        self.records
            .lock()
            .get(&id)
            .and_then(|rec| rec.data.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update_one(&self, update: &StoredUser) -> Result<StoredUser, StoreError> {
        let mut records = self.records.lock();
        let rec = records.get_mut(&update.id).ok_or(StoreError::NotFound)?;
        let data = rec.data.as_mut().ok_or(StoreError::NotFound)?;
        if data.version != update.version {
            return Err(StoreError::InvalidVersion);
        }
        data.first_name = update.first_name.clone();
        data.last_name = update.last_name.clone();
        data.password_hash = update.password_hash.clone();
        data.country = update.country.clone();
        data.updated_at = update.updated_at;
        data.version += 1;
        let snapshot = data.clone();
        rec.events.push(OutboxEntry::pending(
            Action::Updated,
            snapshot.id,
            snapshot.version,
            Some(snapshot.clone()),
        ));
        Ok(snapshot)
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        let rec = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        if rec.data.is_none() {
            return Err(StoreError::NotFound);
        }
        rec.data = None;
        rec.events
            .push(OutboxEntry::pending(Action::Deleted, id, DELETED_VERSION, None));
        Ok(())
    }

    async fn find_many(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let records = self.records.lock();
        let mut matches: Vec<StoredUser> = records
            .values()
            .filter_map(|rec| rec.data.clone())
            .filter(|data| {
                data.created_at >= query.created_after
                    && query
                        .country
                        .as_ref()
                        .is_none_or(|country| &data.country == country)
            })
            .collect();
        matches.sort_by_key(|data| data.created_at);
        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(skip_for(query) as usize)
            .take(query.length.max(0) as usize)
            .collect();
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
        let now = Utc::now();
        let cutoff = now - chrono::Duration::milliseconds(retry_interval.as_millis() as i64);
        let mut records = self.records.lock();
        let candidate = records
            .values_mut()
            .filter(|rec| {
                rec.events.first().is_some_and(|head| {
                    head.state == EntryState::Pending
                        || (head.state == EntryState::Processing && head.updated_at < cutoff)
                })
            })
            .min_by_key(|rec| rec.events[0].updated_at);
        let Some(rec) = candidate else {
            return Ok(None);
        };
        let before = rec.events[0].clone();
        rec.events[0].state = EntryState::Processing;
        rec.events[0].updated_at = now;
        Ok(Some(before))
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

    async fn process_event(&self, id: Uuid, version: i64) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        if let Some(rec) = records.get_mut(&id) {
            let guard = rec.events.first().is_some_and(|head| {
                head.state == EntryState::Processing && head.version == version
            });
            if guard {
                rec.events.remove(0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(nickname: &str, email: &str) -> StoredUser {
        let now = Utc::now();
        StoredUser {
            id: Uuid::new_v4(),
            first_name: "Max".into(),
            last_name: "Mustermann".into(),
            nickname: nickname.into(),
            password_hash: "$2b$04$hash".into(),
            email: email.into(),
            country: "DE".into(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let store = MemoryStore::new();
        let user = sample_user("maxmust", "max@example.com");
        store.create(&user).await.unwrap();

        let read = store.read_one(user.id).await.unwrap();
        assert_eq!(read, user);
        assert_eq!(read.version, 1);
        assert_eq!(store.outbox_len(user.id), Some(1));
    }

    #[tokio::test]
    async fn duplicate_email_or_nickname_is_rejected() {
        let store = MemoryStore::new();
        store
            .create(&sample_user("superoriginal", "first@example.com"))
            .await
            .unwrap();

        let same_nickname = sample_user("superoriginal", "second@example.com");
        assert!(matches!(
            store.create(&same_nickname).await,
            Err(StoreError::AlreadyExists)
        ));

        let same_email = sample_user("different", "first@example.com");
        assert!(matches!(
            store.create(&same_email).await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn update_bumps_version_and_appends_entry() {
        let store = MemoryStore::new();
        let user = sample_user("upd", "upd@example.com");
        store.create(&user).await.unwrap();

        let mut update = user.clone();
        update.first_name = "Erika".into();
        update.updated_at = Utc::now();
        let stored = store.update_one(&update).await.unwrap();

        assert_eq!(stored.version, 2);
        assert_eq!(stored.first_name, "Erika");
        assert_eq!(stored.created_at, user.created_at);
        assert_eq!(stored.email, user.email);
        assert_eq!(store.outbox_len(user.id), Some(2));
    }

    #[tokio::test]
    async fn stale_update_fails_with_invalid_version() {
        let store = MemoryStore::new();
        let user = sample_user("stale", "stale@example.com");
        store.create(&user).await.unwrap();
        store.update_one(&user).await.unwrap();

        // second update still presents version 1
        assert!(matches!(
            store.update_one(&user).await,
            Err(StoreError::InvalidVersion)
        ));
    }

    #[tokio::test]
    async fn update_of_absent_or_tombstoned_record_is_not_found() {
        let store = MemoryStore::new();
        let user = sample_user("ghost", "ghost@example.com");
        assert!(matches!(
            store.update_one(&user).await,
            Err(StoreError::NotFound)
        ));

        store.create(&user).await.unwrap();
        store.delete_one(user.id).await.unwrap();
        assert!(matches!(
            store.update_one(&user).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_tombstones_and_appends_sentinel_entry() {
        let store = MemoryStore::new();
        let user = sample_user("gone", "gone@example.com");
        store.create(&user).await.unwrap();
        store.delete_one(user.id).await.unwrap();

        assert!(matches!(
            store.read_one(user.id).await,
            Err(StoreError::NotFound)
        ));
        // document remains, carrying Created + Deleted
        assert_eq!(store.outbox_len(user.id), Some(2));

        // second delete reports not found
        assert!(matches!(
            store.delete_one(user.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn tombstone_frees_the_unique_keys() {
        let store = MemoryStore::new();
        let user = sample_user("recycled", "recycled@example.com");
        store.create(&user).await.unwrap();
        store.delete_one(user.id).await.unwrap();

        // same nickname and email are free again once the record is dead
        store
            .create(&sample_user("recycled", "recycled@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn claim_and_process_drain_in_append_order() {
        let store = MemoryStore::new();
        let user = sample_user("drain", "drain@example.com");
        store.create(&user).await.unwrap();
        store.delete_one(user.id).await.unwrap();

        let retry = Duration::from_secs(10);
        let first = store.claim_next(retry).await.unwrap().unwrap();
        assert_eq!(first.action, Action::Created);
        store.process_event(user.id, first.version).await.unwrap();

        let second = store.claim_next(retry).await.unwrap().unwrap();
        assert_eq!(second.action, Action::Deleted);
        assert_eq!(second.version, DELETED_VERSION);
        assert!(second.data.is_none());
        store.process_event(user.id, second.version).await.unwrap();

        assert_eq!(store.outbox_len(user.id), Some(0));
        assert!(store.claim_next(retry).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn process_event_guard_tolerates_duplicate_acks() {
        let store = MemoryStore::new();
        let user = sample_user("dup", "dup@example.com");
        store.create(&user).await.unwrap();

        let entry = store
            .claim_next(Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();
        store.process_event(user.id, entry.version).await.unwrap();
        // duplicate ack: wrong head (empty outbox), must be a silent no-op
        store.process_event(user.id, entry.version).await.unwrap();
        // version mismatch on a pending head is also a no-op
        store.process_event(user.id, 999).await.unwrap();
    }

    #[tokio::test]
    async fn pending_head_is_not_droppable() {
        let store = MemoryStore::new();
        let user = sample_user("guard", "guard@example.com");
        store.create(&user).await.unwrap();

        // head is still Pending; the Processing guard must hold it in place
        store.process_event(user.id, 1).await.unwrap();
        assert_eq!(store.outbox_len(user.id), Some(1));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..20 {
            let mut user = sample_user(&format!("find{i}"), &format!("find{i}@example.com"));
            user.country = if i < 10 { "DE".into() } else { "NL".into() };
            user.created_at = base + chrono::Duration::seconds(i);
            store.create(&user).await.unwrap();
        }

        let page = store
            .find_many(&RecordQuery {
                created_after: base,
                country: Some("NL".into()),
                length: 10,
                page: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.items.len(), 10);
        assert!(page.items.iter().all(|user| user.country == "NL"));

        let second = store
            .find_many(&RecordQuery {
                created_after: base,
                country: None,
                length: 10,
                page: 2,
            })
            .await
            .unwrap();
        assert_eq!(second.total, 20);
        assert_eq!(second.items.len(), 10);
        // ascending by created_at; page 2 starts at the 11th record
        assert_eq!(second.items[0].created_at, base + chrono::Duration::seconds(10));
    }

    #[tokio::test]
    async fn find_with_no_matches_is_empty_not_an_error() {
        let store = MemoryStore::new();
        let page = store
            .find_many(&RecordQuery {
                created_after: Utc::now(),
                country: None,
                length: 10,
                page: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn tombstoned_records_do_not_match_find() {
        let store = MemoryStore::new();
        let created = Utc::now() - chrono::Duration::hours(1);
        let mut user = sample_user("hidden", "hidden@example.com");
        user.created_at = created;
        store.create(&user).await.unwrap();
        store.delete_one(user.id).await.unwrap();

        let page = store
            .find_many(&RecordQuery {
                created_after: created - chrono::Duration::hours(1),
                country: None,
                length: 10,
                page: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn concurrent_updates_with_same_base_version_admit_one_winner() {
        let store = MemoryStore::new();
        let user = sample_user("race", "race@example.com");
        store.create(&user).await.unwrap();

        let mut left = user.clone();
        left.first_name = "Left".into();
        let mut right = user.clone();
        right.first_name = "Right".into();

        let (a, b) = tokio::join!(store.update_one(&left), store.update_one(&right));
        let outcomes = [a, b];
        let wins = outcomes.iter().filter(|res| res.is_ok()).count();
        let stale = outcomes
            .iter()
            .filter(|res| matches!(res, Err(StoreError::InvalidVersion)))
            .count();
        assert_eq!((wins, stale), (1, 1));
        assert_eq!(store.read_one(user.id).await.unwrap().version, 2);
        // only the winner enqueued an Updated entry
        assert_eq!(store.outbox_len(user.id), Some(2));
    }
}
