//! Document layout for stored users and their outbox entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version carried by `Deleted` outbox entries. The live record is gone by
/// then, and the sentinel guarantees the drop guard in
/// [`process_event`](crate::UserStore::process_event) never collides with a
/// concurrent `Updated` acknowledgement.
pub const DELETED_VERSION: i64 = i64::MAX;

/// Processing state of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    /// Waiting to be claimed by a publisher.
    Pending,
    /// Claimed; the lease expires when `updated_at` grows older than the
    /// configured retry interval.
    Processing,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Pending => "Pending",
            EntryState::Processing => "Processing",
        }
    }
}

/// The mutation an outbox entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "Created",
            Action::Updated => "Updated",
            Action::Deleted => "Deleted",
        }
    }
}

/// A user as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password_hash: String,
    pub email: String,
    pub country: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// A queued change event waiting inside the mutated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Identifier of the mutated record.
    pub id: Uuid,
    pub state: EntryState,
    pub action: Action,
    /// Record version at the time of the action; [`DELETED_VERSION`] for
    /// `Deleted` entries.
    pub version: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Snapshot of the record after the action; `None` for `Deleted`.
    pub data: Option<StoredUser>,
}

impl OutboxEntry {
    /// Build a fresh `Pending` entry for the given action.
    pub fn pending(action: Action, id: Uuid, version: i64, data: Option<StoredUser>) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: EntryState::Pending,
            action,
            version,
            created_at: now,
            updated_at: now,
            data,
        }
    }
}

/// The top-level document: the current payload plus the ordered outbox.
///
/// `data` is `None` once the user is deleted; the document itself remains
/// until its outbox drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub data: Option<StoredUser>,
    pub events: Vec<OutboxEntry>,
}

/// Parameters of a find query.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    /// Records created at or after this instant match.
    pub created_after: DateTime<Utc>,
    /// Exact-match country filter; `None` matches all countries.
    pub country: Option<String>,
    /// Page size.
    pub length: i32,
    /// 1-indexed page number.
    pub page: i64,
}

/// A page of matching records together with the unpaginated total.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub page: i64,
    pub total: u64,
    pub items: Vec<StoredUser>,
}

/// Skip count for a query, clamped to zero for nonsense page numbers.
pub(crate) fn skip_for(query: &RecordQuery) -> u64 {
    (i64::from(query.length) * (query.page - 1)).max(0) as u64
}
