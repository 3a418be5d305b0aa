//! Request, response and event types of the user service.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use validator::Validate;

use userd_store::{OutboxEntry, StoredUser};

use crate::validate::{allowed_runes, iso_country, optional_password, uuid_format};

/// Format a timestamp the way the service speaks time: RFC 3339, UTC,
/// second resolution.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A request to create a user.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewUser {
    #[validate(length(min = 1), custom(function = allowed_runes))]
    pub first_name: String,
    #[validate(length(min = 1), custom(function = allowed_runes))]
    pub last_name: String,
    #[validate(length(min = 1), custom(function = allowed_runes))]
    pub nickname: String,
    #[validate(length(min = 10))]
    pub password: String,
    #[validate(must_match(other = password))]
    pub confirm_password: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = iso_country))]
    pub country: String,
}

/// A request to update a user. Nickname and email are the unique keys and
/// cannot be changed.
#[derive(Debug, Clone, Default, Validate)]
pub struct UserUpdate {
    #[validate(custom(function = uuid_format))]
    pub id: String,
    #[validate(length(min = 1), custom(function = allowed_runes))]
    pub first_name: String,
    #[validate(length(min = 1), custom(function = allowed_runes))]
    pub last_name: String,
    /// Empty leaves the stored password hash untouched.
    #[validate(custom(function = optional_password))]
    pub password: String,
    #[validate(must_match(other = password))]
    pub confirm_password: String,
    #[validate(custom(function = iso_country))]
    pub country: String,
    /// The version the caller last read; the update only applies while the
    /// stored record still carries it.
    pub version: i64,
}

/// A reference to a single user.
#[derive(Debug, Clone, Default, Validate)]
pub struct UserRef {
    #[validate(custom(function = uuid_format))]
    pub id: String,
}

/// Parameters of a find request, as received from the wire.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// RFC 3339 timestamp; empty or unparseable means unbounded.
    pub created_after: String,
    /// Exact-match country filter; empty matches all.
    pub country: String,
    pub length: i32,
    pub page: i64,
}

/// A page of sanitized users.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub page: i64,
    pub total: i64,
    pub items: Vec<SanitizedUser>,
}

/// The public projection of a user. The password hash never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedUser {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl From<&StoredUser> for SanitizedUser {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
            created_at: format_time(user.created_at),
            updated_at: format_time(user.updated_at),
            version: user.version,
        }
    }
}

/// A change message as published to the bus.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub id: String,
    pub version: i64,
    pub action: String,
    pub created_at: String,
    pub sent_at: String,
    /// Snapshot of the record after the action; `null` for deletions.
    pub data: Option<SanitizedUser>,
}

impl ChangeEvent {
    /// Build the published shape from a claimed outbox entry, stamping the
    /// current wall clock as `sent_at`.
    pub fn from_entry(entry: &OutboxEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            version: entry.version,
            action: entry.action.as_str().to_string(),
            created_at: format_time(entry.created_at),
            sent_at: format_time(Utc::now()),
            data: entry.data.as_ref().map(SanitizedUser::from),
        }
    }
}
