//! The user service: a stateful façade over the record store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use userd_bus::Bus;
use userd_store::{RecordQuery, StoredUser, UserStore};

use crate::error::UserError;
use crate::ids::IdGenerator;
use crate::monitor::SuccessRateMonitor;
use crate::password::PasswordHasher;
use crate::types::{NewUser, SanitizedUser, UserPage, UserQuery, UserRef, UserUpdate};

/// Documented ceiling for page lengths. Not enforced; clients asking for
/// more get what they asked for.
pub const MAX_PAGE_LENGTH: i32 = 100;
/// Version assigned to newly created users.
pub const DEFAULT_VERSION: i64 = 1;
/// Page used when a find request leaves the page unset.
pub const DEFAULT_PAGE: i64 = 1;
/// Page length used when a find request leaves the length unset.
pub const DEFAULT_LENGTH: i32 = 25;

/// Timing knobs for the publisher pump.
#[derive(Debug, Clone, Copy)]
pub struct PublisherTiming {
    /// Lower bound of the jittered outbox poll interval.
    pub min_poll: Duration,
    /// Upper bound (exclusive) of the jittered outbox poll interval.
    pub max_poll: Duration,
    /// Outbox lease length, and the deadline of each publish task.
    pub retry_interval: Duration,
}

impl Default for PublisherTiming {
    fn default() -> Self {
        Self {
            min_poll: Duration::from_millis(10),
            max_poll: Duration::from_millis(30),
            retry_interval: Duration::from_secs(10),
        }
    }
}

/// Validates requests, hashes passwords, applies the optimistic version
/// discipline and sanitizes everything that leaves the service.
pub struct UserService {
    pub(crate) store: Arc<dyn UserStore>,
    pub(crate) bus: Arc<dyn Bus>,
    hasher: Arc<dyn PasswordHasher>,
    ids: Arc<dyn IdGenerator>,
    pub(crate) timing: PublisherTiming,
    pub(crate) monitor: Arc<SuccessRateMonitor>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        bus: Arc<dyn Bus>,
        hasher: Arc<dyn PasswordHasher>,
        ids: Arc<dyn IdGenerator>,
        timing: PublisherTiming,
    ) -> Self {
        Self {
            store,
            bus,
            hasher,
            ids,
            timing,
            monitor: Arc::new(SuccessRateMonitor::new()),
        }
    }

    /// The publish success-rate monitor, for health checks.
    pub fn monitor(&self) -> Arc<SuccessRateMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Create a new user from a validated request.
    pub async fn create(&self, new_user: &NewUser) -> Result<SanitizedUser, UserError> {
        if let Err(err) = new_user.validate() {
            warn!(error = %err, "cannot create invalid user");
            return Err(UserError::Invalid);
        }

        let password_hash = self
            .hasher
            .hash(&new_user.password)
            .map_err(|err| UserError::Internal(Box::new(err)))?;

        let now = Utc::now();
        let user = StoredUser {
            id: self.ids.generate(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            nickname: new_user.nickname.clone(),
            password_hash,
            email: new_user.email.clone(),
            country: new_user.country.clone(),
            created_at: now,
            updated_at: now,
            version: DEFAULT_VERSION,
        };

        let stored = self.store.create(&user).await?;
        Ok(SanitizedUser::from(&stored))
    }

    /// Update an existing user, guarded by the version the caller read.
    pub async fn update(&self, update: &UserUpdate) -> Result<SanitizedUser, UserError> {
        if let Err(err) = update.validate() {
            warn!(error = %err, "cannot apply invalid update");
            return Err(UserError::Invalid);
        }
        // Validation guarantees the id parses.
        let id = Uuid::parse_str(&update.id).map_err(|_| UserError::Invalid)?;

        let mut rec = self.store.read_one(id).await?;
        if update.version != rec.version {
            return Err(UserError::InvalidVersion);
        }

        if !update.password.is_empty() {
            rec.password_hash = self
                .hasher
                .hash(&update.password)
                .map_err(|err| UserError::Internal(Box::new(err)))?;
        }
        rec.first_name = update.first_name.clone();
        rec.last_name = update.last_name.clone();
        rec.country = update.country.clone();
        rec.updated_at = Utc::now();

        let stored = self.store.update_one(&rec).await?;
        Ok(SanitizedUser::from(&stored))
    }

    /// Delete the referenced user.
    pub async fn delete(&self, user_ref: &UserRef) -> Result<(), UserError> {
        if user_ref.validate().is_err() {
            return Err(UserError::Invalid);
        }
        let id = Uuid::parse_str(&user_ref.id).map_err(|_| UserError::Invalid)?;
        self.store.delete_one(id).await?;
        Ok(())
    }

    /// Find a page of users matching the query.
    ///
    /// Defaults hide input errors on purpose: an unset page means the
    /// first, an unset length means [`DEFAULT_LENGTH`], and an unparseable
    /// `created_after` matches everything.
    pub async fn find(&self, query: &UserQuery) -> Result<UserPage, UserError> {
        let created_after = parse_created_after(&query.created_after);
        let page = if query.page == 0 { DEFAULT_PAGE } else { query.page };
        let length = if query.length == 0 {
            DEFAULT_LENGTH
        } else {
            query.length
        };

        let record_page = self
            .store
            .find_many(&RecordQuery {
                created_after,
                country: match query.country.as_str() {
                    "" => None,
                    country => Some(country.to_string()),
                },
                length,
                page,
            })
            .await?;

        Ok(UserPage {
            page: record_page.page,
            total: record_page.total as i64,
            items: record_page.items.iter().map(SanitizedUser::from).collect(),
        })
    }
}

fn parse_created_after(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
