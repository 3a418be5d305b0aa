//! Business logic of the userd service.
//!
//! The [`UserService`] validates requests, hashes passwords, applies the
//! optimistic version discipline and translates store errors into the
//! domain error taxonomy. It also owns the publisher pump that drains the
//! store's outbox to the message bus, and the success-rate monitor the
//! health endpoint reads.

mod error;
mod ids;
mod monitor;
mod password;
mod publisher;
mod service;
mod types;
mod validate;

pub use error::UserError;
pub use ids::{IdGenerator, RandomIds};
pub use monitor::{MIN_HEALTHY_RATIO, SuccessRateMonitor};
pub use password::{BcryptHasher, HashError, PasswordHasher};
pub use service::{
    DEFAULT_LENGTH, DEFAULT_PAGE, DEFAULT_VERSION, MAX_PAGE_LENGTH, PublisherTiming, UserService,
};
pub use types::{
    ChangeEvent, NewUser, SanitizedUser, UserPage, UserQuery, UserRef, UserUpdate, format_time,
};
