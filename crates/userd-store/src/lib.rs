//! Store for user records backed by MongoDB.
//!
//! Records are kept using a transactional outbox: each mutation writes the
//! new payload and a pending change event in one atomic document update.
//! A separate pump drains those events to a message bus via [`UserStore::events`]
//! and acknowledges them with [`UserStore::process_event`].
//!
//! Two backends implement the [`UserStore`] seam: [`MongoStore`] for
//! production and [`MemoryStore`] for tests and local development.

mod error;
mod events;
mod memory;
mod mongo;
mod record;
mod traits;

pub use error::StoreError;
pub use events::EventResult;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use record::{
    Action, DELETED_VERSION, EntryState, OutboxEntry, RecordPage, RecordQuery, StoredRecord,
    StoredUser,
};
pub use traits::UserStore;
