//! Capability traits for the message bus.

use async_trait::async_trait;

use crate::error::BusError;

/// Pending send confirmation.
#[async_trait]
pub trait Confirm: Send {
    /// Block until the broker confirms (or rejects) the message.
    async fn done(self: Box<Self>) -> Result<(), BusError>;
}

/// A publisher-with-confirms.
///
/// `send` queues the body with the broker and returns quickly; delivery is
/// only certain once the returned [`Confirm`] resolves. Callers that need
/// a deadline wrap the pair in a timeout.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn send(&self, body: Vec<u8>) -> Result<Box<dyn Confirm>, BusError>;
}
