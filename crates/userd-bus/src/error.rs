//! Bus error types.

/// Error raised while sending or confirming a message.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Transport failure talking to the broker.
    #[error("amqp: {0}")]
    Amqp(#[from] lapin::Error),

    /// The broker refused the message (nack).
    #[error("the bus rejected the message")]
    Rejected,

    /// Injected failure from the in-memory test bus.
    #[error("simulated bus failure")]
    Simulated,
}
