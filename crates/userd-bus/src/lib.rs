//! Message-bus capability for publishing change events.
//!
//! The contract is a publisher-with-confirms: [`Bus::send`] hands a body to
//! the broker without blocking on delivery, and the returned [`Confirm`]
//! resolves once the broker acknowledges it. [`AmqpBus`] implements the
//! contract over RabbitMQ; [`MemoryBus`] is the in-process double for tests.

mod amqp;
mod error;
mod memory;
mod traits;

pub use amqp::AmqpBus;
pub use error::BusError;
pub use memory::{FailureMode, MemoryBus};
pub use traits::{Bus, Confirm};
