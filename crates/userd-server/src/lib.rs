//! gRPC adaptor, health endpoint and bootstrap wiring for userd.

mod error;
pub mod health;
mod rpc;

pub use error::ServerError;
pub use rpc::UsersRpc;

pub use tokio_util::sync::CancellationToken;
