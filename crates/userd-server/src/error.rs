//! Server error types.

use userd_bus::BusError;
use userd_config::ConfigError;
use userd_store::StoreError;

/// Error raised during bootstrap or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("bus: {0}")]
    Bus(#[from] BusError),
    #[error("transport: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection timed out")]
    ConnectTimeout,
}
