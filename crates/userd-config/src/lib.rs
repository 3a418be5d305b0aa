//! Configuration loading and CLI definitions for the userd service.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::{
    BusConfig, Config, DatabaseConfig, LoggingConfig, PublisherConfig, ServerConfig,
};
pub use validate::validate_config;
