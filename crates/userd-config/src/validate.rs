//! Configuration validation logic.

use std::net::SocketAddr;

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.rpc_listen.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation(
            "server.rpc_listen is not a valid socket address".into(),
        ));
    }
    if config.server.health_listen.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation(
            "server.health_listen is not a valid socket address".into(),
        ));
    }
    if config.database.uri.trim().is_empty() {
        return Err(ConfigError::Validation("database.uri is empty".into()));
    }
    if config.database.database.trim().is_empty() {
        return Err(ConfigError::Validation("database.database is empty".into()));
    }
    if config.database.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "database.connect_timeout_secs must be > 0".into(),
        ));
    }
    if config.database.find_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "database.find_timeout_secs must be > 0".into(),
        ));
    }
    if config.bus.uri.trim().is_empty() {
        return Err(ConfigError::Validation("bus.uri is empty".into()));
    }
    if config.bus.routing_key.trim().is_empty() {
        return Err(ConfigError::Validation("bus.routing_key is empty".into()));
    }
    if config.publisher.min_poll_ms >= config.publisher.max_poll_ms {
        return Err(ConfigError::Validation(
            "publisher.min_poll_ms must be < publisher.max_poll_ms".into(),
        ));
    }
    if config.publisher.retry_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "publisher.retry_interval_secs must be > 0".into(),
        ));
    }
    Ok(())
}
