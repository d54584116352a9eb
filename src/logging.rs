//! `tracing` subscriber setup.

use tracing::Level;

use crate::config::{ConfigError, LoggingConfig};

/// Install a `fmt` subscriber at `level` (`trace` .. `error`). A second call,
/// or a host that already installed a subscriber, is not an error.
pub fn init(level: &str) -> Result<(), ConfigError> {
    let level: Level = level
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidConfig(format!("unknown log level '{}'", level)))?;
    if tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

pub fn init_from_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    init(&config.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_checks_level() {
        assert!(init("debug").is_ok());
        assert!(init("info").is_ok());
        assert!(matches!(init("loud"), Err(ConfigError::InvalidConfig(_))));
    }
}
